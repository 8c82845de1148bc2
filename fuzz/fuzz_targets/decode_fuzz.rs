//! Decoder fuzz target: feed arbitrary bytes to the format dispatcher.
//! Decoding must not panic; any value it returns must re-encode without panicking.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    if let Ok(Some(v)) = plistcodec::value_from_slice(data) {
        let _ = plistcodec::to_vec(&v);
    }
    let _ = plistcodec::xml::value_from_slice(data);
    let _ = plistcodec::ascii::value_from_slice(data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
