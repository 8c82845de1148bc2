//! Decode a plist (ASCII or XML) from a file or stdin and print it.
//!
//! Usage: plist_dump [--xml] [--strict] [FILE]
//!
//! Without `--xml` the decoded tree is printed as indented text; with it the value is
//! re-encoded as an XML plist on stdout.

use anyhow::Context;
use plistcodec::dump::value_to_dump;
use plistcodec::{Decoder, Encoder, Mode, RootPolicy};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn main() -> anyhow::Result<()> {
    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let as_xml = take_flag(&mut raw_args, "--xml");
    let mode = if take_flag(&mut raw_args, "--strict") { Mode::Strict } else { Mode::Permissive };
    if let Some(unknown) = raw_args.iter().find(|a| a.starts_with("--")) {
        anyhow::bail!("unknown option {}\nusage: plist_dump [--xml] [--strict] [FILE]", unknown);
    }
    let path: Option<PathBuf> = raw_args.into_iter().next().map(PathBuf::from);

    let input: Box<dyn Read> = match &path {
        Some(p) => Box::new(BufReader::new(
            File::open(p).with_context(|| format!("open {}", p.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let source = path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<stdin>".into());

    let value = Decoder::with_mode(input, mode)
        .decode_value()
        .with_context(|| format!("decode {}", source))?;
    let value = match value {
        Some(v) => v,
        None => {
            eprintln!("{}: empty plist", source);
            return Ok(());
        }
    };

    let stdout = io::stdout();
    if as_xml {
        Encoder::with_root_policy(stdout.lock(), RootPolicy::Any)
            .encode(&value)
            .context("encode XML")?;
    } else {
        let mut out = stdout.lock();
        writeln!(out, "{}", value_to_dump(&value, 0))?;
    }
    Ok(())
}
