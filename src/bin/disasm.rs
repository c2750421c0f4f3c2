//! `disasm <IMAGE> [--out <PATH>]` — emit the annotated disassembly listing
//! for a program image, to stdout or to a file.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use synacor_vm::disasm::{disassemble, render};
use synacor_vm::load;

#[derive(Parser)]
#[command(author, version, about = "Disassemble a Synacor-style program image")]
struct Cli {
    /// Path to the program image file.
    image: PathBuf,
    /// Write the listing here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let bytes = fs::read(&cli.image)
        .with_context(|| format!("failed to read image {:?}", cli.image))?;
    let image = load(&bytes).with_context(|| format!("failed to load image {:?}", cli.image))?;

    let listing = render(&disassemble(&image));
    match cli.out {
        Some(path) => {
            fs::write(&path, listing).with_context(|| format!("failed to write {path:?}"))?;
        }
        None => {
            std::io::stdout().write_all(listing.as_bytes())?;
        }
    }
    Ok(())
}
