//! `vm <IMAGE>` — run the VM against a program image, talking to the real
//! terminal. Exit code 0 on a clean halt, non-zero on load or execution
//! failure.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use synacor_vm::{load, StdioTerminal, Vm};

#[derive(Parser)]
#[command(author, version, about = "Run a Synacor-style program image")]
struct Cli {
    /// Path to the program image file.
    image: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let bytes = fs::read(&cli.image)
        .with_context(|| format!("failed to read image {:?}", cli.image))?;
    let image = load(&bytes).with_context(|| format!("failed to load image {:?}", cli.image))?;

    let mut vm = Vm::new(image, StdioTerminal::default());
    vm.run().context("vm execution failed")?;
    Ok(())
}
