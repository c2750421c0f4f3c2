//! `vault` — solve the vault grid puzzle. No arguments; prints the minimal
//! move sequence, one cardinal direction per line.

use synacor_vm::vault::solve;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match solve() {
        Some(path) => {
            for dir in path {
                println!("{}", dir.name());
            }
            Ok(())
        }
        None => anyhow::bail!("no solution found for the vault grid"),
    }
}
