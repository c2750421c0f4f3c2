//! `ackermann` — search for the teleporter's confirmation seed. No
//! arguments; prints the discovered `p`.

use synacor_vm::ackermann::find_teleporter_seed;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match find_teleporter_seed() {
        Some(p) => {
            println!("{p}");
            Ok(())
        }
        None => anyhow::bail!("no seed in [0, 32768) makes A(4, 1, p) == 6"),
    }
}
