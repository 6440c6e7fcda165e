use anyhow::anyhow;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::str::FromStr;

/// Print shell completions.
#[derive(Parser)]
pub struct Args {
    /// Shell.
    #[arg(default_value = "bash")]
    shell: String,
}

pub fn print_completions(Args { shell }: Args) -> anyhow::Result<()> {
    clap_complete::generate(
        Shell::from_str(&shell).map_err(|e| anyhow!("Shell {e}"))?,
        &mut crate::Cli::command(),
        "vid2frames",
        &mut std::io::stdout(),
    );
    Ok(())
}
