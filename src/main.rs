mod command;
mod discover;
mod ffmpeg;
mod ffprobe;
mod float;
mod metadata;
mod outdir;
mod plan;
mod process;
mod runlog;
mod temporary;

use anyhow::anyhow;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tokio::signal;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[clap(subcommand)]
    action: Action,

    /// Keep temporary files (trimmed intermediates) after exiting.
    #[arg(long, global = true)]
    keep: bool,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

#[derive(clap::Subcommand)]
enum Action {
    Extract(command::extract::Args),
    Probe(command::probe::Args),
    PrintCompletions(command::print_completions::Args),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let keep = cli.keep;
    let run = async {
        match cli.action {
            Action::Extract(args) => command::extract(args).await,
            Action::Probe(args) => command::probe(args),
            Action::PrintCompletions(args) => command::print_completions(args),
        }
    };

    let out = tokio::select! {
        r = run => r,
        _ = signal::ctrl_c() => Err(anyhow!("ctrl_c")),
    };

    temporary::clean(keep).await;

    out
}
