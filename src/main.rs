mod common;
mod completions;
mod cue;
mod extract;
mod formats;
mod optimize;
mod probe;
mod report;
mod run;
mod ui;

use std::io::IsTerminal;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::run::{CheckArgs, ProbeArgs, RunArgs};
use crate::ui::OutputFormat;

/// Retime embedded and standalone subtitles for comfortable reading
#[derive(Parser, Debug)]
#[command(name = "subpace", author, version, about, long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize subtitle timing in videos or subtitle files
    Run(RunArgs),
    /// List the subtitle tracks of a video
    Probe(ProbeArgs),
    /// Report timing-constraint violations in a subtitle file
    Check(CheckArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// The clap command, exposed for completion generation.
pub fn cli_command() -> clap::Command {
    Cli::command()
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, std::io::stdout().is_terminal(), cli.debug);

    let result = match cli.command {
        Commands::Run(args) => run::handle_run(args),
        Commands::Probe(args) => run::handle_probe(args),
        Commands::Check(args) => run::handle_check(args),
        Commands::Completions { shell } => completions::handle_completions(shell),
    };

    if let Err(error) = result {
        ui::error("main.failed", &format!("{error:#}"));
        std::process::exit(1);
    }
}
