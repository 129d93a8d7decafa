mod cli;
mod export;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Render(args) => run::render(args),
        Command::Geometry(args) => run::geometry(args),
        Command::Config(config_cmd) => match config_cmd.action {
            ConfigAction::Check { file } => run::config_check(&file),
            ConfigAction::Where => run::config_where(),
        },
    }
}
