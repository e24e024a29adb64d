extern crate anyhow;
extern crate clap;
#[macro_use]
extern crate mutation_dispatch;
extern crate serde_json;
extern crate thiserror;

#[cfg(feature = "tracing")]
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Command};
use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tracing")]
    {
        // stdout carries replay output, so logs go to stderr
        let subscriber = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Replay(args) => cli::replay::replay(args),
        Command::Rules(command) => cli::rules::rules(command),
    }
}
