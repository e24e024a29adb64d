//! cli component of the mutation-dispatch project.
//!
//! lines starting with `> ` denote commands that should be valid under the current implementation.
//! `$exename` stands for the executable name, which is `mutdispatch` in linux or `mutdispatch.exe` on windows.
//! `<description>` denotes a required argument, while `[description]` denotes an optional argument.
//!
//! # Replaying
//!
//! > `$exename replay <path to batches file>
//! >   [--output <path>]
//! >   [--using <rule chain>]
//! >   [--from-file <path to rules file>]
//! >   [--preset <preset name>]`
//!
//! the batches file is a json array of batches, each batch being a json array of mutation records.
//! every batch is dispatched in order through the selected rules, and the batches that reach the
//! handler are written out as the same json shape. skipped batches are simply absent from the output.
//! without `--output`, the result goes to stdout. a summary is printed to stderr either way.
//!
//! the rules are picked with the following priority:
//!     1. an inline chain of presets, `--using "privacy -> transient"`
//!     2. a json rules file, `--from-file rules.json`
//!     3. a single preset, `--preset privacy`
//!     4. the `passthrough` preset
//!
//! # Rule Management
//!
//! > `$exename rules list-presets [--detailed]`
//!
//! lists every preset available in the current build. `--detailed` also prints what each one does.
//!
//! > `$exename rules save-to-file <preset name> <output path>`
//!
//! writes the preset as a json rules file, which is a good starting point for custom rules.
use clap::{Args, Parser, Subcommand};
use mutation_dispatch::RecordError;
use std::path::PathBuf;
use thiserror::Error;

pub mod replay;
pub mod rules;

/// Error types for CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("batch {batch}, record {record}: {source}")]
    InvalidRecord {
        batch: usize,
        record: usize,
        #[source]
        source: RecordError,
    },
}

/// CLI arguments for the mutdispatch application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Supported commands for mutdispatch
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dispatch recorded batches through a set of preprocessing rules
    Replay(ReplayArgs),

    /// Rule preset management commands
    #[command(subcommand)]
    Rules(RulesCommand),
}

/// Arguments specific to the replay command
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to a json array of mutation batches
    pub input: PathBuf,

    /// Where to write the forwarded batches (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub selection: RuleSelectionArgs,
}

/// Where the preprocessing rules come from
#[derive(Args, Debug, Default)]
pub struct RuleSelectionArgs {
    /// Chain of presets (e.g. "privacy -> transient")
    #[arg(long)]
    pub using: Option<String>,

    /// Load rules from a JSON file
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Use a predefined rule preset
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelection {
    Inline(String),
    FromFile(PathBuf),
    Preset(String),
    Default,
}

impl RuleSelectionArgs {
    pub fn rule_selection(&self) -> RuleSelection {
        if let Some(chain) = &self.using {
            RuleSelection::Inline(chain.clone())
        } else if let Some(path) = &self.from_file {
            RuleSelection::FromFile(path.clone())
        } else if let Some(preset) = &self.preset {
            RuleSelection::Preset(preset.clone())
        } else {
            RuleSelection::Default
        }
    }
}

/// Rule management subcommands
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List available rule presets
    ListPresets {
        /// Show what each preset does
        #[arg(long)]
        detailed: bool,
    },

    /// Save a preset as a JSON rules file
    SaveToFile {
        /// Preset name (e.g. "privacy")
        preset: String,

        /// Output file path
        output_path: PathBuf,
    },
}
