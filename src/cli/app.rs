//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::storage::Workspace;

use super::output::{Output, OutputFormat};
use super::{file_cmd, session_cmd};

#[derive(Parser)]
#[command(name = "linefix")]
#[command(author, version, about = "Line-anchored patching for AI-suggested code fixes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a linefix workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Number the lines of a source file for the AI round-trip
    Encode {
        /// Source file
        file: PathBuf,

        /// Write output here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Remove line anchors, recovering plain source
    Strip {
        /// Anchored file
        file: PathBuf,

        /// Write output here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Extract an anchored patch from an AI response
    Parse {
        /// File holding the raw AI response
        file: PathBuf,

        /// Fail if any line cannot be parsed
        #[arg(long)]
        strict: bool,
    },

    /// Merge a patch into a numbered file
    Apply {
        /// Numbered (anchored) file to merge into
        #[arg(long)]
        base: PathBuf,

        /// Patch file (flat JSON object of anchor to content)
        #[arg(long)]
        patch: PathBuf,

        /// Write output here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Diff a source file against its patched form
    Diff {
        /// Original source file
        #[arg(long)]
        source: PathBuf,

        /// Patch file (flat JSON object of anchor to content)
        #[arg(long)]
        patch: PathBuf,
    },

    /// Manage fix sessions
    #[command(subcommand)]
    Session(session_cmd::SessionCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("linefix starting");

    match cli.command {
        Commands::Init { path } => {
            let workspace = Workspace::init(&path)?;
            output.success(&format!(
                "Initialized linefix workspace at {}",
                workspace.root().display()
            ));
        }

        Commands::Encode { file, out } => file_cmd::encode(&output, &file, out.as_deref())?,
        Commands::Strip { file, out } => file_cmd::strip_file(&output, &file, out.as_deref())?,
        Commands::Parse { file, strict } => file_cmd::parse(&output, &file, strict)?,

        Commands::Apply { base, patch, out } => {
            file_cmd::apply(&output, &base, &patch, out.as_deref())?
        }
        Commands::Diff { source, patch } => file_cmd::diff(&output, &source, &patch)?,

        Commands::Session(cmd) => session_cmd::run(cmd, &output)?,
    }

    Ok(())
}
