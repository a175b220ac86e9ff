//! Session commands: the upload-fix-export workflow
//!
//! Sessions wrap the pure transforms with persistence so a user can
//! absorb AI responses round by round and pull the fixed file out at
//! any point.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use crate::storage::{read_source, Session, SessionId, SessionSummary, Workspace};

use super::file_cmd::{render_diff, report_skipped};
use super::output::Output;

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Snapshot a source file into a new fix session
    New {
        /// Source file to fix
        file: PathBuf,

        /// Session name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List sessions
    List,

    /// Show session details
    Show {
        /// Session ID (s-xxxxxxx)
        id: String,
    },

    /// Print the numbered text to send to the AI
    Numbered {
        /// Session ID
        id: String,
    },

    /// Fold an AI response into the session's cumulative patch
    Absorb {
        /// Session ID
        id: String,

        /// File holding the raw AI response
        response: PathBuf,

        /// Refuse the response if any line fails to parse
        #[arg(long)]
        strict: bool,
    },

    /// Show the diff between the original and the patched source
    Diff {
        /// Session ID
        id: String,
    },

    /// Write the fixed, anchor-free file
    Export {
        /// Session ID
        id: String,

        /// Output path (defaults to fixed_{name} in the current directory)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
}

pub fn run(cmd: SessionCommands, output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let sessions = workspace.sessions();

    match cmd {
        SessionCommands::New { file, name } => {
            let source = read_source(&file)?;
            let name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            });

            let session = Session::new(name, source);
            sessions.save(&session)?;

            if output.is_json() {
                output.data(&SessionSummary::from(&session));
            } else {
                output.success(&format!("Created session {} ({})", session.id, session.name));
            }
        }

        SessionCommands::List => {
            let summaries = sessions.list()?;
            if output.is_json() {
                output.data(&summaries);
            } else if summaries.is_empty() {
                output.success("No sessions");
            } else {
                for summary in summaries {
                    println!(
                        "{}\t{}\t{} line(s), {} patched",
                        summary.id, summary.name, summary.source_lines, summary.patch_lines
                    );
                }
            }
        }

        SessionCommands::Show { id } => {
            let session = sessions.load(&id.parse()?)?;
            let summary = SessionSummary::from(&session);
            if output.is_json() {
                output.data(&summary);
            } else {
                println!("Session {}", summary.id);
                println!("Name: {}", summary.name);
                println!("Created: {}", summary.created_at);
                println!("Updated: {}", summary.updated_at);
                println!("Source lines: {}", summary.source_lines);
                println!("Patch entries: {}", summary.patch_lines);
            }
        }

        SessionCommands::Numbered { id } => {
            let session = sessions.load(&id.parse()?)?;
            print!("{}", session.numbered());
        }

        SessionCommands::Absorb {
            id,
            response,
            strict,
        } => {
            let mut session = sessions.load(&id.parse()?)?;
            let response_text = read_source(&response)?;

            let outcome = session.absorb(&response_text);

            let strict = strict || workspace.config().strict_parse;
            if strict && !outcome.skipped.is_empty() {
                // The in-memory session is discarded; nothing was saved.
                bail!(
                    "response contains {} unparseable line(s); first: '{}'",
                    outcome.skipped.len(),
                    outcome.skipped[0].line
                );
            }

            report_skipped(output, &outcome.skipped, workspace.config().max_skip_report);
            for note in &outcome.stale {
                output.warn(&note.to_string());
            }

            sessions.save(&session)?;
            output.success(&format!(
                "Absorbed {} line(s) into {} ({} skipped)",
                outcome.absorbed,
                session.id,
                outcome.skipped.len()
            ));
        }

        SessionCommands::Diff { id } => {
            let session = sessions.load(&id.parse()?)?;
            render_diff(output, &session.diff());
        }

        SessionCommands::Export { id, out } => {
            let session = sessions.load(&id.parse()?)?;

            let merged = session.merged();
            for note in &merged.notes {
                output.warn(&note.to_string());
            }

            let path = out.unwrap_or_else(|| PathBuf::from(format!("fixed_{}", session.name)));
            fs::write(&path, merged.merged.to_plain_text())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Wrote {}", path.display()));
        }

        SessionCommands::Delete { id } => {
            let id: SessionId = id.parse()?;
            if sessions.delete(&id)? {
                output.success(&format!("Deleted session {}", id));
            } else {
                bail!("Session not found: {}", id);
            }
        }
    }

    Ok(())
}
