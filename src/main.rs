//! linefix - line-anchored patching for AI-suggested code fixes

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = linefix::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
