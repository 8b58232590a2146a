//! Config command implementation.

use super::CommandResult;
use rediguard_bootstrap::ConfigFile;
use std::io::Write;

/// Prints the effective configuration as JSON with the password masked.
pub fn run(file: &ConfigFile, out: &mut dyn Write) -> CommandResult {
    let mut shown = file.clone();
    if !shown.password.is_empty() {
        shown.password = "********".to_string();
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&shown)?)?;
    Ok(())
}
