//! Literal command tier
//!
//! Checked before the intent classifier. Matching is exact (case-insensitive,
//! surrounding whitespace ignored) except `describe`/`desc`, which take the
//! rest of the message as a table reference.

/// Commands available while idle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    ShowTables,
    /// Bare table name or dotted reference, casing preserved
    Describe(String),
    Status,
}

/// How a message reads while a transform awaits confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Confirm,
    Cancel,
    ShowSql,
    Other,
}

const CONFIRM_WORDS: [&str; 5] = ["confirm", "yes", "y", "execute", "run"];
const CANCEL_WORDS: [&str; 4] = ["cancel", "no", "n", "abort"];
const SHOW_SQL_WORDS: [&str; 2] = ["show sql", "sql"];

pub fn parse_command(message: &str) -> Option<Command> {
    let trimmed = message.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "help" | "?" => return Some(Command::Help),
        "show tables" | "list tables" | "tables" => return Some(Command::ShowTables),
        "status" | "state" => return Some(Command::Status),
        _ => {}
    }

    for keyword in ["describe ", "desc "] {
        if lowered.starts_with(keyword) {
            // Keyword is ASCII, so the byte offset is valid in `trimmed`
            let reference = trimmed[keyword.len()..].trim();
            if !reference.is_empty() {
                return Some(Command::Describe(reference.to_string()));
            }
        }
    }

    None
}

pub fn parse_confirmation(message: &str) -> ConfirmationReply {
    let lowered = message.trim().to_lowercase();
    let lowered = lowered.as_str();

    if CONFIRM_WORDS.contains(&lowered) {
        ConfirmationReply::Confirm
    } else if CANCEL_WORDS.contains(&lowered) {
        ConfirmationReply::Cancel
    } else if SHOW_SQL_WORDS.contains(&lowered) {
        ConfirmationReply::ShowSql
    } else {
        ConfirmationReply::Other
    }
}
