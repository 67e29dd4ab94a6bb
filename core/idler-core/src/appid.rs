//! AppID candidate resolution and well-formedness checks.
//!
//! Precedence: a non-empty command-line argument wins, then the persisted
//! slot, then interactive input (signaled to the caller by returning `None`).
//! Well-formedness is necessary but not sufficient; an AppID is only
//! confirmed once the catalog reports it exists.

use crate::slot::AppIdSlot;

/// Trim space, tab, CR and LF from both ends.
pub fn trim(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// AppIDs are one or more ASCII decimal digits.
pub fn is_well_formed(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// The universal quit signal: a single `q`, case-insensitive.
pub fn is_quit(input: &str) -> bool {
    matches!(input.as_bytes(), [b'q'] | [b'Q'])
}

/// Pick the AppID candidate from the priority-ordered sources. `None` means
/// the caller must prompt.
pub fn resolve(cli_arg: Option<&str>, slot: &AppIdSlot) -> Option<String> {
    if let Some(arg) = cli_arg {
        let trimmed = trim(arg);
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    slot.load()
}
