//! Console capability for user-facing text and line input.
//!
//! The engine talks to the terminal only through this trait, so tests can
//! script input and capture output. Diagnostics never go here; tracing
//! writes them to the log file instead.

use std::io::{self, BufRead, Write};

use crate::appid;

pub trait Console {
    /// Print a line of user-facing text.
    fn say(&mut self, text: &str);

    /// Print a prompt (no trailing newline), then read one line. Returns the
    /// trimmed line, or `None` once input is closed.
    fn ask(&mut self, prompt: &str) -> Option<String>;
}

/// Process stdin/stdout.
pub struct StdConsole;

impl Console for StdConsole {
    fn say(&mut self, text: &str) {
        println!("{}", text);
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        if !prompt.is_empty() {
            print!("{}", prompt);
            let _ = io::stdout().flush();
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(appid::trim(&line).to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read console input");
                None
            }
        }
    }
}
