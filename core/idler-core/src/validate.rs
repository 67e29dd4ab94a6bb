//! Validation state machine.
//!
//! Reconciles three unreliable inputs - the command-line argument, the
//! persisted slot and interactive input - into one catalog-confirmed AppID.
//! The loop only exits with a confirmed identifier, an explicit quit, or the
//! attempt ceiling; it never spins forever.
//!
//! States: NEED_INPUT -> SYNTAX_CHECK -> CATALOG_CHECK -> CONFIRMED | QUIT.

use tracing::{debug, info, warn};

use crate::appid;
use crate::catalog::{scan, CatalogTransport};
use crate::console::Console;

/// Practically unlimited, but guarantees termination under pathological
/// repeated failure.
pub const MAX_ATTEMPTS: u32 = 1000;

/// Bounds the retry loops. Shared between validation and the lifecycle
/// manager so the process as a whole terminates.
#[derive(Debug)]
pub struct AttemptCounter {
    used: u32,
    max: u32,
}

impl AttemptCounter {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    /// Consume one attempt. Returns false once the ceiling is exhausted.
    pub fn spend(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// Syntax and catalog checks passed, or the user chose to proceed
    /// unverified (then `display_name` is unset).
    Confirmed {
        appid: String,
        display_name: Option<String>,
    },
    /// User-requested quit.
    Quit,
    /// The attempt ceiling was exhausted.
    AttemptsExceeded,
}

pub struct Validator<'a, T: ?Sized, C: ?Sized> {
    transport: &'a T,
    console: &'a mut C,
}

impl<'a, T: CatalogTransport + ?Sized, C: Console + ?Sized> Validator<'a, T, C> {
    pub fn new(transport: &'a T, console: &'a mut C) -> Self {
        Self { transport, console }
    }

    /// Run the machine to a terminal state, starting from an optional
    /// pre-resolved candidate.
    pub fn confirm(
        &mut self,
        initial: Option<String>,
        attempts: &mut AttemptCounter,
    ) -> Confirmation {
        let mut candidate = initial;

        loop {
            if !attempts.spend() {
                warn!(
                    attempts = attempts.used(),
                    "Attempt ceiling exhausted during validation"
                );
                return Confirmation::AttemptsExceeded;
            }

            // NEED_INPUT
            let current = match candidate.take() {
                Some(value) => value,
                None => match self.console.ask("Enter Steam AppID (or Q to quit): ") {
                    None => return self.quit(),
                    Some(line) if appid::is_quit(&line) => return self.quit(),
                    Some(line) => line,
                },
            };

            // SYNTAX_CHECK
            if !appid::is_well_formed(&current) {
                debug!(candidate = %current, "Rejected malformed AppID");
                self.console.say("Error: AppID must contain digits only.");
                continue;
            }

            // CATALOG_CHECK
            self.console.say("Checking Steam Store for AppID...");
            let payload = match self.transport.fetch(&current) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, appid = %current, "Catalog fetch failed");
                    self.console
                        .say("Warning: Could not contact Steam Store (network issue?).");
                    let choice = match self
                        .console
                        .ask("Retry? (Y to retry, N to continue without Store check, Q to quit): ")
                    {
                        None => return self.quit(),
                        Some(choice) => choice,
                    };
                    match choice.bytes().next() {
                        Some(b'q' | b'Q') => return self.quit(),
                        Some(b'y' | b'Y') => continue,
                        // N or anything else: proceed without verification.
                        _ => {
                            info!(appid = %current, "Proceeding without catalog verification");
                            return Confirmation::Confirmed {
                                appid: current,
                                display_name: None,
                            };
                        }
                    }
                }
            };

            let record = scan(&payload, &current);
            if !record.exists {
                debug!(appid = %current, "Catalog reports no entry");
                self.console
                    .say("AppID not found or store reports no data for this AppID.");
                continue;
            }

            info!(appid = %current, name = ?record.display_name, "AppID confirmed by catalog");
            return Confirmation::Confirmed {
                appid: current,
                display_name: record.display_name,
            };
        }
    }

    fn quit(&mut self) -> Confirmation {
        self.console.say("Exiting.");
        Confirmation::Quit
    }
}
