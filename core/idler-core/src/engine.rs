//! Top-level orchestration: resolve a candidate AppID, confirm it against
//! the catalog, then hand it to the session lifecycle. Outer loop because a
//! failed component load can send the flow back to the start.

use std::time::Duration;

use tracing::{error, info};

use crate::appid;
use crate::catalog::CatalogTransport;
use crate::console::Console;
use crate::session::{ComponentLoader, SessionEnv, SessionManager, SessionOutcome};
use crate::slot::AppIdSlot;
use crate::validate::{AttemptCounter, Confirmation, Validator, MAX_ATTEMPTS};

pub const EXIT_OK: i32 = 0;
pub const EXIT_ATTEMPTS_EXCEEDED: i32 = 2;
pub const EXIT_COMPONENT_LOAD: i32 = 3;
pub const EXIT_MISSING_INIT: i32 = 4;
pub const EXIT_INIT_FAILED: i32 = 5;

/// What was failing when the attempt ceiling hit. Picks the exit code for
/// the ceiling abort.
#[derive(Debug, Clone, Copy)]
enum FailureCause {
    ComponentLoad,
    MissingInit,
    InitFailed,
}

impl FailureCause {
    fn exit_code(self) -> i32 {
        match self {
            FailureCause::ComponentLoad => EXIT_COMPONENT_LOAD,
            FailureCause::MissingInit => EXIT_MISSING_INIT,
            FailureCause::InitFailed => EXIT_INIT_FAILED,
        }
    }
}

pub struct Engine<T, L, C> {
    transport: T,
    loader: L,
    console: C,
    slot: AppIdSlot,
    env: SessionEnv,
    max_attempts: u32,
    maintenance_interval: Duration,
}

impl<T: CatalogTransport, L: ComponentLoader, C: Console> Engine<T, L, C> {
    pub fn new(transport: T, loader: L, console: C, slot: AppIdSlot, env: SessionEnv) -> Self {
        Self {
            transport,
            loader,
            console,
            slot,
            env,
            max_attempts: MAX_ATTEMPTS,
            maintenance_interval: crate::session::MAINTENANCE_INTERVAL,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Run to completion and return the process exit code.
    pub fn run(&mut self, cli_arg: Option<&str>) -> i32 {
        let mut attempts = AttemptCounter::new(self.max_attempts);
        let mut candidate = appid::resolve(cli_arg, &self.slot);
        let mut last_failure: Option<FailureCause> = None;

        loop {
            let (appid, display_name) = {
                let mut validator = Validator::new(&self.transport, &mut self.console);
                match validator.confirm(candidate.take(), &mut attempts) {
                    Confirmation::Confirmed {
                        appid,
                        display_name,
                    } => (appid, display_name),
                    Confirmation::Quit => return EXIT_OK,
                    Confirmation::AttemptsExceeded => return self.abort(last_failure),
                }
            };

            if let Err(err) = self.slot.save(&appid) {
                tracing::warn!(error = %err, "Could not persist confirmed AppID");
            }
            info!(appid = %appid, name = ?display_name, "AppID confirmed, starting session");

            let mut manager =
                SessionManager::new(&self.loader, &mut self.console, &self.env, &self.slot)
                    .with_maintenance_interval(self.maintenance_interval);
            match manager.run(&appid, display_name.as_deref(), &mut attempts) {
                SessionOutcome::Completed | SessionOutcome::Quit => return EXIT_OK,
                SessionOutcome::RetryLoad => {
                    // Back to the top with the same confirmed identifier.
                    last_failure = Some(FailureCause::ComponentLoad);
                    candidate = Some(appid);
                }
                SessionOutcome::Incompatible => {
                    // Fresh attempt with a cleared identifier; candidate is
                    // already consumed, so the user is prompted again.
                    last_failure = Some(FailureCause::MissingInit);
                }
                SessionOutcome::AttemptsExceeded => {
                    return self.abort(Some(FailureCause::InitFailed));
                }
            }
        }
    }

    fn abort(&mut self, cause: Option<FailureCause>) -> i32 {
        self.console
            .say("Aborting: too many attempts or unrecoverable error.");
        let code = cause
            .map(FailureCause::exit_code)
            .unwrap_or(EXIT_ATTEMPTS_EXCEEDED);
        error!(exit_code = code, "Attempt ceiling exhausted, aborting");
        code
    }
}
