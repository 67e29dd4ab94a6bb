//! Session lifecycle manager.
//!
//! Owns the loaded component from load to release:
//! UNLOADED -> LOADED -> INITIALIZING -> RUNNING -> SHUTTING_DOWN -> UNLOADED,
//! with best-effort diagnosis when initialization fails. At most one session
//! handle is live at a time.

mod api;
mod env;
mod silence;

pub use api::{ComponentLoader, DllLoader, LoadError, SessionApi, SteamApiDll};
pub use env::SessionEnv;
pub use silence::with_suppressed_output;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::appid;
use crate::console::Console;
use crate::slot::AppIdSlot;
use crate::validate::AttemptCounter;

pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Clean run: initialized, maintained, stopped by the user, shut down.
    Completed,
    /// User quit at a lifecycle prompt.
    Quit,
    /// Component not found; the user may place it and retry.
    RetryLoad,
    /// Component loaded but incompatible; retry with a cleared identifier.
    Incompatible,
    /// The shared attempt ceiling was exhausted while retrying init.
    AttemptsExceeded,
}

pub struct SessionManager<'a, L, C: ?Sized> {
    loader: &'a L,
    console: &'a mut C,
    env: &'a SessionEnv,
    slot: &'a AppIdSlot,
    maintenance_interval: Duration,
}

impl<'a, L: ComponentLoader, C: Console + ?Sized> SessionManager<'a, L, C> {
    pub fn new(
        loader: &'a L,
        console: &'a mut C,
        env: &'a SessionEnv,
        slot: &'a AppIdSlot,
    ) -> Self {
        Self {
            loader,
            console,
            env,
            slot,
            maintenance_interval: MAINTENANCE_INTERVAL,
        }
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Drive one lifecycle for a confirmed identifier. On init failure the
    /// user may supply a fresh identifier; only the lifecycle restarts, not
    /// catalog validation, so the display name is cleared with it.
    pub fn run(
        &mut self,
        appid: &str,
        display_name: Option<&str>,
        attempts: &mut AttemptCounter,
    ) -> SessionOutcome {
        // UNLOADED -> LOADED
        let api = match self.loader.load() {
            Ok(api) => Arc::new(api),
            Err(err @ LoadError::NotFound { .. }) => {
                warn!(error = %err, "Component load failed");
                self.console.say(&format!("Error: {}.", err));
                return match self
                    .console
                    .ask("Place the library and press ENTER to retry, or Q to quit: ")
                {
                    None => self.quit_unloaded(),
                    Some(line) if appid::is_quit(&line) => self.quit_unloaded(),
                    Some(_) => SessionOutcome::RetryLoad,
                };
            }
            Err(err @ LoadError::MissingInit) => {
                warn!(error = %err, "Component incompatible");
                self.console.say(&format!("Error: {}.", err));
                return SessionOutcome::Incompatible;
            }
        };
        info!("Session component loaded");

        let mut appid = appid.to_string();
        let mut display_name = display_name.map(str::to_string);

        // LOADED -> INITIALIZING, bounded retry with a fresh identifier on
        // failure.
        loop {
            if !attempts.spend() {
                warn!(
                    attempts = attempts.used(),
                    "Attempt ceiling exhausted during initialization"
                );
                self.env.clear();
                return SessionOutcome::AttemptsExceeded;
            }

            // Export the identifier to both surfaces the component reads,
            // clearing stale values from earlier attempts first.
            self.env.clear();
            if let Err(err) = self.slot.save(&appid) {
                warn!(error = %err, "Could not persist AppID before init");
            }
            self.env.export(&appid);

            let initialized = with_suppressed_output(|| api.init());
            if initialized {
                info!(appid = %appid, "Session initialized");
                break;
            }

            debug!(appid = %appid, "Initialization failed, diagnosing");
            self.report_init_failure(&api, &appid, display_name.as_deref());

            match self.prompt_new_appid() {
                None => {
                    self.env.clear();
                    self.console.say("Exiting.");
                    return SessionOutcome::Quit;
                }
                Some(next) => {
                    appid = next;
                    display_name = None;
                }
            }
        }

        // RUNNING
        if let Err(err) = self.slot.save(&appid) {
            warn!(error = %err, "Could not persist AppID after session start");
        }
        match &display_name {
            Some(name) => self
                .console
                .say(&format!("Executing game \"{}\" (AppID {})...", name, appid)),
            None => self
                .console
                .say(&format!("Executing AppID {} (name not found)...", appid)),
        }

        let maintenance = MaintenanceLoop::start(Arc::clone(&api), self.maintenance_interval);
        self.console
            .say("Press ENTER to stop the simulation and exit.");
        let _ = self.console.ask("");

        // RUNNING -> SHUTTING_DOWN. The worker must observe the cleared flag
        // and exit before shutdown runs, so no maintenance call is in flight.
        maintenance.stop();
        api.shutdown();
        self.env.clear();
        self.console.say("Simulation stopped. Exiting.");
        info!(appid = %appid, "Session shut down");
        SessionOutcome::Completed
    }

    fn quit_unloaded(&mut self) -> SessionOutcome {
        self.console.say("Exiting.");
        SessionOutcome::Quit
    }

    fn prompt_new_appid(&mut self) -> Option<String> {
        loop {
            match self
                .console
                .ask("Enter a different AppID to try again, or Q to quit: ")
            {
                None => return None,
                Some(line) if appid::is_quit(&line) => return None,
                Some(line) if line.is_empty() => continue,
                Some(line) => return Some(line),
            }
        }
    }

    /// Best-effort diagnosis of an init failure through the optional
    /// capabilities: no client, client without a user, or a user who does
    /// not own the title.
    fn report_init_failure(&mut self, api: &L::Api, appid: &str, display_name: Option<&str>) {
        if !api.client_running().unwrap_or(false) {
            self.console
                .say("Steam client is not running with a valid user session.");
            self.console
                .say("Please start Steam and log in before trying again.");
            return;
        }
        match api.logged_on() {
            Some(true) => {
                self.console.say(
                    "The AppID appears valid but the game is not owned by the logged-in account.",
                );
                let label = match display_name {
                    Some(name) => format!("game \"{}\" (AppID {})", name, appid),
                    None => format!("AppID {}", appid),
                };
                self.console.say(&format!(
                    "Cannot execute {} - not owned by this Steam account.",
                    label
                ));
            }
            _ => {
                self.console
                    .say("Steam client is running but no user is logged in.");
                self.console.say("Log in to Steam before trying again.");
            }
        }
    }
}

/// Periodic keepalive worker. Stopping clears the running flag and joins, so
/// callers can rely on no maintenance call being in flight afterwards.
/// Cancellation is cooperative: an in-flight call is never interrupted, the
/// loop simply does not schedule another one.
pub struct MaintenanceLoop {
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl MaintenanceLoop {
    pub fn start<A: SessionApi + 'static>(api: Arc<A>, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let worker = thread::spawn(move || {
            debug!("Maintenance loop started");
            while flag.load(Ordering::SeqCst) {
                api.run_callbacks();
                thread::sleep(interval);
            }
            debug!("Maintenance loop exited");
        });
        Self {
            running,
            worker: Some(worker),
        }
    }

    /// Signal the worker and wait for it to finish its current cycle.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Maintenance worker panicked");
            }
        }
    }
}

impl Drop for MaintenanceLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::MAX_ATTEMPTS;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct ScriptedConsole {
        inputs: VecDeque<&'static str>,
        transcript: Vec<String>,
    }

    impl ScriptedConsole {
        fn new(inputs: &[&'static str]) -> Self {
            Self {
                inputs: inputs.iter().copied().collect(),
                transcript: Vec::new(),
            }
        }

        fn said(&self, needle: &str) -> bool {
            self.transcript.iter().any(|line| line.contains(needle))
        }
    }

    impl Console for ScriptedConsole {
        fn say(&mut self, text: &str) {
            self.transcript.push(text.to_string());
        }

        fn ask(&mut self, _prompt: &str) -> Option<String> {
            self.inputs.pop_front().map(str::to_string)
        }
    }

    #[derive(Default)]
    struct FakeApiState {
        callbacks: AtomicUsize,
        shutdowns: AtomicUsize,
        callback_in_flight: AtomicBool,
        shutdown_during_callback: AtomicBool,
    }

    struct FakeApi {
        init_results: Mutex<VecDeque<bool>>,
        client_running: Option<bool>,
        logged_on: Option<bool>,
        state: Arc<FakeApiState>,
    }

    impl FakeApi {
        fn new(init_results: &[bool]) -> Self {
            Self {
                init_results: Mutex::new(init_results.iter().copied().collect()),
                client_running: Some(true),
                logged_on: Some(true),
                state: Arc::new(FakeApiState::default()),
            }
        }

        fn with_client(mut self, client_running: Option<bool>, logged_on: Option<bool>) -> Self {
            self.client_running = client_running;
            self.logged_on = logged_on;
            self
        }
    }

    impl SessionApi for FakeApi {
        fn init(&self) -> bool {
            self.init_results.lock().unwrap().pop_front().unwrap_or(true)
        }

        fn run_callbacks(&self) {
            self.state.callback_in_flight.store(true, Ordering::SeqCst);
            self.state.callbacks.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            self.state.callback_in_flight.store(false, Ordering::SeqCst);
        }

        fn shutdown(&self) {
            if self.state.callback_in_flight.load(Ordering::SeqCst) {
                self.state
                    .shutdown_during_callback
                    .store(true, Ordering::SeqCst);
            }
            self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        }

        fn client_running(&self) -> Option<bool> {
            self.client_running
        }

        fn logged_on(&self) -> Option<bool> {
            self.logged_on
        }
    }

    struct ScriptedLoader {
        plan: Mutex<VecDeque<Result<FakeApi, LoadError>>>,
    }

    impl ScriptedLoader {
        fn new(plan: Vec<Result<FakeApi, LoadError>>) -> Self {
            Self {
                plan: Mutex::new(plan.into_iter().collect()),
            }
        }
    }

    impl ComponentLoader for ScriptedLoader {
        type Api = FakeApi;

        fn load(&self) -> Result<FakeApi, LoadError> {
            self.plan
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected load attempt")
        }
    }

    fn not_found() -> LoadError {
        LoadError::NotFound {
            primary: "steam_api64".to_string(),
            fallback: "steam_api".to_string(),
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        slot: AppIdSlot,
        env: SessionEnv,
    }

    fn fixture(app_var: &'static str, game_var: &'static str) -> Fixture {
        let dir = tempdir().unwrap();
        let slot = AppIdSlot::new(dir.path().join("steam_appid.txt"));
        Fixture {
            _dir: dir,
            slot,
            env: SessionEnv::with_names(app_var, game_var),
        }
    }

    #[test]
    fn clean_run_maintains_and_shuts_down_in_order() {
        let fx = fixture("IDLER_TEST_CLEAN_APP", "IDLER_TEST_CLEAN_GAME");
        let api = FakeApi::new(&[true]);
        let state = Arc::clone(&api.state);
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&[""]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot)
            .with_maintenance_interval(Duration::from_millis(1))
            .run("440", Some("Team Fortress 2"), &mut attempts);

        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(console.said("Executing game \"Team Fortress 2\" (AppID 440)..."));
        assert!(console.said("Simulation stopped"));
        assert_eq!(state.shutdowns.load(Ordering::SeqCst), 1);
        assert!(
            !state.shutdown_during_callback.load(Ordering::SeqCst),
            "shutdown must wait for the maintenance worker to exit"
        );
        assert_eq!(fx.slot.load(), Some("440".to_string()));
        assert!(std::env::var("IDLER_TEST_CLEAN_APP").is_err());
        assert!(std::env::var("IDLER_TEST_CLEAN_GAME").is_err());
    }

    #[test]
    fn maintenance_loop_ticks_until_stopped() {
        let api = Arc::new(FakeApi::new(&[]));
        let state = Arc::clone(&api.state);

        let maintenance = MaintenanceLoop::start(api, Duration::from_millis(1));
        thread::sleep(Duration::from_millis(40));
        maintenance.stop();

        let ticks = state.callbacks.load(Ordering::SeqCst);
        assert!(ticks > 0, "worker never ran");
        thread::sleep(Duration::from_millis(10));
        assert_eq!(
            state.callbacks.load(Ordering::SeqCst),
            ticks,
            "worker kept running after stop"
        );
    }

    #[test]
    fn load_failure_prompts_for_retry() {
        let fx = fixture("IDLER_TEST_RETRY_APP", "IDLER_TEST_RETRY_GAME");
        let loader = ScriptedLoader::new(vec![Err(not_found())]);
        let mut console = ScriptedConsole::new(&[""]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::RetryLoad);
        assert!(console.said("Could not find"));
    }

    #[test]
    fn load_failure_quit() {
        let fx = fixture("IDLER_TEST_LOADQ_APP", "IDLER_TEST_LOADQ_GAME");
        let loader = ScriptedLoader::new(vec![Err(not_found())]);
        let mut console = ScriptedConsole::new(&["q"]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::Quit);
    }

    #[test]
    fn missing_init_is_incompatible() {
        let fx = fixture("IDLER_TEST_INCOMP_APP", "IDLER_TEST_INCOMP_GAME");
        let loader = ScriptedLoader::new(vec![Err(LoadError::MissingInit)]);
        let mut console = ScriptedConsole::new(&[]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::Incompatible);
        assert!(console.said("incompatible"));
    }

    #[test]
    fn init_failure_without_client_reports_client_message() {
        let fx = fixture("IDLER_TEST_NOCLIENT_APP", "IDLER_TEST_NOCLIENT_GAME");
        let api = FakeApi::new(&[false]).with_client(Some(false), None);
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&["q"]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::Quit);
        assert!(console.said("Steam client is not running"));
        assert!(std::env::var("IDLER_TEST_NOCLIENT_APP").is_err());
    }

    #[test]
    fn init_failure_without_login_reports_login_message() {
        let fx = fixture("IDLER_TEST_NOLOGIN_APP", "IDLER_TEST_NOLOGIN_GAME");
        let api = FakeApi::new(&[false]).with_client(Some(true), Some(false));
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&["q"]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::Quit);
        assert!(console.said("no user is logged in"));
    }

    #[test]
    fn init_failure_when_logged_on_reports_entitlement() {
        let fx = fixture("IDLER_TEST_OWNED_APP", "IDLER_TEST_OWNED_GAME");
        let api = FakeApi::new(&[false]).with_client(Some(true), Some(true));
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&["q"]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            Some("Team Fortress 2"),
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::Quit);
        assert!(console
            .said("Cannot execute game \"Team Fortress 2\" (AppID 440) - not owned by this Steam account."));
    }

    #[test]
    fn init_failure_accepts_a_fresh_identifier() {
        let fx = fixture("IDLER_TEST_FRESH_APP", "IDLER_TEST_FRESH_GAME");
        let api = FakeApi::new(&[false, true]);
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&["570", ""]);
        let mut attempts = AttemptCounter::new(MAX_ATTEMPTS);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot)
            .with_maintenance_interval(Duration::from_millis(1))
            .run("440", Some("Team Fortress 2"), &mut attempts);

        assert_eq!(outcome, SessionOutcome::Completed);
        // The fresh identifier was never looked up, so its name is unknown.
        assert!(console.said("Executing AppID 570 (name not found)..."));
        assert_eq!(fx.slot.load(), Some("570".to_string()));
    }

    #[test]
    fn init_retries_stop_at_the_attempt_ceiling() {
        let fx = fixture("IDLER_TEST_CEIL_APP", "IDLER_TEST_CEIL_GAME");
        let api = FakeApi::new(&[false, false, false]).with_client(Some(false), None);
        let loader = ScriptedLoader::new(vec![Ok(api)]);
        let mut console = ScriptedConsole::new(&["1", "2", "3"]);
        let mut attempts = AttemptCounter::new(2);

        let outcome = SessionManager::new(&loader, &mut console, &fx.env, &fx.slot).run(
            "440",
            None,
            &mut attempts,
        );

        assert_eq!(outcome, SessionOutcome::AttemptsExceeded);
        assert!(std::env::var("IDLER_TEST_CEIL_APP").is_err());
    }
}
