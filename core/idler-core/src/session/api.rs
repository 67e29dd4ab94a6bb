//! The dynamically resolved session capability set.
//!
//! The steam_api library is never linked; its entry points are resolved at
//! load time into a struct of function values. Only `SteamAPI_Init` is
//! mandatory - everything else is resolved opportunistically and checked
//! before use.

use std::ffi::{c_void, OsString};

use libloading::{library_filename, Library};
use tracing::{debug, warn};

pub const PRIMARY_LIB: &str = "steam_api64";
pub const FALLBACK_LIB: &str = "steam_api";

type InitFn = unsafe extern "C" fn() -> bool;
type VoidFn = unsafe extern "C" fn();
type BoolFn = unsafe extern "C" fn() -> bool;
type SteamUserFn = unsafe extern "C" fn() -> *mut c_void;
type LoggedOnFn = unsafe extern "C" fn(*mut c_void) -> bool;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither library name could be loaded. Recoverable: the user may place
    /// the library and retry.
    #[error("Could not find {primary} or {fallback} in the current folder")]
    NotFound { primary: String, fallback: String },

    /// The library loaded but lacks the mandatory initialize entry point.
    /// Treated as an incompatible component.
    #[error("Component loaded but SteamAPI_Init was not found (incompatible library?)")]
    MissingInit,
}

/// Resolved capability set of the session component.
pub trait SessionApi: Send + Sync {
    /// Initialize a session for the exported AppID. Mandatory capability.
    fn init(&self) -> bool;

    /// Periodic maintenance call. Best-effort; a no-op when unavailable.
    fn run_callbacks(&self);

    /// Session teardown. Best-effort; a no-op when unavailable.
    fn shutdown(&self);

    /// Whether the external client is active. `None` when the capability is
    /// missing.
    fn client_running(&self) -> Option<bool>;

    /// Whether a user session is logged on. `None` when the capability is
    /// missing.
    fn logged_on(&self) -> Option<bool>;
}

/// Produces a live capability set. The lifecycle manager is generic over
/// this so tests can run against in-process fakes.
pub trait ComponentLoader {
    type Api: SessionApi + 'static;

    fn load(&self) -> Result<Self::Api, LoadError>;
}

/// Loads steam_api by its platform-decorated names.
pub struct DllLoader {
    primary: OsString,
    fallback: OsString,
}

impl DllLoader {
    pub fn new() -> Self {
        Self {
            primary: library_filename(PRIMARY_LIB),
            fallback: library_filename(FALLBACK_LIB),
        }
    }
}

impl Default for DllLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentLoader for DllLoader {
    type Api = SteamApiDll;

    fn load(&self) -> Result<SteamApiDll, LoadError> {
        let library = unsafe { Library::new(&self.primary) }
            .or_else(|primary_err| {
                debug!(error = %primary_err, "Primary library name failed to load");
                unsafe { Library::new(&self.fallback) }
            })
            .map_err(|err| {
                warn!(error = %err, "Fallback library name failed to load");
                LoadError::NotFound {
                    primary: self.primary.to_string_lossy().into_owned(),
                    fallback: self.fallback.to_string_lossy().into_owned(),
                }
            })?;
        SteamApiDll::resolve(library)
    }
}

/// The real capability set: raw entry points into the loaded library.
pub struct SteamApiDll {
    init: InitFn,
    run_callbacks: Option<VoidFn>,
    shutdown: Option<VoidFn>,
    is_running: Option<BoolFn>,
    steam_user: Option<SteamUserFn>,
    user_logged_on: Option<LoggedOnFn>,
    // The function pointers above are only valid while the library stays
    // mapped; it is released when this struct drops.
    _library: Library,
}

impl SteamApiDll {
    fn resolve(library: Library) -> Result<Self, LoadError> {
        let init = match unsafe { library.get::<InitFn>(b"SteamAPI_Init\0") } {
            Ok(symbol) => *symbol,
            Err(err) => {
                warn!(error = %err, "SteamAPI_Init missing from loaded library");
                return Err(LoadError::MissingInit);
            }
        };

        let api = Self {
            init,
            run_callbacks: optional::<VoidFn>(&library, b"SteamAPI_RunCallbacks\0"),
            shutdown: optional::<VoidFn>(&library, b"SteamAPI_Shutdown\0"),
            is_running: optional::<BoolFn>(&library, b"SteamAPI_IsSteamRunning\0"),
            steam_user: optional::<SteamUserFn>(&library, b"SteamAPI_SteamUser\0"),
            user_logged_on: optional::<LoggedOnFn>(&library, b"SteamAPI_ISteamUser_BLoggedOn\0"),
            _library: library,
        };
        debug!(
            run_callbacks = api.run_callbacks.is_some(),
            shutdown = api.shutdown.is_some(),
            is_running = api.is_running.is_some(),
            user_lookup = api.steam_user.is_some() && api.user_logged_on.is_some(),
            "Resolved session capability set"
        );
        Ok(api)
    }
}

fn optional<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    unsafe { library.get::<T>(symbol) }.ok().map(|s| *s)
}

impl SessionApi for SteamApiDll {
    fn init(&self) -> bool {
        unsafe { (self.init)() }
    }

    fn run_callbacks(&self) {
        if let Some(f) = self.run_callbacks {
            unsafe { f() }
        }
    }

    fn shutdown(&self) {
        if let Some(f) = self.shutdown {
            unsafe { f() }
        }
    }

    fn client_running(&self) -> Option<bool> {
        self.is_running.map(|f| unsafe { f() })
    }

    fn logged_on(&self) -> Option<bool> {
        let steam_user = self.steam_user?;
        let user_logged_on = self.user_logged_on?;
        let user = unsafe { steam_user() };
        if user.is_null() {
            return Some(false);
        }
        Some(unsafe { user_logged_on(user) })
    }
}
