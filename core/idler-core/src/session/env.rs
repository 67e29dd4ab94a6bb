//! Process-scoped configuration surfaces read by the session component.
//!
//! The component picks its AppID up from two well-known environment
//! variables. They are mutated only through this type, with explicit
//! set/clear bracketing each attempt so no stale value leaks between
//! attempts.

use std::env;

use tracing::debug;

const APP_ID_VAR: &str = "SteamAppId";
const GAME_ID_VAR: &str = "SteamGameId";

pub struct SessionEnv {
    app_id_var: &'static str,
    game_id_var: &'static str,
}

impl SessionEnv {
    pub fn new() -> Self {
        Self {
            app_id_var: APP_ID_VAR,
            game_id_var: GAME_ID_VAR,
        }
    }

    /// Replace the variable names. Tests use this to keep parallel runs
    /// isolated from each other and from a real Steam install.
    pub fn with_names(app_id_var: &'static str, game_id_var: &'static str) -> Self {
        Self {
            app_id_var,
            game_id_var,
        }
    }

    pub fn export(&self, appid: &str) {
        env::set_var(self.app_id_var, appid);
        env::set_var(self.game_id_var, appid);
        debug!(appid, "Exported session environment");
    }

    pub fn clear(&self) {
        env::remove_var(self.app_id_var);
        env::remove_var(self.game_id_var);
        debug!("Cleared session environment");
    }
}

impl Default for SessionEnv {
    fn default() -> Self {
        Self::new()
    }
}
