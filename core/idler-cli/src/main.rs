//! Interactive Steam play-session simulator.
//!
//! Resolves an AppID from the command line, `steam_appid.txt`, or a prompt,
//! confirms it against the Steam Store, then loads the steam_api library
//! and holds a session open until the user presses ENTER.

mod logging;

use std::process::exit;

use clap::Parser;
use tracing::info;

use idler_core::catalog::HttpCatalog;
use idler_core::console::StdConsole;
use idler_core::engine::Engine;
use idler_core::session::{DllLoader, SessionEnv};
use idler_core::slot::AppIdSlot;

const BANNER_WIDTH: usize = 47;

#[derive(Parser)]
#[command(name = "steam-idler", version, about = "Steam play-session simulator")]
struct Cli {
    /// AppID to simulate. Falls back to steam_appid.txt, then to a prompt.
    #[arg(value_name = "APPID")]
    appid: Option<String>,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();
    info!(appid = ?cli.appid, "Starting up");

    banner();

    let transport = match HttpCatalog::new() {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("Error: could not set up the Steam Store client: {}", err);
            exit(1);
        }
    };

    let mut engine = Engine::new(
        transport,
        DllLoader::new(),
        StdConsole,
        AppIdSlot::in_current_dir(),
        SessionEnv::new(),
    );
    let code = engine.run(cli.appid.as_deref());
    info!(exit_code = code, "Exiting");
    exit(code);
}

fn banner() {
    let title = "Simple Steam Idler";
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("{:^width$}", title, width = BANNER_WIDTH);
    println!("{}", "=".repeat(BANNER_WIDTH));
}
