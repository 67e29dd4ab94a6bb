//! Core library for steam-idler.
//!
//! Everything the binary does lives here: resolving an AppID candidate from
//! the command line, the persisted slot or an interactive prompt; confirming
//! it against the Steam Store catalog; and driving the lifecycle of the local
//! `steam_api` library (load, init, periodic maintenance, shutdown).
//!
//! The interactive console, the catalog transport and the session component
//! are all behind small traits so the control flow can be exercised in tests
//! without a terminal, a network or a real library on disk.

pub mod appid;
pub mod catalog;
pub mod console;
pub mod engine;
pub mod error;
pub mod session;
pub mod slot;
pub mod validate;

pub use engine::Engine;
pub use error::{IdlerError, Result};
