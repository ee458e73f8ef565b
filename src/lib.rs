// Library surface for headless/integration tests and reuse.
// The binary only adds terminal setup, logging and the event loop.
pub mod access;
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod config;
pub mod countdown;
pub mod error;
pub mod exercise;
pub mod export;
pub mod imagery;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod workout;

/// How often the event loop wakes up without input
pub const TICK_RATE_MS: u64 = 100;
