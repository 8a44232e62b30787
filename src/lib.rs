// Library root
// ------------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) parses flags and hands them to `ui::run`.
//
// Module responsibilities:
// - `api`: Blocking HTTP calls against the Matrix client-server API.
// - `credentials`: The credentials file written at login.
// - `session`: Per-invocation config, login and reconnecting from
//   stored credentials.
// - `sync`: Typed `/sync` response and room-name resolution.
// - `message`: Outgoing message bodies and input preparation.
// - `ansi`: ANSI escape codes to Matrix HTML.
// - `cli`: Command line flags.
// - `ui`: Prompts, dispatch and printed output.
// - `error`: Error taxonomy and exit codes.
pub mod ansi;
pub mod api;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod message;
pub mod session;
pub mod sync;
pub mod ui;

pub use error::Error;
