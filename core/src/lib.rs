//! Root of the `heat-core` library.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output belongs to the consuming front end; diagnostics go
// through the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod default_client;
pub mod session;

pub use config::AuthConfig;
pub use session::SessionError;
pub use session::SessionManager;
pub use session::SessionSnapshot;
pub use session::SignInOutcome;
pub use session::UserProfile;
