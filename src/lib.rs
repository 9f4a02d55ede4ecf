//! Board migrator
//!
//! Copies the cards of a public board into a task app by driving both through
//! one browser session: extract the card labels, sign in to the destination,
//! then create the items one at a time through the app's creation widget.

pub mod app;
pub mod auth;
pub mod config;
pub mod extract;

pub use app::{ConsoleProgress, Migrator};
pub use auth::{AuthenticationFlow, Credentials, CredentialsError};
pub use config::{load_config, ConfigError, MigratorConfig};
pub use extract::ItemExtractor;
