//! Destination login
//!
//! Credentials come from the process environment, read once at startup.

use std::fmt;

use action_primitives::{ActionError, PageSession};
use cdp_adapter::Viewport;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::DestinationConfig;

pub const EMAIL_VAR: &str = "TODOIST_EMAIL_ADDRESS";
pub const PASSWORD_VAR: &str = "TODOIST_PASSWORD";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {0} is empty")]
    Empty(&'static str),
}

/// Login for the destination app.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `TODOIST_EMAIL_ADDRESS` and `TODOIST_PASSWORD`.
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| match lookup(key) {
            None => Err(CredentialsError::Missing(key)),
            Some(value) if value.is_empty() => Err(CredentialsError::Empty(key)),
            Some(value) => Ok(value),
        };
        Ok(Self {
            email: read(EMAIL_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signs in to the destination app on the current page.
#[derive(Debug, Clone)]
pub struct AuthenticationFlow {
    destination: DestinationConfig,
    viewport: Viewport,
}

impl AuthenticationFlow {
    pub fn new(destination: DestinationConfig, viewport: Viewport) -> Self {
        Self {
            destination,
            viewport,
        }
    }

    /// Fill and submit the login form, then wait for the app to load.
    ///
    /// Every failure is returned unchanged; nothing is retried.
    #[instrument(skip_all, fields(url = %self.destination.login_url, email = %credentials.email()))]
    pub async fn authenticate(
        &self,
        session: &PageSession,
        credentials: &Credentials,
    ) -> Result<(), ActionError> {
        let dest = &self.destination;

        session.navigate(&dest.login_url, dest.wait_until).await?;
        session.set_viewport(self.viewport).await?;
        session.settle().await?;

        session
            .type_text(&dest.email_selector, credentials.email())
            .await?;
        session
            .type_text(&dest.password_selector, credentials.password())
            .await?;
        session.click(&dest.submit_selector).await?;

        session.wait_for_navigation().await?;
        session.settle().await?;

        info!("signed in");
        Ok(())
    }
}
