//! Configuration management module
//!
//! Loads the YAML configuration file and validates it. Every value has a
//! default, so a missing default config file is not an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::{CreationWidget, FailureStrategy};
use action_primitives::{PageSession, QuietStart, SettleWaitConfig};
use cdp_adapter::{CdpConfig, UiDriver, Viewport, WaitUntil};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub viewport: Viewport,
    pub settle: SettleSettings,
    pub migration: MigrationSettings,
    pub browser: CdpConfig,
}

/// The read-only board items are extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// Matches one node per item; its `innerText` becomes the item text
    pub item_selector: String,
    pub wait_until: WaitUntil,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://trello.com/b/QvHVksDa/personal-work-goals".to_string(),
            item_selector: r#"[data-testid="trello-card"] a[data-testid="card-name"]"#
                .to_string(),
            wait_until: WaitUntil::DomContentLoaded,
        }
    }
}

/// The app items are created in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub login_url: String,
    pub wait_until: WaitUntil,
    pub email_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
    pub widget: CreationWidget,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            login_url: "https://app.todoist.com/auth/login".to_string(),
            wait_until: WaitUntil::DomContentLoaded,
            email_selector: r#"#todoist_app form input[type="email"]"#.to_string(),
            password_selector: r#"#todoist_app form input[type="password"]"#.to_string(),
            submit_selector: r#"button[type="submit"]"#.to_string(),
            widget: CreationWidget::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleSettings {
    pub deadline_ms: u64,
    pub quiet_window_ms: u64,
    pub quiet_start: QuietStart,
    /// Element whose subtree is watched
    pub root: String,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            quiet_window_ms: 1_000,
            quiet_start: QuietStart::OnFirstMutation,
            root: action_primitives::DEFAULT_SETTLE_ROOT.to_string(),
        }
    }
}

impl SettleSettings {
    pub fn wait_config(&self) -> Result<SettleWaitConfig, ConfigError> {
        SettleWaitConfig::from_millis(self.deadline_ms, self.quiet_window_ms)
            .map(|cfg| cfg.with_quiet_start(self.quiet_start))
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Maximum number of items attempted per run
    pub cap: usize,
    pub on_item_failure: FailureStrategy,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            cap: action_flow::executor::DEFAULT_CAP,
            on_item_failure: FailureStrategy::Continue,
        }
    }
}

impl MigratorConfig {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settle.wait_config()?;

        let required = [
            ("source.url", &self.source.url),
            ("source.item_selector", &self.source.item_selector),
            ("destination.login_url", &self.destination.login_url),
            ("destination.email_selector", &self.destination.email_selector),
            ("destination.password_selector", &self.destination.password_selector),
            ("destination.submit_selector", &self.destination.submit_selector),
            ("destination.widget.trigger", &self.destination.widget.trigger),
            ("destination.widget.input", &self.destination.widget.input),
            ("destination.widget.confirm", &self.destination.widget.confirm),
            ("destination.widget.cancel", &self.destination.widget.cancel),
            ("settle.root", &self.settle.root),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be positive, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }

        Ok(())
    }

    /// Build the page session every flow runs on.
    pub fn session(&self, driver: Arc<dyn UiDriver>) -> Result<PageSession, ConfigError> {
        let settle = self.settle.wait_config()?;
        Ok(PageSession::new(driver, settle).with_settle_root(self.settle.root.clone()))
    }
}

/// `<config_dir>/board-migrator/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push("board-migrator");
        path.push("config.yaml");
        path
    })
}

/// Load configuration from `path`, or from the default location.
///
/// An explicit path must exist; a missing default file yields the defaults.
pub async fn load_config(path: Option<&Path>) -> Result<MigratorConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => {
                warn!("no config directory available, using defaults");
                return Ok(MigratorConfig::default());
            }
        },
    };

    if !path.exists() {
        if explicit {
            return Err(ConfigError::NotFound(path));
        }
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(MigratorConfig::default());
    }

    let content = fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
    let config: MigratorConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
    config.validate()?;

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}
