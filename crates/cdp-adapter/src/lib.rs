//! UI driver capability for board-migrator.
//!
//! Everything above this crate talks to a browser page through the [`UiDriver`]
//! trait: navigation, viewport, typing, clicking, text queries and DOM mutation
//! subscriptions. Two implementations live here:
//! - [`ChromiumDriver`], which drives a real Chromium page over DevTools
//! - [`ScriptedDriver`], an in-memory page used by tests across the workspace

use std::env;
use std::path::PathBuf;
use which::which;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Identifier for one mutation observer registration.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct ObserverId(pub Uuid);

    impl ObserverId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }

        /// Name of the page binding that delivers this observer's notifications.
        pub fn binding_name(&self) -> String {
            format!("__boardMigratorSettle_{}", self.0.simple())
        }
    }

    impl Default for ObserverId {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the driver.
    #[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("element not found")]
        ElementNotFound,
        #[error("navigation failed")]
        Navigation,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("internal error")]
        Internal,
    }

    /// Driver error with an optional human-readable hint.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self { kind, hint: None }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn element_not_found(selector: &str) -> Self {
            Self::new(AdapterErrorKind::ElementNotFound)
                .with_hint(format!("no element matches selector '{}'", selector))
        }

        pub fn navigation(url: &str, detail: impl fmt::Display) -> Self {
            Self::new(AdapterErrorKind::Navigation).with_hint(format!("{}: {}", url, detail))
        }

        pub fn cdp_io(detail: impl fmt::Display) -> Self {
            Self::new(AdapterErrorKind::CdpIo).with_hint(detail.to_string())
        }

        pub fn internal(detail: impl fmt::Display) -> Self {
            Self::new(AdapterErrorKind::Internal).with_hint(detail.to_string())
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    /// Configuration for launching the Chromium-backed driver.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        /// Browser binary; auto-detected when absent.
        pub executable: Option<PathBuf>,
        pub headless: bool,
        pub no_sandbox: bool,
        pub request_timeout_ms: u64,
        pub launch_timeout_ms: u64,
        /// Extra command line switches passed to the browser.
        pub args: Vec<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: None,
                headless: true,
                no_sandbox: false,
                request_timeout_ms: 30_000,
                launch_timeout_ms: 20_000,
                args: vec![
                    "--disable-dev-shm-usage".to_string(),
                    "--disable-accelerated-2d-canvas".to_string(),
                    "--disable-gpu".to_string(),
                ],
            }
        }
    }

    impl CdpConfig {
        /// Explicit executable, falling back to `BOARD_MIGRATOR_CHROME`, `PATH` and
        /// well-known install locations.
        pub fn resolve_executable(&self) -> Option<PathBuf> {
            self.executable.clone().or_else(detect_chrome_executable)
        }
    }
}

mod chromium;
pub mod commands;
pub mod driver;
mod scripted;

pub use chromium::ChromiumDriver;
pub use config::CdpConfig;
pub use driver::{MutationNotice, MutationWatch, UiDriver, Viewport, WaitUntil};
pub use error::{AdapterError, AdapterErrorKind};
pub use ids::ObserverId;
pub use scripted::{DriverCall, MutationScript, ScriptedDriver};

fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("BOARD_MIGRATOR_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}
