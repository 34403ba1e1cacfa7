//! Version-qualified store names and the stale-store predicate.

use serde::{Deserialize, Serialize};

/// Names of the stores the current release owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreNames {
    /// Pre-populated shell resources and generic fetch captures.
    pub app_shell: String,
    /// Explicitly downloaded and on-demand captured media.
    pub media: String,
    /// Generic store kept from earlier releases, if any.
    pub legacy: Option<String>,
}

impl StoreNames {
    pub fn new(app_shell: impl Into<String>, media: impl Into<String>) -> Self {
        Self { app_shell: app_shell.into(), media: media.into(), legacy: None }
    }

    /// `app-shell-<version>` and `videos-<version>`.
    pub fn versioned(version: &str, legacy: Option<String>) -> Self {
        Self { app_shell: format!("app-shell-{version}"), media: format!("videos-{version}"), legacy }
    }

    pub fn with_legacy(mut self, legacy: impl Into<String>) -> Self {
        self.legacy = Some(legacy.into());
        self
    }

    /// Names the activation sweep keeps.
    pub fn recognized(&self) -> Vec<&str> {
        let mut names = vec![self.app_shell.as_str(), self.media.as_str()];
        if let Some(legacy) = &self.legacy {
            names.push(legacy.as_str());
        }
        names
    }

    pub fn is_stale(&self, name: &str) -> bool {
        !self.recognized().contains(&name)
    }
}
