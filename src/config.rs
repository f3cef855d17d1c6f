//! Configuration for the gate's routes and the login throttle.
//!
//! Configuration is read from YAML. Every field has a default, so an empty
//! file is valid:
//!
//! ```yaml
//! throttle:
//!   max_attempts: 5
//!   lockout_secs: 900
//! routes:
//!   fallback: /dashboard
//!   login: /login
//!   protected:
//!     - path: /usuarios
//!       permission: security.users.view
//!       nav_item: { section: security, item: users }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::error::ConfigError;
use crate::guard::ProtectedRoute;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_SECS: u32 = 15 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Login lockout policy
    pub throttle: ThrottleConfig,
    /// Protected routes and redirect targets
    pub routes: RouteConfig,
}

impl AccessConfig {
    /// Loads and validates a YAML configuration file.
    pub async fn load_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let f = fs::File::open(path).await.map_err(ConfigError::Io)?;
        let config = serde_yaml::from_reader::<_, AccessConfig>(f.into_std().await)
            .map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: AccessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.throttle.validate()?;
        self.routes.validate()
    }
}

/// Login lockout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Consecutive failures that trigger a lockout
    pub max_attempts: u32,
    /// Lockout window length in seconds
    pub lockout_secs: u32,
}

impl ThrottleConfig {
    /// The lockout window as a duration.
    pub fn lockout_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.lockout_secs))
    }

    /// The lockout window rounded up to whole minutes, for user messages.
    pub fn lockout_minutes(&self) -> u32 {
        self.lockout_secs.div_ceil(60)
    }

    /// Rejects a zero threshold or a zero-length window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "throttle.max_attempts",
                "must be at least 1",
            ));
        }
        if self.lockout_secs == 0 {
            return Err(ConfigError::invalid(
                "throttle.lockout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
        }
    }
}

/// Protected routes and where denied or signed-out users are sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Redirect target after an access denial
    pub fallback: String,
    /// Redirect target when there is no session
    pub login: String,
    /// Routes that require a permission
    pub protected: Vec<ProtectedRoute>,
}

impl RouteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.fallback.starts_with('/') {
            return Err(ConfigError::invalid(
                "routes.fallback",
                format!("'{}' is not an absolute path", self.fallback),
            ));
        }
        if !self.login.starts_with('/') {
            return Err(ConfigError::invalid(
                "routes.login",
                format!("'{}' is not an absolute path", self.login),
            ));
        }

        let mut seen = HashSet::new();
        for route in &self.protected {
            if !route.requirement.is_well_formed() {
                return Err(ConfigError::invalid(
                    "routes.protected.permission",
                    format!("route '{}' has a blank permission", route.path),
                ));
            }
            if !seen.insert(route.path.as_str()) {
                return Err(ConfigError::invalid(
                    "routes.protected.path",
                    format!("route '{}' is declared twice", route.path),
                ));
            }
            if route.path == self.fallback || route.path == self.login {
                return Err(ConfigError::invalid(
                    "routes.protected.path",
                    format!("redirect target '{}' cannot be protected", route.path),
                ));
            }
        }
        Ok(())
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            fallback: "/dashboard".to_string(),
            login: "/login".to_string(),
            protected: Vec::new(),
        }
    }
}
