//! Tree configuration
//!
//! [`TreeConfig`] is plain data: build it with the `with_*` methods or parse
//! it from TOML.
//!
//! ```toml
//! warn_after_ms = 2000
//!
//! [wait_policy]
//! mode = "bounded"
//! timeout_ms = 250
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long `WaitForChild` suspends when the child is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Never suspend; behaves like `FindFirstChild`
    Immediate,
    /// Suspend up to `timeout_ms`, then yield no result
    Bounded {
        /// Upper bound in milliseconds
        timeout_ms: u64,
    },
    /// Suspend until the child appears or the tree shuts down
    Indefinite,
}

impl WaitPolicy {
    /// Bounded policy from a duration
    #[must_use]
    pub fn bounded(timeout: Duration) -> Self {
        Self::Bounded {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Upper bound, `None` when unbounded
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Immediate => Some(Duration::ZERO),
            Self::Bounded { timeout_ms } => Some(Duration::from_millis(*timeout_ms)),
            Self::Indefinite => None,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Bounded { timeout_ms: 5000 }
    }
}

/// Tree configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Default `WaitForChild` strategy
    pub wait_policy: WaitPolicy,
    /// Warn once a wait has been pending this long; a threshold equal to
    /// the wait bound warns just before the wait gives up
    pub warn_after_ms: Option<u64>,
}

impl TreeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With wait policy
    #[inline]
    #[must_use]
    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// With pending-wait warning threshold, `None` disables it
    #[inline]
    #[must_use]
    pub fn with_warn_after(mut self, after: Option<Duration>) -> Self {
        self.warn_after_ms = after.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Warning threshold as a duration
    #[inline]
    #[must_use]
    pub fn warn_after(&self) -> Option<Duration> {
        self.warn_after_ms.map(Duration::from_millis)
    }

    /// Parse from a TOML document; missing keys take defaults
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed input
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            wait_policy: WaitPolicy::default(),
            warn_after_ms: Some(5000),
        }
    }
}
