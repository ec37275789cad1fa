//! Built-in instrumentation toggles
//!
//! Framework-level tracing (HTTP, JDBC, logging, cache client, slow queries)
//! that is switched on or off as a block, independently of the user-declared
//! class rules.

use serde::Serialize;
use std::time::Duration;

/// Default level at which log events are captured
pub const DEFAULT_LOGGING_THRESHOLD: &str = "warn";

/// Default slow-query capture threshold
pub const DEFAULT_QUERY_PLAN_THRESHOLD_MS: u64 = 10_000;

/// Resolved built-in feature toggles.
///
/// When the block itself is disabled every sub-feature reports disabled, and
/// the W3C sub-flags only apply while HTTP is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltInFeatureSet {
    enabled: bool,
    http: HttpFeature,
    jdbc_enabled: bool,
    logging: LoggingFeature,
    cache_client_enabled: bool,
    query_plan_threshold_ms: u64,
}

/// HTTP instrumentation settings as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpFeature {
    pub enabled: bool,
    pub w3c_trace_context: bool,
    pub w3c_back_compat: bool,
}

impl Default for HttpFeature {
    fn default() -> Self {
        Self {
            enabled: false,
            w3c_trace_context: false,
            w3c_back_compat: true,
        }
    }
}

/// Logging instrumentation settings as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingFeature {
    pub enabled: bool,
    pub threshold_level: String,
}

impl Default for LoggingFeature {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_level: DEFAULT_LOGGING_THRESHOLD.to_string(),
        }
    }
}

impl Default for BuiltInFeatureSet {
    fn default() -> Self {
        Self::disabled()
    }
}

impl BuiltInFeatureSet {
    /// Everything off, all settings at their defaults
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            http: HttpFeature::default(),
            jdbc_enabled: false,
            logging: LoggingFeature::default(),
            cache_client_enabled: false,
            query_plan_threshold_ms: DEFAULT_QUERY_PLAN_THRESHOLD_MS,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Raw HTTP settings, including sub-flag defaults that are not in effect.
    pub fn http(&self) -> &HttpFeature {
        &self.http
    }

    pub fn http_enabled(&self) -> bool {
        self.enabled && self.http.enabled
    }

    pub fn w3c_trace_context_enabled(&self) -> bool {
        self.http_enabled() && self.http.w3c_trace_context
    }

    pub fn w3c_back_compat_enabled(&self) -> bool {
        self.http_enabled() && self.http.w3c_back_compat
    }

    pub fn jdbc_enabled(&self) -> bool {
        self.enabled && self.jdbc_enabled
    }

    pub fn logging_enabled(&self) -> bool {
        self.enabled && self.logging.enabled
    }

    pub fn logging_threshold_level(&self) -> &str {
        &self.logging.threshold_level
    }

    pub fn cache_client_enabled(&self) -> bool {
        self.enabled && self.cache_client_enabled
    }

    pub fn query_plan_threshold_ms(&self) -> u64 {
        self.query_plan_threshold_ms
    }

    pub fn query_plan_threshold(&self) -> Duration {
        Duration::from_millis(self.query_plan_threshold_ms)
    }

    /// Check if any built-in feature is in effect
    pub fn any_enabled(&self) -> bool {
        !self.enabled_features().is_empty()
    }

    /// Names of the built-in features in effect
    pub fn enabled_features(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();

        if self.http_enabled() {
            enabled.push("http");
        }
        if self.jdbc_enabled() {
            enabled.push("jdbc");
        }
        if self.logging_enabled() {
            enabled.push("logging");
        }
        if self.cache_client_enabled() {
            enabled.push("cache_client");
        }

        enabled
    }
}

/// Accumulates built-in settings while the builder walks the document.
#[derive(Debug, Default)]
pub(crate) struct BuiltInFeatureSetBuilder {
    features: BuiltInFeatureSet,
}

impl BuiltInFeatureSetBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enabled(mut self, enabled: bool) -> Self {
        self.features.enabled = enabled;
        self
    }

    pub(crate) fn http(mut self, enabled: bool, w3c_trace_context: bool, w3c_back_compat: bool) -> Self {
        self.features.http = HttpFeature {
            enabled,
            w3c_trace_context,
            w3c_back_compat,
        };
        self
    }

    pub(crate) fn jdbc(mut self, enabled: bool) -> Self {
        self.features.jdbc_enabled = enabled;
        self
    }

    pub(crate) fn logging(mut self, enabled: bool, threshold_level: String) -> Self {
        self.features.logging = LoggingFeature {
            enabled,
            threshold_level,
        };
        self
    }

    pub(crate) fn cache_client(mut self, enabled: bool) -> Self {
        self.features.cache_client_enabled = enabled;
        self
    }

    pub(crate) fn query_plan_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.features.query_plan_threshold_ms = threshold_ms;
        self
    }

    /// A disabled block discards every sub-feature that was set.
    pub(crate) fn build(self) -> BuiltInFeatureSet {
        if self.features.enabled {
            self.features
        } else {
            BuiltInFeatureSet::disabled()
        }
    }
}
