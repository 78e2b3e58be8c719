//! Configuration validation module.
//!
//! Invalid settings are rejected at load time rather than surfacing as odd
//! cache or lock behaviour at runtime.

use crate::StashConfig;
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size is zero or exceeds the maximum allowed.
    PoolSizeOutOfRange { name: String, value: usize, maximum: usize },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Duration must be positive.
    NonPositiveDuration { name: String },
    /// Negative entries must not outlive regular entries.
    NegativeTtlTooLong { negative_ms: u64, default_ms: u64 },
    /// Key prefix is empty.
    EmptyPrefix { name: String },
    /// Cache and lock prefixes collide.
    PrefixConflict { prefix: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolSize { min, max } => write!(
                f,
                "Invalid pool size: min ({min}) cannot be greater than max ({max})"
            ),
            Self::PoolSizeOutOfRange { name, value, maximum } => write!(
                f,
                "Pool size for {name} must be between 1 and {maximum}, got {value}"
            ),
            Self::InvalidUrl { url_type, message } => write!(f, "Invalid {url_type} URL: {message}"),
            Self::NonPositiveDuration { name } => write!(f, "Duration '{name}' must be positive"),
            Self::NegativeTtlTooLong { negative_ms, default_ms } => write!(
                f,
                "Negative TTL ({negative_ms}ms) cannot exceed default TTL ({default_ms}ms)"
            ),
            Self::EmptyPrefix { name } => write!(f, "Prefix '{name}' cannot be empty"),
            Self::PrefixConflict { prefix } => {
                write!(f, "Cache and lock prefixes cannot both be '{prefix}'")
            }
            Self::InvalidLogLevel { value } => write!(
                f,
                "Invalid log level: '{value}' (valid: trace, debug, info, warn, error)"
            ),
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{value}' (valid: pretty, json)")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    fn require_positive(&mut self, name: &str, value: u64) {
        if value == 0 {
            self.add_error(ConfigValidationError::NonPositiveDuration { name: name.to_string() });
        }
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &StashConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_redis(&config.redis, &mut result);
        Self::validate_database(&config.database, &mut result);
        Self::validate_cache(&config.cache, &mut result);
        Self::validate_lock(&config.lock, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        if config.cache.prefix == config.lock.prefix {
            result.add_error(ConfigValidationError::PrefixConflict {
                prefix: config.cache.prefix.clone(),
            });
        }

        result.into_result()
    }

    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeOutOfRange {
                name: "redis".to_string(),
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_database(config: &crate::DatabaseConfig, result: &mut ValidationResult) {
        if config.url.is_empty() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !config.url.starts_with("mysql://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }

        if config.min_connections > config.max_connections {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections == 0 || config.max_connections as usize > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeOutOfRange {
                name: "database".to_string(),
                value: config.max_connections as usize,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        result.require_positive("database.connect_timeout_secs", config.connect_timeout_secs);
        result.require_positive("database.idle_timeout_secs", config.idle_timeout_secs);
    }

    fn validate_cache(config: &crate::CacheConfig, result: &mut ValidationResult) {
        if config.prefix.is_empty() {
            result.add_error(ConfigValidationError::EmptyPrefix { name: "cache.prefix".to_string() });
        }

        result.require_positive("cache.default_ttl_ms", config.default_ttl_ms);
        result.require_positive("cache.negative_ttl_ms", config.negative_ttl_ms);

        if config.negative_ttl_ms > config.default_ttl_ms {
            result.add_error(ConfigValidationError::NegativeTtlTooLong {
                negative_ms: config.negative_ttl_ms,
                default_ms: config.default_ttl_ms,
            });
        }
    }

    fn validate_lock(config: &crate::LockConfig, result: &mut ValidationResult) {
        if config.prefix.is_empty() {
            result.add_error(ConfigValidationError::EmptyPrefix { name: "lock.prefix".to_string() });
        }

        result.require_positive("lock.expire_ms", config.expire_ms);
        result.require_positive("lock.retry_span_us", config.retry_span_us);
    }

    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        // Accepts a bare level or an env-filter directive list such as
        // `info,stash=debug`; every directive's level must be known.
        let all_known = config.log_level.split(',').all(|directive| {
            let level = directive.rsplit('=').next().unwrap_or_default().trim().to_lowercase();
            Self::VALID_LOG_LEVELS.contains(&level.as_str())
        });
        if !all_known {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        let format = config.log_format.to_lowercase();
        if !Self::VALID_LOG_FORMATS.contains(&format.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
#[must_use]
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
