//! Configuration system
//!
//! [`SchedulerConfig`] carries every construction-time knob of the kernel and
//! can be loaded from `.toml` or `.ron` files through the [`Config`] trait.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot drive a scheduler
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Inclusive range of identities the allocator may hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    /// Smallest identity handed out
    pub min: u32,
    /// Largest identity handed out
    pub max: u32,
}

impl IdRange {
    /// Create a new identity range
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Number of identities in the range
    pub fn len(&self) -> u64 {
        if self.min > self.max {
            0
        } else {
            u64::from(self.max - self.min) + 1
        }
    }

    /// Check whether the range holds no identities
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Check whether an identity lies in the range
    pub fn contains(&self, id: u32) -> bool {
        (self.min..=self.max).contains(&id)
    }
}

impl Default for IdRange {
    fn default() -> Self {
        // 0 is the root
        Self::new(1, u32::MAX)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Identities available to attached nodes
    pub id_range: IdRange,

    /// Whether the update phase starts paused
    pub start_paused: bool,

    /// Multiplier applied to every update delta
    pub time_scale: f64,

    /// Fixed update interval in seconds
    pub step_seconds: f64,

    /// Largest backlog, in whole steps, replayed after a stall
    pub max_catch_up_steps: u32,

    /// Whether cameras also receive debug draw calls
    pub debug_draw: bool,

    /// Frame rate of the default step scheduler
    pub frame_rate: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            id_range: IdRange::default(),
            start_paused: false,
            time_scale: 1.0,
            step_seconds: 1.0 / 60.0,
            max_catch_up_steps: 10,
            debug_draw: cfg!(debug_assertions),
            frame_rate: 60.0,
        }
    }
}

impl Config for SchedulerConfig {}

impl SchedulerConfig {
    /// Set the identity range
    pub fn with_id_range(mut self, min: u32, max: u32) -> Self {
        self.id_range = IdRange::new(min, max);
        self
    }

    /// Set the fixed update interval
    pub fn with_step(mut self, step_seconds: f64) -> Self {
        self.step_seconds = step_seconds;
        self
    }

    /// Set the time scale
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Start with the update phase paused
    pub fn paused(mut self) -> Self {
        self.start_paused = true;
        self
    }

    /// Set the catch-up cap
    pub fn with_max_catch_up_steps(mut self, steps: u32) -> Self {
        self.max_catch_up_steps = steps;
        self
    }

    /// Enable or disable debug drawing
    pub fn with_debug_draw(mut self, enabled: bool) -> Self {
        self.debug_draw = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_range.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "identity range {}..={} is empty",
                self.id_range.min, self.id_range.max
            )));
        }
        if !(self.step_seconds.is_finite() && self.step_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "step_seconds must be positive, got {}",
                self.step_seconds
            )));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be non-negative, got {}",
                self.time_scale
            )));
        }
        if self.max_catch_up_steps == 0 {
            return Err(ConfigError::Invalid("max_catch_up_steps must be at least 1".to_string()));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }
}
