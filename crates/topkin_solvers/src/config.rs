//! Solver settings.
//!
//! Settings can be loaded from a TOML file, from environment variables, or
//! built in code starting from [`SolverSettings::default`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use topkin_core::math::solvers::SolverConfig;

/// Configuration error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Iteration cap must be at least one.
    #[error("Invalid iteration limit: {0}. Must be at least 1")]
    InvalidIterations(usize),

    /// A tolerance or resolution is not a positive finite number.
    #[error("Invalid {name}: {value}. Must be positive and finite")]
    InvalidTolerance {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Unknown verbosity name or level.
    #[error("Invalid verbosity: {0}. Must be one of: silent, basic, warnings, iterations, detailed, or a number")]
    InvalidVerbosity(String),

    /// A starting velocity is outside `(0, 1]`, or the list is empty.
    #[error("Invalid starting beta list: {0}")]
    InvalidStartBetas(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration file error: {0}")]
    FileError(String),

    /// An environment variable could not be parsed.
    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// How much diagnostic output the solvers produce.
///
/// Levels are ordered; each level includes everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No output at all.
    #[default]
    Silent,
    /// Unlimited one-off warnings (ignored inputs, unusual root counts).
    Basic,
    /// Rate-limited convergence warnings.
    Warnings,
    /// Per-iteration traces of the Newton searches.
    Iterations,
    /// Detailed traces of the massive-b iteration.
    Detailed,
}

impl Verbosity {
    /// Numeric level: 0, 1, 10, 30 or 100.
    pub fn level(self) -> u32 {
        match self {
            Verbosity::Silent => 0,
            Verbosity::Basic => 1,
            Verbosity::Warnings => 10,
            Verbosity::Iterations => 30,
            Verbosity::Detailed => 100,
        }
    }

    /// Highest verbosity whose level does not exceed `level`.
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => Verbosity::Silent,
            1..=9 => Verbosity::Basic,
            10..=29 => Verbosity::Warnings,
            30..=99 => Verbosity::Iterations,
            _ => Verbosity::Detailed,
        }
    }
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silent" | "off" => Ok(Verbosity::Silent),
            "basic" => Ok(Verbosity::Basic),
            "warnings" | "warn" => Ok(Verbosity::Warnings),
            "iterations" => Ok(Verbosity::Iterations),
            "detailed" | "trace" => Ok(Verbosity::Detailed),
            other => other
                .parse::<u32>()
                .map(Verbosity::from_level)
                .map_err(|_| ConfigError::InvalidVerbosity(s.to_string())),
        }
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verbosity::Silent => "silent",
            Verbosity::Basic => "basic",
            Verbosity::Warnings => "warnings",
            Verbosity::Iterations => "iterations",
            Verbosity::Detailed => "detailed",
        };
        write!(f, "{}", name)
    }
}

/// Default starting velocities of the massive-b fixed-point iteration.
pub const DEFAULT_START_BETAS: [f64; 9] = [1.0, 0.99, 0.975, 0.95, 0.9, 0.85, 0.75, 0.55, 0.3];

/// Tunable parameters shared by every solver call made through one
/// [`SolverContext`](crate::context::SolverContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Iteration cap of the massive-b fixed point and the Newton searches.
    pub max_iterations: usize,
    /// Relative convergence tolerance of the massive-b fixed point.
    pub leptonic_tolerance: f64,
    /// Relative step tolerance of the extremum Newton searches.
    pub extremum_tolerance: f64,
    /// Number of times each rate-limited warning is emitted.
    pub warning_budget: u32,
    /// Diagnostic output level.
    #[serde(deserialize_with = "deserialize_verbosity")]
    pub verbosity: Verbosity,
    /// Starting velocities of the massive-b fixed-point iteration.
    pub start_betas: Vec<f64>,
    /// Width in `mW²` at which the W mass bisection stops.
    pub w_mass_bisection_resolution: f64,
}

fn deserialize_verbosity<'de, D>(deserializer: D) -> Result<Verbosity, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Level(u32),
        Name(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Level(level) => Ok(Verbosity::from_level(level)),
        Raw::Name(name) => Verbosity::from_str(&name).map_err(serde::de::Error::custom),
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            leptonic_tolerance: 1.0e-12,
            extremum_tolerance: 1.0e-12,
            warning_budget: 1000,
            verbosity: Verbosity::Silent,
            start_betas: DEFAULT_START_BETAS.to_vec(),
            w_mass_bisection_resolution: 0.01,
        }
    }
}

impl SolverSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style verbosity override.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Builder-style iteration cap override.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Parse and validate settings from TOML text. Missing keys keep their
    /// default values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: SolverSettings = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from environment variables
    ///
    /// Reads `TOPKIN_MAX_ITERATIONS`, `TOPKIN_VERBOSITY` and
    /// `TOPKIN_WARNING_BUDGET`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup("TOPKIN_MAX_ITERATIONS") {
            settings.max_iterations = value.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("TOPKIN_MAX_ITERATIONS is not an integer: {}", value))
            })?;
        }

        if let Some(value) = lookup("TOPKIN_VERBOSITY") {
            settings.verbosity = Verbosity::from_str(&value)?;
        }

        if let Some(value) = lookup("TOPKIN_WARNING_BUDGET") {
            settings.warning_budget = value.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("TOPKIN_WARNING_BUDGET is not an integer: {}", value))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidIterations(self.max_iterations));
        }

        for (name, value) in [
            ("leptonic_tolerance", self.leptonic_tolerance),
            ("extremum_tolerance", self.extremum_tolerance),
            ("w_mass_bisection_resolution", self.w_mass_bisection_resolution),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }

        if self.start_betas.is_empty() {
            return Err(ConfigError::InvalidStartBetas("list is empty".to_string()));
        }
        if let Some(bad) = self.start_betas.iter().find(|b| !(**b > 0.0 && **b <= 1.0)) {
            return Err(ConfigError::InvalidStartBetas(format!(
                "{} is outside (0, 1]",
                bad
            )));
        }

        Ok(())
    }

    /// Newton driver configuration for the extremum searches.
    pub fn extremum_config(&self) -> SolverConfig {
        SolverConfig {
            tolerance: self.extremum_tolerance,
            max_iterations: self.max_iterations,
        }
    }
}
