//! Error types for `DriftJack`
//!
//! Domain-specific error enums aggregated into a single top-level error
//! with Unix exit-code mapping for the CLI.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `DriftJack` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, bind failure)
    pub const IO_ERROR: i32 = 3;

    /// Vehicle link error (connection failed, command rejected)
    pub const VEHICLE_ERROR: i32 = 4;

    /// Attack engine error (session conflict, bad parameters)
    pub const ATTACK_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `DriftJack` operations.
///
/// Aggregates all domain-specific errors and provides a unified
/// interface for error handling and exit code mapping.
#[derive(Debug, Error)]
pub enum DriftJackError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Vehicle link error
    #[error(transparent)]
    Vehicle(#[from] VehicleError),

    /// Attack engine error
    #[error(transparent)]
    Attack(#[from] AttackError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DriftJackError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Vehicle(_) => ExitCode::VEHICLE_ERROR,
            Self::Attack(_) => ExitCode::ATTACK_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Vehicle Link Errors
// ============================================================================

/// Errors raised by the vehicle capability surface.
///
/// The vehicle link is an external collaborator; every failure here is
/// reported to the caller as a structured result, never a panic.
#[derive(Debug, Error)]
pub enum VehicleError {
    /// Failed to establish a connection to the vehicle
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A vehicle command was rejected or could not be executed
    #[error("vehicle command failed: {0}")]
    CommandFailed(String),

    /// A parameter key is not known to the vehicle
    #[error("unknown vehicle parameter: {key}")]
    ParameterUnknown {
        /// The parameter key that was requested
        key: String,
    },

    /// The vehicle link rejected a positioning record layout.
    ///
    /// Older links accept the 18-field base layout; newer ones require
    /// a trailing yaw field. Callers fall back to the extended layout
    /// when this is returned for a base frame.
    #[error("positioning record layout rejected ({fields} fields)")]
    UnsupportedFixLayout {
        /// Number of fields in the rejected frame
        fields: usize,
    },

    /// Mission data could not be read from the vehicle
    #[error("mission unavailable: {0}")]
    MissionUnavailable(String),

    /// A vehicle operation timed out
    #[error("vehicle operation timed out: {0}")]
    Timeout(String),
}

// ============================================================================
// Attack Engine Errors
// ============================================================================

/// Attack engine errors.
#[derive(Debug, Error)]
pub enum AttackError {
    /// A session is already active; `start` was rejected without side effects
    #[error("attack already active")]
    AlreadyRunning,

    /// No vehicle connection is available
    #[error("no vehicle connected")]
    NotConnected,

    /// Strategy B requires an active mission waypoint
    #[error("no active waypoint; start a mission before the hijack")]
    NoActiveWaypoint,

    /// Strategy A drift step count must be a positive integer
    #[error("drift step count must be a positive integer, got {param}")]
    InvalidDriftSteps {
        /// The rejected `param` value
        param: f64,
    },

    /// The background task did not observe cancellation within the bound
    #[error("attack task did not stop within {timeout_ms}ms")]
    StopTimedOut {
        /// The configured join timeout in milliseconds
        timeout_ms: u64,
    },

    /// Vehicle link failure during an attack
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `DriftJack` operations.
pub type Result<T> = std::result::Result<T, DriftJackError>;

// ============================================================================
// Tests
// ============================================================================
