//! Error types for patient element resolution.
//!
//! This module defines the crate error taxonomy and the error type reported
//! by automation driver collaborators.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use patient_locator::{By, Driver, Result};
//!
//! fn example(driver: &Driver) -> Result<()> {
//!     let submit = driver.find(By::id("submit")).get();
//!     submit.click()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | [`ErrorKind`] |
//! |----------|----------|---------------|
//! | Lookup | [`Error::NotFound`] | `NotFound` |
//! | Invalidation | [`Error::StaleElement`] | `TransientInvalidation` |
//! | Driver | [`Error::Driver`] | `Driver` |
//! | Setup | [`Error::Config`], [`Error::Initialization`], [`Error::Json`] | `Initialization` |
//!
//! Retries happen inside [`Locator`](crate::Locator),
//! [`Element`](crate::Element) and [`Driver`](crate::Driver). Callers only
//! ever observe the final outcome.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Result Aliases
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

/// Result type returned by automation driver collaborators.
pub type DriverResult<T> = StdResult<T, DriverError>;

// ============================================================================
// DriverErrorKind
// ============================================================================

/// Closed set of failure kinds a driver collaborator may report.
///
/// Collaborators classify their native failures once, at the boundary.
/// Retry decisions dispatch on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverErrorKind {
    /// Nothing matched a selector.
    NoSuchElement,
    /// A previously valid handle was detached or replaced.
    StaleElement,
    /// The element exists but cannot receive input.
    ElementNotInteractable,
    /// Another element would receive the click.
    ElementClickIntercepted,
    /// The element is in a state that forbids the action.
    InvalidElementState,
    /// The selector could not be evaluated.
    InvalidSelector,
    /// The targeted window is gone.
    NoSuchWindow,
    /// The targeted frame is gone.
    NoSuchFrame,
    /// The remote end timed out.
    Timeout,
    /// Connection to the remote end failed.
    Transport,
    /// Anything else.
    Unknown,
}

impl DriverErrorKind {
    /// Returns `true` for the kinds the resolution engine always handles
    /// itself and which therefore may not appear in ignored sets.
    #[inline]
    #[must_use]
    pub const fn is_always_handled(self) -> bool {
        matches!(self, Self::NoSuchElement | Self::StaleElement)
    }

    /// Returns the snake_case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSuchElement => "no_such_element",
            Self::StaleElement => "stale_element",
            Self::ElementNotInteractable => "element_not_interactable",
            Self::ElementClickIntercepted => "element_click_intercepted",
            Self::InvalidElementState => "invalid_element_state",
            Self::InvalidSelector => "invalid_selector",
            Self::NoSuchWindow => "no_such_window",
            Self::NoSuchFrame => "no_such_frame",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DriverError
// ============================================================================

/// Error reported by an automation driver collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DriverError {
    /// Classified failure kind.
    pub kind: DriverErrorKind,
    /// Driver-supplied message.
    pub message: String,
}

impl DriverError {
    /// Creates a driver error of the given kind.
    #[inline]
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::StaleElement, message)
    }

    /// Creates a no such element error.
    #[inline]
    pub fn no_such_element(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NoSuchElement, message)
    }

    /// Returns the failure kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DriverErrorKind {
        self.kind
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// Coarse classification of a crate [`enum@Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A patient wait for a match exhausted its timeout.
    NotFound,
    /// A cached handle kept going stale until attempts ran out.
    TransientInvalidation,
    /// The driver reported an error that is not ignored.
    Driver,
    /// Setup or wiring failed. Never retried.
    Initialization,
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// No matching element appeared before the timeout.
    ///
    /// Never retried by the action attempt loop.
    #[error("Element not found after {timeout_ms}ms: {description}")]
    NotFound {
        /// Description of the element that was looked up.
        description: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// The element handle kept going stale until attempts ran out.
    #[error("Stale element after {attempts} attempt(s): {description}")]
    StaleElement {
        /// Description of the element.
        description: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last failure reported by the driver.
        #[source]
        source: DriverError,
    },

    /// Driver error that is not configured as ignorable.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Page object wiring failed.
    #[error("Initialization error: {message}")]
    Initialization {
        /// Description of the wiring failure.
        message: String,
    },

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an element not found error.
    #[inline]
    pub fn not_found(description: impl Into<String>, timeout_ms: u64) -> Self {
        Self::NotFound {
            description: description.into(),
            timeout_ms,
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale_element(description: impl Into<String>, attempts: u32, source: DriverError) -> Self {
        Self::StaleElement {
            description: description.into(),
            attempts,
            source,
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an initialization error.
    #[inline]
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StaleElement { .. } => ErrorKind::TransientInvalidation,
            Self::Driver(_) => ErrorKind::Driver,
            Self::Config { .. } | Self::Initialization { .. } | Self::Json(_) => {
                ErrorKind::Initialization
            }
        }
    }

    /// Returns `true` if this is a not found error.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a stale element error.
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }

    /// Returns the driver error kind, if the error came from the driver.
    #[must_use]
    pub fn driver_kind(&self) -> Option<DriverErrorKind> {
        match self {
            Self::Driver(e) => Some(e.kind),
            Self::StaleElement { source, .. } => Some(source.kind),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
