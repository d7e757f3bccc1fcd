//! Element resolution engine.
//!
//! This module provides the patient, self-healing lookup types:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Root scope: owns the lazily acquired session |
//! | [`Locator`] | Produces elements for one selector in one scope |
//! | [`Element`] | Cached, retrying handle to one logical element |
//! | [`Config`] | Timeouts, filter, wait policy, retry policy |
//! | [`By`] | Selector strategies |
//!
//! # Example
//!
//! ```ignore
//! use patient_locator::{By, Driver};
//!
//! let driver = Driver::builder().connect(start_session).build()?;
//! let form = driver.find(By::id("login")).get();
//!
//! form.find(By::name("user")).get().send_keys("alice")?;
//! form.find(By::css("button[type=submit]")).get().click()?;
//! assert!(form.is_absent()?);
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Resolution policy.
pub mod config;

/// Session root and lifecycle.
pub mod driver;

/// Cached, retrying element handles.
pub mod element;

/// Memoizing element locators.
pub mod locator;

/// Scope and cache traits.
pub mod scope;

/// Selector strategies.
pub mod selector;

/// Patient wait utility.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{Config, ConfigBuilder, ConfigFile, ElementFilter, FilterKind};
pub use driver::{Driver, DriverBuilder};
pub use element::{CacheState, Element};
pub use locator::{HandleSupplier, Locator};
pub use scope::{Cacheable, Context, Resolvable, Scoped};
pub use selector::By;
pub use wait::{ExponentialBackoff, FixedInterval, WaitError, WaitPolicy, poll_until};
