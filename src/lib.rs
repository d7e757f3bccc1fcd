//! Patient Locator - retrying, self-healing element resolution.
//!
//! This library sits between UI automation code and a remote automation
//! driver. It turns the driver's flaky "find this element now" primitive into
//! patient, cached, self-healing element handles.
//!
//! # Architecture
//!
//! - **Driver** owns a lazily acquired remote session and is the root scope
//! - **Locator** describes one selector in one scope and memoizes elements
//! - **Element** caches one remote handle and re-resolves it when it goes stale
//! - **Config** decides how long to wait, how often to poll, which candidates
//!   qualify and which driver errors are transient
//! - **Page objects** are wired from declared selectors by an initializer
//!
//! The remote side is abstracted by [`RemoteSession`] and [`RemoteElement`];
//! any concrete driver binding implements those two traits.
//!
//! # Quick Start
//!
//! ```ignore
//! use patient_locator::{By, Driver, Result};
//!
//! fn login(connect: impl Fn() -> patient_locator::DriverResult<Session> + 'static) -> Result<()> {
//!     let driver = Driver::builder().connect(connect).build()?;
//!
//!     let form = driver.find(By::id("login")).get();
//!     form.find(By::name("user")).get().send_keys("alice")?;
//!     form.find(By::css("button")).get().click()?;
//!
//!     driver.quit()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`locate`] | [`Driver`], [`Locator`], [`Element`], [`Config`] |
//! | [`page`] | Page-object graph and initializer |
//! | [`remote`] | Driver binding traits and handles |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//!
//! # Threading
//!
//! All types are single-threaded (`!Send`). Drive one session from one
//! thread.

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Element resolution: driver, locators, elements, configuration.
pub mod locate;

/// Page-object wiring.
pub mod page;

/// Remote driver abstraction.
pub mod remote;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Resolution types
pub use locate::{
    By, CacheState, Cacheable, Config, ConfigBuilder, ConfigFile, Context, Driver, DriverBuilder,
    Element, ElementFilter, ExponentialBackoff, FilterKind, FixedInterval, Locator, Resolvable,
    Scoped, WaitPolicy,
};

// Page-object types
pub use page::{
    AnnotatedFieldStrategy, FieldLocatorStrategy, FindBy, LocatorSlot, PageGraph,
    PageObjectInitializer, PageRef,
};

// Remote driver types
pub use remote::{Handle, RemoteElement, RemoteSession, Session};

// Error types
pub use error::{DriverError, DriverErrorKind, DriverResult, Error, ErrorKind, Result};

// Identifier types
pub use identifiers::NodeId;
