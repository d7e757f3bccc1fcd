//! Root of the locate tree.
//!
//! The [`Driver`] owns the lazily acquired automation [`Session`] and hands
//! out top-level [`Locator`]s. Quitting or closing the last window clears
//! the cached session so the next use starts a new one.
//!
//! # Example
//!
//! ```ignore
//! use patient_locator::{By, Config, Driver};
//!
//! let driver = Driver::builder()
//!     .config(Config::default())
//!     .connect(|| my_backend::start_session())
//!     .build()?;
//!
//! driver.find(By::id("login")).get().click()?;
//! driver.quit()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::error::{DriverResult, Error, Result};
use crate::remote::Session;

use super::By;
use super::config::Config;
use super::locator::Locator;

// ============================================================================
// Types
// ============================================================================

type ConnectFn = dyn Fn() -> DriverResult<Session>;

/// Counts session cache clears.
///
/// Shared by a driver and every lookup below it. A handle cached under an
/// older epoch belongs to a session that is gone.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionEpoch(Rc<Cell<u64>>);

impl SessionEpoch {
    /// Returns the current epoch.
    #[inline]
    pub(crate) fn get(&self) -> u64 {
        self.0.get()
    }

    /// Starts a new epoch, expiring every handle cached so far.
    #[inline]
    pub(crate) fn advance(&self) {
        self.0.set(self.0.get().wrapping_add(1));
    }
}

/// Internal shared state for the driver.
struct DriverInner {
    /// Policy bundle handed to every locator.
    config: Config,
    /// Session supplier.
    connect: Rc<ConnectFn>,
    /// Cached session.
    session: RefCell<Option<Session>>,
    /// Bumped whenever the cached session is dropped.
    epoch: SessionEpoch,
}

// ============================================================================
// Driver
// ============================================================================

/// Lazily connected automation session plus resolution policy.
///
/// Clones share the same session cache. Not safe for concurrent use.
#[derive(Clone)]
pub struct Driver {
    /// Shared inner state.
    inner: Rc<DriverInner>,
}

// ============================================================================
// Driver - Display
// ============================================================================

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("session", &*self.inner.session.borrow())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Driver - Public API
// ============================================================================

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Returns the policy bundle.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns `true` if both values share the same session cache.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Driver) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns `true` if a session is currently cached.
    #[inline]
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    /// Returns the session, connecting on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if connecting fails.
    pub fn session(&self) -> Result<Session> {
        if let Some(session) = self.inner.session.borrow().as_ref() {
            return Ok(session.clone());
        }

        let session = (self.inner.connect)()?;
        info!(session_id = session.id(), "Session acquired");
        *self.inner.session.borrow_mut() = Some(session.clone());
        Ok(session)
    }

    /// Runs a side-effecting operation against the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if connecting or the operation fails.
    pub fn accept(&self, op: impl FnOnce(&Session) -> DriverResult<()>) -> Result<()> {
        self.apply(op)
    }

    /// Runs an operation against the session and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if connecting or the operation fails.
    pub fn apply<T>(&self, op: impl FnOnce(&Session) -> DriverResult<T>) -> Result<T> {
        let session = self.session()?;
        Ok(op(&session)?)
    }

    /// Returns a locator for top-level elements matching `by`.
    #[must_use]
    pub fn find(&self, by: By) -> Locator {
        let description: Rc<str> = by.to_string().into();
        let driver = self.clone();
        Locator::new(
            description,
            Rc::new(move || driver.apply(|session| session.find_children(&by))),
            self.inner.config.clone(),
            self.inner.epoch.clone(),
        )
    }

    /// Terminates the session and clears the cache.
    ///
    /// Element handles cached under the session are expired too. Does nothing
    /// else if no session was ever acquired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if the driver fails to quit. The cache is
    /// cleared regardless.
    pub fn quit(&self) -> Result<()> {
        let session = self.inner.session.borrow_mut().take();
        self.inner.epoch.advance();
        let Some(session) = session else {
            debug!("Quit requested without an active session");
            return Ok(());
        };

        info!(session_id = session.id(), "Quitting session");
        session.quit().map_err(Error::from)
    }

    /// Closes the current window, clearing the cache if it was the last one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if counting or closing windows fails.
    pub fn close(&self) -> Result<()> {
        let session = self.session()?;
        let windows = session.window_count()?;
        session.close_window()?;

        if windows <= 1 {
            info!(session_id = session.id(), "Last window closed");
            self.clear_session();
        } else {
            debug!(session_id = session.id(), remaining = windows - 1, "Window closed");
        }
        Ok(())
    }

    /// Drops the cached session without terminating it.
    ///
    /// Element handles cached under the session are expired too.
    pub fn invalidate(&self) {
        self.clear_session();
    }

    fn clear_session(&self) {
        self.inner.session.borrow_mut().take();
        self.inner.epoch.advance();
    }
}

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct DriverBuilder {
    /// Policy bundle.
    config: Option<Config>,
    /// Session supplier.
    connect: Option<Rc<ConnectFn>>,
}

impl fmt::Debug for DriverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverBuilder")
            .field("config", &self.config)
            .field("connect", &self.connect.is_some())
            .finish()
    }
}

impl DriverBuilder {
    /// Creates a new driver builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy bundle. Defaults to [`Config::default`].
    #[inline]
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the session supplier, called on first use and after every
    /// cache clear.
    #[inline]
    #[must_use]
    pub fn connect(mut self, connect: impl Fn() -> DriverResult<Session> + 'static) -> Self {
        self.connect = Some(Rc::new(connect));
        self
    }

    /// Uses an existing session for every (re-)connect.
    #[inline]
    #[must_use]
    pub fn session(self, session: Session) -> Self {
        self.connect(move || Ok(session.clone()))
    }

    /// Builds the driver with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no session supplier was set
    pub fn build(self) -> Result<Driver> {
        let connect = self.connect.ok_or_else(|| {
            Error::config(
                "Session supplier is required. Use .connect() or .session() to set it.",
            )
        })?;

        Ok(Driver {
            inner: Rc::new(DriverInner {
                config: self.config.unwrap_or_default(),
                connect,
                session: RefCell::new(None),
                epoch: SessionEpoch::default(),
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
