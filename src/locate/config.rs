//! Resolution policy shared by locators, elements and drivers.
//!
//! A [`Config`] is immutable once built. Use [`Config::to_builder`] to derive
//! a variant with individual fields overridden.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use patient_locator::{Config, DriverErrorKind, ExponentialBackoff};
//!
//! let config = Config::builder()
//!     .wait(ExponentialBackoff::default())
//!     .present_timeout(Duration::from_secs(10))
//!     .max_action_attempts(5)
//!     .ignore_action(DriverErrorKind::ElementClickIntercepted)
//!     .build()?;
//!
//! let strict = config.to_builder().max_action_attempts(1).build()?;
//! ```
//!
//! Configurations can also be read from JSON:
//!
//! ```json
//! {
//!   "present_timeout_ms": 10000,
//!   "poll_interval_ms": 50,
//!   "max_action_attempts": 4,
//!   "ignored_action": ["element_click_intercepted"]
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverErrorKind, DriverResult, Error, Result};
use crate::remote::Handle;

use super::wait::{ExponentialBackoff, FixedInterval, WaitPolicy, saturating_millis};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for presence lookups (30 seconds).
pub const DEFAULT_PRESENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for absence checks (30 seconds).
pub const DEFAULT_NOT_PRESENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default poll interval (100 milliseconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of action attempts.
pub const DEFAULT_MAX_ACTION_ATTEMPTS: u32 = 3;

// ============================================================================
// ElementFilter
// ============================================================================

type FilterFn = dyn Fn(&Handle) -> DriverResult<bool>;

/// Predicate deciding which looked-up handles count as matches.
#[derive(Clone)]
pub struct ElementFilter {
    name: Rc<str>,
    predicate: Rc<FilterFn>,
}

impl ElementFilter {
    /// Creates a named filter from a predicate.
    pub fn new(
        name: impl Into<Rc<str>>,
        predicate: impl Fn(&Handle) -> DriverResult<bool> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Rc::new(predicate),
        }
    }

    /// Accepts every handle.
    #[must_use]
    pub fn any() -> Self {
        Self::new("any", |_| Ok(true))
    }

    /// Accepts displayed handles only.
    #[must_use]
    pub fn displayed() -> Self {
        Self::new("displayed", |h| h.is_displayed())
    }

    /// Accepts enabled handles only.
    #[must_use]
    pub fn enabled() -> Self {
        Self::new("enabled", |h| h.is_enabled())
    }

    /// Returns the filter name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the filter against a handle.
    #[inline]
    pub fn matches(&self, handle: &Handle) -> DriverResult<bool> {
        (self.predicate)(handle)
    }
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self::displayed()
    }
}

impl fmt::Debug for ElementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementFilter").field(&self.name).finish()
    }
}

// ============================================================================
// Config
// ============================================================================

/// Immutable resolution policy.
#[derive(Clone)]
pub struct Config {
    inner: Rc<ConfigInner>,
}

struct ConfigInner {
    wait: Rc<dyn WaitPolicy>,
    present_timeout: Duration,
    not_present_timeout: Duration,
    filter: ElementFilter,
    max_action_attempts: u32,
    ignored_lookup: FxHashSet<DriverErrorKind>,
    ignored_action: FxHashSet<DriverErrorKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_builder(ConfigBuilder::new())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("wait", &self.inner.wait)
            .field("present_timeout", &self.inner.present_timeout)
            .field("not_present_timeout", &self.inner.not_present_timeout)
            .field("filter", &self.inner.filter)
            .field("max_action_attempts", &self.inner.max_action_attempts)
            .field("ignored_lookup", &self.inner.ignored_lookup)
            .field("ignored_action", &self.inner.ignored_action)
            .finish()
    }
}

impl Config {
    /// Creates a builder populated with the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Creates a builder populated with this configuration's values.
    #[must_use]
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            wait: Rc::clone(&self.inner.wait),
            present_timeout: self.inner.present_timeout,
            not_present_timeout: self.inner.not_present_timeout,
            filter: self.inner.filter.clone(),
            max_action_attempts: self.inner.max_action_attempts,
            ignored_lookup: self.inner.ignored_lookup.clone(),
            ignored_action: self.inner.ignored_action.clone(),
        }
    }

    /// Parses a JSON [`ConfigFile`] and validates it.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str::<ConfigFile>(json)?.into_config()
    }

    fn from_builder(builder: ConfigBuilder) -> Self {
        Self {
            inner: Rc::new(ConfigInner {
                wait: builder.wait,
                present_timeout: builder.present_timeout,
                not_present_timeout: builder.not_present_timeout,
                filter: builder.filter,
                max_action_attempts: builder.max_action_attempts,
                ignored_lookup: builder.ignored_lookup,
                ignored_action: builder.ignored_action,
            }),
        }
    }
}

// ============================================================================
// Config - Accessors
// ============================================================================

impl Config {
    /// Returns the poll pacing strategy.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> &Rc<dyn WaitPolicy> {
        &self.inner.wait
    }

    /// Returns the default presence timeout.
    #[inline]
    #[must_use]
    pub fn present_timeout(&self) -> Duration {
        self.inner.present_timeout
    }

    /// Returns the default absence timeout.
    #[inline]
    #[must_use]
    pub fn not_present_timeout(&self) -> Duration {
        self.inner.not_present_timeout
    }

    /// Returns the default element filter.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &ElementFilter {
        &self.inner.filter
    }

    /// Returns the total number of attempts an action gets.
    #[inline]
    #[must_use]
    pub fn max_action_attempts(&self) -> u32 {
        self.inner.max_action_attempts
    }

    /// Returns the driver error kinds ignored while looking up elements.
    #[inline]
    #[must_use]
    pub fn ignored_lookup(&self) -> &FxHashSet<DriverErrorKind> {
        &self.inner.ignored_lookup
    }

    /// Returns the driver error kinds retried while executing actions.
    #[inline]
    #[must_use]
    pub fn ignored_action(&self) -> &FxHashSet<DriverErrorKind> {
        &self.inner.ignored_action
    }
}

// ============================================================================
// Config - Classification
// ============================================================================

impl Config {
    /// Returns `true` if a lookup failure counts as "no match this attempt".
    #[inline]
    pub(crate) fn tolerates_lookup(&self, err: &DriverError) -> bool {
        err.kind.is_always_handled() || self.inner.ignored_lookup.contains(&err.kind)
    }

    /// Returns `true` if an action failure should clear the cache and retry.
    #[inline]
    pub(crate) fn retries_action(&self, err: &DriverError) -> bool {
        err.kind == DriverErrorKind::StaleElement || self.inner.ignored_action.contains(&err.kind)
    }
}

// ============================================================================
// ConfigBuilder
// ============================================================================

/// Fluent builder for [`Config`].
#[derive(Clone)]
pub struct ConfigBuilder {
    wait: Rc<dyn WaitPolicy>,
    present_timeout: Duration,
    not_present_timeout: Duration,
    filter: ElementFilter,
    max_action_attempts: u32,
    ignored_lookup: FxHashSet<DriverErrorKind>,
    ignored_action: FxHashSet<DriverErrorKind>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("present_timeout", &self.present_timeout)
            .field("max_action_attempts", &self.max_action_attempts)
            .finish_non_exhaustive()
    }
}

impl ConfigBuilder {
    /// Creates a builder populated with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wait: Rc::new(FixedInterval(DEFAULT_POLL_INTERVAL)),
            present_timeout: DEFAULT_PRESENT_TIMEOUT,
            not_present_timeout: DEFAULT_NOT_PRESENT_TIMEOUT,
            filter: ElementFilter::default(),
            max_action_attempts: DEFAULT_MAX_ACTION_ATTEMPTS,
            ignored_lookup: FxHashSet::default(),
            ignored_action: FxHashSet::default(),
        }
    }

    /// Sets the poll pacing strategy.
    #[inline]
    #[must_use]
    pub fn wait(self, policy: impl WaitPolicy + 'static) -> Self {
        self.wait_rc(Rc::new(policy))
    }

    /// Sets an already shared poll pacing strategy.
    #[inline]
    #[must_use]
    pub fn wait_rc(mut self, policy: Rc<dyn WaitPolicy>) -> Self {
        self.wait = policy;
        self
    }

    /// Sets the default presence timeout.
    #[inline]
    #[must_use]
    pub fn present_timeout(mut self, timeout: Duration) -> Self {
        self.present_timeout = timeout;
        self
    }

    /// Sets the default absence timeout.
    #[inline]
    #[must_use]
    pub fn not_present_timeout(mut self, timeout: Duration) -> Self {
        self.not_present_timeout = timeout;
        self
    }

    /// Sets the default element filter.
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: ElementFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the total number of attempts an action gets.
    #[inline]
    #[must_use]
    pub fn max_action_attempts(mut self, attempts: u32) -> Self {
        self.max_action_attempts = attempts;
        self
    }

    /// Ignores a driver error kind while looking up elements.
    #[inline]
    #[must_use]
    pub fn ignore_lookup(mut self, kind: DriverErrorKind) -> Self {
        self.ignored_lookup.insert(kind);
        self
    }

    /// Retries actions failing with a driver error kind.
    #[inline]
    #[must_use]
    pub fn ignore_action(mut self, kind: DriverErrorKind) -> Self {
        self.ignored_action.insert(kind);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `max_action_attempts` is zero
    /// - [`Error::Config`] if an ignored set contains
    ///   [`DriverErrorKind::NoSuchElement`] or [`DriverErrorKind::StaleElement`]
    pub fn build(self) -> Result<Config> {
        if self.max_action_attempts == 0 {
            return Err(Error::config("max_action_attempts must be at least 1"));
        }
        Self::validate_ignored("ignored_lookup", &self.ignored_lookup)?;
        Self::validate_ignored("ignored_action", &self.ignored_action)?;

        Ok(Config::from_builder(self))
    }

    fn validate_ignored(name: &str, kinds: &FxHashSet<DriverErrorKind>) -> Result<()> {
        if let Some(kind) = kinds.iter().find(|k| k.is_always_handled()) {
            return Err(Error::config(format!(
                "{name} may not contain {kind}; it is always handled explicitly"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// ConfigFile
// ============================================================================

/// Built-in filters selectable from a [`ConfigFile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// [`ElementFilter::any`].
    Any,
    /// [`ElementFilter::displayed`].
    #[default]
    Displayed,
    /// [`ElementFilter::enabled`].
    Enabled,
}

/// Serializable form of [`Config`] with millisecond timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Presence timeout in milliseconds.
    pub present_timeout_ms: i64,
    /// Absence timeout in milliseconds.
    pub not_present_timeout_ms: i64,
    /// Delay between polls in milliseconds (initial delay with backoff).
    pub poll_interval_ms: i64,
    /// Enables exponential backoff with this growth factor.
    pub backoff_factor: Option<u32>,
    /// Backoff delay cap in milliseconds.
    pub max_poll_interval_ms: Option<i64>,
    /// Total attempts per action.
    pub max_action_attempts: u32,
    /// Element filter.
    pub filter: FilterKind,
    /// Driver error kinds ignored during lookup.
    pub ignored_lookup: Vec<DriverErrorKind>,
    /// Driver error kinds retried during actions.
    pub ignored_action: Vec<DriverErrorKind>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            present_timeout_ms: default_millis(DEFAULT_PRESENT_TIMEOUT),
            not_present_timeout_ms: default_millis(DEFAULT_NOT_PRESENT_TIMEOUT),
            poll_interval_ms: default_millis(DEFAULT_POLL_INTERVAL),
            backoff_factor: None,
            max_poll_interval_ms: None,
            max_action_attempts: DEFAULT_MAX_ACTION_ATTEMPTS,
            filter: FilterKind::default(),
            ignored_lookup: Vec::new(),
            ignored_action: Vec::new(),
        }
    }
}

fn default_millis(duration: Duration) -> i64 {
    i64::try_from(saturating_millis(duration)).unwrap_or(i64::MAX)
}

impl ConfigFile {
    /// Converts to a validated [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for negative durations and for everything
    /// [`ConfigBuilder::build`] rejects.
    pub fn into_config(self) -> Result<Config> {
        let poll_interval = millis("poll_interval_ms", self.poll_interval_ms)?;

        let mut builder = Config::builder()
            .present_timeout(millis("present_timeout_ms", self.present_timeout_ms)?)
            .not_present_timeout(millis("not_present_timeout_ms", self.not_present_timeout_ms)?)
            .max_action_attempts(self.max_action_attempts)
            .filter(match self.filter {
                FilterKind::Any => ElementFilter::any(),
                FilterKind::Displayed => ElementFilter::displayed(),
                FilterKind::Enabled => ElementFilter::enabled(),
            });

        builder = match self.backoff_factor {
            Some(factor) => {
                let max = match self.max_poll_interval_ms {
                    Some(ms) => millis("max_poll_interval_ms", ms)?,
                    None => ExponentialBackoff::default().max,
                };
                builder.wait(ExponentialBackoff {
                    initial: poll_interval,
                    factor,
                    max,
                })
            }
            None => builder.wait(FixedInterval(poll_interval)),
        };

        for kind in self.ignored_lookup {
            builder = builder.ignore_lookup(kind);
        }
        for kind in self.ignored_action {
            builder = builder.ignore_action(kind);
        }

        builder.build()
    }
}

fn millis(name: &str, value: i64) -> Result<Duration> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| Error::config(format!("{name} must not be negative, got {value}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.present_timeout(), DEFAULT_PRESENT_TIMEOUT);
        assert_eq!(config.not_present_timeout(), DEFAULT_NOT_PRESENT_TIMEOUT);
        assert_eq!(config.max_action_attempts(), 3);
        assert_eq!(config.filter().name(), "displayed");
        assert!(config.ignored_lookup().is_empty());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = Config::builder().max_action_attempts(0).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_not_found_in_ignored_lookup_rejected() {
        let err = Config::builder()
            .ignore_lookup(DriverErrorKind::NoSuchElement)
            .build()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.to_string().contains("no_such_element"));
    }

    #[test]
    fn test_stale_in_ignored_action_rejected() {
        let result = Config::builder()
            .ignore_action(DriverErrorKind::StaleElement)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_to_builder_overrides_single_field() {
        let base = Config::builder()
            .present_timeout(Duration::from_secs(4))
            .ignore_action(DriverErrorKind::ElementNotInteractable)
            .build()
            .unwrap();

        let derived = base
            .to_builder()
            .present_timeout(Duration::from_secs(9))
            .build()
            .unwrap();

        assert_eq!(derived.present_timeout(), Duration::from_secs(9));
        assert_eq!(base.present_timeout(), Duration::from_secs(4));
        assert!(
            derived
                .ignored_action()
                .contains(&DriverErrorKind::ElementNotInteractable)
        );
    }

    #[test]
    fn test_classification() {
        let config = Config::builder()
            .ignore_lookup(DriverErrorKind::Timeout)
            .ignore_action(DriverErrorKind::ElementClickIntercepted)
            .build()
            .unwrap();

        assert!(config.tolerates_lookup(&DriverError::stale("x")));
        assert!(config.tolerates_lookup(&DriverError::no_such_element("x")));
        assert!(config.tolerates_lookup(&DriverError::new(DriverErrorKind::Timeout, "x")));
        assert!(!config.tolerates_lookup(&DriverError::new(DriverErrorKind::Transport, "x")));

        assert!(config.retries_action(&DriverError::stale("x")));
        assert!(config.retries_action(&DriverError::new(
            DriverErrorKind::ElementClickIntercepted,
            "x"
        )));
        assert!(!config.retries_action(&DriverError::no_such_element("x")));
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(
            r#"{
                "present_timeout_ms": 1500,
                "poll_interval_ms": 20,
                "backoff_factor": 3,
                "max_action_attempts": 5,
                "filter": "any",
                "ignored_action": ["element_click_intercepted"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.present_timeout(), Duration::from_millis(1500));
        assert_eq!(config.not_present_timeout(), DEFAULT_NOT_PRESENT_TIMEOUT);
        assert_eq!(config.max_action_attempts(), 5);
        assert_eq!(config.filter().name(), "any");
        assert_eq!(config.wait().delay(2), Duration::from_millis(60));
    }

    #[test]
    fn test_from_json_rejects_negative_timeout() {
        let err = Config::from_json(r#"{"present_timeout_ms": -1}"#).unwrap_err();
        assert!(err.to_string().contains("present_timeout_ms"));
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        let err = Config::from_json(r#"{"presence": 10}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_json_rejects_always_handled_kind() {
        let err = Config::from_json(r#"{"ignored_lookup": ["stale_element"]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
    }
}
