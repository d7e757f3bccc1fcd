//! Per-field selector annotations.
//!
//! A [`FindBy`] names exactly one selector strategy for a field, plus an
//! optional timeout override for that field's locator.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use patient_locator::page::FindBy;
//!
//! let save = FindBy::accessibility_id("save").with_timeout(Duration::from_secs(60));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locate::By;
use crate::locate::wait::saturating_millis;

// ============================================================================
// FindBy
// ============================================================================

/// Selector annotation for a page-object field.
///
/// Exactly one strategy must be set. This is checked when the page graph is
/// initialized, not when the annotation is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FindBy {
    /// Element ID.
    pub id: Option<String>,
    /// Accessibility identifier.
    pub accessibility_id: Option<String>,
    /// Platform UI automation path.
    pub ui_path: Option<String>,
    /// XPath expression.
    pub xpath: Option<String>,
    /// CSS selector.
    pub css: Option<String>,
    /// Presence timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl FindBy {
    /// Annotation selecting by element ID.
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            id: Some(value.into()),
            ..Self::default()
        }
    }

    /// Annotation selecting by accessibility identifier.
    #[must_use]
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Self {
            accessibility_id: Some(value.into()),
            ..Self::default()
        }
    }

    /// Annotation selecting by platform UI automation path.
    #[must_use]
    pub fn ui_path(value: impl Into<String>) -> Self {
        Self {
            ui_path: Some(value.into()),
            ..Self::default()
        }
    }

    /// Annotation selecting by XPath.
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            xpath: Some(value.into()),
            ..Self::default()
        }
    }

    /// Annotation selecting by CSS.
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            css: Some(value.into()),
            ..Self::default()
        }
    }

    /// Overrides the presence timeout for this field.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(saturating_millis(timeout));
        self
    }

    /// Returns the timeout override.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns the single selected strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] if zero or several strategies are
    /// set.
    pub fn selector(&self) -> Result<By> {
        let candidates = [
            self.id.clone().map(By::Id),
            self.accessibility_id.clone().map(By::AccessibilityId),
            self.ui_path.clone().map(By::UiPath),
            self.xpath.clone().map(By::XPath),
            self.css.clone().map(By::Css),
        ];
        let mut selected = candidates.into_iter().flatten();

        match (selected.next(), selected.next()) {
            (Some(by), None) => Ok(by),
            (None, _) => Err(Error::initialization("no selector strategy set")),
            (Some(first), Some(second)) => Err(Error::initialization(format!(
                "several selector strategies set ({}, {}, ...); exactly one is allowed",
                first.strategy(),
                second.strategy()
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    #[test]
    fn test_single_strategy() {
        assert_eq!(FindBy::xpath("//a").selector().unwrap(), By::xpath("//a"));
        assert_eq!(
            FindBy::accessibility_id("menu").selector().unwrap(),
            By::accessibility_id("menu")
        );
    }

    #[test]
    fn test_no_strategy_rejected() {
        let err = FindBy::default().selector().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
    }

    #[test]
    fn test_several_strategies_rejected() {
        let find_by = FindBy {
            id: Some("a".into()),
            css: Some("#a".into()),
            ..FindBy::default()
        };

        let err = find_by.selector().unwrap_err();
        assert!(err.to_string().contains("id, css"));
    }

    #[test]
    fn test_timeout_override() {
        let find_by = FindBy::id("slow").with_timeout(Duration::from_secs(45));
        assert_eq!(find_by.timeout(), Some(Duration::from_secs(45)));
        assert_eq!(FindBy::id("fast").timeout(), None);
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let find_by = FindBy::id("forever").with_timeout(Duration::MAX);
        assert_eq!(find_by.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_deserialize_annotation_table() {
        let table: Vec<FindBy> = serde_json::from_str(
            r#"[{"ui_path": "new UiSelector().text(\"OK\")", "timeout_ms": 500}, {"css": "nav"}]"#,
        )
        .unwrap();

        assert_eq!(table[0].timeout(), Some(Duration::from_millis(500)));
        assert!(matches!(table[0].selector().unwrap(), By::UiPath(_)));
        assert_eq!(table[1].selector().unwrap(), By::css("nav"));
    }
}
