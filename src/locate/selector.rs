//! Element selector strategies.
//!
//! Provides Selenium-like `By` selectors. Selectors are opaque to the
//! resolution engine: they are handed to the driver collaborator unchanged.
//!
//! # Example
//!
//! ```ignore
//! use patient_locator::By;
//!
//! // CSS selector (default)
//! let submit = driver.find(By::css("#submit"));
//!
//! // Mobile accessibility id
//! let menu = driver.find(By::accessibility_id("main-menu"));
//!
//! // Platform UI automation path
//! let row = driver.find(By::ui_path("new UiSelector().text(\"Inbox\")"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// By Enum
// ============================================================================

/// Element selector strategy (like Selenium's `By`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum By {
    /// CSS selector (most common on the web).
    ///
    /// # Example
    /// ```ignore
    /// By::Css("button.primary")
    /// By::Css("[data-testid='submit']")
    /// ```
    #[serde(rename = "css")]
    Css(String),

    /// XPath expression.
    ///
    /// # Example
    /// ```ignore
    /// By::XPath("//button[@type='submit']")
    /// ```
    #[serde(rename = "xpath")]
    XPath(String),

    /// Element ID (web `id` attribute or native resource id).
    #[serde(rename = "id")]
    Id(String),

    /// Accessibility identifier (content-description / accessibility label).
    #[serde(rename = "accessibilityId")]
    AccessibilityId(String),

    /// Platform UI automation path (UiAutomator selector, class chain, ...).
    ///
    /// Passed to the driver verbatim.
    #[serde(rename = "uiPath")]
    UiPath(String),

    /// Tag name.
    #[serde(rename = "tag")]
    Tag(String),

    /// Name attribute.
    #[serde(rename = "name")]
    Name(String),

    /// Class name (single class).
    #[serde(rename = "class")]
    Class(String),

    /// Link text (for `<a>` elements).
    #[serde(rename = "linkText")]
    LinkText(String),
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates an accessibility identifier selector.
    #[inline]
    pub fn accessibility_id(id: impl Into<String>) -> Self {
        Self::AccessibilityId(id.into())
    }

    /// Creates a platform UI automation path selector.
    #[inline]
    pub fn ui_path(path: impl Into<String>) -> Self {
        Self::UiPath(path.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a name attribute selector.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a class name selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates a link text selector.
    #[inline]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::AccessibilityId(_) => "accessibilityId",
            Self::UiPath(_) => "uiPath",
            Self::Tag(_) => "tag",
            Self::Name(_) => "name",
            Self::Class(_) => "class",
            Self::LinkText(_) => "linkText",
        }
    }

    /// Returns the selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::Id(v)
            | Self::AccessibilityId(v)
            | Self::UiPath(v)
            | Self::Tag(v)
            | Self::Name(v)
            | Self::Class(v)
            | Self::LinkText(v) => v,
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy(), self.value())
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
