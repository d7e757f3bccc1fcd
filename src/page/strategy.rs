//! Pluggable "build a locator for this field" strategies.

use tracing::debug;

use crate::error::{Error, Result};
use crate::locate::{Context, Locator, Scoped};

use super::annotation::FindBy;
use super::graph::NodeKind;

// ============================================================================
// FieldDescriptor
// ============================================================================

/// What a declared field refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// A locator slot.
    Locator,
    /// A nested node of the given kind.
    Node(NodeKind),
}

/// Everything a strategy may inspect about a field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor<'a> {
    /// Name of the declaring node.
    pub owner: &'a str,
    /// Field name.
    pub name: &'a str,
    /// Selector annotation, if declared.
    pub find_by: Option<&'a FindBy>,
    /// What the field refers to.
    pub target: FieldTarget,
}

impl FieldDescriptor<'_> {
    /// Returns `"Owner.field"`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

// ============================================================================
// FieldLocatorStrategy
// ============================================================================

/// Builds the locator for one field, scoped to `context`.
///
/// Returning `Ok(None)` leaves the field unset.
pub trait FieldLocatorStrategy {
    /// Builds the locator for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] for malformed field metadata.
    fn build_locator(&self, context: &Context, field: &FieldDescriptor<'_>)
    -> Result<Option<Locator>>;
}

impl<F> FieldLocatorStrategy for F
where
    F: Fn(&Context, &FieldDescriptor<'_>) -> Result<Option<Locator>>,
{
    fn build_locator(
        &self,
        context: &Context,
        field: &FieldDescriptor<'_>,
    ) -> Result<Option<Locator>> {
        self(context, field)
    }
}

// ============================================================================
// AnnotatedFieldStrategy
// ============================================================================

/// Default strategy: builds locators from [`FindBy`] annotations.
///
/// Fields without annotation are left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotatedFieldStrategy;

impl FieldLocatorStrategy for AnnotatedFieldStrategy {
    fn build_locator(
        &self,
        context: &Context,
        field: &FieldDescriptor<'_>,
    ) -> Result<Option<Locator>> {
        let Some(find_by) = field.find_by else {
            return Ok(None);
        };

        let by = find_by.selector().map_err(|err| match err {
            Error::Initialization { message } => {
                Error::initialization(format!("{}: {message}", field.path()))
            }
            other => other,
        })?;
        debug!(field = %field.path(), selector = %by, "Building field locator");

        let locator = context.find(by);
        Ok(Some(match find_by.timeout() {
            Some(timeout) => locator.with_timeout(timeout),
            None => locator,
        }))
    }
}
