//! Product variant selection.

use serde::{Deserialize, Serialize};

/// A variant selector on a cart or order line.
///
/// Equality is a value comparison over the full selector: two selectors are
/// the same variant only when both size and color match. Cart lines merge on
/// `(product, variant)` identity, so `Large/Red` and `Large/Blue` stay
/// separate lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct VariantSelector {
    /// Selected size, if the product has sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Selected color, if the product has colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl VariantSelector {
    /// A selector with neither size nor color.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            size: None,
            color: None,
        }
    }

    /// Whether the selector carries no choices at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size.is_none() && self.color.is_none()
    }
}

impl std::fmt::Display for VariantSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => write!(f, "{size}/{color}"),
            (Some(size), None) => write!(f, "{size}"),
            (None, Some(color)) => write!(f, "{color}"),
            (None, None) => write!(f, "-"),
        }
    }
}
