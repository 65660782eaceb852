//! A customer's house configuration as sent by the configurator.

use serde::{Deserialize, Serialize};

/// One chosen option outside the nest module itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Pricing category, e.g. `"gebaeudehuelle"`.
    pub category: String,
    /// Item key inside the category, e.g. `"holzlattung"`.
    pub value: String,
    /// Number of units (PV modules, window square meters). Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl Selection {
    /// Creates a single-unit selection.
    #[must_use]
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
            quantity: None,
        }
    }

    /// Sets the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Complete configuration: a nest module plus its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Item key in the `nest` category, e.g. `"nest80"`.
    pub nest: String,
    /// Chosen options, at most one per category.
    #[serde(default)]
    pub selections: Vec<Selection>,
    /// Whether the fixed-price site check service was ordered.
    #[serde(default)]
    pub grundstueckscheck: bool,
}

impl Configuration {
    /// Creates a configuration with only a nest module selected.
    #[must_use]
    pub fn new(nest: impl Into<String>) -> Self {
        Self {
            nest: nest.into(),
            selections: Vec::new(),
            grundstueckscheck: false,
        }
    }

    /// Adds a selection.
    #[must_use]
    pub fn with(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }
}
