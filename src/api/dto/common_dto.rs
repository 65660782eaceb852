//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Configuration, Selection};

/// A selected option as sent by the configurator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionDto {
    /// Pricing category (e.g. `"gebaeudehuelle"`).
    pub category: String,
    /// Item key within the category.
    pub value: String,
    /// Units, for countable options such as PV modules. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// A house configuration as sent by the configurator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDto {
    /// Item key of the nest module (e.g. `"nest80"`).
    pub nest: String,
    /// Further options, at most one per category.
    #[serde(default)]
    pub selections: Vec<SelectionDto>,
    /// Whether the site check service is ordered.
    #[serde(default)]
    pub grundstueckscheck: bool,
}

impl From<ConfigurationDto> for Configuration {
    fn from(dto: ConfigurationDto) -> Self {
        Self {
            nest: dto.nest,
            selections: dto
                .selections
                .into_iter()
                .map(|s| Selection {
                    category: s.category,
                    value: s.value,
                    quantity: s.quantity,
                })
                .collect(),
            grundstueckscheck: dto.grundstueckscheck,
        }
    }
}
