//! Pure price calculation over a configuration and a pricing dataset.
//!
//! [`calculate_price`] is deterministic and side-effect free so that a
//! quoted price can be reproduced later from the stored configuration and
//! snapshot version. Anything it cannot price is an error; it never falls
//! back to zero.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::configuration::Configuration;
use super::pricing::{NEST_CATEGORY, PricingData, PricingEntry};
use super::Cents;

/// Category holding fixed-price extras.
pub const OPTIONS_CATEGORY: &str = "optionen";

/// Item key of the site check service inside [`OPTIONS_CATEGORY`].
pub const GRUNDSTUECKSCHECK_KEY: &str = "grundstueckscheck";

/// Reasons a configuration cannot be priced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The dataset has no such category.
    #[error("pricing category '{0}' is not available")]
    MissingCategory(String),

    /// The category exists but does not contain the item.
    #[error("no price for '{item_key}' in category '{category}'")]
    MissingItem {
        /// Category looked up.
        category: String,
        /// Item key looked up.
        item_key: String,
    },

    /// The item is listed as "price on request".
    #[error("'{item_key}' in category '{category}' is priced on request")]
    PriceOnRequest {
        /// Category of the item.
        category: String,
        /// Item key.
        item_key: String,
    },

    /// Quantity is zero or above the item's maximum.
    #[error("invalid quantity {quantity} for '{item_key}' in category '{category}'")]
    InvalidQuantity {
        /// Category of the item.
        category: String,
        /// Item key.
        item_key: String,
        /// Requested quantity.
        quantity: u32,
    },

    /// The same category was selected twice.
    #[error("category '{0}' selected more than once")]
    DuplicateCategory(String),

    /// An item is selected explicitly and through its dedicated flag.
    #[error("'{item_key}' in category '{category}' selected more than once")]
    DuplicateItem {
        /// Category of the item.
        category: String,
        /// Item key.
        item_key: String,
    },

    /// The nest module has no usable floor area.
    #[error("nest module '{0}' has no floor area")]
    MissingArea(String),

    /// A stored price is negative.
    #[error("negative price for '{item_key}' in category '{category}'")]
    NegativePrice {
        /// Category of the item.
        category: String,
        /// Item key.
        item_key: String,
    },

    /// Intermediate sum exceeded the representable range.
    #[error("price overflow")]
    Overflow,
}

/// A priced line of the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Pricing category.
    pub category: String,
    /// Item key.
    pub item_key: String,
    /// Display name from the dataset.
    pub name: String,
    /// Price of one unit.
    pub unit_price: Cents,
    /// Units priced.
    pub quantity: u32,
    /// `unit_price × quantity`.
    pub price: Cents,
}

/// Full price derivation for one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    /// The nest module line.
    pub base: LineItem,
    /// Option lines in selection order.
    pub options: Vec<LineItem>,
    /// Base plus all options.
    pub total_price: Cents,
    /// Usable floor area of the nest module.
    pub square_meters: u32,
    /// `total_price / square_meters`, rounded half up.
    pub price_per_square_meter: Cents,
}

impl PriceBreakdown {
    /// Shortcut for the base (nest) price.
    #[must_use]
    pub fn base_price(&self) -> Cents {
        self.base.price
    }
}

/// Prices `configuration` against `pricing`.
///
/// # Errors
///
/// Returns a [`PriceError`] when any referenced category or item is
/// missing, priced on request, has an invalid quantity, or the sum
/// overflows.
pub fn calculate_price(
    configuration: &Configuration,
    pricing: &PricingData,
) -> Result<PriceBreakdown, PriceError> {
    let nest_entry = lookup(pricing, NEST_CATEGORY, &configuration.nest)?;
    let square_meters = nest_entry
        .square_meters
        .filter(|m| *m > 0)
        .ok_or_else(|| PriceError::MissingArea(configuration.nest.clone()))?;
    let base = line_item(NEST_CATEGORY, &configuration.nest, nest_entry, 1)?;

    let mut seen = HashSet::new();
    seen.insert(NEST_CATEGORY);

    let mut options = Vec::with_capacity(configuration.selections.len() + 1);
    for selection in &configuration.selections {
        if !seen.insert(selection.category.as_str()) {
            return Err(PriceError::DuplicateCategory(selection.category.clone()));
        }
        if configuration.grundstueckscheck
            && selection.category == OPTIONS_CATEGORY
            && selection.value == GRUNDSTUECKSCHECK_KEY
        {
            return Err(PriceError::DuplicateItem {
                category: OPTIONS_CATEGORY.to_string(),
                item_key: GRUNDSTUECKSCHECK_KEY.to_string(),
            });
        }
        let entry = lookup(pricing, &selection.category, &selection.value)?;
        let quantity = selection.quantity.unwrap_or(1);
        options.push(line_item(&selection.category, &selection.value, entry, quantity)?);
    }

    if configuration.grundstueckscheck {
        let entry = lookup(pricing, OPTIONS_CATEGORY, GRUNDSTUECKSCHECK_KEY)?;
        options.push(line_item(OPTIONS_CATEGORY, GRUNDSTUECKSCHECK_KEY, entry, 1)?);
    }

    let total_price = options
        .iter()
        .try_fold(base.price, |acc, item| acc.checked_add(item.price))
        .ok_or(PriceError::Overflow)?;
    let price_per_square_meter = total_price
        .div_round(square_meters)
        .ok_or_else(|| PriceError::MissingArea(configuration.nest.clone()))?;

    Ok(PriceBreakdown {
        base,
        options,
        total_price,
        square_meters,
        price_per_square_meter,
    })
}

fn lookup<'a>(
    pricing: &'a PricingData,
    category: &str,
    item_key: &str,
) -> Result<&'a PricingEntry, PriceError> {
    let items = pricing
        .category(category)
        .ok_or_else(|| PriceError::MissingCategory(category.to_string()))?;
    let entry = items.get(item_key).ok_or_else(|| PriceError::MissingItem {
        category: category.to_string(),
        item_key: item_key.to_string(),
    })?;
    if entry.on_request {
        return Err(PriceError::PriceOnRequest {
            category: category.to_string(),
            item_key: item_key.to_string(),
        });
    }
    if entry.price.is_negative() {
        return Err(PriceError::NegativePrice {
            category: category.to_string(),
            item_key: item_key.to_string(),
        });
    }
    Ok(entry)
}

fn line_item(
    category: &str,
    item_key: &str,
    entry: &PricingEntry,
    quantity: u32,
) -> Result<LineItem, PriceError> {
    let within_max = entry.max_quantity.is_none_or(|max| quantity <= max);
    if quantity == 0 || !within_max {
        return Err(PriceError::InvalidQuantity {
            category: category.to_string(),
            item_key: item_key.to_string(),
            quantity,
        });
    }
    let price = entry.price.checked_mul(quantity).ok_or(PriceError::Overflow)?;
    Ok(LineItem {
        category: category.to_string(),
        item_key: item_key.to_string(),
        name: entry.name.clone(),
        unit_price: entry.price,
        quantity,
        price,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::configuration::Selection;

    fn pricing() -> PricingData {
        let mut data = PricingData::new();
        data.insert(
            NEST_CATEGORY,
            "nest80",
            PricingEntry::new("Nest 80", Cents::new(17_700_000)).with_square_meters(75),
        );
        data.insert(
            NEST_CATEGORY,
            "nest100",
            PricingEntry::new("Nest 100", Cents::new(21_300_000)).with_square_meters(95),
        );
        data.insert("gebaeudehuelle", "trapezblech", PricingEntry::new("Trapezblech", Cents::ZERO));
        data.insert(
            "gebaeudehuelle",
            "holzlattung",
            PricingEntry::new("Holzlattung Lärche Natur", Cents::new(950_000)),
        );
        data.insert(
            "pvanlage",
            "modul",
            PricingEntry::new("PV-Modul", Cents::new(120_000)).with_max_quantity(8),
        );
        data.insert("fenster", "sonder", PricingEntry::new("Sonderfenster", Cents::ZERO).on_request());
        data.insert(
            OPTIONS_CATEGORY,
            GRUNDSTUECKSCHECK_KEY,
            PricingEntry::new("Grundstückscheck", Cents::new(150_000)),
        );
        data
    }

    #[test]
    fn nest_only_configuration() {
        let Ok(b) = calculate_price(&Configuration::new("nest80"), &pricing()) else {
            panic!("expected a price");
        };
        assert_eq!(b.base_price(), Cents::new(17_700_000));
        assert_eq!(b.total_price, Cents::new(17_700_000));
        assert_eq!(b.square_meters, 75);
        assert_eq!(b.price_per_square_meter, Cents::new(236_000));
        assert!(b.options.is_empty());
    }

    #[test]
    fn options_and_quantities_add_up() {
        let config = Configuration::new("nest80")
            .with(Selection::new("gebaeudehuelle", "holzlattung"))
            .with(Selection::new("pvanlage", "modul").with_quantity(4));
        let config = Configuration {
            grundstueckscheck: true,
            ..config
        };
        let Ok(b) = calculate_price(&config, &pricing()) else {
            panic!("expected a price");
        };
        assert_eq!(b.options.len(), 3);
        assert_eq!(b.options.get(1).map(|l| l.price), Some(Cents::new(480_000)));
        assert_eq!(
            b.total_price,
            Cents::new(17_700_000 + 950_000 + 480_000 + 150_000)
        );
    }

    #[test]
    fn is_deterministic() {
        let config = Configuration::new("nest100").with(Selection::new("gebaeudehuelle", "trapezblech"));
        let a = calculate_price(&config, &pricing());
        let b = calculate_price(&config, &pricing());
        assert_eq!(a, b);
        assert!(a.is_ok_and(|x| !x.total_price.is_negative()));
    }

    #[test]
    fn missing_category_is_an_error_not_zero() {
        let config = Configuration::new("nest80").with(Selection::new("innenverkleidung", "fichte"));
        assert_eq!(
            calculate_price(&config, &pricing()),
            Err(PriceError::MissingCategory("innenverkleidung".to_string()))
        );
    }

    #[test]
    fn missing_item_and_missing_nest() {
        let config = Configuration::new("nest80").with(Selection::new("gebaeudehuelle", "gold"));
        assert!(matches!(
            calculate_price(&config, &pricing()),
            Err(PriceError::MissingItem { .. })
        ));
        assert!(matches!(
            calculate_price(&Configuration::new("nest999"), &pricing()),
            Err(PriceError::MissingItem { .. })
        ));
        assert!(matches!(
            calculate_price(&Configuration::new("nest80"), &PricingData::new()),
            Err(PriceError::MissingCategory(_))
        ));
    }

    #[test]
    fn on_request_items_cannot_be_priced() {
        let config = Configuration::new("nest80").with(Selection::new("fenster", "sonder"));
        assert!(matches!(
            calculate_price(&config, &pricing()),
            Err(PriceError::PriceOnRequest { .. })
        ));
    }

    #[test]
    fn quantity_bounds_are_enforced() {
        let over = Configuration::new("nest80").with(Selection::new("pvanlage", "modul").with_quantity(9));
        let zero = Configuration::new("nest80").with(Selection::new("pvanlage", "modul").with_quantity(0));
        assert!(matches!(
            calculate_price(&over, &pricing()),
            Err(PriceError::InvalidQuantity { quantity: 9, .. })
        ));
        assert!(matches!(
            calculate_price(&zero, &pricing()),
            Err(PriceError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let config = Configuration::new("nest80")
            .with(Selection::new("gebaeudehuelle", "trapezblech"))
            .with(Selection::new("gebaeudehuelle", "holzlattung"));
        assert_eq!(
            calculate_price(&config, &pricing()),
            Err(PriceError::DuplicateCategory("gebaeudehuelle".to_string()))
        );
    }

    #[test]
    fn site_check_cannot_be_charged_twice() {
        let both = Configuration {
            grundstueckscheck: true,
            ..Configuration::new("nest80").with(Selection::new(OPTIONS_CATEGORY, GRUNDSTUECKSCHECK_KEY))
        };
        assert_eq!(
            calculate_price(&both, &pricing()),
            Err(PriceError::DuplicateItem {
                category: OPTIONS_CATEGORY.to_string(),
                item_key: GRUNDSTUECKSCHECK_KEY.to_string(),
            })
        );

        let selected = Configuration::new("nest80").with(Selection::new(OPTIONS_CATEGORY, GRUNDSTUECKSCHECK_KEY));
        let Ok(b) = calculate_price(&selected, &pricing()) else {
            panic!("expected a price");
        };
        assert_eq!(b.total_price, Cents::new(17_850_000));
        assert_eq!(b.options.len(), 1);
    }

    #[test]
    fn nest_without_area_is_rejected() {
        let mut data = pricing();
        data.insert(NEST_CATEGORY, "nest80", PricingEntry::new("Nest 80", Cents::new(1)));
        assert_eq!(
            calculate_price(&Configuration::new("nest80"), &data),
            Err(PriceError::MissingArea("nest80".to_string()))
        );
    }

    #[test]
    fn grundstueckscheck_requires_a_price() {
        let mut data = pricing();
        data.insert_category(OPTIONS_CATEGORY, Default::default());
        let config = Configuration {
            grundstueckscheck: true,
            ..Configuration::new("nest80")
        };
        assert!(matches!(
            calculate_price(&config, &data),
            Err(PriceError::MissingItem { .. })
        ));
    }

    #[test]
    fn overflow_is_reported() {
        let mut data = pricing();
        data.insert(
            "pvanlage",
            "modul",
            PricingEntry::new("PV-Modul", Cents::new(i64::MAX / 2)),
        );
        let config = Configuration::new("nest80").with(Selection::new("pvanlage", "modul").with_quantity(3));
        assert_eq!(calculate_price(&config, &data), Err(PriceError::Overflow));
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::configuration::Selection;

    fn arb_entry() -> impl Strategy<Value = PricingEntry> {
        (0i64..100_000_000, proptest::option::of(1u32..10), proptest::bool::weighted(0.1)).prop_map(
            |(price, max_quantity, on_request)| PricingEntry {
                name: "Option".to_string(),
                price: Cents::new(price),
                on_request,
                square_meters: None,
                max_quantity,
            },
        )
    }

    fn arb_pricing() -> impl Strategy<Value = PricingData> {
        (
            prop::collection::btree_map("nest[0-9]{2,3}", (0i64..1_000_000_000, 1u32..500), 1..4),
            prop::collection::btree_map(
                "cat_[a-z]{3,6}",
                prop::collection::btree_map("[a-z]{3,6}", arb_entry(), 1..4),
                0..5,
            ),
        )
            .prop_map(|(nests, categories)| {
                let mut data = PricingData::new();
                for (key, (price, area)) in nests {
                    data.insert(
                        NEST_CATEGORY,
                        key.clone(),
                        PricingEntry::new(key, Cents::new(price)).with_square_meters(area),
                    );
                }
                for (category, items) in categories {
                    data.insert_category(category, items);
                }
                data
            })
    }

    fn arb_case() -> impl Strategy<Value = (PricingData, Configuration)> {
        arb_pricing().prop_flat_map(|data| {
            let nests: Vec<String> = data
                .category(NEST_CATEGORY)
                .map(|items| items.keys().cloned().collect())
                .unwrap_or_default();
            let choices: Vec<(String, String)> = data
                .categories()
                .filter(|(category, _)| category.as_str() != NEST_CATEGORY)
                .flat_map(|(category, items)| items.keys().map(|key| (category.clone(), key.clone())))
                .collect();
            let max = choices.len();
            (
                Just(data),
                prop::sample::select(nests),
                prop::sample::subsequence(choices, 0..=max),
                1u32..12,
            )
                .prop_map(|(data, nest, picked, quantity)| {
                    let selections = picked
                        .into_iter()
                        .map(|(category, key)| Selection::new(category, key).with_quantity(quantity))
                        .collect();
                    let configuration = Configuration {
                        nest,
                        selections,
                        grundstueckscheck: false,
                    };
                    (data, configuration)
                })
        })
    }

    proptest! {
        #[test]
        fn same_inputs_give_same_result((data, configuration) in arb_case()) {
            prop_assert_eq!(
                calculate_price(&configuration, &data),
                calculate_price(&configuration, &data)
            );
        }

        #[test]
        fn priced_totals_are_non_negative_sums((data, configuration) in arb_case()) {
            if let Ok(breakdown) = calculate_price(&configuration, &data) {
                prop_assert!(!breakdown.total_price.is_negative());
                prop_assert!(!breakdown.price_per_square_meter.is_negative());
                let sum: i64 = breakdown.options.iter().map(|l| l.price.get()).sum();
                prop_assert_eq!(breakdown.total_price.get(), breakdown.base_price().get() + sum);
            }
        }

        #[test]
        fn unknown_category_is_never_priced((data, configuration) in arb_case()) {
            let mut configuration = configuration;
            configuration.selections.insert(0, Selection::new("missing_category", "anything"));
            prop_assert_eq!(
                calculate_price(&configuration, &data),
                Err(PriceError::MissingCategory("missing_category".to_string()))
            );
        }
    }
}
