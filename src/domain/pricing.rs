//! Pricing dataset, snapshots and snapshot diffs.
//!
//! [`PricingData`] maps `category → item key → entry`. Both levels are
//! ordered maps so that serialised snapshots and diffs are deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Category holding the house modules themselves.
pub const NEST_CATEGORY: &str = "nest";

/// Categories every written snapshot must contain.
pub const REQUIRED_CATEGORIES: &[&str] =
    &[NEST_CATEGORY, "gebaeudehuelle", "innenverkleidung", "fussboden"];

/// A single priced option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingEntry {
    /// Display name as written in the source sheet.
    pub name: String,
    /// Unit price in cents. Zero for included baseline options.
    pub price: Cents,
    /// `true` when the sheet lists the option as "price on request".
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub on_request: bool,
    /// Usable floor area; only meaningful for [`NEST_CATEGORY`] entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_meters: Option<u32>,
    /// Upper bound on the selectable quantity (e.g. PV modules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
}

impl PricingEntry {
    /// Creates a plain priced entry.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Cents) -> Self {
        Self {
            name: name.into(),
            price,
            on_request: false,
            square_meters: None,
            max_quantity: None,
        }
    }

    /// Sets the floor area.
    #[must_use]
    pub fn with_square_meters(mut self, square_meters: u32) -> Self {
        self.square_meters = Some(square_meters);
        self
    }

    /// Sets the maximum quantity.
    #[must_use]
    pub fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = Some(max_quantity);
        self
    }

    /// Marks the entry as "price on request".
    #[must_use]
    pub fn on_request(mut self) -> Self {
        self.on_request = true;
        self
    }
}

/// Items of one category keyed by item key.
pub type CategoryPrices = BTreeMap<String, PricingEntry>;

/// Full pricing dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingData(BTreeMap<String, CategoryPrices>);

impl PricingData {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the items of `category`, if present.
    #[must_use]
    pub fn category(&self, category: &str) -> Option<&CategoryPrices> {
        self.0.get(category)
    }

    /// Looks up a single entry.
    #[must_use]
    pub fn entry(&self, category: &str, item_key: &str) -> Option<&PricingEntry> {
        self.0.get(category).and_then(|items| items.get(item_key))
    }

    /// Inserts or replaces a whole category.
    pub fn insert_category(&mut self, category: impl Into<String>, items: CategoryPrices) {
        self.0.insert(category.into(), items);
    }

    /// Inserts or replaces a single entry, creating the category if needed.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        item_key: impl Into<String>,
        entry: PricingEntry,
    ) {
        self.0
            .entry(category.into())
            .or_default()
            .insert(item_key.into(), entry);
    }

    /// Iterates over categories in key order.
    pub fn categories(&self) -> impl Iterator<Item = (&String, &CategoryPrices)> {
        self.0.iter()
    }

    /// Total number of entries across all categories.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if no category holds any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Required categories that are absent or empty.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_CATEGORIES
            .iter()
            .copied()
            .filter(|c| self.0.get(*c).is_none_or(BTreeMap::is_empty))
            .collect()
    }
}

/// A persisted, versioned copy of the pricing dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSnapshot {
    /// Monotonic version, starting at 1.
    pub version: i64,
    /// Full dataset.
    pub data: PricingData,
    /// When the snapshot was written.
    pub synced_at: DateTime<Utc>,
    /// Who triggered the sync (`"cron"`, `"admin"`, `"cli"`, ...).
    pub synced_by: String,
}

/// Kind of change between two datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Item exists only in the new dataset.
    Added,
    /// Item exists in both with a different price, name or on-request flag.
    Updated,
    /// Item exists only in the old dataset.
    Removed,
}

/// One item-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingChange {
    /// Category of the item.
    pub category: String,
    /// Item key.
    pub item_key: String,
    /// What happened.
    pub action: ChangeAction,
    /// Price before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<Cents>,
    /// Price after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_price: Option<Cents>,
}

/// Result of comparing two datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingDiff {
    /// Item-level changes in category/key order.
    pub changes: Vec<PricingChange>,
    /// Items present and identical in both datasets.
    pub unchanged: usize,
}

impl PricingDiff {
    /// Number of changes with the given action.
    #[must_use]
    pub fn count(&self, action: ChangeAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    /// Returns `true` if the datasets are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compares `new` against `old` item by item.
#[must_use]
pub fn diff(old: &PricingData, new: &PricingData) -> PricingDiff {
    let mut out = PricingDiff::default();

    for (category, items) in new.categories() {
        for (key, entry) in items {
            match old.entry(category, key) {
                None => out.changes.push(PricingChange {
                    category: category.clone(),
                    item_key: key.clone(),
                    action: ChangeAction::Added,
                    old_price: None,
                    new_price: Some(entry.price),
                }),
                Some(prev) if prev.price != entry.price
                    || prev.name != entry.name
                    || prev.on_request != entry.on_request
                    || prev.square_meters != entry.square_meters
                    || prev.max_quantity != entry.max_quantity =>
                {
                    out.changes.push(PricingChange {
                        category: category.clone(),
                        item_key: key.clone(),
                        action: ChangeAction::Updated,
                        old_price: Some(prev.price),
                        new_price: Some(entry.price),
                    });
                }
                Some(_) => out.unchanged += 1,
            }
        }
    }

    for (category, items) in old.categories() {
        for (key, entry) in items {
            if new.entry(category, key).is_none() {
                out.changes.push(PricingChange {
                    category: category.clone(),
                    item_key: key.clone(),
                    action: ChangeAction::Removed,
                    old_price: Some(entry.price),
                    new_price: None,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PricingData {
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
        data.insert("fenster", "holz", PricingEntry::new("Holz", Cents::new(40_000)));
        data
    }

    #[test]
    fn identical_datasets_have_no_changes() {
        let d = diff(&sample(), &sample());
        assert!(d.is_empty());
        assert_eq!(d.unchanged, 3);
    }

    #[test]
    fn detects_added_updated_removed() {
        let old = sample();
        let mut new = sample();
        new.insert(NEST_CATEGORY, "nest120", PricingEntry::new("Nest 120", Cents::new(1)));
        new.insert(
            NEST_CATEGORY,
            "nest80",
            PricingEntry::new("Nest 80", Cents::new(18_000_000)).with_square_meters(75),
        );
        new.insert_category("fenster", CategoryPrices::new());

        let d = diff(&old, &new);
        assert_eq!(d.count(ChangeAction::Added), 1);
        assert_eq!(d.count(ChangeAction::Updated), 1);
        assert_eq!(d.count(ChangeAction::Removed), 1);
        assert_eq!(d.unchanged, 1);

        let updated = d
            .changes
            .iter()
            .find(|c| c.action == ChangeAction::Updated);
        assert_eq!(
            updated.map(|c| (c.old_price, c.new_price)),
            Some((Some(Cents::new(17_700_000)), Some(Cents::new(18_000_000))))
        );
    }

    #[test]
    fn missing_required_lists_absent_and_empty_categories() {
        let mut data = sample();
        data.insert_category("fussboden", CategoryPrices::new());
        let missing = data.missing_required();
        assert_eq!(missing, vec!["gebaeudehuelle", "innenverkleidung", "fussboden"]);
    }

    #[test]
    fn serialises_as_nested_object() {
        let json = serde_json::to_value(sample()).unwrap_or_default();
        assert_eq!(json["nest"]["nest80"]["price"], 17_700_000);
        assert_eq!(json["nest"]["nest80"]["squareMeters"], 75);
        assert!(json["fenster"]["holz"].get("onRequest").is_none());
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn arb_pricing() -> impl Strategy<Value = PricingData> {
        prop::collection::vec(
            ("[a-z]{3,8}", "[a-z0-9]{2,6}", 0i64..1_000_000_000, any::<bool>()),
            0..30,
        )
        .prop_map(|rows| {
            let mut data = PricingData::new();
            for (category, key, price, on_request) in rows {
                let entry = PricingEntry::new(key.clone(), Cents::new(price));
                let entry = if on_request { entry.on_request() } else { entry };
                data.insert(category, key, entry);
            }
            data
        })
    }

    proptest! {
        #[test]
        fn dataset_compared_with_itself_has_no_changes(data in arb_pricing()) {
            let d = diff(&data, &data);
            prop_assert!(d.is_empty());
            prop_assert_eq!(d.unchanged, data.item_count());
        }
    }
}
