//! Selected rows, tracked by key so they survive tree rebuilds.

use std::collections::{BTreeSet, HashSet};

use varmap_model::columns::INTERNAL_PREFIX;
use varmap_model::{LEAF_PREFIX, Row, RowKey};

use crate::tree::LeafLookup;

/// Separator of legacy leaf values, `<Organ>/<Group>/<Variable>|<key>`.
const LEGACY_SEPARATOR: char = '|';

/// Canonical `ROW:<key>` form of one tree widget value, or `None` for
/// internal node values and values without a usable key.
pub fn normalize_leaf_value(value: &str) -> Option<String> {
    parse_reference(value).map(|key| key.leaf_value())
}

/// Normalize a list of widget values, dropping unusable entries and
/// repeated keys (first occurrence wins).
pub fn normalize_leaf_values<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(|value| normalize_leaf_value(value.as_ref()))
        .filter(|leaf| seen.insert(leaf.clone()))
        .collect()
}

fn parse_reference(value: &str) -> Option<RowKey> {
    let value = value.trim();
    if value.is_empty() || value.starts_with(INTERNAL_PREFIX) {
        return None;
    }
    if let Some(rest) = value.strip_prefix(LEAF_PREFIX) {
        return RowKey::parse(rest).ok();
    }
    if let Some((_, tail)) = value.rsplit_once(LEGACY_SEPARATOR) {
        return RowKey::parse(tail).ok();
    }
    None
}

/// Parse a bare key or any leaf value form.
fn parse_any(value: &str) -> Option<RowKey> {
    parse_reference(value).or_else(|| RowKey::parse(value).ok())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<RowKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection from tree widget values in any supported form.
    pub fn from_leaf_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: values
                .into_iter()
                .filter_map(|value| parse_reference(value.as_ref()))
                .collect(),
        }
    }

    /// Returns true if the key was not selected before.
    pub fn select(&mut self, key: RowKey) -> bool {
        self.keys.insert(key)
    }

    pub fn deselect(&mut self, key: &RowKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.keys.contains(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.keys.iter()
    }

    /// `ROW:<key>` values for the tree widget, in key order.
    pub fn leaf_values(&self) -> Vec<String> {
        self.keys.iter().map(RowKey::leaf_value).collect()
    }

    /// Selected rows present in `lookup`, in key order. Keys that no longer
    /// resolve are skipped.
    pub fn resolve<'a>(&self, lookup: &'a LeafLookup) -> Vec<&'a Row> {
        self.keys
            .iter()
            .filter_map(|key| lookup.get_by_key(key))
            .collect()
    }

    /// Drop keys that do not resolve in `lookup`. Returns how many were dropped.
    pub fn retain_resolvable(&mut self, lookup: &LeafLookup) -> usize {
        let before = self.keys.len();
        self.keys.retain(|key| lookup.contains_key(key));
        before - self.keys.len()
    }

    /// Comma-joined sorted keys, or `None` for an empty selection.
    pub fn serialize(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        Some(
            self.keys
                .iter()
                .map(RowKey::as_str)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Inverse of [`Selection::serialize`]. Leaf values in either form are
    /// accepted too; anything else is ignored.
    pub fn deserialize(raw: &str) -> Self {
        Self {
            keys: raw.split(',').filter_map(parse_any).collect(),
        }
    }
}

impl FromIterator<RowKey> for Selection {
    fn from_iter<T: IntoIterator<Item = RowKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<RowKey> for Selection {
    fn extend<T: IntoIterator<Item = RowKey>>(&mut self, iter: T) {
        self.keys.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> RowKey {
        RowKey::parse(raw).unwrap()
    }

    #[test]
    fn empty_selection_serializes_to_none() {
        assert_eq!(Selection::new().serialize(), None);
        assert!(Selection::deserialize("").is_empty());
    }

    #[test]
    fn serialize_sorts_keys() {
        let selection: Selection = [key("ff00000000"), key("0a00000000")].into_iter().collect();
        assert_eq!(
            selection.serialize().as_deref(),
            Some("0a00000000,ff00000000")
        );
    }

    #[test]
    fn deserialize_accepts_every_reference_form() {
        let selection =
            Selection::deserialize("0a00000000, ROW:0b00000000,Cardiology/Heart/HR|0c00000000,junk");
        let keys: Vec<&str> = selection.keys().map(RowKey::as_str).collect();
        assert_eq!(keys, vec!["0a00000000", "0b00000000", "0c00000000"]);
    }

    #[test]
    fn legacy_values_are_normalized_and_deduplicated() {
        let values = normalize_leaf_values([
            "Cardiology/Heart/Heart Rate|ABCDEF0123",
            "ROW:abcdef0123",
            "Cardiology",
            "Cardiology/Heart",
            "__root__",
            "",
            "Cardiology/Heart/Heart Rate|not-a-key",
            "ROW:0123456789",
        ]);
        assert_eq!(values, vec!["ROW:abcdef0123", "ROW:0123456789"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_leaf_values(["a/b/c|0123456789", "ROW:fedcba9876"]);
        let twice = normalize_leaf_values(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn internal_node_values_do_not_select_anything() {
        let selection = Selection::from_leaf_values(["Cardiology", "Cardiology/Heart"]);
        assert!(selection.is_empty());
    }
}
