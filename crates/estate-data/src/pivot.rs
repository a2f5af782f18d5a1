//! Long ⇄ wide reshaping.
//!
//! [`Pivoter::pivot`] turns `(key, category, value)` triples into one row per
//! key with one column per category; [`Pivoter::melt`] goes the other way.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

/// One row of a [`WideTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub key: String,
    /// One cell per category, aligned with [`WideTable::categories`].
    pub values: Vec<Option<f64>>,
}

/// Key column plus one numeric column per category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideTable {
    pub key_column: String,
    pub categories: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn new(key_column: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            key_column: key_column.into(),
            categories,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Keep only rows whose key is in `keys`; `None` keeps everything.
    pub fn filter_keys(&self, keys: Option<&[String]>) -> WideTable {
        let Some(keys) = keys.filter(|k| !k.is_empty()) else {
            return self.clone();
        };
        WideTable {
            key_column: self.key_column.clone(),
            categories: self.categories.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keys.contains(&row.key))
                .cloned()
                .collect(),
        }
    }

    /// Keep only the categories accepted by `keep`, in their current order.
    pub fn select_categories(&self, keep: impl Fn(&str) -> bool) -> WideTable {
        let indices: Vec<usize> = self
            .categories
            .iter()
            .enumerate()
            .filter(|(_, c)| keep(c))
            .map(|(i, _)| i)
            .collect();
        WideTable {
            key_column: self.key_column.clone(),
            categories: indices.iter().map(|&i| self.categories[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| WideRow {
                    key: row.key.clone(),
                    values: indices.iter().map(|&i| row.values[i]).collect(),
                })
                .collect(),
        }
    }
}

/// One `(key, category, value)` triple of a long table.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub key: String,
    pub category: String,
    pub value: Option<f64>,
}

// ── Pivoter ───────────────────────────────────────────────────────────────────

/// Stateless reshaping helper.
pub struct Pivoter;

impl Pivoter {
    /// Pivot long triples into a wide table keyed by `key_column`.
    ///
    /// Rows are sorted by key (`K`'s ordering), categories keep the order in
    /// which they first appear anywhere in `long`, and absent
    /// `(key, category)` pairs are filled with `0`. Repeated pairs are summed.
    pub fn pivot<K, I>(long: I, key_column: &str) -> WideTable
    where
        K: Ord + Display,
        I: IntoIterator<Item = (K, String, f64)>,
    {
        let mut categories: Vec<String> = Vec::new();
        let mut category_index: HashMap<String, usize> = HashMap::new();
        let mut cells: BTreeMap<K, HashMap<usize, f64>> = BTreeMap::new();

        for (key, category, value) in long {
            let idx = *category_index.entry(category.clone()).or_insert_with(|| {
                categories.push(category);
                categories.len() - 1
            });
            *cells.entry(key).or_default().entry(idx).or_insert(0.0) += value;
        }

        let width = categories.len();
        let rows = cells
            .into_iter()
            .map(|(key, by_category)| WideRow {
                key: key.to_string(),
                values: (0..width)
                    .map(|i| Some(by_category.get(&i).copied().unwrap_or(0.0)))
                    .collect(),
            })
            .collect();

        WideTable {
            key_column: key_column.to_string(),
            categories,
            rows,
        }
    }

    /// Unpivot every category column of `wide` into long rows, column by
    /// column (all keys of the first category, then the next, ...).
    pub fn melt(wide: &WideTable) -> Vec<LongRow> {
        let mut long = Vec::with_capacity(wide.rows.len() * wide.categories.len());
        for (idx, category) in wide.categories.iter().enumerate() {
            for row in &wide.rows {
                long.push(LongRow {
                    key: row.key.clone(),
                    category: category.clone(),
                    value: row.values.get(idx).copied().flatten(),
                });
            }
        }
        long
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(key: &str, cat: &str, value: f64) -> (String, String, f64) {
        (key.to_string(), cat.to_string(), value)
    }

    #[test]
    fn test_pivot_fills_absent_pairs_with_zero() {
        let wide = Pivoter::pivot(
            vec![triple("M1", "A", 5.0), triple("M1", "B", 3.0), triple("M2", "A", 2.0)],
            "년월",
        );
        assert_eq!(wide.key_column, "년월");
        assert_eq!(wide.categories, vec!["A", "B"]);
        assert_eq!(
            wide.rows,
            vec![
                WideRow { key: "M1".into(), values: vec![Some(5.0), Some(3.0)] },
                WideRow { key: "M2".into(), values: vec![Some(2.0), Some(0.0)] },
            ]
        );
    }

    #[test]
    fn test_pivot_category_order_is_first_seen() {
        let wide = Pivoter::pivot(
            vec![triple("M2", "서울", 1.0), triple("M1", "부산", 1.0), triple("M1", "서울", 1.0)],
            "년월",
        );
        assert_eq!(wide.categories, vec!["서울", "부산"]);
        // Rows still sorted by key.
        assert_eq!(wide.rows[0].key, "M1");
        assert_eq!(wide.rows[0].values, vec![Some(1.0), Some(1.0)]);
        assert_eq!(wide.rows[1].values, vec![Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_pivot_numeric_keys_sort_numerically() {
        let wide = Pivoter::pivot(
            vec![(2021, "A".to_string(), 1.0), (999, "A".to_string(), 2.0)],
            "년도",
        );
        let keys: Vec<&str> = wide.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["999", "2021"]);
    }

    #[test]
    fn test_pivot_sums_repeated_pairs() {
        let wide = Pivoter::pivot(vec![triple("M1", "A", 1.5), triple("M1", "A", 2.0)], "k");
        assert_eq!(wide.rows[0].values, vec![Some(3.5)]);
    }

    #[test]
    fn test_pivot_empty_input() {
        let wide = Pivoter::pivot(Vec::<(String, String, f64)>::new(), "년월");
        assert!(wide.is_empty());
        assert!(wide.categories.is_empty());
    }

    #[test]
    fn test_melt_column_major() {
        let wide = WideTable {
            key_column: "시도".into(),
            categories: vec!["1월".into(), "2월".into()],
            rows: vec![
                WideRow { key: "서울".into(), values: vec![Some(10.0), None] },
                WideRow { key: "부산".into(), values: vec![Some(5.0), Some(6.0)] },
            ],
        };
        let long = Pivoter::melt(&wide);
        let flat: Vec<(&str, &str, Option<f64>)> = long
            .iter()
            .map(|r| (r.key.as_str(), r.category.as_str(), r.value))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("서울", "1월", Some(10.0)),
                ("부산", "1월", Some(5.0)),
                ("서울", "2월", None),
                ("부산", "2월", Some(6.0)),
            ]
        );
    }

    #[test]
    fn test_filter_and_select() {
        let wide = WideTable {
            key_column: "시도".into(),
            categories: vec!["1월_호수".into(), "1월_면적".into()],
            rows: vec![
                WideRow { key: "서울".into(), values: vec![Some(1.0), Some(2.0)] },
                WideRow { key: "부산".into(), values: vec![Some(3.0), Some(4.0)] },
            ],
        };
        let filtered = wide.filter_keys(Some(&["부산".to_string()]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].key, "부산");

        let unfiltered = wide.filter_keys(None);
        assert_eq!(unfiltered.len(), 2);

        let areas = wide.select_categories(|c| c.contains("_면적"));
        assert_eq!(areas.categories, vec!["1월_면적"]);
        assert_eq!(areas.rows[1].values, vec![Some(4.0)]);
    }
}
