use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, FanDataset};

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// A column absent from the map is unconstrained; an empty set hides everything.
pub type FilterState = BTreeMap<String, BTreeSet<CellValue>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(dataset: &FanDataset) -> FilterState {
    dataset
        .unique_values
        .iter()
        .map(|(col, vals)| (col.clone(), vals.clone()))
        .collect()
}

/// Return indices of fans that pass all active filters.
///
/// A fan passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The fan's value for that column is in the selected set → passes
pub fn filtered_indices(dataset: &FanDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .fans
        .iter()
        .enumerate()
        .filter(|(_, fan)| {
            filters.iter().all(|(col, selected)| {
                if selected.is_empty() {
                    return false;
                }
                // every value selected → no effective filter
                if dataset
                    .unique_values
                    .get(col)
                    .is_some_and(|all| selected.len() == all.len())
                {
                    return true;
                }
                let value = fan.attribute(col).unwrap_or(CellValue::Null);
                selected.contains(&value)
            })
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::fan;
    use crate::data::model::{CHANNEL, CLUSTER};

    fn dataset() -> FanDataset {
        let mut web = fan("c", "2", 5.0);
        web.channel = "web".to_string();
        FanDataset::from_fans(vec![fan("a", "1", 1.0), fan("b", "2", 2.0), web])
    }

    #[test]
    fn everything_selected_shows_everything() {
        let ds = dataset();
        let filters = init_filter_state(&ds);
        assert_eq!(filtered_indices(&ds, &filters), vec![0, 1, 2]);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let ds = dataset();
        let mut filters = init_filter_state(&ds);
        filters.insert(CHANNEL.to_string(), BTreeSet::new());
        assert!(filtered_indices(&ds, &filters).is_empty());
    }

    #[test]
    fn columns_combine_with_and() {
        let ds = dataset();
        let mut filters = init_filter_state(&ds);
        filters.insert(
            CLUSTER.to_string(),
            BTreeSet::from([CellValue::Text("2".into())]),
        );
        assert_eq!(filtered_indices(&ds, &filters), vec![1, 2]);

        filters.insert(
            CHANNEL.to_string(),
            BTreeSet::from([CellValue::Text("web".into())]),
        );
        assert_eq!(filtered_indices(&ds, &filters), vec![2]);
    }

    #[test]
    fn unknown_column_matches_only_null() {
        let ds = dataset();
        let mut filters = FilterState::new();
        filters.insert("churn".to_string(), BTreeSet::from([CellValue::Text("x".into())]));
        assert!(filtered_indices(&ds, &filters).is_empty());
        filters.insert("churn".to_string(), BTreeSet::from([CellValue::Null]));
        assert_eq!(filtered_indices(&ds, &filters).len(), 3);
    }
}
