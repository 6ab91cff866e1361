//! Turn postal records into select options, and stored selections back into options.
//!
//! In grouping mode every postcode becomes a single option. The stored value of
//! such an option keeps all its cities in `city`, joined with `", "`; that is the
//! only trace of the grouping once the value has been saved.
//!
//! A real city name containing `", "` is indistinguishable from a grouped value
//! and will be shown split.

use std::collections::HashMap;

use crate::types::{DisplayOption, PostalRecord};

/// Separator between cities in a label
pub const LABEL_SEPARATOR: &str = " / ";
/// Separator between cities in a stored grouped value
pub const STORED_SEPARATOR: &str = ", ";

pub fn format_label(city_label: &str, postcode: &str) -> String {
    format!("{} ({})", city_label, postcode)
}

fn ungrouped_option(record: &PostalRecord) -> DisplayOption {
    DisplayOption {
        label: format_label(&record.city, &record.postcode),
        value: record.clone(),
    }
}

/// Options for search results.
///
/// Grouping keeps postcodes in first-seen order and cities in first-seen order
/// within each postcode, without repeats.
pub fn group_for_display(records: &[PostalRecord], group_by_postcode: bool) -> Vec<DisplayOption> {
    if !group_by_postcode {
        return records.iter().map(ungrouped_option).collect();
    }

    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.postcode.as_str()).or_insert_with(|| {
            groups.push((record.postcode.as_str(), Vec::new()));
            groups.len() - 1
        });
        let cities = &mut groups[slot].1;
        if !cities.contains(&record.city.as_str()) {
            cities.push(record.city.as_str());
        }
    }

    groups
        .into_iter()
        .map(|(postcode, cities)| DisplayOption {
            label: format_label(&cities.join(LABEL_SEPARATOR), postcode),
            value: PostalRecord::new(postcode, cities.join(STORED_SEPARATOR)),
        })
        .collect()
}

/// Options for a previously stored selection. Values are passed through untouched.
pub fn selection_for_display(records: &[PostalRecord], group_by_postcode: bool) -> Vec<DisplayOption> {
    records
        .iter()
        .map(|record| {
            if group_by_postcode && record.city.contains(STORED_SEPARATOR) {
                let cities: Vec<&str> = record
                    .city
                    .split(STORED_SEPARATOR)
                    .filter(|c| !c.is_empty())
                    .collect();
                DisplayOption {
                    label: format_label(&cities.join(LABEL_SEPARATOR), &record.postcode),
                    value: record.clone(),
                }
            } else {
                ungrouped_option(record)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn test_ungrouped_labels() {
        let options = group_for_display(
            &[record("1000", "Brussels"), record("1000", "Bruxelles")],
            false,
        );
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "Brussels (1000)");
        assert_eq!(options[1].label, "Bruxelles (1000)");
        assert_eq!(options[1].value, record("1000", "Bruxelles"));
    }

    #[test]
    fn test_grouped_by_postcode() {
        let options = group_for_display(
            &[
                record("3000", "Leuven"),
                record("1000", "Brussels"),
                record("3000", "Heverlee"),
                record("3000", "Leuven"),
            ],
            true,
        );

        assert_eq!(
            options,
            vec![
                DisplayOption {
                    label: "Leuven / Heverlee (3000)".to_string(),
                    value: record("3000", "Leuven, Heverlee"),
                },
                DisplayOption {
                    label: "Brussels (1000)".to_string(),
                    value: record("1000", "Brussels"),
                },
            ]
        );
    }

    #[test]
    fn test_stored_grouped_value_renders_split() {
        let options = selection_for_display(&[record("3000", "Leuven, Heverlee")], true);
        assert_eq!(options[0].label, "Leuven / Heverlee (3000)");
        assert_eq!(options[0].value, record("3000", "Leuven, Heverlee"));
    }

    #[test]
    fn test_stored_grouped_value_without_grouping() {
        let options = selection_for_display(&[record("3000", "Leuven, Heverlee")], false);
        assert_eq!(options[0].label, "Leuven, Heverlee (3000)");
    }

    #[test]
    fn test_stored_value_drops_empty_cities() {
        let options = selection_for_display(&[record("3000", "Leuven, , Heverlee, ")], true);
        assert_eq!(options[0].label, "Leuven / Heverlee (3000)");
    }

    #[test]
    fn test_empty_selection() {
        assert!(selection_for_display(&[], true).is_empty());
        assert!(group_for_display(&[], true).is_empty());
    }
}
