//! Facet selection model and advanced-query construction.
//!
//! Facet choices arrive from Slack as multi-select option values encoded
//! `field$value`. They are translated into an advanced-query clause per
//! configured field: OR within a field's values, AND across fields.

use crate::config::FacetField;

const OPTION_VALUE_SEPARATOR: char = '$';

/// The set of `(field, value)` pairs a user has selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FacetSelection {
    selections: Vec<(String, String)>,
}

impl FacetSelection {
    /// Parse UI option values of the form `field$value`. Values without a
    /// separator are ignored; anything after the first separator belongs to
    /// the facet value.
    pub fn from_option_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selections = values
            .into_iter()
            .filter_map(|raw| {
                raw.as_ref()
                    .split_once(OPTION_VALUE_SEPARATOR)
                    .map(|(field, value)| (field.to_owned(), value.to_owned()))
            })
            .collect();
        Self { selections }
    }

    /// The option value carried by a facet choice in the picker.
    pub fn option_value(field: &str, value: &str) -> String {
        format!("{field}{OPTION_VALUE_SEPARATOR}{value}")
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Build the advanced-query filter string. For each configured field with
    /// at least one selected value this contributes ` @field==("v1","v2")`,
    /// quoted and comma-joined; fields appear in configuration order.
    pub fn advanced_query(&self, fields: &[FacetField]) -> String {
        let mut clause = String::new();
        for field in fields {
            let values: Vec<String> = self
                .selections
                .iter()
                .filter(|(selected_field, _)| selected_field == &field.field)
                .map(|(_, value)| format!("\"{value}\""))
                .collect();
            if !values.is_empty() {
                clause.push_str(&format!(" @{}==({})", field.field, values.join(",")));
            }
        }
        clause
    }
}
