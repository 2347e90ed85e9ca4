use serde::Deserialize;
use serde_json::Value;

use scout_core::highlight::HighlightSpan;

/// One page of results from the search backend, plus the facet values the
/// backend computed for the query.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultSet {
    pub total_count: u64,
    pub duration: u64,
    pub search_uid: String,
    pub results: Vec<SearchResult>,
    pub facets: Vec<FacetOutput>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    pub title: String,
    pub excerpt: String,
    pub click_uri: String,
    pub raw: serde_json::Map<String, Value>,
    pub title_highlights: Vec<HighlightSpan>,
    pub excerpt_highlights: Vec<HighlightSpan>,
}

impl SearchResult {
    /// A raw index field rendered as display text. Strings pass through,
    /// numbers and booleans are stringified, null and absent fields are
    /// absent.
    pub fn raw_text(&self, field: &str) -> Option<String> {
        match self.raw.get(field)? {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetOutput {
    pub facet_id: String,
    pub field: String,
    pub values: Vec<FacetValue>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetValue {
    pub value: String,
    pub number_of_results: u64,
}

#[cfg(test)]
mod tests {
    use super::{ResultSet, SearchResult};

    #[test]
    fn deserializes_a_backend_response() {
        let payload = r#"{
            "totalCount": 2,
            "duration": 42,
            "searchUid": "uid-1",
            "results": [{
                "title": "Getting started",
                "excerpt": "First steps",
                "clickUri": "https://docs.example.com/start",
                "raw": {"source": "Docs", "urihash": "h1", "views": 7},
                "titleHighlights": [{"offset": 0, "length": 7}],
                "excerptHighlights": []
            }],
            "facets": [{
                "facetId": "filetype",
                "field": "filetype",
                "values": [{"value": "pdf", "numberOfResults": 2}]
            }]
        }"#;

        let results: ResultSet = serde_json::from_str(payload).expect("deserialize");
        assert_eq!(results.total_count, 2);
        assert_eq!(results.results[0].title_highlights[0].length, 7);
        assert_eq!(results.facets[0].values[0].value, "pdf");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let results: ResultSet = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(results.total_count, 0);
        assert!(results.results.is_empty());
        assert!(results.search_uid.is_empty());
    }

    #[test]
    fn raw_text_stringifies_non_string_values() {
        let result: SearchResult = serde_json::from_str(
            r#"{"raw": {"views": 7, "empty": "", "gone": null, "source": "Docs"}}"#,
        )
        .expect("deserialize");

        assert_eq!(result.raw_text("views").as_deref(), Some("7"));
        assert_eq!(result.raw_text("source").as_deref(), Some("Docs"));
        assert_eq!(result.raw_text("empty"), None);
        assert_eq!(result.raw_text("gone"), None);
        assert_eq!(result.raw_text("missing"), None);
    }
}
