//! Keyword-highlight application.
//!
//! The search backend returns highlight spans as `{offset, length}` pairs over
//! the plain-text field, sorted ascending and non-overlapping. Rendering wraps
//! each span in `*` markers for Slack mrkdwn emphasis. Each applied span
//! inserts two characters, so a running shift keeps later spans anchored to
//! the right positions.

use serde::Deserialize;

/// A highlighted region of the original (pre-insertion) string. Offsets count
/// characters, not bytes.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct HighlightSpan {
    pub offset: usize,
    pub length: usize,
}

const MARKER: char = '*';

/// Wrap every span of `text` in emphasis markers. A single left-to-right pass;
/// spans must already be in ascending offset order. Out-of-range spans clamp
/// to the end of the string rather than failing the whole render.
pub fn apply_highlights(text: &str, spans: &[HighlightSpan]) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let mut shift = 0usize;

    for span in spans {
        let open = (span.offset + shift).min(chars.len());
        chars.insert(open, MARKER);
        let close = (span.offset + span.length + shift + 1).min(chars.len());
        chars.insert(close, MARKER);
        shift += 2;
    }

    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{apply_highlights, HighlightSpan};

    #[test]
    fn single_span_wraps_the_keyword() {
        let spans = [HighlightSpan { offset: 0, length: 5 }];
        assert_eq!(apply_highlights("hello world", &spans), "*hello* world");
    }

    #[test]
    fn later_spans_account_for_earlier_insertions() {
        let spans = [
            HighlightSpan { offset: 0, length: 5 },
            HighlightSpan { offset: 6, length: 5 },
        ];
        assert_eq!(apply_highlights("hello world", &spans), "*hello* *world*");
    }

    #[test]
    fn mid_string_span_keeps_surrounding_text() {
        let spans = [HighlightSpan { offset: 4, length: 2 }];
        assert_eq!(apply_highlights("the icon set", &spans), "the *ic*on set");
    }

    #[test]
    fn out_of_range_span_clamps_to_the_end() {
        let spans = [HighlightSpan { offset: 40, length: 5 }];
        assert_eq!(apply_highlights("short", &spans), "short**");
    }

    #[test]
    fn no_spans_returns_the_text_unchanged() {
        assert_eq!(apply_highlights("plain", &[]), "plain");
    }

    #[test]
    fn multibyte_text_is_counted_in_characters() {
        let spans = [HighlightSpan { offset: 0, length: 4 }];
        assert_eq!(apply_highlights("café menu", &spans), "*café* menu");
    }
}
