//! Raw captured markup.

use serde::{Deserialize, Serialize};

/// Offset into the scrollable viewport, in pixels.
pub type ScrollPosition = u64;

/// Markup of the rows newly discovered at one scroll position.
///
/// Two fragments are equal only when both the position and the markup match;
/// the master store deduplicates on this full-row equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawFragment {
    pub position: ScrollPosition,
    pub html_content: String,
}

impl RawFragment {
    /// Wrap row markup in a `<table>` so it parses back as table rows.
    pub fn from_rows(position: ScrollPosition, rows: &[String]) -> Self {
        Self {
            position,
            html_content: format!("<table>{}</table>", rows.concat()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_wraps_in_table() {
        let fragment = RawFragment::from_rows(
            800,
            &[
                r#"<tr id="a"><td>1</td></tr>"#.to_string(),
                r#"<tr id="b"><td>2</td></tr>"#.to_string(),
            ],
        );
        assert_eq!(fragment.position, 800);
        assert_eq!(
            fragment.html_content,
            r#"<table><tr id="a"><td>1</td></tr><tr id="b"><td>2</td></tr></table>"#
        );
    }

    #[test]
    fn test_serialized_column_names() {
        let fragment = RawFragment::from_rows(0, &[]);
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["position"], 0);
        assert_eq!(json["html_content"], "<table></table>");
    }
}
