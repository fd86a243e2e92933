// src/services/extractor.rs

//! Row discovery in rendered page snapshots.

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::ExtractionConfig;
use crate::services::parse_selector;

/// A row found in a page snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    pub id: String,
    /// Outer markup of the row
    pub html: String,
}

/// Finds identified rows inside the table region of a page.
pub struct RowExtractor {
    region: Selector,
    rows: Selector,
}

impl RowExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            region: parse_selector(&config.table_region)?,
            rows: parse_selector(&config.row_selector)?,
        })
    }

    /// Rows inside the table region of a full page, in document order.
    ///
    /// Rows without a usable identifier are skipped; they never abort the
    /// snapshot.
    pub fn extract(&self, page_html: &str) -> Vec<ExtractedRow> {
        let document = Html::parse_document(page_html);
        let mut found = Vec::new();

        for region in document.select(&self.region) {
            for row in region.select(&self.rows) {
                match row.value().attr("id").map(str::trim) {
                    Some(id) if !id.is_empty() => found.push(ExtractedRow {
                        id: id.to_string(),
                        html: row.html(),
                    }),
                    _ => log::debug!("Skipping row without identifier"),
                }
            }
        }
        found
    }

    /// Identifiers of all rows in a stored fragment.
    pub fn identifiers(&self, fragment_html: &str) -> Vec<String> {
        let fragment = Html::parse_fragment(fragment_html);
        fragment
            .select(&self.rows)
            .filter_map(|row| row.value().attr("id"))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}
