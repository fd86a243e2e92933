// src/services/transformer.rs

//! Parses stored fragments into typed records.

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{ExtractionConfig, RawFragment, TypedRecord};
use crate::services::parse_selector;

/// Turns fragment rows into [`TypedRecord`]s.
pub struct RecordTransformer {
    rows: Selector,
    cells: Selector,
    text: Selector,
    min_cells: usize,
}

impl RecordTransformer {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            rows: parse_selector(&config.row_selector)?,
            cells: parse_selector(&config.cell_selector)?,
            text: parse_selector(&config.text_selector)?,
            min_cells: config.min_cells,
        })
    }

    /// Parse every row of every fragment, in order.
    pub fn transform(&self, fragments: &[RawFragment]) -> Vec<TypedRecord> {
        let mut records = Vec::new();
        let mut skipped = 0;

        for fragment in fragments {
            let html = Html::parse_fragment(&fragment.html_content);
            for row in html.select(&self.rows) {
                match self.parse_row(row) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            log::debug!(
                "Skipped {} row(s) with fewer than {} cells",
                skipped,
                self.min_cells
            );
        }
        records
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<TypedRecord> {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cells).collect();
        if cells.len() < self.min_cells.max(TypedRecord::HEADERS.len()) {
            return None;
        }

        let price = self.inner_text(cells[4]);
        Some(TypedRecord {
            id: cell_text(cells[0]),
            short_name: self.inner_text(cells[1]).unwrap_or_default(),
            full_name: self.inner_text(cells[2]).unwrap_or_default(),
            quantity: parse_int(&cell_text(cells[3])),
            price: parse_price(price.as_deref().unwrap_or("0")),
            code: cell_text(cells[5]),
            grade: cell_text(cells[6]),
            weight: parse_float(&cell_text(cells[7])),
        })
    }

    /// Text of the display element nested in a cell, if present.
    fn inner_text(&self, cell: ElementRef<'_>) -> Option<String> {
        cell.select(&self.text)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Integer cell, `0` when unparsable.
pub fn parse_int(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

/// Decimal cell, `0.0` when unparsable.
pub fn parse_float(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Price cell with a decimal comma, `0.0` when unparsable.
pub fn parse_price(s: &str) -> f64 {
    parse_float(&s.replace(',', "."))
}
