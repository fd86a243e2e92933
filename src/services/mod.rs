//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Row discovery in rendered pages (`RowExtractor`)
//! - Identifier deduplication (`SeenIndex`)
//! - Fragment buffering between flushes (`BatchBuffer`)
//! - Typed record parsing (`RecordTransformer`)

mod buffer;
mod extractor;
mod index;
mod transformer;

pub use buffer::BatchBuffer;
pub use extractor::{ExtractedRow, RowExtractor};
pub use index::SeenIndex;
pub use transformer::RecordTransformer;

use scraper::Selector;

use crate::error::{AppError, Result};

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
