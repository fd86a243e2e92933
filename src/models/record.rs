//! Typed output record.

use serde::{Deserialize, Serialize};

/// One table row parsed into typed columns.
///
/// Numeric columns that fail to parse hold zero instead of dropping the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedRecord {
    /// Nomenclature identifier (first cell)
    pub id: String,
    pub short_name: String,
    pub full_name: String,
    /// Stock on hand
    pub quantity: i64,
    pub price: f64,
    /// Standards document code
    pub code: String,
    /// Material grade
    pub grade: String,
    pub weight: f64,
}

impl TypedRecord {
    /// Column names in output order.
    pub const HEADERS: [&'static str; 8] = [
        "id",
        "short_name",
        "full_name",
        "quantity",
        "price",
        "code",
        "grade",
        "weight",
    ];

    /// Render the record as string cells in `HEADERS` order.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.short_name.clone(),
            self.full_name.clone(),
            self.quantity.to_string(),
            self.price.to_string(),
            self.code.clone(),
            self.grade.clone(),
            self.weight.to_string(),
        ]
    }
}
