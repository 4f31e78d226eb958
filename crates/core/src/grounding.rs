//! Visual grounding helpers.
//!
//! Traceability of extracted fields back to regions of the source receipt
//! image, via the opaque chunk identifiers carried on [`ReceiptData`].
//! Chunk ids are keyed by the suffix after their last underscore; a chunk
//! id like `r2_total` grounds the `total` field.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::models::ReceiptData;

/// Grounding metadata for one extracted field.
#[derive(Debug, Clone, Serialize)]
pub struct GroundingInfo {
    pub field: String,
    pub value: String,
    pub chunk_ids: Vec<String>,
    pub confidence: f64,
    /// Normalized image coordinates, when the extractor provides them.
    pub bounding_box: Option<[f64; 4]>,
}

/// Per-field grounding metadata for every field present on the receipt.
pub fn extract_grounding(receipt: &ReceiptData) -> Vec<GroundingInfo> {
    let mut field_chunks: HashMap<String, Vec<String>> = HashMap::new();
    for chunk_id in &receipt.chunk_ids {
        if let Some((_, field)) = chunk_id.rsplit_once('_') {
            let field = field.trim().to_lowercase();
            if !field.is_empty() {
                field_chunks.entry(field).or_default().push(chunk_id.clone());
            }
        }
    }

    let fields: Vec<(&str, Option<String>)> = vec![
        ("vendor", Some(receipt.vendor.clone())),
        ("total", Some(format!("${:.2}", receipt.total))),
        ("date", receipt.date.clone()),
        ("tax", receipt.tax.map(|v| format!("${v:.2}"))),
        ("tip", receipt.tip.map(|v| format!("${v:.2}"))),
        ("subtotal", receipt.subtotal.map(|v| format!("${v:.2}"))),
    ];

    let groundings: Vec<GroundingInfo> = fields
        .into_iter()
        .filter_map(|(field, value)| {
            value.map(|value| GroundingInfo {
                field: field.to_string(),
                value,
                chunk_ids: field_chunks.get(field).cloned().unwrap_or_default(),
                confidence: receipt.confidence,
                bounding_box: None,
            })
        })
        .collect();

    debug!(
        count = groundings.len(),
        chunk_count = receipt.chunk_ids.len(),
        "grounding extracted"
    );
    groundings
}

/// Whether the receipt carries at least one grounding chunk id.
pub fn has_grounding(receipt: &ReceiptData) -> bool {
    !receipt.chunk_ids.is_empty()
}

/// Fraction of extracted fields that trace back to the receipt image.
pub fn grounding_coverage(receipt: &ReceiptData) -> f64 {
    if receipt.chunk_ids.is_empty() {
        return 0.0;
    }

    let groundings = extract_grounding(receipt);
    if groundings.is_empty() {
        return 0.0;
    }

    let grounded_fields = groundings.iter().filter(|g| !g.chunk_ids.is_empty()).count();

    // vendor + total are always present; optional fields count when set.
    let mut total_fields = 2;
    if receipt.date.is_some() {
        total_fields += 1;
    }
    if receipt.tax.is_some() {
        total_fields += 1;
    }
    if receipt.tip.is_some() {
        total_fields += 1;
    }
    if receipt.subtotal.is_some() {
        total_fields += 1;
    }

    grounded_fields as f64 / total_fields.max(1) as f64
}
