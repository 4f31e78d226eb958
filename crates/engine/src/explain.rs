//! Human-readable and JSON-ready diagnosis formatting.
//!
//! Converts a structured [`Diagnosis`] into terminal-friendly text for CLI
//! usage and a machine-friendly JSON value for APIs, logging, and storage.

use serde_json::{json, Value};
use tracing::error;

use ledgerlens_core::grounding::{extract_grounding, grounding_coverage, has_grounding};
use ledgerlens_core::{Diagnosis, MismatchType};

const OUTPUT_WIDTH: usize = 56;
const MAX_EVIDENCE_DISPLAY: usize = 8;

fn separator() -> String {
    "=".repeat(OUTPUT_WIDTH)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a diagnosis into a clean, human-readable text block.
pub fn format_explanation(diagnosis: Option<&Diagnosis>) -> String {
    let sep = separator();
    let Some(diagnosis) = diagnosis else {
        error!(fallback = "error_block", "explanation input missing");
        return format!("\n{sep}\n  ERROR: No diagnosis data available\n{sep}\n");
    };

    let mut lines: Vec<String> = vec![String::new()];

    let header = if diagnosis.labels.contains(&MismatchType::NoMatch) {
        "NO MATCH FOUND".to_string()
    } else if diagnosis.is_clean_match() {
        format!("Match Found - {:.0}%", diagnosis.confidence)
    } else {
        let status = if diagnosis.confidence >= 80.0 {
            "Probable Match"
        } else if diagnosis.confidence >= 50.0 {
            "Possible Match"
        } else {
            "Weak Match"
        };
        format!("{status} - {:.0}%", diagnosis.confidence)
    };

    lines.push(sep.clone());
    lines.push(format!("  {header}"));
    lines.push(sep.clone());

    lines.push(String::new());
    if let Some(receipt) = &diagnosis.receipt {
        lines.push(format!("  Receipt:      {}", receipt.vendor));
        lines.push(format!(
            "                ${:.2}  |  {}",
            receipt.total,
            receipt.date.as_deref().filter(|d| !d.is_empty()).unwrap_or("date unknown")
        ));
    } else {
        lines.push("  Receipt:      (no receipt data available)".to_string());
    }

    if let Some(top) = diagnosis
        .top_match
        .as_ref()
        .filter(|_| !diagnosis.labels.contains(&MismatchType::NoMatch))
    {
        lines.push(String::new());
        lines.push(format!("  Best Match:   {}", top.transaction.merchant));
        lines.push(format!(
            "                ${:.2}  |  {}",
            top.transaction.amount,
            if top.transaction.date.is_empty() { "date unknown" } else { &top.transaction.date }
        ));
    }

    lines.push(String::new());
    lines.push("  Evidence:".to_string());

    if diagnosis.evidence.is_empty() {
        lines.push("    • (no evidence recorded)".to_string());
    } else if diagnosis.evidence.len() <= MAX_EVIDENCE_DISPLAY {
        for evidence in &diagnosis.evidence {
            lines.push(format!("    • {evidence}"));
        }
    } else {
        for evidence in &diagnosis.evidence[..MAX_EVIDENCE_DISPLAY - 1] {
            lines.push(format!("    • {evidence}"));
        }
        let remaining = diagnosis.evidence.len() - (MAX_EVIDENCE_DISPLAY - 1);
        lines.push(format!("    • ... and {remaining} more evidence item(s)"));
    }

    if let Some(receipt) = &diagnosis.receipt {
        if has_grounding(receipt) {
            let coverage = grounding_coverage(receipt);
            if coverage > 0.0 {
                lines.push(String::new());
                lines.push(format!(
                    "  Grounding: {:.0}% of fields traced to receipt image",
                    coverage * 100.0
                ));
            }
        }
    }

    lines.push(String::new());
    if diagnosis.is_clean_match() {
        lines.push("  Diagnosis: Clean Match - No Exception".to_string());
    } else if !diagnosis.labels.is_empty() {
        lines.push(format!("  Diagnosis: {}", diagnosis.label_summary()));
    } else {
        lines.push("  Diagnosis: Unclassified".to_string());
    }

    if let Some(receipt) = diagnosis.receipt.as_ref().filter(|r| r.is_low_confidence()) {
        lines.push(String::new());
        lines.push(format!(
            "  WARNING: Low extraction confidence ({:.0}%)",
            receipt.confidence * 100.0
        ));
        lines.push("    Receipt may be blurry or damaged. Verify extracted values manually.".to_string());
    }

    if diagnosis.evidence.iter().any(|e| e.to_lowercase().contains("second candidate")) {
        lines.push(String::new());
        lines.push("  WARNING: Multiple close candidates detected".to_string());
        lines.push("    Runner-up candidate scored close to top match. Review manually.".to_string());
    }

    lines.push(String::new());
    lines.push(sep);
    lines.push(String::new());
    lines.join("\n")
}

/// Format a diagnosis as a structured JSON value.
pub fn format_explanation_json(diagnosis: Option<&Diagnosis>) -> Value {
    let Some(diagnosis) = diagnosis else {
        error!(fallback = "error_payload", "explanation input missing");
        return json!({
            "status": "error",
            "confidence": 0.0,
            "diagnosis": {
                "labels": [],
                "label_names": [],
                "label_summary": "Error",
                "is_compound": false,
                "is_clean_match": false,
            },
            "evidence": ["No diagnosis data available"],
            "receipt": Value::Null,
            "top_match": Value::Null,
            "warnings": ["Diagnosis object was None"],
        });
    };

    let status = if diagnosis.labels.contains(&MismatchType::NoMatch) {
        "no_match"
    } else if diagnosis.is_clean_match() {
        "clean_match"
    } else {
        "match_found"
    };

    let diagnosis_section = json!({
        "labels": diagnosis.labels.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        "label_names": diagnosis.label_names(),
        "label_summary": diagnosis.label_summary(),
        "is_compound": diagnosis.is_compound(),
        "is_clean_match": diagnosis.is_clean_match(),
    });

    let receipt_section = diagnosis.receipt.as_ref().map(|receipt| {
        let grounding = serde_json::to_value(extract_grounding(receipt))
            .unwrap_or_else(|_| Value::Array(Vec::new()));
        json!({
            "vendor": receipt.vendor,
            "total": receipt.total,
            "date": receipt.date,
            "tax": receipt.tax,
            "tip": receipt.tip,
            "subtotal": receipt.subtotal,
            "confidence": receipt.confidence,
            "is_low_confidence": receipt.is_low_confidence(),
            "chunk_ids": receipt.chunk_ids,
            "grounding_coverage": round2(grounding_coverage(receipt)),
            "grounding": grounding,
        })
    });

    let top_match_section = diagnosis.top_match.as_ref().map(|top| {
        json!({
            "merchant": top.transaction.merchant,
            "amount": top.transaction.amount,
            "date": top.transaction.date,
            "transaction_id": top.transaction.transaction_id,
            "description": top.transaction.description,
            "scores": {
                "vendor_score": round1(top.vendor_score),
                "amount_diff": round2(top.amount_diff),
                "amount_pct_diff": round1(top.amount_pct_diff),
                "date_diff": top.date_diff,
                "overall_confidence": round1(top.overall_confidence),
            },
            "evidence": top.evidence,
        })
    });

    let mut warnings: Vec<String> = Vec::new();
    if let Some(receipt) = diagnosis.receipt.as_ref().filter(|r| r.is_low_confidence()) {
        warnings.push(format!(
            "Low extraction confidence ({:.0}%). Verify extracted values manually.",
            receipt.confidence * 100.0
        ));
    }

    json!({
        "status": status,
        "confidence": round1(diagnosis.confidence),
        "diagnosis": diagnosis_section,
        "evidence": diagnosis.evidence,
        "receipt": receipt_section,
        "top_match": top_match_section,
        "warnings": warnings,
    })
}
