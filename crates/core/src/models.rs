use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel for "dates incomparable" — one side missing or unparseable.
/// Distinct from "very far apart": the ranker's 3-day pre-filter lets
/// sentinel rows through so they compete on vendor and amount alone.
pub const DATE_INCOMPARABLE: u32 = 999;

/// Five archetypes describing why a receipt fails to match a bank transaction.
///
/// All archetypes can co-occur except `NoMatch`, which only ever appears
/// alone and only when no candidate cleared the ranking threshold at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchType {
    /// Vendor similarity below 80/100 while other signals may align.
    /// Typical cause: processor descriptors like "ELAGAVE*1847 CHATT TN".
    #[serde(rename = "vendor_descriptor_mismatch")]
    VendorMismatch,
    /// Posting date 1-3 days after the receipt date.
    SettlementDelay,
    /// Amount differs by no more than 25%, consistent with a tip or tax
    /// adjustment settled after the receipt was printed.
    TipTaxVariance,
    /// Candidate cleared the ranking floor but no archetype explains it.
    PartialMatch,
    /// No credible candidate in the transaction table.
    NoMatch,
}

impl MismatchType {
    /// Stable wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            MismatchType::VendorMismatch => "vendor_descriptor_mismatch",
            MismatchType::SettlementDelay => "settlement_delay",
            MismatchType::TipTaxVariance => "tip_tax_variance",
            MismatchType::PartialMatch => "partial_match",
            MismatchType::NoMatch => "no_match",
        }
    }

    /// Human-readable name for display.
    pub fn display_name(self) -> &'static str {
        match self {
            MismatchType::VendorMismatch => "Vendor Descriptor Mismatch",
            MismatchType::SettlementDelay => "Settlement Delay",
            MismatchType::TipTaxVariance => "Tip/Tax Variance",
            MismatchType::PartialMatch => "Partial Match",
            MismatchType::NoMatch => "No Match Found",
        }
    }
}

impl std::fmt::Display for MismatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("receipt field '{field}' must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("extraction confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Extracted receipt fields as produced by the extraction collaborator.
///
/// Created once at the extraction boundary, immutable afterward, and carried
/// through the whole pipeline by value. `chunk_ids` trace extracted values
/// back to regions of the source image (visual grounding); empty when the
/// extractor does not support grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptData {
    /// Vendor name exactly as printed, before any normalization.
    pub vendor: String,
    /// Final total paid, including tax and tip.
    pub total: f64,
    /// Date as printed, in whatever format it appears.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub tip: Option<f64>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Extraction certainty, 0.0 (guessed) to 1.0 (certain).
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub chunk_ids: Vec<String>,
    /// Raw OCR text, kept for debugging unexpected extractions.
    #[serde(default)]
    pub raw_text: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_confidence() -> f64 {
    1.0
}

impl ReceiptData {
    /// Minimal constructor used throughout tests and callers that only have
    /// vendor and total.
    pub fn new(vendor: impl Into<String>, total: f64) -> Self {
        ReceiptData {
            vendor: vendor.into(),
            total,
            date: None,
            tax: None,
            tip: None,
            subtotal: None,
            currency: default_currency(),
            confidence: default_confidence(),
            chunk_ids: Vec::new(),
            raw_text: None,
        }
    }

    /// Enforce the numeric invariants at an ingestion boundary.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [
            ("total", Some(self.total)),
            ("tax", self.tax),
            ("tip", self.tip),
            ("subtotal", self.subtotal),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ModelError::NegativeAmount { field, value: v });
                }
            }
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }

    pub fn has_tip(&self) -> bool {
        self.tip.is_some_and(|tip| tip > 0.0)
    }

    pub fn has_tax(&self) -> bool {
        self.tax.is_some_and(|tax| tax > 0.0)
    }

    /// Whether extraction confidence is below the warning threshold (0.8).
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < 0.8
    }

    /// Sum of tax and tip where known, for diagnosing amount variances.
    pub fn tax_tip_total(&self) -> f64 {
        self.tax.unwrap_or(0.0) + self.tip.unwrap_or(0.0)
    }
}

/// One raw row from the transaction table, before validation.
///
/// Any tabular source (CSV export, API payload) lowers into this shape.
/// The ranker drops rows with a missing merchant or amount.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRow {
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub transaction_id: Option<String>,
}

/// One bank record as posted: merchant descriptors are often abbreviated or
/// coded by the payment processor, amounts settle after tip adjustment, and
/// dates shift 1-3 business days. Those differences are exactly what the
/// diagnosis exists to explain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub merchant: String,
    /// Settled amount as posted, not the authorization amount.
    pub amount: f64,
    /// Bank posting date, not purchase date.
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// One (receipt, transaction) pairing with full scoring detail.
///
/// Constructed only by the ranker, never mutated afterward. The evidence
/// list always holds exactly three strings, in vendor → amount → date order;
/// it carries the reasoning through diagnosis into the final explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub transaction: Transaction,
    /// Vendor similarity on normalized names, 0-100.
    pub vendor_score: f64,
    /// Absolute dollar difference, always non-negative.
    pub amount_diff: f64,
    /// Difference as a percentage of the receipt total.
    pub amount_pct_diff: f64,
    /// Calendar days between receipt and posting date; 999 = incomparable.
    pub date_diff: u32,
    /// Weighted combination: vendor 40%, amount 35%, date 25%.
    pub overall_confidence: f64,
    pub evidence: Vec<String>,
}

/// Final diagnostic output of the pipeline.
///
/// `labels` is a list because mismatches compound: the bank can mangle the
/// name AND post two days late. Empty labels with a top match means a clean
/// match. `explanation` starts empty; the formatter fills it in a separate
/// pass so classification and presentation never intermix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub labels: Vec<MismatchType>,
    /// Calibrated confidence, 0-100.
    pub confidence: f64,
    /// Complete audit trail: candidate-level strings first, then rule
    /// strings, then contextual notes, in append order.
    pub evidence: Vec<String>,
    pub top_match: Option<MatchCandidate>,
    pub receipt: Option<ReceiptData>,
    #[serde(default)]
    pub explanation: String,
}

impl Diagnosis {
    /// Whether any match was found (vs NO_MATCH or no candidates).
    pub fn is_match(&self) -> bool {
        !self.labels.contains(&MismatchType::NoMatch) && self.top_match.is_some()
    }

    /// Whether this is a clean match with no mismatch labels.
    pub fn is_clean_match(&self) -> bool {
        self.labels.is_empty() && self.top_match.is_some()
    }

    /// Whether multiple mismatch types fired simultaneously.
    pub fn is_compound(&self) -> bool {
        self.labels.len() > 1
    }

    pub fn label_names(&self) -> Vec<&'static str> {
        self.labels.iter().map(|label| label.display_name()).collect()
    }

    /// Single-line summary of all labels, joined with " + ".
    pub fn label_summary(&self) -> String {
        if self.labels.is_empty() {
            return "Clean Match".to_string();
        }
        self.label_names().join(" + ")
    }
}
