//! Candidate ranking: evaluate every transaction row against one receipt.

use tracing::{debug, info, warn};

use ledgerlens_core::normalize::normalize_amount;
use ledgerlens_core::{MatchCandidate, ReceiptData, Transaction, TransactionRow, DATE_INCOMPARABLE};

use crate::score::{score_amount, score_date, score_vendor, AMOUNT_WEIGHT, DATE_WEIGHT, VENDOR_WEIGHT};

/// Rows whose dates are both present but more than this many days apart
/// cannot be the same transaction, regardless of other signals.
pub const MAX_DATE_DIFF_DAYS: u32 = 3;

/// Floor below which a "best guess" is not worth surfacing; anything under
/// it becomes NO_MATCH downstream.
pub const MIN_CONFIDENCE_THRESHOLD: f64 = 30.0;

pub const MAX_RESULTS: usize = 3;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Find the best matching transactions for a receipt.
///
/// Returns at most [`MAX_RESULTS`] candidates with overall confidence of at
/// least [`MIN_CONFIDENCE_THRESHOLD`], sorted descending (stable with
/// respect to row order on ties). Never panics; malformed rows are dropped,
/// an empty table yields an empty result.
pub fn find_matches(receipt: &ReceiptData, rows: &[TransactionRow]) -> Vec<MatchCandidate> {
    if rows.is_empty() {
        warn!("matching input: transaction table empty, returning no candidates");
        return Vec::new();
    }

    let receipt_vendor = receipt.vendor.as_str();
    let receipt_total = normalize_amount(receipt.total);
    let receipt_date = receipt.date.as_deref().unwrap_or("");

    if receipt_vendor.trim().is_empty() {
        warn!("matching receipt: vendor empty, relying on amount/date signals");
    }
    if receipt_total <= 0.0 {
        warn!("matching receipt: total zero or invalid, relying on vendor/date signals");
    }

    let valid_rows: Vec<&TransactionRow> = rows
        .iter()
        .filter(|row| {
            row.merchant.as_deref().is_some_and(|m| !m.trim().is_empty()) && row.amount.is_some()
        })
        .collect();
    let dropped_rows = rows.len() - valid_rows.len();
    if dropped_rows > 0 {
        warn!(
            dropped_rows,
            remaining_rows = valid_rows.len(),
            "matching input: dropped rows missing merchant or amount"
        );
    }
    if valid_rows.is_empty() {
        warn!("matching input: no valid rows after dropping incomplete ones");
        return Vec::new();
    }

    let mut candidates: Vec<MatchCandidate> = Vec::new();
    let mut skipped_date = 0usize;

    for row in valid_rows {
        let raw_date = row.date.as_deref().unwrap_or("").trim();
        let date = score_date(receipt_date, raw_date);
        // Pre-filter: both dates known and too far apart. Incomparable rows
        // stay in and compete on vendor + amount alone.
        if date.days_apart > MAX_DATE_DIFF_DAYS && date.days_apart != DATE_INCOMPARABLE {
            skipped_date += 1;
            debug!(merchant = row.merchant.as_deref(), days_apart = date.days_apart, "row skipped: outside date window");
            continue;
        }

        let raw_merchant = row.merchant.as_deref().unwrap_or("").trim();
        let amount_value = normalize_amount(row.amount.unwrap_or(0.0));

        let vendor = score_vendor(receipt_vendor, raw_merchant);
        let amount = score_amount(receipt_total, amount_value);

        let overall = round1(
            vendor.score * VENDOR_WEIGHT + amount.score * AMOUNT_WEIGHT + date.score * DATE_WEIGHT,
        );

        candidates.push(MatchCandidate {
            transaction: Transaction {
                merchant: raw_merchant.to_string(),
                amount: amount_value,
                date: raw_date.to_string(),
                description: row.description.clone(),
                transaction_id: row.transaction_id.clone(),
            },
            vendor_score: vendor.score,
            amount_diff: amount.abs_diff,
            amount_pct_diff: amount.pct_diff,
            date_diff: date.days_apart,
            overall_confidence: overall,
            evidence: vec![vendor.evidence, amount.evidence, date.evidence],
        });
    }

    let scored = candidates.len();
    let mut above_threshold: Vec<MatchCandidate> = candidates
        .into_iter()
        .filter(|candidate| candidate.overall_confidence >= MIN_CONFIDENCE_THRESHOLD)
        .collect();
    let below_threshold = scored - above_threshold.len();

    // sort_by is stable, so equal confidences keep their row order.
    above_threshold.sort_by(|a, b| {
        b.overall_confidence
            .partial_cmp(&a.overall_confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    above_threshold.truncate(MAX_RESULTS);

    info!(
        candidates_scored = scored,
        above_threshold = above_threshold.len(),
        skipped_date,
        filtered_below_threshold = below_threshold,
        top_confidence = above_threshold.first().map(|c| c.overall_confidence).unwrap_or(0.0),
        receipt_vendor,
        "matching complete"
    );

    if let Some(top) = above_threshold.first() {
        info!(
            merchant = %top.transaction.merchant,
            confidence = top.overall_confidence,
            vendor_score = top.vendor_score,
            amount_diff = top.amount_diff,
            date_diff = top.date_diff,
            "matching top candidate"
        );
    } else {
        info!("matching top candidate: none above threshold");
    }

    above_threshold
}
