//! Per-dimension scoring: vendor similarity, amount proximity, date proximity.
//!
//! Each scorer normalizes BOTH sides, returns a 0-100 score, and attaches a
//! human-readable evidence string explaining the number. Evidence strings
//! travel with the candidate through diagnosis into the final explanation.

use chrono::NaiveDate;
use tracing::{debug, warn};

use ledgerlens_core::normalize::{normalize_amount, normalize_date, normalize_vendor};
use ledgerlens_core::similarity::similarity_ratio;
use ledgerlens_core::DATE_INCOMPARABLE;

/// Overall weighting: vendor descriptor mangling is the most common cause of
/// apparent mismatch, so it dominates; date is the least discriminating
/// signal because settlement delay is common and benign.
pub const VENDOR_WEIGHT: f64 = 0.40;
pub const AMOUNT_WEIGHT: f64 = 0.35;
pub const DATE_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct VendorScore {
    pub score: f64,
    pub evidence: String,
}

#[derive(Debug, Clone)]
pub struct AmountScore {
    pub score: f64,
    /// Absolute dollar difference, 2 decimals.
    pub abs_diff: f64,
    /// Difference as a percentage of the receipt total, 1 decimal.
    pub pct_diff: f64,
    pub evidence: String,
}

#[derive(Debug, Clone)]
pub struct DateScore {
    pub score: f64,
    /// Absolute calendar days; [`DATE_INCOMPARABLE`] when either side is
    /// missing or unparseable.
    pub days_apart: u32,
    pub evidence: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score vendor name similarity between receipt and bank descriptor.
pub fn score_vendor(receipt_vendor: &str, transaction_merchant: &str) -> VendorScore {
    let rv = normalize_vendor(receipt_vendor);
    let tm = normalize_vendor(transaction_merchant);

    let (score, evidence) = if rv.is_empty() && tm.is_empty() {
        (0.0, "Both vendor names are empty - cannot compare".to_string())
    } else if rv.is_empty() {
        (0.0, format!("Receipt vendor name is empty (bank: '{tm}')"))
    } else if tm.is_empty() {
        (0.0, format!("Bank merchant name is empty (receipt: '{rv}')"))
    } else if rv == tm {
        (100.0, format!("Vendor names match exactly: '{rv}'"))
    } else {
        let score = round1(similarity_ratio(&rv, &tm)).clamp(0.0, 100.0);
        let evidence = if score >= 95.0 {
            format!("Vendor names match: '{rv}' ~ '{tm}' (score: {score:.1})")
        } else if score >= 80.0 {
            format!("Vendor names similar: '{rv}' ~ '{tm}' (score: {score:.1})")
        } else if score >= 60.0 {
            format!("Vendor names differ: '{rv}' vs '{tm}' (score: {score:.1})")
        } else if score >= 40.0 {
            format!("Vendor names weakly similar: '{rv}' vs '{tm}' (score: {score:.1})")
        } else {
            format!("Vendor names unrelated: '{rv}' vs '{tm}' (score: {score:.1})")
        };
        (score, evidence)
    };

    debug!(
        receipt_raw = receipt_vendor,
        receipt_norm = %rv,
        bank_raw = transaction_merchant,
        bank_norm = %tm,
        score,
        "vendor scoring"
    );
    VendorScore { score, evidence }
}

/// Score amount proximity. The score falls linearly from 100 at an exact
/// match to 0 once the relative difference reaches 25%.
pub fn score_amount(receipt_total: f64, transaction_amount: f64) -> AmountScore {
    let receipt_value = normalize_amount(receipt_total);
    let txn_value = normalize_amount(transaction_amount);

    if receipt_value <= 0.0 {
        let abs_diff = round2(txn_value.abs());
        let result = AmountScore {
            score: 0.0,
            abs_diff,
            pct_diff: 100.0,
            evidence: format!(
                "Receipt total is $0.00 - cannot compute amount proximity (bank: ${txn_value:.2})"
            ),
        };
        debug!(
            receipt = receipt_value,
            bank = txn_value,
            score = result.score,
            abs_diff,
            "amount scoring"
        );
        return result;
    }

    let abs_diff = round2((receipt_value - txn_value).abs());
    let pct_diff = round1(abs_diff / receipt_value * 100.0);
    let score = round1(((1.0 - (abs_diff / receipt_value) / 0.25).max(0.0) * 100.0).min(100.0));

    let evidence = if abs_diff == 0.0 {
        format!("Exact amount match: ${receipt_value:.2}")
    } else {
        let diff_sign = if txn_value > receipt_value { "+" } else { "-" };
        let detail =
            format!("${receipt_value:.2} vs ${txn_value:.2} (diff: {diff_sign}${abs_diff:.2}, {pct_diff:.1}%)");
        if pct_diff <= 2.0 {
            format!("Amount very close: {detail}")
        } else if pct_diff <= 10.0 {
            format!("Amount close: {detail}")
        } else if pct_diff <= 25.0 {
            format!("Amount differs: {detail}")
        } else {
            format!("Amount significantly different: {detail}")
        }
    };

    debug!(
        receipt = receipt_value,
        bank = txn_value,
        score,
        abs_diff,
        pct_diff,
        "amount scoring"
    );
    AmountScore { score, abs_diff, pct_diff, evidence }
}

/// Score date proximity. The score falls linearly from 100 at same-day to 0
/// at 5+ days apart. A missing or unparseable side yields the incomparable
/// sentinel rather than a large day count.
pub fn score_date(receipt_date: &str, transaction_date: &str) -> DateScore {
    let rd = normalize_date(receipt_date);
    let td = normalize_date(transaction_date);

    if rd.is_empty() || td.is_empty() {
        let evidence = if rd.is_empty() && td.is_empty() {
            "Both dates are missing - cannot compare".to_string()
        } else if rd.is_empty() {
            format!("Receipt date is missing (bank: {td})")
        } else {
            format!("Bank date is missing (receipt: {rd})")
        };
        debug!(receipt_norm = %rd, bank_norm = %td, days_apart = DATE_INCOMPARABLE, "date scoring");
        return DateScore { score: 0.0, days_apart: DATE_INCOMPARABLE, evidence };
    }

    // Normalized dates are ISO formatted; a parse failure here means the
    // normalizer and this parser disagree, which we degrade, not panic, on.
    let (r_date, t_date) = match (
        NaiveDate::parse_from_str(&rd, "%Y-%m-%d"),
        NaiveDate::parse_from_str(&td, "%Y-%m-%d"),
    ) {
        (Ok(r), Ok(t)) => (r, t),
        _ => {
            warn!(receipt_norm = %rd, bank_norm = %td, "date scoring parse error");
            return DateScore {
                score: 0.0,
                days_apart: DATE_INCOMPARABLE,
                evidence: format!("Could not compare dates: {rd} vs {td}"),
            };
        }
    };

    let days_apart = (t_date - r_date).num_days().unsigned_abs() as u32;
    let score = round1((1.0 - days_apart as f64 / 5.0).max(0.0) * 100.0);

    let evidence = if days_apart == 0 {
        format!("Same date: {rd}")
    } else if days_apart <= 3 {
        let direction = if t_date > r_date { "later" } else { "earlier" };
        format!("Settlement delay: {days_apart} day(s) {direction} (receipt: {rd}, bank: {td})")
    } else if days_apart <= 7 {
        format!(
            "Date gap: {days_apart} days apart (receipt: {rd}, bank: {td}) - \
             exceeds typical 1-3 day settlement window"
        )
    } else {
        format!("Date mismatch: {days_apart} days apart (receipt: {rd}, bank: {td})")
    };

    debug!(receipt_norm = %rd, bank_norm = %td, days_apart, score, "date scoring");
    DateScore { score, days_apart, evidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── score_vendor ──────────────────────────────────────────────────────────

    #[test]
    fn vendor_exact_after_normalization_is_100() {
        let result = score_vendor("Starbucks", "Starbucks");
        assert_eq!(result.score, 100.0);
        assert!(result.evidence.contains("match exactly"));

        // Alias + store number collapse to the same normalized form.
        let result = score_vendor("Home Depot", "THE HOME DEPOT #4821");
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn vendor_alias_equivalence_scores_100() {
        let result = score_vendor("Amazon.com", "AMZN MKTP US*2K4RF");
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn vendor_descriptor_lands_in_weak_band() {
        let result = score_vendor("El Agave Mexican Restaurant", "ELAGAVE*1847 CHATT TN");
        assert!(result.score >= 40.0 && result.score < 75.0, "score was {}", result.score);
        assert!(result.evidence.contains("el agave mexican"));
        assert!(result.evidence.contains("elagave"));
    }

    #[test]
    fn vendor_unrelated_scores_low() {
        let result = score_vendor("Bob's Local Hardware", "Walmart");
        assert!(result.score < 35.0, "score was {}", result.score);

        let result = score_vendor("Starbucks", "SYSCO 4823847");
        assert!(result.score < 35.0, "score was {}", result.score);
    }

    #[test]
    fn vendor_empty_sides_score_zero() {
        assert_eq!(score_vendor("", "").score, 0.0);
        let result = score_vendor("Starbucks", "");
        assert_eq!(result.score, 0.0);
        assert!(result.evidence.contains("Bank merchant name is empty"));
        let result = score_vendor("", "Amazon");
        assert_eq!(result.score, 0.0);
        assert!(result.evidence.contains("Receipt vendor name is empty"));
    }

    #[test]
    fn vendor_equal_normalized_forms_always_score_100() {
        for (a, b) in [
            ("PP*JOHNDEEREFINAN", "JohnDeereFinan"),
            ("SQ *JOE'S PIZZA GRILL", "Joes Pizza Grill"),
            ("Café", "cafe"),
        ] {
            let result = score_vendor(a, b);
            assert_eq!(result.score, 100.0, "{a} vs {b}");
        }
    }

    // ── score_amount ──────────────────────────────────────────────────────────

    #[test]
    fn amount_exact_match_scores_100() {
        let result = score_amount(89.97, 89.97);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.abs_diff, 0.0);
        assert_eq!(result.pct_diff, 0.0);
        assert!(result.evidence.contains("Exact amount match"));
    }

    #[test]
    fn amount_score_falls_linearly_to_zero_at_25_pct() {
        // 10% off -> 60 points.
        let result = score_amount(100.0, 90.0);
        assert_eq!(result.score, 60.0);
        assert_eq!(result.abs_diff, 10.0);
        assert_eq!(result.pct_diff, 10.0);

        // 2% off -> 92 points.
        let result = score_amount(50.0, 51.0);
        assert_eq!(result.score, 92.0);

        // 30% off -> floor.
        let result = score_amount(100.0, 130.0);
        assert_eq!(result.score, 0.0);
        assert!(result.evidence.contains("significantly different"));
    }

    #[test]
    fn amount_tip_case_exceeds_linear_window() {
        // The $5.25 -> $6.83 tip case: 30.1% variance scores zero here but
        // still carries the exact differences for the classifier.
        let result = score_amount(5.25, 6.83);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.abs_diff, 1.58);
        assert_eq!(result.pct_diff, 30.1);
    }

    #[test]
    fn amount_missing_receipt_total() {
        let result = score_amount(0.0, 50.0);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.abs_diff, 50.0);
        assert_eq!(result.pct_diff, 100.0);
        assert!(result.evidence.contains("cannot compute"));
    }

    #[test]
    fn amount_evidence_shows_sign() {
        let result = score_amount(100.0, 104.0);
        assert!(result.evidence.contains("+$4.00"), "{}", result.evidence);
        let result = score_amount(100.0, 96.0);
        assert!(result.evidence.contains("-$4.00"), "{}", result.evidence);
    }

    // ── score_date ────────────────────────────────────────────────────────────

    #[test]
    fn date_same_day_scores_100() {
        let result = score_date("2026-01-12", "2026-01-12");
        assert_eq!(result.score, 100.0);
        assert_eq!(result.days_apart, 0);
        assert!(result.evidence.contains("Same date"));
    }

    #[test]
    fn date_settlement_window_scores() {
        let result = score_date("2026-01-15", "2026-01-17");
        assert_eq!(result.days_apart, 2);
        assert_eq!(result.score, 60.0);
        assert!(result.evidence.contains("Settlement delay"));
        assert!(result.evidence.contains("later"));

        let result = score_date("2026-01-17", "2026-01-15");
        assert!(result.evidence.contains("earlier"));
    }

    #[test]
    fn date_zero_at_five_days_and_beyond() {
        assert_eq!(score_date("2026-01-10", "2026-01-15").score, 0.0);
        assert_eq!(score_date("2026-01-10", "2026-01-30").score, 0.0);
    }

    #[test]
    fn date_gap_and_mismatch_evidence_bands() {
        let result = score_date("2026-01-10", "2026-01-15");
        assert!(result.evidence.contains("Date gap"));
        let result = score_date("2026-01-10", "2026-01-30");
        assert!(result.evidence.contains("Date mismatch"));
    }

    #[test]
    fn date_missing_sides_are_incomparable() {
        let result = score_date("", "2026-01-12");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.days_apart, DATE_INCOMPARABLE);

        let result = score_date("2026-01-12", "");
        assert_eq!(result.days_apart, DATE_INCOMPARABLE);

        let result = score_date("not a date", "garbage");
        assert_eq!(result.days_apart, DATE_INCOMPARABLE);
        assert!(result.evidence.contains("Both dates are missing"));
    }

    #[test]
    fn date_symmetric_in_score_and_days() {
        let ab = score_date("2026-01-10", "2026-01-13");
        let ba = score_date("2026-01-13", "2026-01-10");
        assert_eq!(ab.score, ba.score);
        assert_eq!(ab.days_apart, ba.days_apart);
    }
}
