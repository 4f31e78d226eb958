//! Deterministic mismatch classification rules.
//!
//! Converts ranked match candidates into a final [`Diagnosis`].

use tracing::{debug, info, warn};

use ledgerlens_core::{Diagnosis, MatchCandidate, MismatchType, ReceiptData, DATE_INCOMPARABLE};

// -- Classification thresholds --

/// Vendor similarity score (0-100) at or above which vendors are considered
/// matching. At 80, "starbucks" vs "starbucks" (100) matches while
/// "el agave mexican" vs "elagave" does not. Lower toward 70 for lenient
/// matching, raise toward 90 for strict.
pub const VENDOR_MATCH_THRESHOLD: f64 = 80.0;

/// Maximum date difference in days treated as a settlement delay. 1-3 is the
/// standard credit card settlement window; 5 would cover holiday weekends.
pub const SETTLEMENT_MAX_DAYS: u32 = 3;

/// Maximum percentage difference attributable to tip/tax variance.
/// At 25%, a $100 receipt with a $125 bank charge is within threshold and
/// $130 is not. A 20% tip on top of 10% tax lands at 30.1% and exceeds this;
/// restaurant-heavy data may want 35.
pub const TIP_TAX_MAX_PCT: f64 = 25.0;

/// Percentage difference at or below which amounts count as matching, i.e.
/// amount is not a source of mismatch.
pub const AMOUNT_CLOSE_THRESHOLD: f64 = 2.0;

/// Days difference at which dates count as matching. 0 means only same-day;
/// at 1, one-day differences would no longer fire SETTLEMENT_DELAY.
pub const DATE_CLOSE_THRESHOLD: u32 = 0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Calibrate final confidence with extraction quality and ambiguity signals.
fn calibrate_confidence(
    match_confidence: f64,
    receipt: Option<&ReceiptData>,
    num_matches: usize,
    labels: &[MismatchType],
) -> f64 {
    let mut adjusted = match_confidence;

    if let Some(receipt) = receipt {
        if receipt.is_low_confidence() {
            let penalty = ((0.8 - receipt.confidence) * 30.0).clamp(0.0, 15.0);
            adjusted -= penalty;
            debug!(
                factor = "extraction_quality",
                penalty,
                receipt_confidence = receipt.confidence,
                "confidence calibration"
            );
        }
    }

    if num_matches >= 3 {
        adjusted -= 5.0;
        debug!(factor = "ambiguity", num_matches, penalty = 5.0, "confidence calibration");
    } else if num_matches == 2 {
        adjusted -= 2.0;
        debug!(factor = "ambiguity", num_matches, penalty = 2.0, "confidence calibration");
    }

    if labels.len() >= 3 {
        adjusted -= 3.0;
        debug!(factor = "compound_complexity", labels = labels.len(), penalty = 3.0, "confidence calibration");
    } else if labels.len() == 2 {
        adjusted -= 1.0;
        debug!(factor = "compound_complexity", labels = labels.len(), penalty = 1.0, "confidence calibration");
    }

    if receipt.is_some() && labels.is_empty() && adjusted >= 80.0 {
        adjusted += 3.0;
        debug!(factor = "clean_bonus", bonus = 3.0, "confidence calibration");
    }

    let calibrated = round1(adjusted).clamp(0.0, 100.0);
    debug!(
        raw = match_confidence,
        calibrated,
        num_matches,
        labels = ?labels,
        "confidence calibration"
    );
    calibrated
}

/// Classify the mismatch type from ranked candidates.
///
/// An empty candidate list yields NO_MATCH at fixed 95% confidence.
/// Otherwise the vendor, settlement-delay, and tip/tax rules are evaluated
/// independently against the top candidate and can stack into a compound
/// diagnosis; if none fires, the result is a clean match or PARTIAL_MATCH
/// depending on whether the overall confidence clears 80%.
pub fn diagnose(matches: &[MatchCandidate], receipt: Option<&ReceiptData>) -> Diagnosis {
    if matches.is_empty() {
        info!(case = "no_match", reason = "no candidates available", "diagnosis");
        let mut evidence = vec![
            "No transactions in the CSV scored above the 30% confidence threshold.".to_string(),
        ];
        if let Some(date) = receipt.and_then(|r| r.date.as_deref()) {
            evidence.push(format!(
                "Receipt dated {date} - verify that transactions from this date range are \
                 included in the CSV."
            ));
        }
        evidence.push(
            "Possible causes: transaction not yet posted by the bank, transaction in a \
             different account, or receipt doesn't belong to this transaction set."
                .to_string(),
        );
        return Diagnosis {
            labels: vec![MismatchType::NoMatch],
            confidence: 95.0,
            evidence,
            top_match: None,
            receipt: receipt.cloned(),
            explanation: String::new(),
        };
    }

    let top = &matches[0];
    let mut labels: Vec<MismatchType> = Vec::new();
    let mut diagnosis_evidence: Vec<String> = Vec::new();

    let vendor_matches = top.vendor_score >= VENDOR_MATCH_THRESHOLD;
    let amount_matches = top.amount_pct_diff <= AMOUNT_CLOSE_THRESHOLD;
    let date_matches = top.date_diff == DATE_CLOSE_THRESHOLD;

    debug!(
        vendor_matches,
        vendor_score = top.vendor_score,
        amount_matches,
        amount_pct_diff = top.amount_pct_diff,
        date_matches,
        date_diff = top.date_diff,
        "diagnosis signals"
    );

    // -- Check 1: VENDOR_MISMATCH --
    if !vendor_matches {
        labels.push(MismatchType::VendorMismatch);
        let receipt_vendor = receipt.map(|r| r.vendor.as_str()).unwrap_or("unknown");
        diagnosis_evidence.push(format!(
            "Vendor descriptor mismatch: names scored {:.1}/100 (threshold: {:.0}). \
             Receipt vendor '{}' does not closely match bank descriptor '{}' - likely \
             abbreviated or coded by payment processor.",
            top.vendor_score, VENDOR_MATCH_THRESHOLD, receipt_vendor, top.transaction.merchant
        ));
        info!(
            rule = "vendor_mismatch",
            vendor_score = top.vendor_score,
            threshold = VENDOR_MATCH_THRESHOLD,
            "diagnosis rule fired"
        );
    }

    // -- Check 2: SETTLEMENT_DELAY --
    if !date_matches && (1..=SETTLEMENT_MAX_DAYS).contains(&top.date_diff) {
        labels.push(MismatchType::SettlementDelay);
        diagnosis_evidence.push(format!(
            "Settlement delay: {} day(s) between receipt date and bank posting date. \
             Credit card transactions typically settle in 1-{} business days, so this \
             delay is within the normal range.",
            top.date_diff, SETTLEMENT_MAX_DAYS
        ));
        info!(
            rule = "settlement_delay",
            date_diff = top.date_diff,
            threshold_max = SETTLEMENT_MAX_DAYS,
            "diagnosis rule fired"
        );
    }

    // -- Check 3: TIP_TAX_VARIANCE --
    if !amount_matches && top.amount_pct_diff <= TIP_TAX_MAX_PCT {
        labels.push(MismatchType::TipTaxVariance);
        let base_evidence = format!(
            "Amount variance of ${:.2} ({:.1}%) is within the {:.0}% threshold for \
             tip/tax variance.",
            top.amount_diff, top.amount_pct_diff, TIP_TAX_MAX_PCT
        );
        let mut context_parts: Vec<String> = Vec::new();

        if let Some(receipt) = receipt {
            if let Some(tip) = receipt.tip.filter(|_| receipt.has_tip()) {
                context_parts.push(format!("Receipt includes a ${tip:.2} tip."));
            }
            if let Some(tax) = receipt.tax.filter(|_| receipt.has_tax()) {
                if (top.amount_diff - tax).abs() < 1.0 {
                    context_parts.push(format!(
                        "Difference (${:.2}) is close to the receipt tax amount (${:.2}).",
                        top.amount_diff, tax
                    ));
                }
            }
            if top.transaction.amount > receipt.total {
                context_parts.push(
                    "Bank charged more than receipt total - consistent with tip added \
                     after receipt was printed."
                        .to_string(),
                );
            } else if top.transaction.amount < receipt.total {
                context_parts.push(
                    "Bank charged less than receipt total - possible discount, partial \
                     refund, or pre-tip authorization."
                        .to_string(),
                );
            }
        }

        if context_parts.is_empty() {
            diagnosis_evidence.push(format!(
                "{base_evidence} Consistent with tip, tax adjustment, or rounding difference."
            ));
        } else {
            diagnosis_evidence.push(format!("{base_evidence} {}", context_parts.join(" ")));
        }

        info!(
            rule = "tip_tax_variance",
            amount_diff = top.amount_diff,
            amount_pct_diff = top.amount_pct_diff,
            threshold_max = TIP_TAX_MAX_PCT,
            "diagnosis rule fired"
        );
    }

    // -- Post-check: no archetype triggered --
    if labels.is_empty() {
        if top.overall_confidence >= 80.0 {
            diagnosis_evidence.push(
                "All signals align - vendor, amount, and date all match within thresholds. \
                 This appears to be a clean match with no accounting exception."
                    .to_string(),
            );
            info!(
                case = "clean_match",
                confidence = top.overall_confidence,
                vendor_score = top.vendor_score,
                amount_pct_diff = top.amount_pct_diff,
                date_diff = top.date_diff,
                "diagnosis"
            );
        } else {
            labels.push(MismatchType::PartialMatch);
            let mut contributing_factors: Vec<String> = Vec::new();

            if (VENDOR_MATCH_THRESHOLD..95.0).contains(&top.vendor_score) {
                contributing_factors.push(format!(
                    "vendor similarity is moderate ({:.1}/100)",
                    top.vendor_score
                ));
            }
            if top.amount_pct_diff > AMOUNT_CLOSE_THRESHOLD && top.amount_pct_diff > TIP_TAX_MAX_PCT
            {
                contributing_factors.push(format!(
                    "amount difference ({:.1}%) exceeds the {:.0}% tip/tax threshold",
                    top.amount_pct_diff, TIP_TAX_MAX_PCT
                ));
            }
            if top.date_diff > SETTLEMENT_MAX_DAYS && top.date_diff != DATE_INCOMPARABLE {
                contributing_factors.push(format!(
                    "date gap ({} days) exceeds the {}-day settlement window",
                    top.date_diff, SETTLEMENT_MAX_DAYS
                ));
            }

            if contributing_factors.is_empty() {
                diagnosis_evidence.push(format!(
                    "Partial match: overall confidence is {:.1}% (below 80% clean match \
                     threshold). Some signals align but the combined evidence is not strong \
                     enough for a confident diagnosis.",
                    top.overall_confidence
                ));
            } else {
                diagnosis_evidence.push(format!(
                    "Partial match: overall confidence is {:.1}% (below 80% clean match \
                     threshold). Contributing factors: {}.",
                    top.overall_confidence,
                    contributing_factors.join("; ")
                ));
            }

            info!(
                rule = "partial_match",
                confidence = top.overall_confidence,
                "diagnosis rule fired"
            );
        }
    }

    // -- Extraction confidence warning --
    if let Some(receipt) = receipt {
        if receipt.is_low_confidence() {
            diagnosis_evidence.push(format!(
                "WARNING: Low extraction confidence ({:.0}%). The receipt image may be \
                 blurry, damaged, or partially illegible. Extracted values should be \
                 verified manually before acting on this diagnosis.",
                receipt.confidence * 100.0
            ));
            warn!(
                warning = "low_extraction_confidence",
                confidence_pct = receipt.confidence * 100.0,
                "diagnosis"
            );
        }
    }

    // -- Multiple candidates notice --
    if let Some(runner_up) = matches.get(1) {
        let confidence_gap = top.overall_confidence - runner_up.overall_confidence;
        if confidence_gap < 15.0 {
            diagnosis_evidence.push(format!(
                "Note: A second candidate ('{}', ${:.2}) scored {:.1}% - only {:.1} points \
                 below the top match. Manual review recommended.",
                runner_up.transaction.merchant,
                runner_up.transaction.amount,
                runner_up.overall_confidence,
                confidence_gap
            ));
        }
    }

    let mut complete_evidence = top.evidence.clone();
    complete_evidence.extend(diagnosis_evidence);

    let calibrated =
        calibrate_confidence(top.overall_confidence, receipt, matches.len(), &labels);

    let diagnosis = Diagnosis {
        labels,
        confidence: calibrated,
        evidence: complete_evidence,
        top_match: Some(top.clone()),
        receipt: receipt.cloned(),
        explanation: String::new(),
    };

    info!(
        labels = ?diagnosis.label_names(),
        confidence = diagnosis.confidence,
        evidence_count = diagnosis.evidence.len(),
        receipt_vendor = receipt.map(|r| r.vendor.as_str()).unwrap_or("unknown"),
        "diagnosis complete"
    );
    diagnosis
}
