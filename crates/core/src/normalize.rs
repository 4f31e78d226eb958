//! Field normalization.
//!
//! Three pure, total normalizers used on BOTH sides of every comparison so
//! that systematic formatting differences cancel out instead of surfacing as
//! false mismatches:
//!
//! - [`normalize_vendor`] — cleaned, alias-resolved vendor name
//! - [`normalize_date`]   — ISO `YYYY-MM-DD` or empty
//! - [`normalize_amount`] / [`parse_amount`] — non-negative 2-decimal float
//!
//! Invalid input degrades to neutral defaults (`""` / `0.0`); these functions
//! never panic and never report errors. Downstream scoring treats the neutral
//! default as "unknown" and scores it as a non-match on that dimension.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_store_number, r"#\s*\d+");
re!(re_digits_only, r"^\d+$");
re!(re_month_slash_year, r"^\d{1,2}[/-]\d{2,4}$");
re!(re_month_name_year, r"^[A-Za-z]{3,9}\s+\d{4}$");

/// Curated merchant abbreviation -> canonical name table. Applied after all
/// other vendor cleanup, longest alias first: exact match, then prefix, then
/// substring-contains, first hit wins.
static VENDOR_ALIASES: &[(&str, &str)] = &[
    ("amzn", "amazon"),
    ("amzn mktp", "amazon"),
    ("amazon.com", "amazon"),
    ("wmt", "walmart"),
    ("wal-mart", "walmart"),
    ("walmart.com", "walmart"),
    ("sbux", "starbucks"),
    ("starbux", "starbucks"),
    ("hd supply", "home depot"),
    ("the home depot", "home depot"),
    ("homedepot", "home depot"),
    ("costco whse", "costco"),
    ("costco wholesale", "costco"),
    ("tgt", "target"),
    ("target.com", "target"),
    ("chick-fil-a", "chick fil a"),
    ("mcd", "mcdonalds"),
    ("mcdonald's", "mcdonalds"),
];

/// Corporate/business-type words stripped from the END of a vendor name,
/// repeatedly while they terminate the word sequence.
static STRIP_SUFFIXES: &[&str] = &[
    "inc", "llc", "corp", "ltd", "co", "company", "restaurant", "rest", "rstrt", "store",
    "stores", "services", "service", "svc",
];

/// Payment-processor prefixes (Square, PayPal, Toast, Grubhub, DoorDash,
/// Uber Eats) stripped from the start of a bank descriptor. First hit only.
static PROCESSOR_PREFIXES: &[&str] = &[
    "sq *", "sq*", "pp*", "pp *", "tst*", "tst *", "grub*", "dd *", "ue *",
];

static NULL_TOKENS: &[&str] = &["n/a", "na", "none", "null", "unknown"];

/// Alias table with keys cleaned the same way vendor names are, sorted
/// longest-first. Built once at first use.
fn normalized_aliases() -> &'static [(String, &'static str)] {
    static ALIASES: OnceLock<Vec<(String, &'static str)>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        let mut cleaned: Vec<(String, &'static str)> = VENDOR_ALIASES
            .iter()
            .filter_map(|(alias, canonical)| {
                let key: String = alias
                    .to_lowercase()
                    .chars()
                    .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
                    .collect();
                let key = collapse_whitespace(&key);
                (!key.is_empty()).then_some((key, *canonical))
            })
            .collect();
        cleaned.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        cleaned
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a vendor/merchant string for comparison.
pub fn normalize_vendor(vendor: &str) -> String {
    if vendor.trim().is_empty() {
        return String::new();
    }

    let mut name: String = vendor
        .to_lowercase()
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    for prefix in PROCESSOR_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.trim().to_string();
            break;
        }
    }

    // Everything after the first remaining '*' is a processor transaction code.
    if let Some(idx) = name.find('*') {
        name = name[..idx].trim().to_string();
    }

    name = re_store_number().replace_all(&name, "").into_owned();

    // Keep Unicode letters/digits (for international vendors) while
    // stripping punctuation; underscore becomes a word separator.
    name = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();

    let mut words: Vec<&str> = name.split_whitespace().collect();
    while let Some(last) = words.last() {
        if STRIP_SUFFIXES.contains(last) {
            words.pop();
        } else {
            break;
        }
    }
    let mut name = words.join(" ");

    let aliases = normalized_aliases();
    if let Some((_, canonical)) = aliases.iter().find(|(alias, _)| name == *alias) {
        name = canonical.to_string();
    } else if let Some((_, canonical)) = aliases.iter().find(|(alias, _)| name.starts_with(alias)) {
        name = canonical.to_string();
    } else if let Some((_, canonical)) = aliases.iter().find(|(alias, _)| name.contains(alias)) {
        name = canonical.to_string();
    }

    let normalized = collapse_whitespace(&name);
    debug!(raw = vendor, normalized = %normalized, "normalize_vendor");
    normalized
}

/// Date formats tried in order; month-first interpretations come before
/// day-first so ambiguous strings resolve US-style. Two-digit-year formats
/// precede four-digit ones because chrono's `%Y` greedily accepts short
/// years ("01/15/26" would otherwise parse as year 26). Month names need
/// both `%b` and `%B` entries: `%b` only accepts 3-letter abbreviations.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M:%S %p",
];

fn try_parse_date(text: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Normalize date text to ISO `YYYY-MM-DD`, or `""` when the input is
/// missing, a known null token, or too ambiguous to trust (bare years,
/// `MM/YY`-shaped strings, "Month YYYY").
pub fn normalize_date(date_str: &str) -> String {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        debug!(raw = date_str, "normalize_date rejected: no digits");
        return String::new();
    }

    let lowered = trimmed.to_lowercase();
    if NULL_TOKENS.contains(&lowered.as_str()) {
        return String::new();
    }

    if re_digits_only().is_match(trimmed)
        || re_month_slash_year().is_match(trimmed)
        || re_month_name_year().is_match(trimmed)
    {
        return String::new();
    }

    match try_parse_date(trimmed) {
        Some(parsed) => {
            let year = parsed.year();
            if year < 2000 || year > Utc::now().year() + 2 {
                warn!(raw = date_str, year, "normalize_date: suspicious year");
            }
            let normalized = parsed.format("%Y-%m-%d").to_string();
            debug!(raw = date_str, normalized = %normalized, "normalize_date");
            normalized
        }
        None => {
            warn!(raw = date_str, "normalize_date: parse failed, falling back to empty");
            String::new()
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalize a numeric amount into a non-negative 2-decimal float.
/// Non-finite or negative values degrade to 0.0.
pub fn normalize_amount(value: f64) -> f64 {
    if !value.is_finite() {
        warn!(value, "normalize_amount: non-finite, falling back to 0.0");
        return 0.0;
    }
    if value < 0.0 {
        warn!(value, "normalize_amount: negative, falling back to 0.0");
        return 0.0;
    }
    round2(value)
}

/// Parse an amount string (`"$1,247.83"`, `"(5.00)"`, `"€47.50"`) into a
/// non-negative 2-decimal float. Negative notation, null tokens, and
/// unparseable text all degrade to 0.0.
pub fn parse_amount(text: &str) -> f64 {
    let cleaned = text.trim();
    if cleaned.is_empty() {
        return 0.0;
    }

    let lowered = cleaned.to_lowercase();
    if NULL_TOKENS.contains(&lowered.as_str()) {
        return 0.0;
    }

    let is_negative = cleaned.starts_with('-')
        || (cleaned.starts_with('(') && cleaned.ends_with(')'))
        || cleaned.contains("-$")
        || cleaned.contains("$-");

    let stripped: String = cleaned
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | '(' | ')' | ','))
        .collect();
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return 0.0;
    }

    let value: f64 = match stripped.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(raw = text, "parse_amount: parse failed, falling back to 0.0");
            return 0.0;
        }
    };

    if !value.is_finite() {
        warn!(raw = text, "parse_amount: non-finite, falling back to 0.0");
        return 0.0;
    }

    if is_negative || value < 0.0 {
        warn!(raw = text, "parse_amount: negative, falling back to 0.0");
        return 0.0;
    }

    round2(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_empty_inputs() {
        assert_eq!(normalize_vendor(""), "");
        assert_eq!(normalize_vendor("   "), "");
    }

    #[test]
    fn vendor_case_folding() {
        assert_eq!(normalize_vendor("STARBUCKS"), "starbucks");
        assert_eq!(normalize_vendor("Starbucks"), "starbucks");
    }

    #[test]
    fn vendor_diacritics_stripped() {
        assert_eq!(normalize_vendor("Café"), "cafe");
        assert_eq!(normalize_vendor("Crème Brûlée"), "creme brulee");
    }

    #[test]
    fn vendor_processor_prefixes() {
        assert_eq!(normalize_vendor("SQ *JOE'S PIZZA GRILL"), "joes pizza grill");
        assert_eq!(normalize_vendor("PP*JOHNDEEREFINAN"), "johndeerefinan");
        assert_eq!(normalize_vendor("TST*GREENVILLE COFFEE"), "greenville coffee");
    }

    #[test]
    fn vendor_star_truncation() {
        assert_eq!(normalize_vendor("ELAGAVE*1847 CHATT TN"), "elagave");
        assert_eq!(normalize_vendor("ELAGAVE*1847"), "elagave");
    }

    #[test]
    fn vendor_store_numbers_stripped() {
        assert_eq!(normalize_vendor("Starbucks #14892"), "starbucks");
        assert_eq!(normalize_vendor("THE HOME DEPOT #4821"), "home depot");
        assert_eq!(normalize_vendor("TARGET # 2847"), "target");
    }

    #[test]
    fn vendor_punctuation_removed() {
        assert_eq!(normalize_vendor("McDonald's"), "mcdonalds");
        assert_eq!(normalize_vendor("Bob's Local Hardware"), "bobs local hardware");
    }

    #[test]
    fn vendor_suffixes_stripped_repeatedly() {
        assert_eq!(normalize_vendor("El Agave Mexican Restaurant"), "el agave mexican");
        assert_eq!(normalize_vendor("Greenville Supply Inc"), "greenville supply");
        assert_eq!(normalize_vendor("ABC Services LLC"), "abc");
    }

    #[test]
    fn vendor_aliases_applied() {
        assert_eq!(normalize_vendor("Amazon.com"), "amazon");
        assert_eq!(normalize_vendor("AMZN"), "amazon");
        assert_eq!(normalize_vendor("SBUX"), "starbucks");
        assert_eq!(normalize_vendor("WMT"), "walmart");
        assert_eq!(normalize_vendor("THE HOME DEPOT"), "home depot");
        assert_eq!(normalize_vendor("Home Depot"), "home depot");
    }

    #[test]
    fn vendor_alias_prefix_match() {
        // Prefix pass fires after the transaction code is truncated.
        assert_eq!(normalize_vendor("AMZN MKTP US*2K4RF83J0"), "amazon");
        assert_eq!(normalize_vendor("AMZN MKTP US*2K4RF"), "amazon");
    }

    #[test]
    fn vendor_prefix_and_suffix_combined() {
        assert_eq!(normalize_vendor("SQ *GREENVILLE SUPPLY INC"), "greenville supply");
    }

    #[test]
    fn vendor_no_alias_digits_preserved() {
        assert_eq!(normalize_vendor("SYSCO 4823847"), "sysco 4823847");
        assert_eq!(normalize_vendor("FASTENAL CO01 CHATT"), "fastenal co01 chatt");
    }

    #[test]
    fn date_iso_and_us_formats() {
        assert_eq!(normalize_date("2026-01-15"), "2026-01-15");
        assert_eq!(normalize_date("01/15/2026"), "2026-01-15");
        assert_eq!(normalize_date("1/15/2026"), "2026-01-15");
        assert_eq!(normalize_date("01/15/26"), "2026-01-15");
        assert_eq!(normalize_date("01-15-2026"), "2026-01-15");
    }

    #[test]
    fn date_month_names() {
        assert_eq!(normalize_date("Jan 15, 2026"), "2026-01-15");
        assert_eq!(normalize_date("January 15, 2026"), "2026-01-15");
        assert_eq!(normalize_date("15 Jan 2026"), "2026-01-15");
        assert_eq!(normalize_date("15-Jan-2026"), "2026-01-15");
    }

    #[test]
    fn date_full_month_names() {
        // Chrono's %b rejects full names, so these go through the %B formats.
        assert_eq!(normalize_date("December 3, 2025"), "2025-12-03");
        assert_eq!(normalize_date("December 3 2025"), "2025-12-03");
        assert_eq!(normalize_date("15 December 2025"), "2025-12-15");
        assert_eq!(normalize_date("September 9, 2026"), "2026-09-09");
    }

    #[test]
    fn date_with_time_components() {
        assert_eq!(normalize_date("01/15/2026 14:23:05"), "2026-01-15");
        assert_eq!(normalize_date("Jan 15, 2026 2:23 PM"), "2026-01-15");
        assert_eq!(normalize_date("January 15, 2026 2:23 PM"), "2026-01-15");
        assert_eq!(normalize_date("2026-01-15T14:23:05"), "2026-01-15");
    }

    #[test]
    fn date_rejects_empty_and_null_tokens() {
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("   "), "");
        assert_eq!(normalize_date("N/A"), "");
        assert_eq!(normalize_date("unknown"), "");
        assert_eq!(normalize_date("not a date"), "");
    }

    #[test]
    fn date_rejects_ambiguous_shapes() {
        assert_eq!(normalize_date("2026"), "");
        assert_eq!(normalize_date("20260115"), "");
        assert_eq!(normalize_date("01/26"), "");
        assert_eq!(normalize_date("1-2026"), "");
        assert_eq!(normalize_date("January 2026"), "");
    }

    #[test]
    fn date_month_first_preferred() {
        // 03/04 is ambiguous; month-first wins.
        assert_eq!(normalize_date("03/04/2026"), "2026-03-04");
        // Day-first is the fallback when month-first cannot parse.
        assert_eq!(normalize_date("25/12/2026"), "2026-12-25");
    }

    #[test]
    fn amount_numeric_passthrough() {
        assert_eq!(normalize_amount(89.97), 89.97);
        assert_eq!(normalize_amount(89.0), 89.0);
        assert_eq!(normalize_amount(0.0), 0.0);
    }

    #[test]
    fn amount_rejects_negative_and_non_finite() {
        assert_eq!(normalize_amount(-5.0), 0.0);
        assert_eq!(normalize_amount(f64::NAN), 0.0);
        assert_eq!(normalize_amount(f64::INFINITY), 0.0);
    }

    #[test]
    fn amount_rounds_to_two_decimals() {
        assert_eq!(normalize_amount(47.499999999), 47.5);
        assert_eq!(normalize_amount(47.505), 47.51);
    }

    #[test]
    fn amount_is_idempotent() {
        for value in [0.0, 5.25, 47.505, 89.97, 1247.834567] {
            let once = normalize_amount(value);
            assert_eq!(normalize_amount(once), once);
        }
    }

    #[test]
    fn parse_amount_currency_symbols() {
        assert_eq!(parse_amount("$89.97"), 89.97);
        assert_eq!(parse_amount("$1,247.83"), 1247.83);
        assert_eq!(parse_amount("€47.50"), 47.50);
        assert_eq!(parse_amount("£234.67"), 234.67);
        assert_eq!(parse_amount(" $89.97 "), 89.97);
    }

    #[test]
    fn parse_amount_plain_strings() {
        assert_eq!(parse_amount("89.97"), 89.97);
        assert_eq!(parse_amount("1,247.83"), 1247.83);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("N/A"), 0.0);
        assert_eq!(parse_amount("five dollars"), 0.0);
    }

    #[test]
    fn parse_amount_rejects_negative_notation() {
        assert_eq!(parse_amount("-$5.00"), 0.0);
        assert_eq!(parse_amount("-5.00"), 0.0);
        assert_eq!(parse_amount("($5.00)"), 0.0);
        assert_eq!(parse_amount("$-5.00"), 0.0);
    }

    #[test]
    fn same_normalization_on_both_sides() {
        // Receipt side and bank side must agree after normalization.
        assert_eq!(normalize_vendor("Amazon.com"), normalize_vendor("AMZN MKTP US*2K4RF"));
        assert_eq!(normalize_date("01/12/2026"), normalize_date("2026-01-12"));
        assert_eq!(normalize_amount(47.50), parse_amount("$47.50"));
    }
}
