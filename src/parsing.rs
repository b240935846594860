//! Heuristic number recovery from noisy model or OCR text.
//!
//! The rules favour precision first and fall back to progressively looser
//! matches, so an ambiguous answer still yields a best guess that a human can
//! check against the raw response.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A currency-like number: optional `$`, digits (comma-grouped or plain),
/// up to two decimals and an optional trailing minus.
const NUMBER: &str = r"\$?\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?-?";

const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Width of the free-text gap allowed between a label and its number.
pub const LABEL_WINDOW: usize = 60;

static EBT_ADJACENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)EBT[^0-9.\-]*({})", NUMBER)).unwrap());

static EBT_WINDOW: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?is)EBT.{{0,60}}?({})", NUMBER)).unwrap());

static EBT_NEAR_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)(?:EBT.*?TOTAL|TOTAL.*?EBT).{{0,60}}?({})",
        NUMBER
    ))
    .unwrap()
});

static ANY_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("({})", NUMBER)).unwrap());

static CUSTOMER_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)#?\s*Customers?[:\s\-]*(\d{1,6})").unwrap());

static BARE_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,6})\b").unwrap());

static END_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bend\s*(?:no\b\.?|#)").unwrap());

static END_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bend\b").unwrap());

static DAILY_LOTTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)daily\s+lotto").unwrap());

static LINE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d{1,6}(?:\.\d{1,4})?").unwrap());

/// How a trailing minus (`"122.00-"`) is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingMinus {
    /// Drop the dash and keep the magnitude.
    #[default]
    Strip,
    /// Accounting notation: `122.00-` is -122.00.
    Negate,
}

/// The ordered rules used to find the EBT figure on a batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbtStrategy {
    /// `EBT` followed by a number with no digits, periods or dashes between.
    AdjacentLabel,
    /// `EBT`, up to 60 arbitrary characters, then a number.
    LabelWindow,
    /// `EBT` and `TOTAL` in either order, then a number within 60 characters.
    LabelNearTotal,
    /// The first currency-like number anywhere.
    FirstNumber,
}

pub const EBT_STRATEGIES: [EbtStrategy; 4] = [
    EbtStrategy::AdjacentLabel,
    EbtStrategy::LabelWindow,
    EbtStrategy::LabelNearTotal,
    EbtStrategy::FirstNumber,
];

impl EbtStrategy {
    fn pattern(&self) -> &'static Regex {
        match self {
            EbtStrategy::AdjacentLabel => &EBT_ADJACENT,
            EbtStrategy::LabelWindow => &EBT_WINDOW,
            EbtStrategy::LabelNearTotal => &EBT_NEAR_TOTAL,
            EbtStrategy::FirstNumber => &ANY_NUMBER,
        }
    }

    /// Applies this single rule to already-flattened text.
    pub fn apply(&self, text: &str, policy: TrailingMinus) -> Option<f64> {
        let caps = self.pattern().captures(text)?;
        normalize_number(caps.get(1)?.as_str(), policy)
    }
}

/// Joins lines and removes zero-width characters so numbers split by layout
/// noise still match.
pub fn flatten_text(text: &str) -> String {
    text.chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Finds the EBT total in free text, trying each rule of [`EBT_STRATEGIES`]
/// in order. Returns the winning rule alongside the value.
pub fn find_ebt_total(text: &str, policy: TrailingMinus) -> Option<(EbtStrategy, f64)> {
    let flat = flatten_text(text);
    EBT_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.apply(&flat, policy).map(|v| (*strategy, v)))
}

pub fn parse_currency(text: &str, policy: TrailingMinus) -> Option<f64> {
    find_ebt_total(text, policy).map(|(_, value)| value)
}

/// Normalizes one matched numeral (`"$1,234.56"`, `"122.00-"`) to a float.
///
/// Malformed residue yields `None`, never a panic or a zero.
pub fn normalize_number(raw: &str, policy: TrailingMinus) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace() && !ZERO_WIDTH.contains(c))
        .collect();

    let trailing_minus = cleaned.ends_with('-');
    if trailing_minus {
        cleaned.pop();
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    match (trailing_minus, policy) {
        (true, TrailingMinus::Negate) => Some(-value),
        _ => Some(value),
    }
}

/// Reads a standalone amount string as found in model JSON, accepting
/// `(123.45)` as a negative and a leading `+`.
pub fn parse_amount(raw: &str, policy: TrailingMinus) -> Option<f64> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        return normalize_number(inner, policy).map(|v| -v.abs());
    }
    normalize_number(trimmed.trim_start_matches('+'), policy)
}

/// Plain counts such as customers per shift: a `Customers` label first,
/// then the first bare integer of up to six digits.
pub fn parse_count(text: &str) -> Option<u32> {
    let flat = flatten_text(text);
    CUSTOMER_COUNT
        .captures(&flat)
        .or_else(|| BARE_COUNT.captures(&flat))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Searches for any of `labels` with a number after it (or before it) within
/// [`LABEL_WINDOW`] non-numeric characters. Labels are tried in order.
pub fn find_near_label(text: &str, labels: &[&str], policy: TrailingMinus) -> Option<f64> {
    let flat = flatten_text(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    labels.iter().find_map(|label| {
        let label = regex::escape(label);
        let after = format!(
            r"(?i){}[^0-9\-$]{{0,{}}}({})",
            label, LABEL_WINDOW, NUMBER
        );
        let before = format!(
            r"(?i)({})[^0-9\-$]{{0,{}}}{}",
            NUMBER, LABEL_WINDOW, label
        );
        [after, before].iter().find_map(|pattern| {
            let re = Regex::new(pattern).ok()?;
            let caps = re.captures(&flat)?;
            normalize_number(caps.get(1)?.as_str(), policy)
        })
    })
}

/// Sums every number in the region that follows the first of `markers`.
pub fn sum_after_marker(text: &str, markers: &[&str], policy: TrailingMinus) -> Option<f64> {
    const REGION: usize = 400;

    let lower = text.to_ascii_lowercase();
    let start = markers
        .iter()
        .find_map(|m| lower.find(&m.to_ascii_lowercase()))?;
    let end = floor_boundary(text, start + REGION);

    let values: Vec<f64> = ANY_NUMBER
        .find_iter(&flatten_text(&text[start..end]))
        .filter_map(|m| normalize_number(m.as_str(), policy))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

/// Lines read below an `End no` header.
const HEADER_SPAN: usize = 80;

/// Reads one number per line below an `End no` style header, up to `limit`.
///
/// A short (or headerless) read is topped up with the numbers that follow a
/// `Daily Lotto` marker (or start the text), skipping the lines the header
/// read already consumed.
pub fn numbers_below_header(text: &str, limit: usize, policy: TrailingMinus) -> Vec<f64> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let header = lines
        .iter()
        .position(|l| END_HEADER.is_match(l))
        .or_else(|| lines.iter().position(|l| END_WORD.is_match(l)));
    let consumed = match header {
        Some(idx) => idx + 1..idx + 1 + HEADER_SPAN,
        None => 0..0,
    };

    let mut values: Vec<f64> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| consumed.contains(i))
        .filter_map(|(_, line)| LINE_NUMBER.find(line))
        .filter_map(|m| normalize_number(m.as_str(), policy))
        .take(limit)
        .collect();

    if values.len() < limit {
        let marker = lines.iter().position(|l| DAILY_LOTTO.is_match(l));
        let room = limit - values.len();
        let top_up: Vec<f64> = lines
            .iter()
            .enumerate()
            .skip(marker.unwrap_or(0))
            .filter(|(i, _)| !consumed.contains(i))
            .flat_map(|(i, line)| {
                let segment: &str = match DAILY_LOTTO.find(line) {
                    Some(found) if marker == Some(i) => &line[found.end()..],
                    _ => *line,
                };
                LINE_NUMBER.find_iter(segment)
            })
            .filter_map(|m| normalize_number(m.as_str(), policy))
            .take(room)
            .collect();
        values.extend(top_up);
    }

    values
}

fn floor_boundary(text: &str, mut pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIP: TrailingMinus = TrailingMinus::Strip;

    #[test]
    fn test_ebt_with_currency_and_grouping() {
        assert_eq!(parse_currency("EBT $1,234.56", STRIP), Some(1234.56));
        assert_eq!(
            parse_currency("Card totals\nVISA 10.00\nEBT $1,234.56\n", STRIP),
            Some(1234.56)
        );
    }

    #[test]
    fn test_adjacent_label_rule_wins_first() {
        let found = find_ebt_total("EBT: 45.10 then TOTAL 99.99", STRIP);
        assert_eq!(found, Some((EbtStrategy::AdjacentLabel, 45.10)));
    }

    #[test]
    fn test_label_window_rule_skips_separators() {
        // A dash between the label and the amount defeats the adjacent rule.
        let text = "EBT -- 45.00";
        assert_eq!(EbtStrategy::AdjacentLabel.apply(text, STRIP), None);
        assert_eq!(EbtStrategy::LabelWindow.apply(text, STRIP), Some(45.0));
        assert_eq!(
            find_ebt_total(text, STRIP),
            Some((EbtStrategy::LabelWindow, 45.0))
        );
    }

    #[test]
    fn test_near_total_rule() {
        let text = format!("EBT {} TOTAL: 12.50", "-".repeat(70));
        assert_eq!(EbtStrategy::AdjacentLabel.apply(&text, STRIP), None);
        assert_eq!(EbtStrategy::LabelWindow.apply(&text, STRIP), None);
        assert_eq!(EbtStrategy::LabelNearTotal.apply(&text, STRIP), Some(12.5));
        assert_eq!(
            find_ebt_total(&text, STRIP),
            Some((EbtStrategy::LabelNearTotal, 12.5))
        );
    }

    #[test]
    fn test_first_number_fallback() {
        assert_eq!(
            find_ebt_total("The amount is 19.99 dollars", STRIP),
            Some((EbtStrategy::FirstNumber, 19.99))
        );
    }

    #[test]
    fn test_no_digits_is_not_found() {
        assert_eq!(parse_currency("NOT_FOUND", STRIP), None);
        assert_eq!(parse_currency("", STRIP), None);
    }

    #[test]
    fn test_trailing_minus_is_stripped_by_default() {
        assert_eq!(parse_currency("122.00-", STRIP), Some(122.0));
    }

    #[test]
    fn test_trailing_minus_negates_when_configured() {
        assert_eq!(parse_currency("122.00-", TrailingMinus::Negate), Some(-122.0));
        assert_eq!(normalize_number("$1,000.00-", TrailingMinus::Negate), Some(-1000.0));
    }

    #[test]
    fn test_zero_width_and_line_breaks() {
        assert_eq!(parse_currency("EBT\n$1,2\u{200B}34.56", STRIP), Some(1234.56));
        assert_eq!(normalize_number("$ 1,234.5\u{200B}", STRIP), Some(1234.5));
    }

    #[test]
    fn test_ungrouped_thousands() {
        assert_eq!(parse_currency("EBT 1234.56", STRIP), Some(1234.56));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert_eq!(normalize_number("$", STRIP), None);
        assert_eq!(normalize_number("-", STRIP), None);
        assert_eq!(normalize_number("12.3.4", STRIP), None);
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("(45.00)", STRIP), Some(-45.0));
        assert_eq!(parse_amount("+12", STRIP), Some(12.0));
        assert_eq!(parse_amount(" $2,500 ", STRIP), Some(2500.0));
        assert_eq!(parse_amount("n/a", STRIP), None);
    }

    #[test]
    fn test_count_prefers_customer_label() {
        assert_eq!(parse_count("Shift 2\n#Customers: 143"), Some(143));
        assert_eq!(parse_count("Customers - 88"), Some(88));
        assert_eq!(parse_count("Total 57 today"), Some(57));
        assert_eq!(parse_count("NOT_FOUND"), None);
    }

    #[test]
    fn test_find_near_label_both_directions() {
        let text = "Category LOTTERY ..... 38.50\nFuel deposit 1,234.56";
        assert_eq!(find_near_label(text, &["LOTTERY"], STRIP), Some(38.5));
        assert_eq!(find_near_label(text, &["fuel deposit"], STRIP), Some(1234.56));
        assert_eq!(find_near_label("412.00 Diesel", &["DIESEL"], STRIP), Some(412.0));
        assert_eq!(find_near_label("nothing here", &["Taxes"], STRIP), None);
    }

    #[test]
    fn test_sum_after_marker() {
        let text = "Total Cash 900\nAdditional:\n 10.50\n 4.50\n";
        assert_eq!(sum_after_marker(text, &["additional"], STRIP), Some(15.0));
        assert_eq!(sum_after_marker("no section", &["additional"], STRIP), None);
    }

    #[test]
    fn test_numbers_below_header() {
        let text = "Daily Lotto\nBook  End no\n101\n102 \n\n103\n";
        assert_eq!(numbers_below_header(text, 20, STRIP), vec![101.0, 102.0, 103.0]);
        assert_eq!(numbers_below_header(text, 2, STRIP), vec![101.0, 102.0]);
        assert_eq!(
            numbers_below_header("Daily Lotto 5 6 7", 20, STRIP),
            vec![5.0, 6.0, 7.0]
        );
    }

    #[test]
    fn test_short_header_read_is_topped_up_after_daily_lotto() {
        let text = "Shift 3\nDaily Lotto 900\nEnd no\n101\n102";
        assert_eq!(
            numbers_below_header(text, 20, STRIP),
            vec![101.0, 102.0, 900.0]
        );
        assert_eq!(numbers_below_header(text, 2, STRIP), vec![101.0, 102.0]);
    }
}
