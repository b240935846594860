//! Typed field records for each report type, decoded defensively from the
//! model's answer.
//!
//! A recovered JSON object is preferred. A field whose keys the object does
//! not carry at all, or an answer with no JSON, is read from the plain text
//! with label-proximity heuristics instead. A key that is present but null or
//! unreadable stays `None`; nothing is ever defaulted to zero.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::parsing::{
    find_near_label, numbers_below_header, parse_amount, parse_count, parse_currency,
    sum_after_marker, TrailingMinus,
};
use crate::recovery::{recover_json_object, text_outside_json_object};
use crate::schema::{ExtractionResult, ReportType};

/// Entries in the primary `handwritten_lotto_end` run.
pub const LOTTO_END_PRIMARY_WIDTH: usize = 20;
/// Entries in the secondary `handwritten_lotto_end` run.
pub const LOTTO_END_SECONDARY_WIDTH: usize = 16;

/// Reads fields from one response: the recovered JSON object when there is
/// one, and the prose around it.
struct FieldReader<'a> {
    json: Option<&'a Map<String, Value>>,
    prose: Cow<'a, str>,
    policy: TrailingMinus,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a str, json: Option<&'a Map<String, Value>>, policy: TrailingMinus) -> Self {
        let prose = match json {
            Some(_) => Cow::Owned(text_outside_json_object(raw)),
            None => Cow::Borrowed(raw),
        };
        Self {
            json,
            prose,
            policy,
        }
    }

    /// Values of whichever `keys` the JSON object carries (case-insensitive).
    fn json_values(&self, keys: &[&str]) -> Vec<&'a Value> {
        self.json
            .map(|map| keys.iter().filter_map(|key| lookup(map, key)).collect())
            .unwrap_or_default()
    }

    /// JSON: the first of `keys` holding a readable number. Falls back to
    /// the first of `labels` with a number nearby when no key is present.
    fn number(&self, keys: &[&str], labels: &[&str]) -> Option<f64> {
        let present = self.json_values(keys);
        if present.is_empty() {
            return find_near_label(&self.prose, labels, self.policy);
        }
        present
            .into_iter()
            .find_map(|value| lenient_number(value, self.policy))
    }

    /// Like [`FieldReader::number`], with a marker-region sum as the text fallback.
    fn marker_sum(&self, keys: &[&str], markers: &[&str]) -> Option<f64> {
        let present = self.json_values(keys);
        if present.is_empty() {
            return sum_after_marker(&self.prose, markers, self.policy);
        }
        present
            .into_iter()
            .find_map(|value| lenient_number(value, self.policy))
    }

    /// The first of `keys` holding an array, or one number per line below an
    /// `End no` header when no key is present.
    fn sequence(&self, keys: &[&str], width: usize) -> Vec<Option<f64>> {
        let present = self.json_values(keys);
        let values: Vec<Option<f64>> = if present.is_empty() {
            numbers_below_header(&self.prose, width, self.policy)
                .into_iter()
                .map(Some)
                .collect()
        } else {
            present
                .into_iter()
                .find_map(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|v| lenient_number(v, self.policy))
                        .collect()
                })
                .unwrap_or_default()
        };
        fit_to_width(values, width)
    }
}

fn lookup<'m>(map: &'m Map<String, Value>, key: &str) -> Option<&'m Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Reads a JSON number, or a currency-like string, as a finite float.
pub fn lenient_number(value: &Value, policy: TrailingMinus) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_amount(s, policy),
        _ => None,
    }
}

/// Clips or null-pads a sequence to exactly `width` entries.
pub fn fit_to_width(mut values: Vec<Option<f64>>, width: usize) -> Vec<Option<f64>> {
    values.resize(width, None);
    values
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchFields {
    pub ebt_total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Day1Fields {
    pub net_sales_total: Option<f64>,
    pub credit: Option<f64>,
    pub debit: Option<f64>,
}

impl Day1Fields {
    fn read(r: &FieldReader) -> Self {
        Self {
            net_sales_total: r.number(
                &["net_sales_total", "net_sales", "total_net_sales"],
                &["Net Sales Total", "Total Net Sales", "Net Sales"],
            ),
            credit: r.number(&["credit"], &["Credit"]),
            debit: r.number(&["debit"], &["Debit"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Day2Fields {
    pub lottery_net: Option<f64>,
    pub fuel_deposit: Option<f64>,
    pub taxable_sales: Option<f64>,
    pub taxes: Option<f64>,
}

impl Day2Fields {
    fn read(r: &FieldReader) -> Self {
        Self {
            lottery_net: r.number(
                &["lottery_net", "lottery", "lottery_net_sales"],
                &["Lottery Net Sales", "Lottery Net", "Lottery", "Lotto"],
            ),
            fuel_deposit: r.number(
                &["fuel_deposit", "fuel_deposit_net", "fuel_deposit_sales"],
                &["Fuel deposit net", "Fuel deposit sales", "Fuel deposit"],
            ),
            taxable_sales: r.number(
                &["taxable_sales", "taxable-sales", "taxable"],
                &["TAXABLE-SALES", "Taxable Sales", "Taxable_Sales", "Taxable"],
            ),
            taxes: r.number(&["taxes", "tax"], &["TAXES", "Sales Tax", "Tax"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Day3Fields {
    pub unleaded: Option<f64>,
    pub plus: Option<f64>,
    pub premium: Option<f64>,
    pub diesel: Option<f64>,
}

impl Day3Fields {
    fn read(r: &FieldReader) -> Self {
        Self {
            unleaded: r.number(
                &["unleaded", "regular", "reg"],
                &["Unleaded", "Regular", "REG"],
            ),
            plus: r.number(&["plus"], &["PLUS (MID)", "Plus"]),
            premium: r.number(&["premium"], &["Premium"]),
            diesel: r.number(&["diesel"], &["Diesel"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandwrittenFields {
    pub morning: Option<f64>,
    pub evening: Option<f64>,
    pub night: Option<f64>,
    pub total_cash: Option<f64>,
    pub additional_sum: Option<f64>,
    pub game_in: Option<f64>,
    pub game_out: Option<f64>,
}

impl HandwrittenFields {
    fn read(r: &FieldReader) -> Self {
        let additional_sum =
            r.marker_sum(&["additional_sum", "additional"], &["additional", "add'l"]);
        Self {
            morning: r.number(&["morning"], &["Morning Shift", "Morning", "Morn"]),
            evening: r.number(&["evening"], &["Evening Shift", "Evening", "Eve"]),
            night: r.number(&["night"], &["Night Shift", "Night"]),
            total_cash: r.number(
                &["total_cash"],
                &["Total Cash", "Cash Total", "Total"],
            ),
            additional_sum,
            game_in: r.number(&["game_in"], &["Game In"]),
            game_out: r.number(&["game_out"], &["Game Out"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LottoFields {
    pub drw_gm_net_sales: Option<f64>,
    pub drw_gm_cashes: Option<f64>,
    pub scratch_cashes: Option<f64>,
    /// An explicitly reported total; preferred over the sum of the two cashes.
    pub total_cashes: Option<f64>,
}

impl LottoFields {
    fn read(r: &FieldReader) -> Self {
        Self {
            drw_gm_net_sales: r.number(
                &["drw_gm_net_sales", "draw_gm_net_sales"],
                &["DRW GM NET SALES", "DRAW GM NET SALES"],
            ),
            drw_gm_cashes: r.number(
                &["drw_gm_cashes", "draw_gm_cashes"],
                &["DRW GM CASHES", "DRAW GM CASHES"],
            ),
            scratch_cashes: r.number(&["scratch_cashes"], &["SCRATCH CASHES"]),
            total_cashes: r.number(&["total_cashes"], &["TOTAL CASHES"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LottoEndFields {
    pub end_values: Vec<Option<f64>>,
    /// `None` when no second image was supplied.
    pub end_values_secondary: Option<Vec<Option<f64>>>,
}

const END_VALUE_KEYS: [&str; 4] = ["end_values", "end_no", "end", "values"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShiftFields {
    pub morning: Option<u32>,
    pub evening: Option<u32>,
    pub night: Option<u32>,
}

/// Decoded values, one variant per report type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum ReportValues {
    Batch(BatchFields),
    Day1(Day1Fields),
    Day2(Day2Fields),
    Day3(Day3Fields),
    Handwritten(HandwrittenFields),
    Lotto(LottoFields),
    HandwrittenLottoEnd(LottoEndFields),
    Shift(ShiftFields),
}

impl ReportValues {
    /// Decodes the responses of one request; `responses[i]` answers image `i`.
    pub fn decode(report: ReportType, responses: &[String], policy: TrailingMinus) -> Self {
        let primary = responses.first().map(String::as_str).unwrap_or_default();
        let recovered = recover_json_object(primary);
        let reader = FieldReader::new(primary, recovered.as_ref(), policy);

        match report {
            ReportType::Batch => ReportValues::Batch(BatchFields {
                ebt_total: parse_currency(primary, policy),
            }),
            ReportType::Day1 => ReportValues::Day1(Day1Fields::read(&reader)),
            ReportType::Day2 => ReportValues::Day2(Day2Fields::read(&reader)),
            ReportType::Day3 => ReportValues::Day3(Day3Fields::read(&reader)),
            ReportType::Handwritten => {
                ReportValues::Handwritten(HandwrittenFields::read(&reader))
            }
            ReportType::Lotto => ReportValues::Lotto(LottoFields::read(&reader)),
            ReportType::HandwrittenLottoEnd => {
                let end_values = reader.sequence(&END_VALUE_KEYS, LOTTO_END_PRIMARY_WIDTH);
                let end_values_secondary = responses.get(1).map(|raw| {
                    let recovered = recover_json_object(raw);
                    let reader = FieldReader::new(raw, recovered.as_ref(), policy);
                    reader.sequence(&END_VALUE_KEYS, LOTTO_END_SECONDARY_WIDTH)
                });
                ReportValues::HandwrittenLottoEnd(LottoEndFields {
                    end_values,
                    end_values_secondary,
                })
            }
            ReportType::Shift => ReportValues::Shift(decode_shift(responses, &reader)),
        }
    }

    pub fn report_type(&self) -> ReportType {
        match self {
            ReportValues::Batch(_) => ReportType::Batch,
            ReportValues::Day1(_) => ReportType::Day1,
            ReportValues::Day2(_) => ReportType::Day2,
            ReportValues::Day3(_) => ReportType::Day3,
            ReportValues::Handwritten(_) => ReportType::Handwritten,
            ReportValues::Lotto(_) => ReportType::Lotto,
            ReportValues::HandwrittenLottoEnd(_) => ReportType::HandwrittenLottoEnd,
            ReportValues::Shift(_) => ReportType::Shift,
        }
    }

    /// Flattens the typed record into field-name keyed values for mapping.
    pub fn to_extraction(&self) -> ExtractionResult {
        let result = ExtractionResult::new(self.report_type());
        match self {
            ReportValues::Batch(f) => result.with_value("ebt_total", f.ebt_total),
            ReportValues::Day1(f) => result
                .with_value("net_sales_total", f.net_sales_total)
                .with_value("credit", f.credit)
                .with_value("debit", f.debit),
            ReportValues::Day2(f) => result
                .with_value("lottery_net", f.lottery_net)
                .with_value("fuel_deposit", f.fuel_deposit)
                .with_value("taxable_sales", f.taxable_sales)
                .with_value("taxes", f.taxes),
            ReportValues::Day3(f) => result
                .with_value("unleaded", f.unleaded)
                .with_value("plus", f.plus)
                .with_value("premium", f.premium)
                .with_value("diesel", f.diesel),
            ReportValues::Handwritten(f) => result
                .with_value("morning", f.morning)
                .with_value("evening", f.evening)
                .with_value("night", f.night)
                .with_value("total_cash", f.total_cash)
                .with_value("additional_sum", f.additional_sum)
                .with_value("game_in", f.game_in)
                .with_value("game_out", f.game_out),
            ReportValues::Lotto(f) => result
                .with_value("drw_gm_net_sales", f.drw_gm_net_sales)
                .with_value("drw_gm_cashes", f.drw_gm_cashes)
                .with_value("scratch_cashes", f.scratch_cashes)
                .with_value("total_cashes", f.total_cashes),
            ReportValues::HandwrittenLottoEnd(f) => {
                let result = result.with_sequence("end_values", f.end_values.clone());
                match &f.end_values_secondary {
                    Some(secondary) => {
                        result.with_sequence("end_values_secondary", secondary.clone())
                    }
                    None => result,
                }
            }
            ReportValues::Shift(f) => result
                .with_value("morning", f.morning.map(f64::from))
                .with_value("evening", f.evening.map(f64::from))
                .with_value("night", f.night.map(f64::from)),
        }
    }
}

/// One image: a JSON object with all three counts (or labelled text).
/// Several images: one slip per shift, in morning/evening/night order.
fn decode_shift(responses: &[String], reader: &FieldReader) -> ShiftFields {
    let as_count = |v: Option<f64>| {
        v.filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
    };

    if responses.len() <= 1 {
        return ShiftFields {
            morning: as_count(reader.number(&["morning"], &["Morning"])),
            evening: as_count(reader.number(&["evening"], &["Evening"])),
            night: as_count(reader.number(&["night"], &["Night"])),
        };
    }

    let slot = |idx: usize| responses.get(idx).and_then(|raw| parse_count(raw));
    ShiftFields {
        morning: slot(0),
        evening: slot(1),
        night: slot(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIP: TrailingMinus = TrailingMinus::Strip;

    fn decode(report: ReportType, responses: &[&str]) -> ReportValues {
        let owned: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
        ReportValues::decode(report, &owned, STRIP)
    }

    #[test]
    fn test_day1_json_with_missing_credit() {
        let values = decode(
            ReportType::Day1,
            &[r#"```json {"net_sales_total": 1234.56, "debit": "$80.00"} ```"#],
        );
        assert_eq!(
            values,
            ReportValues::Day1(Day1Fields {
                net_sales_total: Some(1234.56),
                credit: None,
                debit: Some(80.0),
            })
        );
    }

    #[test]
    fn test_day2_accepts_aliases_and_null() {
        let values = decode(
            ReportType::Day2,
            &[r#"{"Lottery": 38.5, "fuel_deposit": null, "taxable-sales": "9,876.54", "tax": 12}"#],
        );
        let ReportValues::Day2(fields) = values else {
            panic!("expected day2 values");
        };
        assert_eq!(fields.lottery_net, Some(38.5));
        assert_eq!(fields.fuel_deposit, None);
        assert_eq!(fields.taxable_sales, Some(9876.54));
        assert_eq!(fields.taxes, Some(12.0));
    }

    #[test]
    fn test_day3_text_fallback() {
        let text = "PRODUCT TOTALS\nUNLEADED 1,204.33\nPLUS 210.10\nPREMIUM 98.00\nDIESEL 412.75";
        let ReportValues::Day3(fields) = decode(ReportType::Day3, &[text]) else {
            panic!("expected day3 values");
        };
        assert_eq!(fields.unleaded, Some(1204.33));
        assert_eq!(fields.plus, Some(210.10));
        assert_eq!(fields.premium, Some(98.0));
        assert_eq!(fields.diesel, Some(412.75));
    }

    #[test]
    fn test_non_numeric_json_values_are_absent_not_zero() {
        let ReportValues::Lotto(fields) = decode(
            ReportType::Lotto,
            &[r#"{"drw_gm_net_sales": "unknown", "drw_gm_cashes": true, "scratch_cashes": [1]}"#],
        ) else {
            panic!("expected lotto values");
        };
        assert_eq!(fields, LottoFields::default());
        assert!(!ReportValues::Lotto(fields).to_extraction().has_usable_value());
    }

    #[test]
    fn test_batch_reads_ebt_from_text() {
        let values = decode(ReportType::Batch, &["EBT: $1,234.56"]);
        assert_eq!(
            values.to_extraction().value("ebt_total"),
            Some(1234.56)
        );
    }

    #[test]
    fn test_lotto_end_pads_and_clips() {
        let short = decode(ReportType::HandwrittenLottoEnd, &[r#"{"end_values":[10,20,30]}"#]);
        let result = short.to_extraction();
        let seq = result.sequence("end_values").unwrap();
        assert_eq!(seq.len(), LOTTO_END_PRIMARY_WIDTH);
        assert_eq!(&seq[..3], &[Some(10.0), Some(20.0), Some(30.0)]);
        assert!(seq[3..].iter().all(Option::is_none));
        assert!(result.sequence("end_values_secondary").is_none());

        let long: Vec<String> = (1..=25).map(|n| n.to_string()).collect();
        let raw = format!(r#"{{"end_no":[{}]}}"#, long.join(","));
        let second = format!(r#"{{"values":[{}]}}"#, long.join(","));
        let ReportValues::HandwrittenLottoEnd(fields) =
            decode(ReportType::HandwrittenLottoEnd, &[&raw, &second])
        else {
            panic!("expected lotto end values");
        };
        assert_eq!(fields.end_values.len(), LOTTO_END_PRIMARY_WIDTH);
        assert_eq!(fields.end_values[19], Some(20.0));
        let secondary = fields.end_values_secondary.unwrap();
        assert_eq!(secondary.len(), LOTTO_END_SECONDARY_WIDTH);
        assert_eq!(secondary[15], Some(16.0));
    }

    #[test]
    fn test_shift_single_image_json() {
        let ReportValues::Shift(fields) = decode(
            ReportType::Shift,
            &[r#"{"morning": 41, "evening": "37", "night": 2.5}"#],
        ) else {
            panic!("expected shift values");
        };
        assert_eq!(fields.morning, Some(41));
        assert_eq!(fields.evening, Some(37));
        assert_eq!(fields.night, None);
    }

    #[test]
    fn test_shift_one_slip_per_image() {
        let ReportValues::Shift(fields) = decode(
            ReportType::Shift,
            &["#Customers: 120", "NOT_FOUND", "Customers 14"],
        ) else {
            panic!("expected shift values");
        };
        assert_eq!(fields.morning, Some(120));
        assert_eq!(fields.evening, None);
        assert_eq!(fields.night, Some(14));
    }

    #[test]
    fn test_handwritten_text_additional_section() {
        let text = "Morning 41\nEvening 37\nNight 12\nTotal Cash 1,050.25\nAdditional\n 20.00\n 5.50";
        let ReportValues::Handwritten(fields) = decode(ReportType::Handwritten, &[text]) else {
            panic!("expected handwritten values");
        };
        assert_eq!(fields.morning, Some(41.0));
        assert_eq!(fields.night, Some(12.0));
        assert_eq!(fields.total_cash, Some(1050.25));
        assert_eq!(fields.additional_sum, Some(25.5));
        assert_eq!(fields.game_in, None);
    }

    #[test]
    fn test_json_without_expected_keys_falls_back_to_text() {
        let raw = "Daily Lotto\nEnd no\n501\n502\n503\n{\"note\": \"column was hard to read\"}";
        let ReportValues::HandwrittenLottoEnd(fields) =
            decode(ReportType::HandwrittenLottoEnd, &[raw])
        else {
            panic!("expected lotto end values");
        };
        assert_eq!(&fields.end_values[..3], &[Some(501.0), Some(502.0), Some(503.0)]);
        assert!(fields.end_values[3..].iter().all(Option::is_none));

        let ReportValues::Day1(fields) = decode(
            ReportType::Day1,
            &["Credit: 310.00 (the other totals are below)\n{\"net_sales_total\": 900}"],
        ) else {
            panic!("expected day1 values");
        };
        assert_eq!(fields.net_sales_total, Some(900.0));
        assert_eq!(fields.credit, Some(310.0));
        assert_eq!(fields.debit, None);
    }

    #[test]
    fn test_null_json_key_does_not_fall_back() {
        let ReportValues::Day1(fields) = decode(
            ReportType::Day1,
            &[r#"{"net_sales_total": 1234.56, "credit": null, "debit": "$80.00"}"#],
        ) else {
            panic!("expected day1 values");
        };
        assert_eq!(fields.credit, None);
        assert_eq!(fields.debit, Some(80.0));

        let ReportValues::HandwrittenLottoEnd(fields) = decode(
            ReportType::HandwrittenLottoEnd,
            &[r#"End no
501
502
{"end_values": null}"#],
        ) else {
            panic!("expected lotto end values");
        };
        assert!(fields.end_values.iter().all(Option::is_none));
    }

    #[test]
    fn test_lotto_explicit_total_cashes() {
        let values = decode(
            ReportType::Lotto,
            &[r#"{"drw_gm_cashes": 2.0, "scratch_cashes": 122.0, "total_cashes": "$130.00"}"#],
        );
        let result = values.to_extraction();
        assert_eq!(result.value("total_cashes"), Some(130.0));
        assert_eq!(result.value("drw_gm_cashes"), Some(2.0));
    }
}
