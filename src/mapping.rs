//! Declarative field-to-cell bindings for every report type.
//!
//! Adding a report type means adding a table here; the dispatcher never
//! branches on report-specific cell addresses.

use serde::Serialize;

use crate::error::Result;
use crate::schema::{CellAddress, ExtractionResult, ReportType};

/// How the value of one bound cell is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellRule {
    /// Copy one extracted field.
    Field(&'static str),
    /// The `total` field when present, otherwise the sum of all `parts`
    /// (every part required). Skipped unless strictly positive.
    PositiveTotal {
        total: &'static str,
        parts: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBinding {
    pub cell: &'static str,
    pub rule: CellRule,
}

impl CellBinding {
    const fn field(name: &'static str, cell: &'static str) -> Self {
        Self {
            cell,
            rule: CellRule::Field(name),
        }
    }

    const fn positive_total(
        total: &'static str,
        parts: &'static [&'static str],
        cell: &'static str,
    ) -> Self {
        Self {
            cell,
            rule: CellRule::PositiveTotal { total, parts },
        }
    }
}

/// A sequence field laid across `width` consecutive columns starting at `anchor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRun {
    pub field: &'static str,
    pub anchor: &'static str,
    pub width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMapping {
    pub report: ReportType,
    pub cells: &'static [CellBinding],
    pub runs: &'static [ColumnRun],
}

/// One planned cell assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWrite {
    pub cell: CellAddress,
    pub field: String,
    pub value: f64,
}

static BATCH: FieldMapping = FieldMapping {
    report: ReportType::Batch,
    cells: &[CellBinding::field("ebt_total", "Z10")],
    runs: &[],
};

static DAY1: FieldMapping = FieldMapping {
    report: ReportType::Day1,
    cells: &[
        CellBinding::field("net_sales_total", "L7"),
        CellBinding::field("credit", "I12"),
        CellBinding::field("debit", "I13"),
    ],
    runs: &[],
};

static DAY2: FieldMapping = FieldMapping {
    report: ReportType::Day2,
    cells: &[
        CellBinding::field("lottery_net", "L6"),
        CellBinding::field("fuel_deposit", "F15"),
        CellBinding::field("taxable_sales", "F16"),
        CellBinding::field("taxes", "F17"),
        CellBinding::field("taxes", "Z11"),
    ],
    runs: &[],
};

static DAY3: FieldMapping = FieldMapping {
    report: ReportType::Day3,
    cells: &[
        CellBinding::field("unleaded", "F26"),
        CellBinding::field("plus", "H26"),
        CellBinding::field("premium", "G26"),
        CellBinding::field("diesel", "E26"),
    ],
    runs: &[],
};

static HANDWRITTEN: FieldMapping = FieldMapping {
    report: ReportType::Handwritten,
    cells: &[
        CellBinding::field("morning", "D9"),
        CellBinding::field("evening", "D11"),
        CellBinding::field("night", "D13"),
        CellBinding::field("total_cash", "L14"),
        CellBinding::field("additional_sum", "Z17"),
        CellBinding::field("game_in", "F34"),
        CellBinding::field("game_out", "F35"),
    ],
    runs: &[],
};

static LOTTO: FieldMapping = FieldMapping {
    report: ReportType::Lotto,
    cells: &[
        CellBinding::field("drw_gm_net_sales", "T30"),
        CellBinding::positive_total("total_cashes", &["drw_gm_cashes", "scratch_cashes"], "Z9"),
    ],
    runs: &[],
};

static HANDWRITTEN_LOTTO_END: FieldMapping = FieldMapping {
    report: ReportType::HandwrittenLottoEnd,
    cells: &[],
    runs: &[
        ColumnRun {
            field: "end_values",
            anchor: "I26",
            width: crate::reports::LOTTO_END_PRIMARY_WIDTH,
        },
        ColumnRun {
            field: "end_values_secondary",
            anchor: "I33",
            width: crate::reports::LOTTO_END_SECONDARY_WIDTH,
        },
    ],
};

static SHIFT: FieldMapping = FieldMapping {
    report: ReportType::Shift,
    cells: &[
        CellBinding::field("morning", "E10"),
        CellBinding::field("evening", "E12"),
        CellBinding::field("night", "E14"),
    ],
    runs: &[],
};

impl FieldMapping {
    pub fn for_report(report: ReportType) -> &'static FieldMapping {
        match report {
            ReportType::Batch => &BATCH,
            ReportType::Day1 => &DAY1,
            ReportType::Day2 => &DAY2,
            ReportType::Day3 => &DAY3,
            ReportType::Handwritten => &HANDWRITTEN,
            ReportType::Lotto => &LOTTO,
            ReportType::HandwrittenLottoEnd => &HANDWRITTEN_LOTTO_END,
            ReportType::Shift => &SHIFT,
        }
    }

    /// Computes the cell assignments for `result`. Absent values produce no
    /// write, so the cell keeps whatever it held before.
    pub fn plan(&self, result: &ExtractionResult) -> Result<Vec<CellWrite>> {
        let mut writes = Vec::new();

        for binding in self.cells {
            let resolved = match binding.rule {
                CellRule::Field(name) => result.value(name).map(|v| (name.to_string(), v)),
                CellRule::PositiveTotal { total, parts } => positive_total(result, total, parts),
            };
            if let Some((field, value)) = resolved {
                writes.push(CellWrite {
                    cell: CellAddress::parse(binding.cell)?,
                    field,
                    value,
                });
            }
        }

        for run in self.runs {
            let Some(values) = result.sequence(run.field) else {
                continue;
            };
            let anchor = CellAddress::parse(run.anchor)?;
            for (offset, value) in values.iter().take(run.width).enumerate() {
                if let Some(value) = value {
                    writes.push(CellWrite {
                        cell: anchor.shifted_right(offset as u32),
                        field: format!("{}[{}]", run.field, offset),
                        value: *value,
                    });
                }
            }
        }

        Ok(writes)
    }

    /// Every cell this mapping may touch.
    pub fn target_cells(&self) -> Result<Vec<CellAddress>> {
        let mut cells = self
            .cells
            .iter()
            .map(|b| CellAddress::parse(b.cell))
            .collect::<Result<Vec<_>>>()?;
        for run in self.runs {
            let anchor = CellAddress::parse(run.anchor)?;
            cells.extend((0..run.width as u32).map(|i| anchor.shifted_right(i)));
        }
        Ok(cells)
    }
}

fn positive_total(
    result: &ExtractionResult,
    total: &str,
    parts: &[&str],
) -> Option<(String, f64)> {
    let (field, value) = match result.value(total) {
        Some(value) => (total.to_string(), value),
        None => (
            parts.join("+"),
            parts
                .iter()
                .map(|name| result.value(name))
                .sum::<Option<f64>>()?,
        ),
    };
    (value > 0.0).then_some((field, value))
}
