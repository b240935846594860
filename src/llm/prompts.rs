// Instructions sent alongside each report photograph.

use crate::schema::ReportType;

pub const PROMPT_BATCH: &str = r#"
Analyze this Batch Report image and find the dollar amount of the EBT total.
Look for a line containing 'EBT' (or 'E B T'), possibly with the word 'Total'
nearby, and read the amount on that line.
Answer with a single short line such as: EBT: 123.45
If no EBT amount is present, answer NOT_FOUND.
"#;

pub const PROMPT_DAY1: &str = r#"
Analyze this Day Report (page 1) image and extract:
1. The net sales total (labelled 'Net Sales Total', 'Total Net Sales' or similar).
2. The credit amount from the cashier details (exclude MOP sales).
3. The debit amount from the cashier details (exclude MOP sales).

Answer with a JSON object like:
{
  "net_sales_total": 1234.56,
  "credit": 567.89,
  "debit": 123.45
}
Use null for any value you cannot find.
"#;

pub const PROMPT_DAY2: &str = r#"
Analyze this Day Report (page 2) image.

From the Category Report section:
 - the net sales of LOTTERY,
 - the net sales of Fuel Deposit.
From the Tax Report section:
 - the TAXABLE-SALES value,
 - the TAXES value.

Answer with a JSON object like:
{
  "lottery_net": 38.50,
  "fuel_deposit": 1234.56,
  "taxable_sales": 9876.54,
  "taxes": 123.45
}
Use null for any value you cannot find.
"#;

pub const PROMPT_DAY3: &str = r#"
Analyze this Day Report (page 3, FP/HOSE RUNNING RPT) image and read the
PRODUCT TOTALS volume for each product: UNLEADED, PLUS, PREMIUM, DIESEL.

Answer with a JSON object using exactly these keys:
{
  "unleaded": 1234.56,
  "plus": 234.56,
  "premium": 345.67,
  "diesel": 456.78
}
Use null for any value you cannot find.
"#;

pub const PROMPT_HANDWRITTEN: &str = r#"
This image is a handwritten daily report. Extract:
- the Morning shift customer count,
- the Evening shift customer count,
- the Night shift customer count,
- the Total Cash amount,
- the sum of every number listed under the 'Additional' heading,
- the Game In amount,
- the Game Out amount.

Answer with a JSON object like:
{
  "morning": 123,
  "evening": 456,
  "night": 78,
  "total_cash": 1234.56,
  "additional_sum": 45.67,
  "game_in": 300.00,
  "game_out": 120.00
}
Use null for any value you cannot find.
"#;

pub const PROMPT_LOTTO: &str = r#"
Analyze this Lotto Machine Report image and extract:
1. The dollar amount after "DRW GM NET SALES" (or "DRAW GM NET SALES").
2. The dollar amount after "DRW GM CASHES" (or "DRAW GM CASHES").
3. The dollar amount after "SCRATCH CASHES".

Keep decimal points (38.50, not 3850). Drop dollar signs and negative signs:
a value printed as $122.00- is reported as 122.00.

Answer with a JSON object like:
{
  "drw_gm_net_sales": 38.50,
  "drw_gm_cashes": 2.00,
  "scratch_cashes": 122.00
}
Use null for any value you cannot find.
"#;

pub const PROMPT_LOTTO_END: &str = r#"
Read this handwritten report image. Find the 'Daily Lotto' section and its
'End no' column (or similar). List the End no values from top to bottom.

Answer with a JSON object like: {"end_values": [123, 124, 125]}
If the column is not present, answer NOT_FOUND.
"#;

pub const PROMPT_SHIFT_SLIP: &str = r#"
Return only the number of customers shown in this shift report image, or the
text NOT_FOUND if there is none. Look for '#Customers', 'Customers',
'No. of Customers' or similar.
"#;

pub const PROMPT_SHIFT_SUMMARY: &str = r#"
This image shows the customer counts for the morning, evening and night
shifts. Look for '#Customers', 'Customers' or 'No. of Customers' under each
shift.

Answer with a JSON object like:
{
  "morning": 120,
  "evening": 95,
  "night": 14
}
Use null for any count you cannot find.
"#;

/// The instruction sent with each image of a request carrying `image_count` images.
pub fn instruction_for(report: ReportType, image_count: usize) -> &'static str {
    match report {
        ReportType::Batch => PROMPT_BATCH,
        ReportType::Day1 => PROMPT_DAY1,
        ReportType::Day2 => PROMPT_DAY2,
        ReportType::Day3 => PROMPT_DAY3,
        ReportType::Handwritten => PROMPT_HANDWRITTEN,
        ReportType::Lotto => PROMPT_LOTTO,
        ReportType::HandwrittenLottoEnd => PROMPT_LOTTO_END,
        ReportType::Shift if image_count > 1 => PROMPT_SHIFT_SLIP,
        ReportType::Shift => PROMPT_SHIFT_SUMMARY,
    }
}
