use crate::merge::MergedRows;
use crate::window::MonthWindow;
use ftx_client::models::FundingPayment;
use ftx_client::models::SpotMarginHistory;

pub const NARROW_HEADER: [&str; 4] = ["future", "payment", "rate", "time"];
pub const WIDE_HEADER: [&str; 9] = [
    "future",
    "payment",
    "rate",
    "time",
    "coin",
    "cost",
    "borrow_rate",
    "size",
    "borrow_time",
];

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&Cell> for serde_json::Value {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Text(text) => serde_json::Value::from(text.as_str()),
            Cell::Number(number) => serde_json::json!(number),
            Cell::Empty => serde_json::Value::from(""),
        }
    }
}

/// A bold label with a formula to its right.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryCell {
    /// Zero-based row.
    pub row: u32,
    pub label: String,
    pub formula: String,
}

/// Fixed cells next to the data, computing totals over whole columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Zero-based column holding the labels; the formulas go into the column after it.
    pub label_column: u32,
    pub cells: Vec<SummaryCell>,
}

impl Summary {
    pub fn value_column(&self) -> u32 {
        self.label_column + 1
    }
}

/// Everything that goes into one sheet. The sheet's previous content is replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetReport {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub summary: Summary,
}

/// `JAN` for a report over all markets, `JAN BTC-PERP` for a single market.
pub fn sheet_name(window: &MonthWindow, future: Option<&str>) -> String {
    match future {
        Some(future) => format!("{} {future}", window.label()),
        None => window.label().to_string(),
    }
}

pub fn build_report(name: String, rows: MergedRows, hkd_to_usd_rate: f64) -> SheetReport {
    match rows {
        MergedRows::Narrow(payments) => SheetReport {
            name,
            header: NARROW_HEADER.iter().map(|h| h.to_string()).collect(),
            rows: payments.iter().map(funding_cells).collect(),
            summary: narrow_summary(hkd_to_usd_rate),
        },
        MergedRows::Wide(rows) => SheetReport {
            name,
            header: WIDE_HEADER.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    let mut cells = match &row.funding {
                        Some(payment) => funding_cells(payment),
                        None => vec![Cell::Empty; NARROW_HEADER.len()],
                    };
                    cells.extend(match &row.margin {
                        Some(borrow) => margin_cells(borrow),
                        None => vec![Cell::Empty; WIDE_HEADER.len() - NARROW_HEADER.len()],
                    });
                    cells
                })
                .collect(),
            summary: wide_summary(hkd_to_usd_rate),
        },
    }
}

fn funding_cells(payment: &FundingPayment) -> Vec<Cell> {
    vec![
        Cell::Text(payment.future.clone()),
        Cell::Number(payment.payment),
        Cell::Number(payment.rate),
        Cell::Text(payment.time.clone()),
    ]
}

fn margin_cells(borrow: &SpotMarginHistory) -> Vec<Cell> {
    vec![
        Cell::Text(borrow.coin.clone()),
        Cell::Number(borrow.cost),
        Cell::Number(borrow.rate),
        Cell::Number(borrow.size),
        Cell::Text(borrow.time.clone()),
    ]
}

fn summary_cell(row: u32, label: &str, formula: String) -> SummaryCell {
    SummaryCell {
        row,
        label: label.to_string(),
        formula,
    }
}

// F/G, right of the four data columns
fn narrow_summary(hkd_to_usd_rate: f64) -> Summary {
    Summary {
        label_column: 5,
        cells: vec![
            summary_cell(1, "Net (usd)", "=ABS(SUM(B2:B))".to_string()),
            summary_cell(2, "hkd", format!("=MULTIPLY(G2,{hkd_to_usd_rate})")),
            summary_cell(3, "Avg rate", "=AVERAGE(C2:C)".to_string()),
        ],
    }
}

// K/L, right of the nine data columns
fn wide_summary(hkd_to_usd_rate: f64) -> Summary {
    Summary {
        label_column: 10,
        cells: vec![
            summary_cell(1, "Funding (usd)", "=-SUM(B2:B)".to_string()),
            summary_cell(2, "Borrow cost (usd)", "=SUM(F2:F)".to_string()),
            summary_cell(3, "Net (usd)", "=L2-L3".to_string()),
            summary_cell(4, "hkd", format!("=MULTIPLY(L4,{hkd_to_usd_rate})")),
            summary_cell(5, "Avg funding rate", "=AVERAGE(C2:C)".to_string()),
            summary_cell(6, "Avg borrow rate", "=AVERAGE(G2:G)".to_string()),
        ],
    }
}

/// A1 notation for a zero-based cell, e.g. `(1, 5)` is `F2`.
pub fn a1(row: u32, column: u32) -> String {
    let mut letters = String::new();
    let mut column = column + 1;
    while column > 0 {
        let remainder = (column - 1) % 26;
        letters.insert(0, (b'A' + remainder as u8) as char);
        column = (column - 1) / 26;
    }

    format!("{letters}{}", row + 1)
}
