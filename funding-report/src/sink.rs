use crate::report::a1;
use crate::report::SheetReport;
use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sheets_client::models::GridCell;
use sheets_client::models::ValueRange;

/// Where finished sheets are written to.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Create the sheet if needed and replace its content with `report`.
    async fn upsert(&self, report: &SheetReport) -> Result<()>;
}

pub struct SheetsSink {
    client: sheets_client::Client,
}

impl SheetsSink {
    pub fn new(client: sheets_client::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSink for SheetsSink {
    async fn upsert(&self, report: &SheetReport) -> Result<()> {
        let sheets = self.client.sheets().await?;

        let sheet = match sheets.into_iter().find(|sheet| sheet.title == report.name) {
            Some(sheet) => {
                tracing::debug!(sheet = %report.name, "Clearing existing sheet");
                self.client.clear(&quote(&report.name)).await?;
                // a previous run may have bolded labels of the other layout
                self.client.clear_formats(sheet.sheet_id).await?;
                sheet
            }
            None => {
                tracing::debug!(sheet = %report.name, "Creating sheet");
                self.client.add_sheet(&report.name).await?
            }
        };

        tracing::info!(sheet = %report.name, records = report.rows.len(), "Writing records");

        self.client
            .batch_update_values(value_ranges(report))
            .await
            .with_context(|| format!("Failed to write sheet {}", report.name))?;

        self.client
            .bold(sheet.sheet_id, &label_cells(report))
            .await
            .with_context(|| format!("Failed to format sheet {}", report.name))?;

        Ok(())
    }
}

/// Sheet names are quoted in A1 ranges since they may contain spaces.
fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn value_ranges(report: &SheetReport) -> Vec<ValueRange> {
    let table = std::iter::once(
        report
            .header
            .iter()
            .map(|header| Value::from(header.as_str()))
            .collect::<Vec<_>>(),
    )
    .chain(
        report
            .rows
            .iter()
            .map(|row| row.iter().map(Value::from).collect()),
    )
    .collect();

    let mut ranges = vec![ValueRange::rows(
        format!("{}!{}", quote(&report.name), a1(0, 0)),
        table,
    )];

    let summary = &report.summary;
    ranges.extend(summary.cells.iter().map(|cell| {
        ValueRange::rows(
            format!("{}!{}", quote(&report.name), a1(cell.row, summary.label_column)),
            vec![vec![
                Value::from(cell.label.as_str()),
                Value::from(cell.formula.as_str()),
            ]],
        )
    }));

    ranges
}

fn label_cells(report: &SheetReport) -> Vec<GridCell> {
    report
        .summary
        .cells
        .iter()
        .map(|cell| GridCell {
            row: cell.row,
            column: report.summary.label_column,
        })
        .collect()
}
