use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Spreadsheet {
    #[serde(default)]
    pub(crate) sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Sheet {
    pub(crate) properties: SheetProperties,
}

/// Values for a rectangular A1 range, row by row.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    pub major_dimension: &'static str,
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    pub fn rows(range: impl Into<String>, values: Vec<Vec<Value>>) -> Self {
        Self {
            range: range.into(),
            major_dimension: "ROWS",
            values,
        }
    }
}

/// A single cell addressed by zero-based row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchUpdateValues {
    pub(crate) value_input_option: &'static str,
    pub(crate) data: Vec<ValueRange>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchUpdate {
    pub(crate) requests: Vec<SheetRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum SheetRequest {
    AddSheet {
        properties: NewSheet,
    },
    RepeatCell {
        range: GridRange,
        cell: CellData,
        fields: &'static str,
    },
    /// Without any rows this resets the given `fields` of every cell in the range.
    UpdateCells {
        range: SheetRange,
        fields: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct NewSheet {
    pub(crate) title: String,
}

/// A range covering a whole sheet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetRange {
    pub(crate) sheet_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GridRange {
    pub(crate) sheet_id: i64,
    pub(crate) start_row_index: u32,
    pub(crate) end_row_index: u32,
    pub(crate) start_column_index: u32,
    pub(crate) end_column_index: u32,
}

impl GridRange {
    pub(crate) fn cell(sheet_id: i64, cell: GridCell) -> Self {
        Self {
            sheet_id,
            start_row_index: cell.row,
            end_row_index: cell.row + 1,
            start_column_index: cell.column,
            end_column_index: cell.column + 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellData {
    pub(crate) user_entered_format: CellFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellFormat {
    pub(crate) text_format: TextFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextFormat {
    pub(crate) bold: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchUpdateResponse {
    #[serde(default)]
    pub(crate) replies: Vec<Reply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Reply {
    pub(crate) add_sheet: Option<Sheet>,
}

// The error response from google
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorResponse {
    pub(crate) error: GoogleErrorMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorMessage {
    pub(crate) code: u16,
    pub(crate) message: String,
}
