use crate::auth::ServiceAccount;
use crate::models::BatchUpdate;
use crate::models::BatchUpdateResponse;
use crate::models::BatchUpdateValues;
use crate::models::CellData;
use crate::models::CellFormat;
use crate::models::GoogleErrorResponse;
use crate::models::GridCell;
use crate::models::GridRange;
use crate::models::NewSheet;
use crate::models::SheetProperties;
use crate::models::SheetRange;
use crate::models::SheetRequest;
use crate::models::Spreadsheet;
use crate::models::TextFormat;
use crate::models::ValueRange;
use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use reqwest::Method;
use reqwest::Response;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use std::time::Duration;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_URL: &str = "https://sheets.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Endpoints {
    pub token: Url,
    pub sheets: Url,
}

impl Endpoints {
    pub fn google() -> Result<Self> {
        Ok(Self {
            token: Url::parse(TOKEN_URL)?,
            sheets: Url::parse(SHEETS_URL)?,
        })
    }
}

/// A client bound to a single spreadsheet.
///
/// The access token is obtained once when authenticating and is not refreshed, which is plenty for
/// a single reporting run.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    sheets_url: Url,
    spreadsheet_id: String,
    token: String,
}

impl Client {
    pub async fn authenticate(account: &ServiceAccount, spreadsheet_id: &str) -> Result<Self> {
        Self::authenticate_at(Endpoints::google()?, account, spreadsheet_id).await
    }

    pub async fn authenticate_at(
        endpoints: Endpoints,
        account: &ServiceAccount,
        spreadsheet_id: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build http client")?;

        let token = account.access_token(&client, &endpoints.token).await?;

        Ok(Self {
            client,
            sheets_url: endpoints.sheets,
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        })
    }

    /// All sheets of the spreadsheet.
    pub async fn sheets(&self) -> Result<Vec<SheetProperties>> {
        let mut url = self.url(&[&self.spreadsheet_id])?;
        url.set_query(Some("fields=sheets.properties"));

        let spreadsheet: Spreadsheet = self.send::<(), _>(Method::GET, url, None).await?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .collect())
    }

    pub async fn add_sheet(&self, title: &str) -> Result<SheetProperties> {
        let response = self
            .batch_update(vec![SheetRequest::AddSheet {
                properties: NewSheet {
                    title: title.to_string(),
                },
            }])
            .await?;

        response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|sheet| sheet.properties)
            .with_context(|| format!("No sheet in response to adding '{title}'"))
    }

    /// Clear all values of the given A1 range, e.g. a whole sheet `'JAN'`.
    pub async fn clear(&self, range: &str) -> Result<()> {
        let url = self.url(&[&self.spreadsheet_id, "values", &format!("{range}:clear")])?;

        let _: serde_json::Value = self
            .send(Method::POST, url, Some(&serde_json::json!({})))
            .await?;

        Ok(())
    }

    /// Write several ranges at once. Values are interpreted as if typed in, so strings starting
    /// with `=` become formulas.
    pub async fn batch_update_values(&self, data: Vec<ValueRange>) -> Result<()> {
        let url = self.url(&[&self.spreadsheet_id, "values:batchUpdate"])?;

        let _: serde_json::Value = self
            .send(
                Method::POST,
                url,
                Some(&BatchUpdateValues {
                    value_input_option: "USER_ENTERED",
                    data,
                }),
            )
            .await?;

        Ok(())
    }

    /// Reset the formatting of every cell of a sheet, leaving its values alone.
    pub async fn clear_formats(&self, sheet_id: i64) -> Result<()> {
        self.batch_update(vec![SheetRequest::UpdateCells {
            range: SheetRange { sheet_id },
            fields: "userEnteredFormat",
        }])
        .await?;

        Ok(())
    }

    pub async fn bold(&self, sheet_id: i64, cells: &[GridCell]) -> Result<()> {
        if cells.is_empty() {
            return Ok(());
        }

        let requests = cells
            .iter()
            .map(|cell| SheetRequest::RepeatCell {
                range: GridRange::cell(sheet_id, *cell),
                cell: CellData {
                    user_entered_format: CellFormat {
                        text_format: TextFormat { bold: true },
                    },
                },
                fields: "userEnteredFormat.textFormat.bold",
            })
            .collect();

        self.batch_update(requests).await?;

        Ok(())
    }

    async fn batch_update(&self, requests: Vec<SheetRequest>) -> Result<BatchUpdateResponse> {
        let url = self.url(&[&format!("{}:batchUpdate", self.spreadsheet_id)])?;

        self.send(Method::POST, url, Some(&BatchUpdate { requests }))
            .await
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.sheets_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid sheets url {}", self.sheets_url))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);

        Ok(url)
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        tracing::trace!(%method, %url, "Sending sheets request");

        let mut builder = self.client.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .context("Failed to call sheets api")?;

        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, resp: Response) -> Result<T> {
        let status = resp.status();
        let content = resp.text().await?;
        if status.is_success() {
            match from_str::<T>(&content) {
                Ok(ret) => Ok(ret),
                Err(e) => {
                    bail!("Cannot deserialize '{}'. '{}'", content, e);
                }
            }
        } else {
            match from_str::<GoogleErrorResponse>(&content) {
                Ok(ret) => bail!(
                    "Sheets error {}: {}",
                    ret.error.code,
                    ret.error.message
                ),
                Err(e) => {
                    bail!("Cannot deserialize error '{}'. '{}'", content, e);
                }
            }
        }
    }
}
