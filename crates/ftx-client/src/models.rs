use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

pub const MAINNET_URL: &str = "https://ftx.com";

pub trait Request: Serialize {
    const METHOD: Method;
    const SIGNED: bool = true;
    const ENDPOINT: &'static str;
    type Record: DeserializeOwned;
}

/// The outcome of a request the exchange answered with a well-formed HTTP success.
///
/// The exchange wraps every payload in `{success, result}`. A `success: false` (or a body we
/// cannot make sense of) is not the same as "there is nothing to report", so it is kept apart from
/// an empty record list.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    Records(Vec<T>),
    Rejected { reason: String },
}

impl<T> Fetched<T> {
    /// The fetched records, or an empty list if the exchange rejected the request.
    pub fn into_records(self) -> Vec<T> {
        match self {
            Fetched::Records(records) => records,
            Fetched::Rejected { .. } => vec![],
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Fetched::Rejected { .. })
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct Envelope {
    pub(crate) success: bool,
    pub(crate) result: Option<serde_json::Value>,
    pub(crate) error: Option<String>,
}

impl Envelope {
    pub(crate) fn into_fetched<T: DeserializeOwned>(self) -> Fetched<T> {
        if !self.success {
            return Fetched::Rejected {
                reason: self
                    .error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            };
        }

        match self.result.map(serde_json::from_value::<Vec<T>>) {
            Some(Ok(records)) => Fetched::Records(records),
            Some(Err(e)) => Fetched::Rejected {
                reason: format!("unexpected result shape: {e}"),
            },
            None => Fetched::Rejected {
                reason: "missing result".to_string(),
            },
        }
    }
}

/// A funding payment settled on one of the account's perpetual futures.
///
/// A negative `payment` means the account received funding.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FundingPayment {
    pub future: String,
    pub id: u64,
    pub payment: f64,
    pub rate: f64,
    /// ISO-8601 timestamp as reported by the exchange.
    pub time: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountPosition {
    pub future: String,
}

/// Interest charged for a spot margin borrow.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SpotMarginHistory {
    pub coin: String,
    pub cost: f64,
    pub rate: f64,
    pub size: f64,
    pub time: String,
}

/// Get the account's open futures positions.
#[derive(Clone, Debug, Serialize, Default)]
pub struct GetPositionsRequest {}

impl Request for GetPositionsRequest {
    const METHOD: Method = Method::GET;
    const ENDPOINT: &'static str = "/api/positions";
    type Record = AccountPosition;
}

/// Get the funding payments between `start_time` and `end_time` (unix seconds).
#[derive(Clone, Debug, Serialize)]
pub struct GetFundingPaymentsRequest {
    pub start_time: i64,
    pub end_time: i64,
    /// Restrict the payments to a single future, e.g. `BTC-PERP`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future: Option<String>,
}

impl Request for GetFundingPaymentsRequest {
    const METHOD: Method = Method::GET;
    const ENDPOINT: &'static str = "/api/funding_payments";
    type Record = FundingPayment;
}

/// Get the spot margin borrow history between `start_time` and `end_time` (unix seconds).
#[derive(Clone, Debug, Serialize)]
pub struct GetBorrowHistoryRequest {
    pub start_time: i64,
    pub end_time: i64,
}

impl Request for GetBorrowHistoryRequest {
    const METHOD: Method = Method::GET;
    const ENDPOINT: &'static str = "/api/spot_margin/borrow_history";
    type Record = SpotMarginHistory;
}
