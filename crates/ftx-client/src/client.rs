use crate::models::AccountPosition;
use crate::models::Envelope;
use crate::models::Fetched;
use crate::models::FundingPayment;
use crate::models::GetBorrowHistoryRequest;
use crate::models::GetFundingPaymentsRequest;
use crate::models::GetPositionsRequest;
use crate::models::Request;
use crate::models::SpotMarginHistory;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use hex::encode as hexify;
use reqwest::Method;
use reqwest::Response;
use reqwest::Url;
use ring::hmac;
use serde_json::from_str;
use serde_urlencoded::to_string as to_ustring;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use url::form_urlencoded;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Client {
    url: Url,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl Client {
    /// Endpoints are absolute paths, so only the scheme, host and port of `url` are used.
    pub fn new(url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build http client")?;

        Ok(Self {
            client,
            url,
            credentials: None,
        })
    }

    pub fn with_credentials(self, api_key: impl ToString, secret: impl ToString) -> Self {
        Self {
            credentials: Some(Credentials::new(api_key.to_string(), secret.to_string())),
            ..self
        }
    }

    /// Scope all requests to the given sub-account.
    ///
    /// Has no effect if the client has no credentials.
    pub fn with_subaccount(self, subaccount: impl ToString) -> Self {
        Self {
            credentials: self.credentials.map(|credentials| Credentials {
                subaccount: Some(subaccount.to_string()),
                ..credentials
            }),
            ..self
        }
    }

    /// Retrieve the account's futures positions.
    pub async fn positions(&self) -> Result<Fetched<AccountPosition>> {
        self.send_request(GetPositionsRequest::default()).await
    }

    /// Retrieve the funding payments in `[start_time, end_time]` (unix seconds), optionally for a
    /// single future.
    pub async fn funding_payments(
        &self,
        start_time: i64,
        end_time: i64,
        future: Option<&str>,
    ) -> Result<Fetched<FundingPayment>> {
        self.send_request(GetFundingPaymentsRequest {
            start_time,
            end_time,
            future: future.map(|future| future.to_string()),
        })
        .await
    }

    /// Retrieve the spot margin borrow costs in `[start_time, end_time]` (unix seconds).
    pub async fn spot_margin_borrow_history(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> Result<Fetched<SpotMarginHistory>> {
        self.send_request(GetBorrowHistoryRequest {
            start_time,
            end_time,
        })
        .await
    }

    async fn send_request<R>(&self, req: R) -> Result<Fetched<R::Record>>
    where
        R: Request,
    {
        let mut url = self.url.join(R::ENDPOINT)?;

        // The signature covers the query exactly as it is sent.
        let query = to_ustring(&req)?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }

        let mut builder = self.client.request(R::METHOD, url.clone());

        if R::SIGNED {
            let credentials = match &self.credentials {
                None => {
                    bail!("FTX client not signed in")
                }
                Some(credentials) => credentials,
            };

            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
            let signature = credentials.signature(timestamp, &R::METHOD, &url);
            builder = builder
                .header("FTX-KEY", credentials.api_key.as_str())
                .header("FTX-TS", timestamp.to_string())
                .header("FTX-SIGN", signature);

            if let Some(subaccount) = &credentials.subaccount {
                let subaccount: String =
                    form_urlencoded::byte_serialize(subaccount.as_bytes()).collect();
                builder = builder.header("FTX-SUBACCOUNT", subaccount);
            }
        }

        tracing::debug!(endpoint = R::ENDPOINT, %query, "Sending request");

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Failed to call {}", R::ENDPOINT))?;

        self.handle_response(resp).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: Response,
    ) -> Result<Fetched<T>> {
        let status = resp.status();
        let content = resp.text().await?;
        if !status.is_success() {
            match from_str::<Envelope>(&content) {
                Ok(Envelope {
                    error: Some(error), ..
                }) => bail!("FTX error ({status}): {error}"),
                _ => bail!("FTX request failed ({status}): '{content}'"),
            }
        }

        match from_str::<Envelope>(&content) {
            Ok(envelope) => Ok(envelope.into_fetched()),
            Err(e) => Ok(Fetched::Rejected {
                reason: format!("Cannot deserialize '{content}': {e}"),
            }),
        }
    }
}

#[derive(Clone, Debug)]
struct Credentials {
    api_key: String,
    secret: String,
    subaccount: Option<String>,
}

impl Credentials {
    fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            subaccount: None,
        }
    }

    fn signature(&self, timestamp: u128, method: &Method, url: &Url) -> String {
        // Signature: hex(HMAC_SHA256(apiSecret, timestamp + verb + path + [? + query]))
        let signed_key = hmac::Key::new(hmac::HMAC_SHA256, self.secret.as_bytes());
        let sign_message = match url.query() {
            Some(query) => format!("{}{}{}?{}", timestamp, method.as_str(), url.path(), query),
            None => format!("{}{}{}", timestamp, method.as_str(), url.path()),
        };

        hexify(hmac::sign(&signed_key, sign_message.as_bytes()))
    }
}

#[cfg(test)]
mod test {
    use super::Client;
    use super::Credentials;
    use crate::models::Fetched;
    use anyhow::Result;
    use axum::extract::RawQuery;
    use axum::http::HeaderMap;
    use axum::http::StatusCode;
    use axum::http::Uri;
    use axum::routing::get;
    use axum::Json;
    use axum::Router;
    use reqwest::Method;
    use reqwest::Url;
    use ring::hmac;
    use serde_json::json;
    use std::net::SocketAddr;

    const API_KEY: &str = "LR0RQT6bKjrUNh38eCw9jYC89VDAbRkCogAc_XAm";
    const SECRET: &str = "T4lPid48QtjNxjLUFOcUZghD7CUJ7sTVsfuvQZF2";

    #[test]
    fn test_signature_without_query() -> Result<()> {
        let credentials = Credentials::new(API_KEY, SECRET);
        let sig = credentials.signature(
            1588591511721,
            &Method::GET,
            &Url::parse("https://ftx.com/api/markets")?,
        );
        assert_eq!(
            sig,
            "dbc62ec300b2624c580611858d94f2332ac636bb86eccfa1167a7777c496ee6f"
        );
        Ok(())
    }

    #[test]
    fn test_signature_with_query() -> Result<()> {
        let credentials = Credentials::new(API_KEY, SECRET);
        let url = Url::parse(
            "https://ftx.com/api/funding_payments?start_time=1672531200&end_time=1675209599&future=BTC-PERP",
        )?;

        let sig = credentials.signature(1588591511721, &Method::GET, &url);
        assert_eq!(
            sig,
            "b938116e7bc15ef92db294e759b136b5cd817488811393ee0d11bee552f2e64f"
        );

        // same inputs, same signature
        assert_eq!(sig, credentials.signature(1588591511721, &Method::GET, &url));

        // a different timestamp changes the signature
        assert_eq!(
            credentials.signature(1588591511722, &Method::GET, &url),
            "3314f6c24822f49e7ce25bb74e77cf3eb7e95f4f19c30e4fd0ce1ca439e29a95"
        );
        Ok(())
    }

    #[test]
    fn test_signature_depends_on_secret_and_path() -> Result<()> {
        let credentials = Credentials::new(API_KEY, SECRET);
        let url = Url::parse("https://ftx.com/api/positions")?;
        let sig = credentials.signature(1588591511721, &Method::GET, &url);
        assert_eq!(
            sig,
            "6379373278a65bd23bbacdbbe1951a5f91f121510d083f5037578c8d01081060"
        );

        let other = Credentials::new(API_KEY, "another secret");
        assert_ne!(sig, other.signature(1588591511721, &Method::GET, &url));

        let markets = Url::parse("https://ftx.com/api/markets")?;
        assert_ne!(sig, credentials.signature(1588591511721, &Method::GET, &markets));
        Ok(())
    }

    async fn serve(router: Router) -> Url {
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(router.into_make_service());
        let url = Url::parse(&format!("http://{}", server.local_addr())).unwrap();
        tokio::spawn(server);
        url
    }

    /// Recomputes the signature from what actually arrived on the wire.
    fn verify(headers: &HeaderMap, uri: &Uri) -> bool {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        let message = format!(
            "{}GET{}",
            header("FTX-TS"),
            uri.path_and_query().map(|p| p.as_str()).unwrap_or_default()
        );
        let key = hmac::Key::new(hmac::HMAC_SHA256, SECRET.as_bytes());
        let expected = hex::encode(hmac::sign(&key, message.as_bytes()));

        header("FTX-KEY") == API_KEY && header("FTX-SIGN") == expected
    }

    async fn funding_payments(
        headers: HeaderMap,
        uri: Uri,
        RawQuery(query): RawQuery,
    ) -> (StatusCode, Json<serde_json::Value>) {
        if !verify(&headers, &uri) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "Not logged in"})),
            );
        }

        assert_eq!(
            query.as_deref(),
            Some("start_time=1672531200&end_time=1675209599&future=BTC-PERP")
        );

        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "result": [{
                    "future": "BTC-PERP",
                    "id": 1,
                    "payment": -0.5,
                    "rate": 0.0001,
                    "time": "2023-01-01T00:00:00Z"
                }]
            })),
        )
    }

    #[tokio::test]
    async fn signed_request_is_accepted_by_server() -> Result<()> {
        let url = serve(Router::new().route("/api/funding_payments", get(funding_payments))).await;
        let client = Client::new(url)?.with_credentials(API_KEY, SECRET);

        let payments = client
            .funding_payments(1672531200, 1675209599, Some("BTC-PERP"))
            .await?
            .into_records();

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].future, "BTC-PERP");
        assert_eq!(payments[0].payment, -0.5);
        Ok(())
    }

    #[tokio::test]
    async fn request_without_parameters_is_signed_without_query() -> Result<()> {
        let router = Router::new().route(
            "/api/positions",
            get(|headers: HeaderMap, uri: Uri| async move {
                assert!(uri.query().is_none());
                assert!(verify(&headers, &uri));
                Json(json!({"success": true, "result": [{"future": "ETH-PERP", "size": 1.0}]}))
            }),
        );
        let client = Client::new(serve(router).await)?.with_credentials(API_KEY, SECRET);

        let positions = client.positions().await?;

        assert_eq!(positions.into_records()[0].future, "ETH-PERP");
        Ok(())
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_not_an_error() -> Result<()> {
        let router = Router::new().route(
            "/api/spot_margin/borrow_history",
            get(|| async { Json(json!({"success": false, "result": []})) }),
        );
        let client = Client::new(serve(router).await)?.with_credentials(API_KEY, SECRET);

        let history = client.spot_margin_borrow_history(0, 1).await?;

        assert!(history.is_rejected());
        assert!(history.into_records().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unexpected_body_is_rejected() -> Result<()> {
        let router = Router::new().route("/api/positions", get(|| async { "<html></html>" }));
        let client = Client::new(serve(router).await)?.with_credentials(API_KEY, SECRET);

        assert!(matches!(
            client.positions().await?,
            Fetched::Rejected { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn http_error_is_propagated() -> Result<()> {
        let router = Router::new().route(
            "/api/positions",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "Internal error"})),
                )
            }),
        );
        let client = Client::new(serve(router).await)?.with_credentials(API_KEY, SECRET);

        let error = client.positions().await.unwrap_err();

        assert!(format!("{error:#}").contains("Internal error"));
        Ok(())
    }

    #[tokio::test]
    async fn subaccount_header_is_sent_encoded() -> Result<()> {
        let router = Router::new().route(
            "/api/positions",
            get(|headers: HeaderMap, uri: Uri| async move {
                assert!(verify(&headers, &uri));
                assert_eq!(headers.get("FTX-SUBACCOUNT").unwrap(), "funding%2Fbot");
                Json(json!({"success": true, "result": []}))
            }),
        );
        let client = Client::new(serve(router).await)?
            .with_credentials(API_KEY, SECRET)
            .with_subaccount("funding/bot");

        assert_eq!(client.positions().await?, Fetched::Records(vec![]));
        Ok(())
    }

    #[tokio::test]
    async fn path_of_base_url_is_ignored() -> Result<()> {
        let router = Router::new().route(
            "/api/positions",
            get(|headers: HeaderMap, uri: Uri| async move {
                assert!(verify(&headers, &uri));
                Json(json!({"success": true, "result": [{"future": "BTC-PERP"}]}))
            }),
        );
        let url = serve(router).await.join("/ftx/")?;
        let client = Client::new(url)?.with_credentials(API_KEY, SECRET);

        assert_eq!(client.positions().await?.into_records().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unsigned_client_refuses_signed_requests() -> Result<()> {
        let client = Client::new(Url::parse("http://127.0.0.1:1")?)?;

        assert!(client.positions().await.is_err());
        Ok(())
    }
}
