use crate::config::Config;
use crate::merge::merge;
use crate::report::build_report;
use crate::report::sheet_name;
use crate::sink::ReportSink;
use crate::sink::SheetsSink;
use crate::window::MonthWindow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use ftx_client::models::AccountPosition;
use ftx_client::models::FundingPayment;
use ftx_client::models::SpotMarginHistory;
use ftx_client::Fetched;
use futures::future::join_all;
use sheets_client::ServiceAccount;
use url::Url;

/// The account data a report is built from.
#[async_trait]
pub trait AccountHistory: Send + Sync {
    async fn positions(&self) -> Result<Fetched<AccountPosition>>;

    async fn funding_payments(
        &self,
        window: &MonthWindow,
        future: Option<&str>,
    ) -> Result<Fetched<FundingPayment>>;

    async fn borrow_history(&self, window: &MonthWindow) -> Result<Fetched<SpotMarginHistory>>;
}

#[async_trait]
impl AccountHistory for ftx_client::Client {
    async fn positions(&self) -> Result<Fetched<AccountPosition>> {
        ftx_client::Client::positions(self).await
    }

    async fn funding_payments(
        &self,
        window: &MonthWindow,
        future: Option<&str>,
    ) -> Result<Fetched<FundingPayment>> {
        ftx_client::Client::funding_payments(self, window.start_time(), window.end_time(), future)
            .await
    }

    async fn borrow_history(&self, window: &MonthWindow) -> Result<Fetched<SpotMarginHistory>> {
        self.spot_margin_borrow_history(window.start_time(), window.end_time())
            .await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// One sheet with the payments of all markets.
    Single,
    /// One sheet per future the account holds a position in.
    PerMarket,
}

#[derive(Debug)]
pub enum MarketOutcome {
    Written { sheet: String, records: usize },
    /// The exchange reported no funding payments.
    NotFound,
    /// The exchange refused to answer.
    Rejected { reason: String },
    Failed(anyhow::Error),
}

/// How the report for one market (or for all of them, see [`Scope::Single`]) went.
#[derive(Debug)]
pub struct MarketReport {
    pub market: Option<String>,
    pub outcome: MarketOutcome,
}

impl MarketReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, MarketOutcome::Failed(_))
    }

    fn log(&self) {
        let market = self.market.as_deref().unwrap_or("all markets");
        match &self.outcome {
            MarketOutcome::Written { sheet, records } => {
                tracing::info!(%market, %sheet, %records, "Funding payments written")
            }
            MarketOutcome::NotFound => {
                tracing::warn!(%market, "No funding payments found")
            }
            MarketOutcome::Rejected { reason } => {
                tracing::warn!(%market, %reason, "Funding payments request rejected")
            }
            MarketOutcome::Failed(e) => {
                tracing::error!(%market, "Failed to report funding payments: {e:#}")
            }
        }
    }
}

/// Build the clients from `config` and write the report for `window`.
pub async fn execute(
    config: Config,
    ftx_url: Url,
    window: MonthWindow,
    scope: Scope,
) -> Result<Vec<MarketReport>> {
    let mut ftx = ftx_client::Client::new(ftx_url)?
        .with_credentials(&config.ftx.api_key, &config.ftx.api_secret);
    if let Some(subaccount) = &config.ftx.subaccount {
        tracing::info!(%subaccount, "Using sub-account");
        ftx = ftx.with_subaccount(subaccount);
    }

    let account = ServiceAccount::new(
        &config.google.service_account_email,
        &config.google.private_key,
    )?;
    let sheets = sheets_client::Client::authenticate(&account, &config.google.sheet_id)
        .await
        .context("Failed to authenticate with google")?;

    run(
        &ftx,
        &SheetsSink::new(sheets),
        window,
        scope,
        config.hkd_to_usd_rate,
    )
    .await
}

/// Fetch, merge and write the funding payments of `window`.
///
/// Every market is reported on concurrently and independently; the failure of one does not stop
/// the others. Errors that concern all markets, such as failing to list the positions, abort the
/// run.
pub async fn run(
    history: &dyn AccountHistory,
    sink: &dyn ReportSink,
    window: MonthWindow,
    scope: Scope,
    hkd_to_usd_rate: f64,
) -> Result<Vec<MarketReport>> {
    tracing::info!(
        month = window.label(),
        year = window.year,
        start_time = window.start_time(),
        end_time = window.end_time(),
        ?scope,
        "Getting funding payments"
    );

    let margin = match history
        .borrow_history(&window)
        .await
        .context("Failed to get spot margin borrow history")?
    {
        Fetched::Records(margin) => margin,
        Fetched::Rejected { reason } => {
            tracing::warn!(%reason, "Spot margin borrow history rejected, reporting without");
            vec![]
        }
    };

    let markets: Vec<Option<String>> = match scope {
        Scope::Single => vec![None],
        Scope::PerMarket => {
            let positions = match history
                .positions()
                .await
                .context("Failed to get account positions")?
            {
                Fetched::Records(positions) => positions,
                // Without the positions there is no telling which markets to report on.
                Fetched::Rejected { reason } => bail!("Positions request rejected: {reason}"),
            };

            let mut futures = positions
                .into_iter()
                .map(|position| position.future)
                .collect::<Vec<_>>();
            futures.sort();
            futures.dedup();

            if futures.is_empty() {
                tracing::warn!("No open positions found");
            }

            futures.into_iter().map(Some).collect()
        }
    };

    let reports = join_all(markets.into_iter().map(|market| {
        let margin = margin.clone();
        async move {
            let outcome = match report_market(
                history,
                sink,
                &window,
                market.as_deref(),
                margin,
                hkd_to_usd_rate,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(e) => MarketOutcome::Failed(e),
            };

            MarketReport { market, outcome }
        }
    }))
    .await;

    for report in reports.iter() {
        report.log();
    }

    let failed = reports.iter().filter(|report| report.is_failed()).count();
    tracing::info!(
        markets = reports.len(),
        %failed,
        "Finished reporting funding payments"
    );

    Ok(reports)
}

async fn report_market(
    history: &dyn AccountHistory,
    sink: &dyn ReportSink,
    window: &MonthWindow,
    market: Option<&str>,
    margin: Vec<SpotMarginHistory>,
    hkd_to_usd_rate: f64,
) -> Result<MarketOutcome> {
    let payments = match history.funding_payments(window, market).await? {
        Fetched::Records(payments) => payments,
        Fetched::Rejected { reason } => return Ok(MarketOutcome::Rejected { reason }),
    };

    if payments.is_empty() {
        return Ok(MarketOutcome::NotFound);
    }

    let report = build_report(
        sheet_name(window, market),
        merge(payments, margin),
        hkd_to_usd_rate,
    );
    sink.upsert(&report).await?;

    Ok(MarketOutcome::Written {
        sheet: report.name,
        records: report.rows.len(),
    })
}
