use crate::run::Scope;
use clap::Parser;
use ftx_client::models::MAINNET_URL;
use url::Url;

#[derive(Parser)]
#[clap(about = "Write a month of FTX funding payments into a Google spreadsheet")]
pub struct Opts {
    /// The year to report on, defaults to the current year.
    #[clap(short, long)]
    pub year: Option<i32>,

    /// The month to report on (1-12), defaults to the current month.
    #[clap(short, long, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub month: Option<u8>,

    /// Write all markets into a single sheet instead of one sheet per open position.
    #[clap(long)]
    pub single: bool,

    /// If enabled logs will be in json format
    #[clap(short, long)]
    pub json: bool,

    /// The FTX REST API to query. Only scheme, host and port are used, any path is ignored.
    #[clap(long, default_value = MAINNET_URL)]
    pub ftx_url: Url,
}

impl Opts {
    // use this method to parse the options from the cli.
    pub fn read() -> Opts {
        Opts::parse()
    }

    pub fn scope(&self) -> Scope {
        if self.single {
            Scope::Single
        } else {
            Scope::PerMarket
        }
    }
}
