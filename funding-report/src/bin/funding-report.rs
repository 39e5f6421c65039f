use anyhow::Result;
use funding_report::cli::Opts;
use funding_report::config;
use funding_report::config::Config;
use funding_report::logger;
use funding_report::run;
use funding_report::window;
use funding_report::window::MonthWindow;
use tracing::metadata::LevelFilter;

fn main() -> Result<()> {
    let opts = Opts::read();

    logger::init_tracing(LevelFilter::INFO, opts.json)?;

    // `.env` may set `TZ`, so it is loaded before the window is resolved.
    config::load_env_file(None);

    // The local offset can only be looked up while we are the only thread, i.e. before the
    // runtime starts.
    let (year, month) = window::resolve_target(opts.year, opts.month, window::today_local())?;
    let window = MonthWindow::resolve(year, month, window::local_offset_at)?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let scope = opts.scope();
    let reports = match runtime.block_on(run::execute(config, opts.ftx_url, window, scope)) {
        Ok(reports) => reports,
        Err(e) => {
            tracing::error!("Error occurred: {e:#}");
            std::process::exit(1);
        }
    };

    if reports.iter().any(|report| report.is_failed()) {
        std::process::exit(1);
    }

    Ok(())
}
