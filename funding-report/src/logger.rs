use anyhow::Context;
use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const RUST_LOG_ENV: &str = "RUST_LOG";

// Tracing log directives config
fn log_base_directives(env: EnvFilter, level: LevelFilter) -> Result<EnvFilter> {
    let filter = env
        .add_directive(Directive::from(level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("rustls=warn".parse()?);
    Ok(filter)
}

// Configure and initialise tracing subsystem
pub fn init_tracing(level: LevelFilter, json_format: bool) -> Result<()> {
    if level == LevelFilter::OFF {
        return Ok(());
    }

    let mut filter = log_base_directives(EnvFilter::new(""), level)?;

    // Parse additional log directives from env variable
    if let Some(Ok(env)) = std::env::var_os(RUST_LOG_ENV).map(|s| s.into_string()) {
        for directive in env.split(',') {
            #[allow(clippy::print_stdout)]
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => println!("WARN ignoring log directive: `{directive}`: {e}"),
            };
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let fmt_layer = if json_format {
        fmt_layer.json().with_timer(UtcTime::rfc_3339()).boxed()
    } else {
        fmt_layer.with_timer(UtcTime::rfc_3339()).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to init tracing")?;

    tracing::debug!("Initialized logger");

    Ok(())
}
