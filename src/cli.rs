use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::domain::{LtvConfig, LtvError, PageSize, DEFAULT_ENDPOINT};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ltv",
    version,
    about = "A tui based lazy loading table viewer for paginated HTTP APIs",
    long_about = "ltv renders a remote product listing as a lazily loaded, virtually \
scrolled table.\n\nExamples:\n  ltv\n  ltv --url https://dummyjson.com/products --rows 25\n  \
ltv --log-file ~/.ltv/ltv.log"
)]
pub struct CliArgs {
    #[arg(
        short,
        long,
        value_name = "URL",
        default_value = DEFAULT_ENDPOINT,
        help = "Endpoint serving the paginated listing."
    )]
    pub url: String,

    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = 10,
        help = "Rows fetched per page at startup."
    )]
    pub rows: usize,

    #[arg(
        long,
        value_name = "FILE",
        help = "Append diagnostic logs to this file (~ and env vars expand)."
    )]
    pub log_file: Option<String>,

    #[arg(
        long,
        value_name = "MS",
        default_value_t = 100,
        help = "Terminal event poll interval in milliseconds."
    )]
    pub poll_ms: u64,
}

impl CliArgs {
    pub fn into_config(self) -> Result<LtvConfig, LtvError> {
        let base_url = Url::parse(&self.url)?;
        if self.rows == 0 {
            return Err(LtvError::Setup("--rows must be positive".to_string()));
        }
        Ok(LtvConfig::default()
            .with_base_url(base_url)
            .with_page_size(PageSize::Rows(self.rows))
            .with_event_poll_time(self.poll_ms))
    }
}

/// Set up the tracing stack when a log file is given. The terminal belongs to
/// the UI, so without a file there is no subscriber at all.
pub fn init_tracing(log_file: Option<&str>) -> Result<(), LtvError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let path = shellexpand::full(path).map_err(|e| LtvError::Setup(e.to_string()))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
