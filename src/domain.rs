use std::time::Duration;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;
use url::Url;

use crate::api::FetchOutcome;

pub const DEFAULT_ENDPOINT: &str = "https://dummyjson.com/products";

// Rows-per-page steps offered by the page size control.
pub const PAGE_SIZES: [PageSize; 5] = [
    PageSize::Rows(10),
    PageSize::Rows(15),
    PageSize::Rows(25),
    PageSize::Rows(50),
    PageSize::All,
];

/// Number of rows one fetch window covers. `All` asks the server for the
/// complete listing in a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(usize),
    All,
}

impl PageSize {
    pub fn label(&self) -> String {
        match self {
            PageSize::Rows(n) => n.to_string(),
            PageSize::All => "All".to_string(),
        }
    }
}

/// One column of the product listing. The record fields are opaque server
/// data; this catalog names the ones the table knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub header: &'static str,
}

pub const COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec { field: "id", header: "S.No" },
    ColumnSpec { field: "title", header: "Product Title" },
    ColumnSpec { field: "category", header: "Category" },
    ColumnSpec { field: "description", header: "Description" },
    ColumnSpec { field: "brand", header: "Brand" },
];

#[derive(Debug, Error)]
pub enum LtvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{0}")]
    Setup(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct LtvConfig {
    /// Endpoint serving the paginated listing.
    pub base_url: Url,
    /// Rows per fetch window at startup.
    pub page_size: PageSize,
    /// How long the controller waits for a terminal event per tick, in ms.
    pub event_poll_time: u64,
    /// Rendered column width cap.
    pub max_column_width: usize,
    /// How long a transient status message stays up before the status line
    /// falls back to the summary.
    pub status_message_ttl: Duration,
}

impl Default for LtvConfig {
    fn default() -> Self {
        LtvConfig {
            base_url: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            page_size: PageSize::Rows(10),
            event_poll_time: 100,
            max_column_width: 42,
            status_message_ttl: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Help,
    Enter,
    Exit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    FilterColumn,
    CyclePageSize,
    PickColumns,
    Toggle,
    CopyCell,
    CopyRow,
    Refresh,
    Resize(usize, usize),
    RawKey(KeyEvent),
    WindowLoaded(FetchOutcome),
}

pub const HELP_TEXT: &str = "
 ltv - lazy table viewer

 Movement
   j / Down        next row
   k / Up          previous row
   h / Left        previous column
   l / Right       next column
   PageUp/PageDown move one screen
   g / G           first / last row

 Table
   /               filter the current column (Enter applies, Esc cancels,
                   empty input clears the filter)
   r               cycle rows per page (10, 15, 25, 50, All)
   c               choose visible columns (Space toggles, Enter applies)
   y / Y           copy current cell / row to the clipboard
   F5              refetch the visible window

 Other
   ?               this help
   Esc             close popup / cancel input
   q               quit
";
