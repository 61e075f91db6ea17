//! The model: a sparse sequence of record slots plus the view state the
//! table renders from.
//!
//! This is where the lazy pagination lives. Slots are positional; a slot is
//! `Unloaded` until some fetch window covered it. One fetch may be in flight
//! at a time (the busy flag); window requests made while busy are dropped,
//! not queued. The run loop rescans the viewport every tick, so a dropped
//! request simply gets staged again once the flag clears.

use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::api::{FetchOutcome, FetchWindow, PageQuery, ProductRecord};
use crate::domain::{COLUMNS, ColumnSpec, LtvConfig, LtvError, Message, PAGE_SIZES, PageSize};
use crate::input::{InputResult, Inputter};
use crate::ui::{CMDLINE_HEIGHT, HEADER_BAR_HEIGHT, TABLE_HEADER_HEIGHT};

/// One positional entry in the display sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Unloaded,
    Loaded(ProductRecord),
}

#[derive(Debug, PartialEq)]
pub enum Status {
    Running,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Help,
    Picker,
    Input,
}

/// Per-column view state on top of the static catalog.
struct ColumnState {
    spec: ColumnSpec,
    visible: bool,
    filter: String,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(HEADER_BAR_HEIGHT + TABLE_HEADER_HEIGHT + CMDLINE_HEIGHT)
            .max(1);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct ColumnHeading {
    pub field: &'static str,
    pub header: String,
    pub has_filter: bool,
}

/// One viewport row as the UI renders it. Unloaded slots become skeletons;
/// `even` carries the row parity for the alternating fill width.
pub enum ViewRow {
    Loaded(Vec<String>),
    Skeleton { even: bool },
}

pub struct PickerView {
    pub entries: Vec<(String, bool)>,
    pub cursor: usize,
}

pub struct InputView {
    pub field: &'static str,
    pub input: InputResult,
}

/// Snapshot of everything the UI needs for one frame.
pub struct UIData {
    pub endpoint_host: String,
    pub page_size_label: String,
    pub loaded: usize,
    pub total: usize,
    pub nrows: usize,
    pub busy: bool,
    pub columns: Vec<ColumnHeading>,
    pub rows: Vec<ViewRow>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_help: bool,
    pub picker: Option<PickerView>,
    pub cmdinput: Option<InputView>,
    pub status_line: String,
    pub max_column_width: usize,
}

pub struct Model {
    config: LtvConfig,
    pub status: Status,
    modus: Modus,

    // The sparse sequence and its bookkeeping.
    slots: Vec<Slot>,
    total_records: usize,
    busy: bool,
    staged: Option<FetchWindow>,

    // View state.
    columns: Vec<ColumnState>,
    page_size: PageSize,
    cursor_row: usize,
    offset_row: usize,
    cursor_col: usize,
    layout: UILayout,

    clipboard: Option<Clipboard>,
    input: Inputter,
    filter_target: Option<usize>,
    picker_pending: Vec<bool>,
    picker_cursor: usize,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &LtvConfig, ui_width: usize, ui_height: usize) -> Result<Self, LtvError> {
        let columns = COLUMNS
            .iter()
            .map(|spec| ColumnState {
                spec: *spec,
                visible: true,
                filter: String::new(),
            })
            .collect();
        Ok(Self {
            config: config.clone(),
            status: Status::Running,
            modus: Modus::Table,
            slots: Vec::new(),
            total_records: 0,
            busy: false,
            staged: None,
            columns,
            page_size: config.page_size,
            cursor_row: 0,
            offset_row: 0,
            cursor_col: 0,
            layout: UILayout::from_values(ui_width, ui_height),
            clipboard: None,
            input: Inputter::default(),
            filter_target: None,
            picker_pending: Vec::new(),
            picker_cursor: 0,
            status_message: "Loading ...".to_string(),
            last_status_message_update: Instant::now(),
        })
    }

    // -------------------- Lazy pagination core -------------------- //

    /// Stage one fetch for the window starting at `first`. Dropped while a
    /// fetch is in flight.
    pub fn request_window(&mut self, first: usize, rows: PageSize) {
        if self.busy {
            trace!("Fetch in flight, dropping window request at {first}");
            return;
        }
        let query = self.build_query(first, rows);
        debug!("Staging window at {first}: {query:?}");
        self.busy = true;
        self.staged = Some(FetchWindow { first, rows, query });
    }

    /// Hand the staged window to the run loop for dispatch.
    pub fn take_staged(&mut self) -> Option<FetchWindow> {
        self.staged.take()
    }

    fn build_query(&self, first: usize, rows: PageSize) -> PageQuery {
        let (limit, skip) = match rows {
            PageSize::Rows(n) => (n, first),
            // The reference server treats limit=0 as "everything", which is
            // what an All request before the first response amounts to.
            PageSize::All => (self.total_records, 0),
        };
        let filters = self
            .columns
            .iter()
            .filter(|c| !c.filter.is_empty())
            .map(|c| (c.spec.field.to_string(), c.filter.clone()))
            .collect();
        PageQuery {
            limit,
            skip,
            filters,
        }
    }

    /// Merge one completed fetch. Clearing the busy flag is the only thing
    /// guaranteed on both paths.
    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        self.busy = false;
        let window = outcome.window;
        match outcome.result {
            Ok(page) => {
                self.total_records = page.total;
                let returned = page.products.len();
                match window.rows {
                    PageSize::All => {
                        self.slots = page.products.into_iter().map(Slot::Loaded).collect();
                    }
                    PageSize::Rows(_) => {
                        // Grow with placeholders up to the known total, then
                        // overwrite the fetched range. A shrinking total never
                        // truncates; stale trailing slots stay until a reset.
                        if self.slots.len() < self.total_records {
                            self.slots.resize(self.total_records, Slot::Unloaded);
                        }
                        if self.slots.len() < window.first + returned {
                            self.slots.resize(window.first + returned, Slot::Unloaded);
                        }
                        for (i, record) in page.products.into_iter().enumerate() {
                            self.slots[window.first + i] = Slot::Loaded(record);
                        }
                    }
                }
                info!(
                    "Loaded window at {} ({} records) in {}ms",
                    window.first, returned, outcome.elapsed_ms
                );
                self.set_status_message(format!(
                    "Loaded {} of {} records in {}ms",
                    self.loaded_count(),
                    self.total_records,
                    outcome.elapsed_ms
                ));
                self.clamp_cursor();
            }
            Err(e) => {
                error!("Fetching window at {} failed: {e}", window.first);
                self.set_status_message(format!("Fetch failed: {e}"));
            }
        }
    }

    /// Stage a fetch for the first unloaded slot the viewport shows. This is
    /// the poll-driven stand-in for a virtualizer re-firing its lazy-load
    /// callback on render.
    pub fn scan_viewport(&mut self) {
        if self.busy {
            return;
        }
        let begin = self.offset_row;
        let end = (begin + self.layout.table_height).min(self.row_count());
        for idx in begin..end {
            if !matches!(self.slots.get(idx), Some(Slot::Loaded(_))) {
                self.request_window(idx, self.page_size);
                return;
            }
        }
    }

    pub fn set_page_size(&mut self, value: PageSize) {
        debug!("Rows per page set to {}", value.label());
        self.page_size = value;
        self.reset_sequence();
        self.set_status_message(format!("Rows per page: {}", value.label()));
        self.request_window(0, value);
    }

    pub fn set_filter(&mut self, field: &str, text: &str) {
        let Some(column) = self.columns.iter_mut().find(|c| c.spec.field == field) else {
            debug!("Ignoring filter for unknown field {field}");
            return;
        };
        debug!("Filter {field}={text:?}");
        column.filter = text.to_string();
        self.reset_sequence();
        self.request_window(0, self.page_size);
    }

    /// Pure view-state update; no fetch.
    pub fn set_visible_columns(&mut self, selection: &[bool]) {
        for (column, &visible) in self.columns.iter_mut().zip(selection) {
            column.visible = visible;
        }
        let ncols = self.visible_indices().len();
        self.cursor_col = self.cursor_col.min(ncols.saturating_sub(1));
    }

    fn reset_sequence(&mut self) {
        self.slots.clear();
        self.cursor_row = 0;
        self.offset_row = 0;
    }

    fn row_count(&self) -> usize {
        self.total_records.max(self.slots.len())
    }

    fn loaded_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Loaded(_)))
            .count()
    }

    fn visible_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible)
            .map(|(i, _)| i)
            .collect()
    }

    // ------------------------- Update loop ------------------------ //

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Input
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Message) -> Result<(), LtvError> {
        match message {
            // Completions and resizes apply in every modus.
            Message::WindowLoaded(outcome) => {
                self.apply_outcome(outcome);
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            _ => {}
        }

        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageDown => self.move_selection_down(self.layout.table_height),
                Message::MovePageUp => self.move_selection_up(self.layout.table_height),
                Message::MoveBeginning => self.place_cursor(0),
                Message::MoveEnd => self.place_cursor(self.row_count().saturating_sub(1)),
                Message::FilterColumn => self.begin_filter_input(),
                Message::CyclePageSize => self.cycle_page_size(),
                Message::PickColumns => self.open_picker(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Refresh => self.request_window(self.offset_row, self.page_size),
                Message::Help => self.modus = Modus::Help,
                _ => (),
            },
            Modus::Help => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help | Message::Enter => self.modus = Modus::Table,
                _ => (),
            },
            Modus::Picker => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => {
                    if self.picker_cursor + 1 < self.picker_pending.len() {
                        self.picker_cursor += 1;
                    }
                }
                Message::MoveUp => self.picker_cursor = self.picker_cursor.saturating_sub(1),
                Message::Toggle => {
                    if let Some(flag) = self.picker_pending.get_mut(self.picker_cursor) {
                        *flag = !*flag;
                    }
                }
                Message::Enter => {
                    let selection = std::mem::take(&mut self.picker_pending);
                    self.set_visible_columns(&selection);
                    self.modus = Modus::Table;
                }
                Message::Exit => self.modus = Modus::Table,
                _ => (),
            },
            Modus::Input => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.layout.width, width, self.layout.height, height
        );
        self.layout = UILayout::from_values(width, height);
        self.clamp_cursor();
    }

    // ---------------------- Control handling ---------------------- //

    fn cycle_page_size(&mut self) {
        let next = match PAGE_SIZES.iter().position(|p| *p == self.page_size) {
            Some(i) => PAGE_SIZES[(i + 1) % PAGE_SIZES.len()],
            None => PAGE_SIZES[0],
        };
        self.set_page_size(next);
    }

    fn begin_filter_input(&mut self) {
        let Some(&catalog_idx) = self.visible_indices().get(self.cursor_col) else {
            self.set_status_message("No column selected");
            return;
        };
        self.filter_target = Some(catalog_idx);
        self.modus = Modus::Input;
        self.input.clear();
        self.input.set(&self.columns[catalog_idx].filter);
    }

    fn raw_input(&mut self, key: KeyEvent) {
        let result = self.input.read(key);
        if result.finished {
            self.modus = Modus::Table;
            if let Some(idx) = self.filter_target.take()
                && !result.canceled
            {
                let field = self.columns[idx].spec.field;
                self.set_filter(field, &result.input);
            }
            self.input.clear();
        }
    }

    fn open_picker(&mut self) {
        self.picker_pending = self.columns.iter().map(|c| c.visible).collect();
        self.picker_cursor = 0;
        self.modus = Modus::Picker;
    }

    fn place_cursor(&mut self, abs: usize) {
        let height = self.layout.table_height;
        if abs < self.offset_row {
            self.offset_row = abs;
            self.cursor_row = 0;
        } else if abs >= self.offset_row + height {
            self.offset_row = abs + 1 - height;
            self.cursor_row = height - 1;
        } else {
            self.cursor_row = abs - self.offset_row;
        }
    }

    fn clamp_cursor(&mut self) {
        let abs = (self.offset_row + self.cursor_row).min(self.row_count().saturating_sub(1));
        self.place_cursor(abs);
    }

    fn move_selection_down(&mut self, step: usize) {
        let nrows = self.row_count();
        if nrows == 0 {
            return;
        }
        let abs = (self.offset_row + self.cursor_row + step).min(nrows - 1);
        self.place_cursor(abs);
    }

    fn move_selection_up(&mut self, step: usize) {
        let abs = (self.offset_row + self.cursor_row).saturating_sub(step);
        self.place_cursor(abs);
    }

    fn move_selection_left(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        let ncols = self.visible_indices().len();
        if ncols > 0 && self.cursor_col + 1 < ncols {
            self.cursor_col += 1;
        }
    }

    fn copy_cell(&mut self) {
        let abs = self.offset_row + self.cursor_row;
        let Some(&catalog_idx) = self.visible_indices().get(self.cursor_col) else {
            return;
        };
        match self.slots.get(abs) {
            Some(Slot::Loaded(record)) => {
                let cell = record.field_text(self.columns[catalog_idx].spec.field);
                self.clipboard_set(cell);
                self.set_status_message("Copied cell to clipboard");
            }
            _ => self.set_status_message("Row not loaded yet"),
        }
    }

    fn copy_row(&mut self) {
        let abs = self.offset_row + self.cursor_row;
        match self.slots.get(abs) {
            Some(Slot::Loaded(record)) => {
                let content = self
                    .visible_indices()
                    .iter()
                    .map(|&ci| {
                        Model::wrap_cell_content(&record.field_text(self.columns[ci].spec.field))
                    })
                    .collect::<Vec<String>>();
                self.clipboard_set(content.join(","));
                self.set_status_message("Copied row to clipboard");
            }
            _ => self.set_status_message("Row not loaded yet"),
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace("\"", "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn clipboard_set(&mut self, text: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => debug!("Clipboard unavailable: {e:?}"),
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(text) {
                Ok(_) => trace!("Copied content to clipboard."),
                Err(e) => trace!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    // --------------------------- UI data -------------------------- //

    fn status_line(&self) -> String {
        if self.last_status_message_update.elapsed() < self.config.status_message_ttl {
            return self.status_message.clone();
        }
        let active = self
            .columns
            .iter()
            .filter(|c| !c.filter.is_empty())
            .map(|c| format!("{}={}", c.spec.field, c.filter))
            .collect::<Vec<String>>();
        let mut line = format!(
            "{} records, {} loaded",
            self.total_records,
            self.loaded_count()
        );
        if !active.is_empty() {
            line.push_str(&format!(", filter {}", active.join(" ")));
        }
        line
    }

    pub fn get_uidata(&self) -> UIData {
        let visible = self.visible_indices();
        let columns = visible
            .iter()
            .map(|&ci| {
                let column = &self.columns[ci];
                ColumnHeading {
                    field: column.spec.field,
                    header: column.spec.header.to_string(),
                    has_filter: !column.filter.is_empty(),
                }
            })
            .collect();

        let begin = self.offset_row;
        let end = (begin + self.layout.table_height).min(self.row_count());
        let rows = (begin..end)
            .map(|idx| match self.slots.get(idx) {
                Some(Slot::Loaded(record)) => ViewRow::Loaded(
                    visible
                        .iter()
                        .map(|&ci| record.field_text(self.columns[ci].spec.field))
                        .collect(),
                ),
                _ => ViewRow::Skeleton { even: idx % 2 == 0 },
            })
            .collect();

        UIData {
            endpoint_host: self
                .config
                .base_url
                .host_str()
                .unwrap_or("localhost")
                .to_string(),
            page_size_label: self.page_size.label(),
            loaded: self.loaded_count(),
            total: self.total_records,
            nrows: self.row_count(),
            busy: self.busy,
            columns,
            rows,
            selected_row: self.cursor_row,
            selected_column: self.cursor_col,
            abs_selected_row: self.offset_row + self.cursor_row,
            show_help: self.modus == Modus::Help,
            picker: (self.modus == Modus::Picker).then(|| PickerView {
                entries: self
                    .columns
                    .iter()
                    .zip(&self.picker_pending)
                    .map(|(c, &checked)| (c.spec.header.to_string(), checked))
                    .collect(),
                cursor: self.picker_cursor,
            }),
            cmdinput: (self.modus == Modus::Input).then(|| InputView {
                field: self
                    .filter_target
                    .map(|i| self.columns[i].spec.field)
                    .unwrap_or(""),
                input: self.input.get(),
            }),
            status_line: self.status_line(),
            max_column_width: self.config.max_column_width,
        }
    }
}
