//! Ratatui frontend: header bar, virtualized table with skeleton rows,
//! scrollbar, command/status line, and the help and column-picker popups.
//! Renders purely from the model's `UIData` snapshot.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Style, Stylize},
    text::Line,
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
    },
};

use crate::domain::{HELP_TEXT, LtvConfig};
use crate::model::{Model, PickerView, UIData, ViewRow};

pub const HEADER_BAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SKELETON: &str = "░";

pub struct TableUI {
    frame_count: usize,
}

impl TableUI {
    pub fn new(_cfg: &LtvConfig) -> Self {
        Self { frame_count: 0 }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        self.frame_count = self.frame_count.wrapping_add(1);
        let data = model.get_uidata();

        let [header_area, table_area, cmd_area] = Layout::vertical([
            Constraint::Length(HEADER_BAR_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_header_bar(&data, frame, header_area);
        self.draw_table(&data, frame, table_area);
        self.draw_cmdline(&data, frame, cmd_area);

        if data.show_help {
            self.draw_help(frame);
        }
        if let Some(picker) = &data.picker {
            self.draw_picker(picker, frame);
        }
    }

    fn draw_header_bar(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let spinner = if data.busy {
            SPINNER_FRAMES[self.frame_count % SPINNER_FRAMES.len()]
        } else {
            " "
        };
        let line = Line::from(vec![
            " ltv ".bold(),
            "│ ".dim(),
            data.endpoint_host.clone().yellow(),
            format!(" │ rows: {}", data.page_size_label).into(),
            format!(" │ {}/{} loaded ", data.loaded, data.total).into(),
            spinner.cyan(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_table(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let [body_area, scrollbar_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let widths = column_widths(data, body_area.width as usize);

        let header = Row::new(data.columns.iter().map(|col| {
            let marker = if col.has_filter { " *" } else { "" };
            Cell::from(format!("{}{}", col.header, marker))
        }))
        .style(Style::new().bold().underlined());

        let rows = data.rows.iter().enumerate().map(|(ridx, row)| match row {
            ViewRow::Loaded(cells) => {
                let cells = cells.iter().enumerate().map(|(cidx, text)| {
                    let mut cell = Cell::from(text.clone());
                    if ridx == data.selected_row && cidx == data.selected_column {
                        cell = cell.style(Style::new().bold());
                    }
                    cell
                });
                let mut row = Row::new(cells);
                if ridx == data.selected_row {
                    row = row.style(Style::new().reversed());
                }
                row
            }
            ViewRow::Skeleton { even } => Row::new(widths.iter().enumerate().map(|(cidx, w)| {
                let description = data
                    .columns
                    .get(cidx)
                    .is_some_and(|c| c.field == "description");
                Cell::from(skeleton_cell(*w, *even, description)).style(Style::new().dim())
            })),
        });

        let table = Table::new(
            rows,
            widths
                .iter()
                .map(|w| Constraint::Length(*w as u16))
                .collect::<Vec<_>>(),
        )
        .header(header)
        .column_spacing(1);
        frame.render_widget(table, body_area);

        if data.nrows > 0 {
            let mut state = ScrollbarState::new(data.nrows).position(data.abs_selected_row);
            frame.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight),
                scrollbar_area,
                &mut state,
            );
        }
    }

    fn draw_cmdline(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        if let Some(input) = &data.cmdinput {
            let prefix = format!(" {} ❯ ", input.field);
            let prefix_width = prefix.chars().count();
            let line = Line::from(vec![prefix.bold(), input.input.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);

            let x = area.x + (prefix_width + input.input.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(
                x.min(area.right().saturating_sub(1)),
                area.y,
            ));
        } else {
            frame.render_widget(Paragraph::new(data.status_line.clone().dim()), area);
        }
    }

    fn draw_help(&self, frame: &mut Frame) {
        let area = popup_area(frame.area(), 76, 24);
        frame.render_widget(Clear, area);
        let block = Block::bordered().title(" help ");
        frame.render_widget(Paragraph::new(HELP_TEXT).block(block), area);
    }

    fn draw_picker(&self, picker: &PickerView, frame: &mut Frame) {
        let area = popup_area(frame.area(), 32, picker.entries.len() as u16 + 2);
        frame.render_widget(Clear, area);

        let lines: Vec<Line> = picker
            .entries
            .iter()
            .enumerate()
            .map(|(i, (label, checked))| {
                let mark = if *checked { "[x]" } else { "[ ]" };
                let line = Line::from(format!(" {mark} {label}"));
                if i == picker.cursor {
                    line.reversed()
                } else {
                    line
                }
            })
            .collect();

        let block = Block::bordered()
            .title(" columns ")
            .title_bottom(Line::from(" Space toggles, Enter applies ").dim());
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Content-fit widths, capped, with the description column soaking up
/// whatever is left over.
fn column_widths(data: &UIData, total_width: usize) -> Vec<usize> {
    let ncols = data.columns.len();
    if ncols == 0 {
        return Vec::new();
    }
    let mut widths: Vec<usize> = data
        .columns
        .iter()
        .enumerate()
        .map(|(cidx, col)| {
            let content = data
                .rows
                .iter()
                .filter_map(|row| match row {
                    ViewRow::Loaded(cells) => Some(cells[cidx].chars().count()),
                    ViewRow::Skeleton { .. } => None,
                })
                .max()
                .unwrap_or(0);
            // Header needs room for the filter marker.
            let header = col.header.chars().count() + 2;
            (content.max(header) + COLUMN_WIDTH_MARGIN).min(data.max_column_width)
        })
        .collect();

    if let Some(di) = data.columns.iter().position(|c| c.field == "description") {
        let spacing = ncols - 1;
        let used: usize = widths
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != di)
            .map(|(_, w)| *w)
            .sum::<usize>()
            + spacing;
        widths[di] = total_width.saturating_sub(used).max(8);
    }
    widths
}

/// Skeleton fill for an unloaded cell. The fill fraction alternates by row
/// parity, with the description column a little narrower on even rows.
fn skeleton_cell(width: usize, even: bool, description: bool) -> String {
    let pct = if even {
        if description { 40 } else { 50 }
    } else {
        70
    };
    SKELETON.repeat(((width * pct) / 100).max(1))
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FetchOutcome, PageResponse};
    use crate::domain::{Message, PageSize};
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;

    fn loaded_model() -> Model {
        let mut model = Model::init(&LtvConfig::default(), 80, 24).unwrap();
        model.request_window(0, PageSize::Rows(10));
        let window = model.take_staged().unwrap();
        let products = (0..10)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": i + 1,
                    "title": format!("Product {i}"),
                    "category": "beauty",
                    "description": "Long lasting",
                    "brand": "Acme"
                }))
                .unwrap()
            })
            .collect();
        model
            .update(Message::WindowLoaded(FetchOutcome {
                window,
                result: Ok(PageResponse {
                    total: 100,
                    products,
                }),
                elapsed_ms: 2,
            }))
            .unwrap();
        model
    }

    fn rendered(model: &Model) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut ui = TableUI::new(&LtvConfig::default());
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn table_shows_headers_records_and_skeletons() {
        let model = loaded_model();
        let screen = rendered(&model);
        assert!(screen.contains("Product Title"));
        assert!(screen.contains("Product 0"));
        assert!(screen.contains("dummyjson.com"));
        // Rows beyond the fetched window render as skeleton fill.
        assert!(screen.contains(SKELETON));
    }

    #[test]
    fn help_popup_renders_the_keymap() {
        let mut model = loaded_model();
        model.update(Message::Help).unwrap();
        let screen = rendered(&model);
        assert!(screen.contains("lazy table viewer"));
    }

    #[test]
    fn picker_popup_lists_columns_with_marks() {
        let mut model = loaded_model();
        model.update(Message::PickColumns).unwrap();
        let screen = rendered(&model);
        assert!(screen.contains("[x] Category"));
    }

    #[test]
    fn skeleton_fill_alternates_by_parity() {
        assert_eq!(skeleton_cell(10, true, false).chars().count(), 5);
        assert_eq!(skeleton_cell(10, false, false).chars().count(), 7);
        assert_eq!(skeleton_cell(10, true, true).chars().count(), 4);
    }

    #[test]
    fn description_column_takes_the_remaining_width() {
        let model = loaded_model();
        let data = model.get_uidata();
        let widths = column_widths(&data, 79);
        let spacing = widths.len() - 1;
        assert_eq!(widths.iter().sum::<usize>() + spacing, 79);
    }
}
