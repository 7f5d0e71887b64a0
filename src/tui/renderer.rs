use crate::evaluation::{EvalTable, EvalView, fit_column_width};
use crate::models::{LoadState, Suite};
use crate::table::ModelRow;
use crate::tui::app::{App, Column, ViewMode};
use crate::tui::utils::{
    band_style, centered_rect, checkbox, mode_color, status_style, truncate,
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

const DATASET_COLUMN_WIDTH: usize = 30;

/// TUI渲染器，负责处理所有UI渲染逻辑
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// 从app结构体中读取数据并渲染
    pub fn draw(&self, f: &mut Frame, app: &App) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.draw_title_bar(f, app, chunks[0]);
        match app.view_mode {
            ViewMode::Models => self.draw_models_view(f, app, chunks[1]),
            ViewMode::Evaluation => self.draw_evaluation_view(f, app, chunks[1]),
        }
        self.draw_status_bar(f, app, chunks[2]);

        if app.show_help {
            self.draw_help(f, app);
        }
    }

    fn draw_title_bar(&self, f: &mut Frame, app: &App, area: Rect) {
        let tab_style = |active: bool| {
            if active {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            }
        };
        let mode = app.state.mode;
        let line = Line::from(vec![
            Span::styled(" EvalBoard ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(" Models ", tab_style(app.view_mode == ViewMode::Models)),
            Span::raw(" "),
            Span::styled(" Evaluation ", tab_style(app.view_mode == ViewMode::Evaluation)),
            Span::raw("  "),
            Span::styled(
                format!("[{}]", mode.label()),
                Style::default().fg(mode_color(mode)).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(app.state.stats_line(), Style::default().fg(Color::Gray)),
        ]);
        f.render_widget(Paragraph::new(line), area);
    }

    /// 模型表格 + 选中模型详情
    fn draw_models_view(&self, f: &mut Frame, app: &App, area: Rect) {
        let block = Block::default()
            .title("Model Configs")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        match &app.state.load {
            LoadState::Loading if app.table.is_empty() => {
                self.draw_message(f, area, block, "Loading model configs...", Color::Gray);
                return;
            }
            LoadState::Failed(message) => {
                self.draw_message(
                    f,
                    area,
                    block.border_style(Style::default().fg(Color::Red)),
                    &format!("Failed to load model configs: {}", message),
                    Color::Red,
                );
                return;
            }
            _ if app.table.is_empty() => {
                self.draw_message(f, area, block, "No models. Press the add key to create one.", Color::Gray);
                return;
            }
            _ => {}
        }

        let proportion = app.state.config.tui.table_panel_proportion.clamp(10, 90);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(proportion),
                Constraint::Percentage(100 - proportion),
            ])
            .split(area);

        self.draw_model_table(f, app, chunks[0], block);
        self.draw_model_details(f, app, chunks[1]);

        if let Some(open) = app.table.dropdown {
            self.draw_dataset_dropdown(f, app, open.row, open.suite, open.cursor);
        }
    }

    fn draw_message(&self, f: &mut Frame, area: Rect, block: Block, message: &str, color: Color) {
        let paragraph = Paragraph::new(message.to_string())
            .style(Style::default().fg(color))
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn draw_model_table(&self, f: &mut Frame, app: &App, area: Rect, block: Block) {
        let header = Row::new(
            Column::ALL
                .iter()
                .map(|c| Cell::from(c.title()).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        );

        let rows = app.table.rows.iter().enumerate().map(|(index, row)| {
            let selected = index == app.selected_row;
            Row::new(Column::ALL.iter().map(|column| {
                let cell = self.model_cell(row, *column);
                if selected && *column == app.selected_column {
                    cell.style(Style::default().bg(Color::Blue).fg(Color::White))
                } else {
                    cell
                }
            }))
        });

        let widths = [
            Constraint::Length(4),
            Constraint::Length(11),
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(DATASET_COLUMN_WIDTH as u16),
            Constraint::Length(9),
            Constraint::Length(DATASET_COLUMN_WIDTH as u16),
            Constraint::Length(5),
            Constraint::Length(5),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = TableState::default().with_selected(Some(app.selected_row));
        f.render_stateful_widget(table, area, &mut state);
    }

    fn model_cell(&self, row: &ModelRow, column: Column) -> Cell<'static> {
        match column {
            Column::Id => Cell::from(row.id.clone()),
            Column::TrainedDate => Cell::from(row.trained_date.clone()),
            Column::TrainedTime => Cell::from(row.trained_time.clone()),
            Column::ModelPath => Cell::from(row.model_path.clone()),
            Column::ModelName => Cell::from(row.model_name.clone()),
            Column::VlmStatus | Column::CotStatus => {
                let suite = if column == Column::VlmStatus {
                    Suite::VlmEvalKit
                } else {
                    Suite::VlmEvalKitCot
                };
                let status = row.status(suite);
                Cell::from(Span::styled(status.label(), status_style(status.not_completed())))
            }
            Column::VlmDatasets | Column::CotDatasets => {
                let suite = if column == Column::VlmDatasets {
                    Suite::VlmEvalKit
                } else {
                    Suite::VlmEvalKitCot
                };
                let summary = &row.picker(suite).summary;
                let style = if summary.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::Magenta)
                };
                Cell::from(Span::styled(
                    truncate(&format!("▾ {}", summary), DATASET_COLUMN_WIDTH),
                    style,
                ))
            }
            Column::Mirb => Cell::from(checkbox(row.mirb)),
            Column::Mmiu => Cell::from(checkbox(row.mmiu)),
        }
    }

    /// 绘制选中模型的完整信息
    fn draw_model_details(&self, f: &mut Frame, app: &App, area: Rect) {
        let Some(row) = app.table.rows.get(app.selected_row) else {
            return;
        };
        let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let field = |key: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{}: ", key), key_style),
                Span::styled(value, Style::default().fg(Color::Green)),
            ])
        };

        let lines = vec![
            field("Model", format!("{} ({})", row.model_name, row.id)),
            field("Path", row.model_path.clone()),
            field("Trained", format!("{} {}", row.trained_date, row.trained_time)),
            field(
                "VLMEvalKit",
                format!(
                    "{} | {}",
                    row.vlm_status.label(),
                    app.committed_datasets(&row.id, Suite::VlmEvalKit)
                ),
            ),
            field(
                "VLM_COT",
                format!(
                    "{} | {}",
                    row.cot_status.label(),
                    app.committed_datasets(&row.id, Suite::VlmEvalKitCot)
                ),
            ),
            field(
                "Benchmarks",
                format!("MIRB {}  mmiu {}", checkbox(row.mirb), checkbox(row.mmiu)),
            ),
        ];

        let details = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(format!("Details - {}", row.id))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(details, area);
    }

    /// 数据集下拉框：弹出的复选框列表
    fn draw_dataset_dropdown(&self, f: &mut Frame, app: &App, row: usize, suite: Suite, cursor: usize) {
        let Some(picker) = app.table.rows.get(row).map(|r| r.picker(suite)) else {
            return;
        };
        let area = centered_rect(40, 60, f.area());

        let items: Vec<ListItem> = picker
            .options
            .iter()
            .map(|option| {
                let style = if option.checked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(
                    format!("{} {}", checkbox(option.checked), option.name),
                    style,
                )))
            })
            .collect();

        let title = format!(
            "{} datasets - model {} ({} selected)",
            suite.label(),
            app.table.rows[row].id,
            picker.selected().len()
        );
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .title_bottom("space toggle · a all · i invert · enter close")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("› ");

        let mut state = ListState::default().with_selected(Some(cursor));
        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_evaluation_view(&self, f: &mut Frame, app: &App, area: Rect) {
        let block = Block::default()
            .title("Evaluation Status")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        match &app.eval_view {
            EvalView::Table(table) => self.draw_eval_table(f, app, table, area, block),
            EvalView::Empty(message) => self.draw_message(f, area, block, message, Color::Gray),
            EvalView::Error(message) => self.draw_message(
                f,
                area,
                block.border_style(Style::default().fg(Color::Red)),
                message,
                Color::Red,
            ),
        }
    }

    /// 两层表头：分区标签行 + 数据集列名行
    fn draw_eval_table(&self, f: &mut Frame, app: &App, table: &EvalTable, area: Rect, block: Block) {
        let settings = &app.state.config.evaluation;
        let inner = block.inner(area);
        f.render_widget(block, area);

        let name_width = settings.name_column_width;
        let column_width = fit_column_width(
            inner.width,
            name_width,
            settings.min_column_width,
            table.columns.len(),
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        // 第一层表头，每个分区标签居中跨越它的列
        let mut section_spans = vec![Span::raw(" ".repeat(name_width as usize + 1))];
        for header in &table.sections {
            let span_width = header.span * (column_width as usize + 1);
            section_spans.push(Span::styled(
                format!("{:^width$}", header.section.label(), width = span_width),
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(section_spans)), chunks[0]);

        let header = Row::new(
            std::iter::once(Cell::from("Model")).chain(
                table
                    .columns
                    .iter()
                    .map(|c| Cell::from(truncate(&c.dataset, column_width as usize))),
            ),
        )
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let visible = chunks[1].height.saturating_sub(1) as usize;
        let offset = app
            .eval_scroll_offset
            .min(table.rows.len().saturating_sub(visible.max(1)));

        let rows = table.rows.iter().skip(offset).map(|row| {
            Row::new(
                std::iter::once(Cell::from(truncate(&row.model, name_width as usize))).chain(
                    row.cells
                        .iter()
                        .map(|cell| Cell::from(Span::styled(cell.text.clone(), band_style(cell.band)))),
                ),
            )
        });

        let widths = std::iter::once(Constraint::Length(name_width))
            .chain(table.columns.iter().map(|_| Constraint::Length(column_width)));

        f.render_widget(Table::new(rows, widths).header(header), chunks[1]);
    }

    fn draw_status_bar(&self, f: &mut Frame, app: &App, area: Rect) {
        let content = match &app.editing {
            Some(edit) => Line::from(vec![
                Span::styled(
                    format!("{} [{}]: ", edit.field.label(), edit.id),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::raw(edit.buffer.clone()),
                Span::styled("█", Style::default().fg(Color::Yellow)),
            ]),
            None => Line::from(app.state.status.clone()),
        };

        let hint = if app.is_editing() {
            "enter save · esc cancel"
        } else if app.pending_delete.is_some() {
            "y confirm · any other key cancels"
        } else {
            "? help"
        };

        let status = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .title_bottom(Line::from(hint).alignment(Alignment::Right))
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(status, area);
    }

    fn draw_help(&self, f: &mut Frame, app: &App) {
        let k = &app.state.config.keybindings;
        let entries = [
            (format!("{}/{}/{}/{}", k.up, k.down, k.left, k.right), "Move selection"),
            (k.toggle.clone(), "Toggle status, checkbox or dataset option"),
            (k.confirm.clone(), "Edit text cell, open or close dataset picker"),
            (k.select_all.clone(), "Select all datasets (open picker)"),
            (k.invert_selection.clone(), "Invert dataset selection (open picker)"),
            (k.add.clone(), "Add model"),
            (k.delete.clone(), "Delete selected model"),
            (k.update.clone(), "Save all changes"),
            (k.refresh.clone(), "Reload from backend"),
            (k.health.clone(), "Health check"),
            (k.reload_mock.clone(), "Reload mock data file"),
            (k.switch_view.clone(), "Switch Models / Evaluation"),
            ("esc".to_string(), "Close picker or cancel edit"),
            (k.quit.clone(), "Quit"),
        ];

        let lines: Vec<Line> = entries
            .into_iter()
            .map(|(key, description)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>14}  ", key),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(description),
                ])
            })
            .collect();

        let area = centered_rect(60, 70, f.area());
        let help = Paragraph::new(lines).block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(Clear, area);
        f.render_widget(help, area);
    }
}
