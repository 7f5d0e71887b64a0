use crate::editor::{EditEvent, EditField, apply_edit};
use crate::evaluation::{EvalView, build_eval_view};
use crate::models::{AppState, Benchmark, EvaluationState, Suite};
use crate::table::{ClosedDropdown, ModelTable};
use crate::tui::input::UserAction;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::debug;

/// 视图模式：可编辑的模型表格或只读的评测状态表
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewMode {
    Models,
    Evaluation,
}

/// 模型表格中的列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    TrainedDate,
    TrainedTime,
    ModelPath,
    ModelName,
    VlmStatus,
    VlmDatasets,
    CotStatus,
    CotDatasets,
    Mirb,
    Mmiu,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Id,
        Column::TrainedDate,
        Column::TrainedTime,
        Column::ModelPath,
        Column::ModelName,
        Column::VlmStatus,
        Column::VlmDatasets,
        Column::CotStatus,
        Column::CotDatasets,
        Column::Mirb,
        Column::Mmiu,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::TrainedDate => "Date",
            Column::TrainedTime => "Time",
            Column::ModelPath => "Model Path",
            Column::ModelName => "Model Name",
            Column::VlmStatus => Suite::VlmEvalKit.label(),
            Column::VlmDatasets => "VLM Datasets",
            Column::CotStatus => Suite::VlmEvalKitCot.label(),
            Column::CotDatasets => "COT Datasets",
            Column::Mirb => Benchmark::Mirb.label(),
            Column::Mmiu => Benchmark::Mmiu.label(),
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }

    fn shifted(&self, delta: isize) -> Column {
        let next = (self.index() as isize + delta).clamp(0, Self::ALL.len() as isize - 1);
        Self::ALL[next as usize]
    }

    fn text_field(&self) -> Option<EditField> {
        match self {
            Column::TrainedDate => Some(EditField::TrainedDate),
            Column::TrainedTime => Some(EditField::TrainedTime),
            Column::ModelPath => Some(EditField::ModelPath),
            Column::ModelName => Some(EditField::ModelName),
            _ => None,
        }
    }
}

/// 正在编辑的文本单元格
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub id: String,
    pub field: EditField,
    pub buffer: String,
}

/// 需要访问数据源的操作，交给控制器执行
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadConfig,
    LoadEvaluation,
    Push,
    AddModel,
    Delete(String),
    Health,
    ReloadMock,
}

/// TUI应用主结构
pub struct App {
    pub state: AppState,
    pub table: ModelTable,
    pub eval_view: EvalView,
    pub view_mode: ViewMode,
    pub selected_row: usize,
    pub selected_column: Column,
    pub editing: Option<TextEdit>,
    pub pending_delete: Option<String>, // 等待确认删除的模型ID
    pub eval_scroll_offset: usize,
    pub show_help: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(state: AppState) -> Self {
        let mut app = Self {
            table: ModelTable::build(
                &state.configs,
                &state.catalog,
                state.config.table.id_order,
                state.config.table.tag_preview,
            ),
            eval_view: EvalView::Empty("Loading evaluation data...".to_string()),
            state,
            view_mode: ViewMode::Models,
            selected_row: 0,
            selected_column: Column::ModelName,
            editing: None,
            pending_delete: None,
            eval_scroll_offset: 0,
            show_help: false,
            should_quit: false,
        };
        app.refresh_eval_view();
        app
    }

    /// 处理退出操作
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// 数据变化后整体重建表格，打开的下拉框随之丢失
    pub fn rebuild_table(&mut self) {
        let table_config = &self.state.config.table;
        self.table = ModelTable::build(
            &self.state.configs,
            &self.state.catalog,
            table_config.id_order,
            table_config.tag_preview,
        );
        self.selected_row = self.selected_row.min(self.table.len().saturating_sub(1));
        debug!(rows = self.table.len(), "Model table rebuilt");
    }

    pub fn refresh_eval_view(&mut self) {
        self.eval_view = match &self.state.evaluation {
            EvaluationState::Loading => EvalView::Empty("Loading evaluation data...".to_string()),
            EvaluationState::Ready(payload) => build_eval_view(payload),
            EvaluationState::Failed(message) => EvalView::Error(message.clone()),
        };
        self.eval_scroll_offset = 0;
    }

    pub fn selected_id(&self) -> Option<String> {
        self.table.rows.get(self.selected_row).map(|r| r.id.clone())
    }

    pub fn select_id(&mut self, id: &str) {
        if let Some(index) = self.table.row_index(id) {
            self.selected_row = index;
        }
    }

    /// 已写入映射的数据集字符串，下拉框中尚未提交的勾选不计入
    pub fn committed_datasets(&self, id: &str, suite: Suite) -> &str {
        self.state
            .configs
            .get(id)
            .map(|model| model.eval_statu.suite(suite).datasets.as_str())
            .unwrap_or("")
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// 处理映射后的用户操作，需要数据源的操作以 `Command` 返回
    pub fn handle_action(&mut self, action: UserAction) -> Option<Command> {
        if self.show_help {
            // 帮助窗口打开时任意操作都先关闭它
            self.show_help = false;
            return None;
        }

        match action {
            UserAction::Quit => self.quit(),
            UserAction::Help => self.show_help = true,
            UserAction::SwitchView => {
                self.close_dropdown();
                self.view_mode = match self.view_mode {
                    ViewMode::Models => ViewMode::Evaluation,
                    ViewMode::Evaluation => ViewMode::Models,
                };
            }
            UserAction::Refresh => {
                return Some(match self.view_mode {
                    ViewMode::Models => Command::LoadConfig,
                    ViewMode::Evaluation => Command::LoadEvaluation,
                });
            }
            UserAction::Health => return Some(Command::Health),
            UserAction::ReloadMock => return Some(Command::ReloadMock),
            UserAction::MoveUp => self.move_vertical(-1),
            UserAction::MoveDown => self.move_vertical(1),
            UserAction::MoveLeft | UserAction::MoveRight if self.view_mode == ViewMode::Models => {
                if self.table.dropdown.is_none() {
                    let delta = if action == UserAction::MoveLeft { -1 } else { 1 };
                    self.selected_column = self.selected_column.shifted(delta);
                }
            }
            UserAction::Cancel => self.close_dropdown(),
            _ if self.view_mode != ViewMode::Models => {}
            UserAction::Toggle => self.toggle_cell(),
            UserAction::Confirm => self.confirm_cell(),
            UserAction::SelectAll => self.table.select_all_in_dropdown(),
            UserAction::InvertSelection => self.table.invert_dropdown(),
            UserAction::AddModel => {
                self.close_dropdown();
                return Some(Command::AddModel);
            }
            UserAction::Update => return Some(Command::Push),
            UserAction::Delete => self.request_delete(),
            _ => {}
        }
        None
    }

    fn move_vertical(&mut self, delta: isize) {
        match self.view_mode {
            ViewMode::Evaluation => {
                self.eval_scroll_offset = self.eval_scroll_offset.saturating_add_signed(delta);
            }
            ViewMode::Models if self.table.dropdown.is_some() => {
                self.table.move_dropdown_cursor(delta);
            }
            ViewMode::Models => {
                let last = self.table.len().saturating_sub(1);
                self.selected_row = self.selected_row.saturating_add_signed(delta).min(last);
            }
        }
    }

    /// 空格：切换状态、复选框或下拉框中的选项
    fn toggle_cell(&mut self) {
        if self.table.dropdown.is_some() {
            self.table.toggle_dropdown_option();
            return;
        }
        let Some(row) = self.table.rows.get(self.selected_row) else {
            return;
        };
        let id = row.id.clone();
        let event = match self.selected_column {
            Column::VlmStatus | Column::CotStatus => {
                let suite = if self.selected_column == Column::VlmStatus {
                    Suite::VlmEvalKit
                } else {
                    Suite::VlmEvalKitCot
                };
                EditEvent::SetStatus {
                    id,
                    suite,
                    value: row.status(suite).toggled().value,
                }
            }
            Column::Mirb | Column::Mmiu => {
                let benchmark = if self.selected_column == Column::Mirb {
                    Benchmark::Mirb
                } else {
                    Benchmark::Mmiu
                };
                EditEvent::SetFlag {
                    id,
                    benchmark,
                    value: !row.flag(benchmark),
                }
            }
            _ => return self.confirm_cell(),
        };
        self.apply(event);
    }

    /// 回车：开始编辑文本，或打开/关闭数据集下拉框
    fn confirm_cell(&mut self) {
        let suite = match self.selected_column {
            Column::VlmDatasets => Suite::VlmEvalKit,
            Column::CotDatasets => Suite::VlmEvalKitCot,
            column => {
                if let Some(field) = column.text_field() {
                    self.start_edit(field);
                }
                return;
            }
        };
        let closed = self.table.toggle_dropdown(self.selected_row, suite);
        self.commit_dropdown(closed);
    }

    pub fn close_dropdown(&mut self) {
        let closed = self.table.close_dropdown();
        self.commit_dropdown(closed);
    }

    /// 下拉框关闭时把选择写回模型映射
    fn commit_dropdown(&mut self, closed: Option<ClosedDropdown>) {
        if let Some(closed) = closed {
            self.apply(EditEvent::SetDatasets {
                id: closed.id,
                suite: closed.suite,
                datasets: closed.selected,
            });
        }
    }

    fn apply(&mut self, event: EditEvent) {
        if let Err(e) = apply_edit(&mut self.state.configs, &mut self.table, event) {
            self.state.status = format!("❌ {}", e);
        }
    }

    fn start_edit(&mut self, field: EditField) {
        let Some(row) = self.table.rows.get(self.selected_row) else {
            return;
        };
        let buffer = match field {
            EditField::TrainedDate => row.trained_date.clone(),
            EditField::TrainedTime => row.trained_time.clone(),
            EditField::ModelPath => row.model_path.clone(),
            EditField::ModelName => row.model_name.clone(),
        };
        self.editing = Some(TextEdit {
            id: row.id.clone(),
            field,
            buffer,
        });
    }

    /// 文本编辑状态下的按键处理
    pub fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(edit) = self.editing.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => edit.buffer.push(c),
            KeyCode::Backspace => {
                edit.buffer.pop();
            }
            KeyCode::Esc => self.editing = None,
            KeyCode::Enter => {
                if let Some(edit) = self.editing.take() {
                    let label = edit.field.label();
                    match apply_edit(
                        &mut self.state.configs,
                        &mut self.table,
                        EditEvent::SetText {
                            id: edit.id.clone(),
                            field: edit.field,
                            value: edit.buffer,
                        },
                    ) {
                        Ok(()) => self.state.status = format!("{} of model {} changed", label, edit.id),
                        Err(e) => self.state.status = format!("❌ {}", e),
                    }
                }
            }
            _ => {}
        }
    }

    fn request_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.state.status = format!("Delete model {}? (y/n)", id);
            self.pending_delete = Some(id);
        }
    }

    /// 删除确认：y 或回车确认，其他键取消
    pub fn handle_delete_prompt(&mut self, key: KeyEvent) -> Option<Command> {
        let id = self.pending_delete.take()?;
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Command::Delete(id)),
            _ => {
                self.state.status = "Delete cancelled".to_string();
                None
            }
        }
    }
}
