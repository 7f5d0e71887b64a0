use crate::data_source::{DataSourceResolver, Resolution};
use crate::editor::collect;
use crate::error::DataSourceError;
use crate::models::{DataMode, EvaluationState, ModelConfig, ModelConfigSet};
use crate::tui::app::Command;
use crate::tui::event::BackendEvent;
use crate::tui::{App, Event, EventHandler, InputHandler, Renderer};
use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::KeyEvent;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// TUI应用控制器，负责协调各个组件
///
/// 主循环只在本线程修改状态；访问数据源的操作都在短生命周期的工作线程中执行，
/// 结果通过事件通道送回主循环。
pub struct TuiApp {
    app: App,
    resolver: DataSourceResolver,
    input_handler: InputHandler,
    renderer: Renderer,
    events: EventHandler,
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TuiApp {
    pub fn new(app: App, resolver: DataSourceResolver) -> Result<Self> {
        // 设置终端
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("Failed to create terminal")?;

        let input_handler = InputHandler::new(app.state.config.keybindings.clone());
        let renderer = Renderer::new();
        // 使用配置中的刷新率
        let tick_rate = Duration::from_millis(app.state.config.tui.refresh_rate_ms);
        let events = EventHandler::new(tick_rate);

        Ok(Self {
            app,
            resolver,
            input_handler,
            renderer,
            events,
            terminal,
        })
    }

    /// 运行TUI应用主循环，无论成功与否都恢复终端
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_loop();
        let cleanup = self.cleanup();
        result.and(cleanup)
    }

    fn run_loop(&mut self) -> Result<()> {
        self.execute(Command::LoadConfig);
        self.execute(Command::LoadEvaluation);

        loop {
            // 渲染界面
            self.terminal
                .draw(|f| self.renderer.draw(f, &self.app))
                .context("Failed to draw frame")?;

            // 处理事件
            match self.events.next().context("Event channel closed")? {
                Event::Input(key) => self.handle_key(key),
                Event::Backend(event) => self.handle_backend_event(event),
                Event::Tick => {}
            }

            if self.app.should_quit {
                info!("Quit requested");
                return Ok(());
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let command = if self.app.is_editing() {
            self.app.handle_edit_key(key);
            None
        } else if self.app.pending_delete.is_some() {
            self.app.handle_delete_prompt(key)
        } else {
            let action = self.input_handler.handle_key_event(key);
            self.app.handle_action(action)
        };

        if let Some(command) = command {
            self.execute(command);
        }
    }

    /// 在工作线程中执行，结果作为事件发回
    fn spawn_worker<F>(&self, job: F)
    where
        F: FnOnce(&DataSourceResolver) -> BackendEvent + Send + 'static,
    {
        let resolver = self.resolver.clone();
        let tx: Sender<Event> = self.events.sender();
        thread::spawn(move || {
            let event = job(&resolver);
            // 主循环已退出时丢弃结果
            let _ = tx.send(Event::Backend(event));
        });
    }

    fn execute(&mut self, command: Command) {
        debug!(?command, "Executing command");
        let state = &mut self.app.state;

        match command {
            Command::LoadConfig => {
                let generation = state.requests.begin_config();
                state.status = "Loading model configs...".to_string();
                self.spawn_worker(move |resolver| BackendEvent::ConfigLoaded {
                    generation,
                    result: resolver.fetch_config(),
                });
            }
            Command::LoadEvaluation => {
                let generation = state.requests.begin_evaluation();
                state.evaluation = EvaluationState::Loading;
                self.app.refresh_eval_view();
                self.spawn_worker(move |resolver| BackendEvent::Evaluated {
                    generation,
                    result: resolver.fetch_evaluated(),
                });
            }
            Command::Push => self.push(),
            Command::AddModel => {
                let today = Local::now().format("%Y-%m-%d").to_string();
                let id = self.resolver.add_model(
                    state.mode,
                    &mut state.configs,
                    ModelConfig::new_entry(today),
                );
                state.status = format!("Model {} added", id);
                self.app.rebuild_table();
                self.app.select_id(&id);
            }
            Command::Delete(id) => {
                match self.resolver.delete_model(state.mode, &mut state.configs, &id) {
                    Ok(outcome) => {
                        state.status = format!("✅ {}", outcome.message);
                        self.app.rebuild_table();
                        if outcome.needs_push {
                            self.push();
                        }
                    }
                    Err(e) => {
                        warn!(id = %id, error = %e, "Delete rejected");
                        state.status = format!("❌ Delete failed: {}", e);
                    }
                }
            }
            Command::Health => {
                let mode = state.mode;
                state.status = "Checking backend health...".to_string();
                self.spawn_worker(move |resolver| BackendEvent::Health(resolver.health(mode)));
            }
            Command::ReloadMock => {
                if self.resolver.mock().is_none() {
                    state.status = "❌ Mock data is disabled".to_string();
                    return;
                }
                let generation = state.requests.begin_config();
                state.status = "Reloading mock data...".to_string();
                self.spawn_worker(move |resolver| BackendEvent::ConfigLoaded {
                    generation,
                    result: reload_mock(resolver),
                });
            }
        }
    }

    /// 收集表格中的值并推送整个映射
    fn push(&mut self) {
        let state = &mut self.app.state;
        let configs = collect(&mut state.configs, &mut self.app.table);
        state.configs = configs.clone();

        let generation = state.requests.begin_config();
        let mode = state.mode;
        state.status = match mode {
            DataMode::Live => "Saving to backend...".to_string(),
            DataMode::Mock => "Saving to mock data...".to_string(),
        };
        info!(mode = mode.label(), count = configs.len(), "Pushing model configs");
        self.spawn_worker(move |resolver| BackendEvent::Pushed {
            generation,
            outcome: resolver.push_config(mode, &configs),
        });
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        let state = &mut self.app.state;

        match event {
            BackendEvent::ConfigLoaded { generation, result } => {
                if state.apply_config_loaded(generation, result) {
                    state.catalog = self.resolver.catalog();
                    self.app.rebuild_table();
                }
            }
            BackendEvent::Pushed {
                generation,
                outcome,
            } => {
                let mode_before = state.mode;
                let refresh = state.apply_push(generation, outcome);
                if state.mode != mode_before {
                    self.app.rebuild_table();
                }
                if refresh {
                    self.schedule_refresh();
                }
            }
            BackendEvent::Evaluated { generation, result } => {
                if state.apply_evaluated(generation, result) {
                    self.app.refresh_eval_view();
                }
            }
            BackendEvent::Health(result) => state.apply_health(result),
            BackendEvent::RefreshDue => self.execute(Command::LoadConfig),
        }
    }

    /// 后端更新成功后延迟一段时间再重新拉取
    fn schedule_refresh(&self) {
        let delay = Duration::from_millis(self.app.state.config.backend.refresh_after_update_ms);
        let tx = self.events.sender();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(Event::Backend(BackendEvent::RefreshDue));
        });
    }

    // 清理终端设置
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        self.terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}

/// 重新读取模拟数据文件，结果按模拟模式的拉取结果处理
fn reload_mock(
    resolver: &DataSourceResolver,
) -> Result<Resolution<ModelConfigSet>, DataSourceError> {
    let mock = resolver
        .mock()
        .ok_or_else(|| DataSourceError::MockUnavailable("mock data is disabled".to_string()))?;
    let configs = mock.reload();
    let stats = mock.stats();
    info!(
        models = stats.models.total_models,
        last_update = %stats.last_update.format("%H:%M:%S"),
        metadata = %stats.metadata,
        "Mock data reloaded"
    );
    Ok(Resolution {
        value: configs,
        mode: DataMode::Mock,
        fallback_reason: None,
    })
}
