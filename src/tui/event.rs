use crate::data_source::{HealthReport, PushOutcome, Resolution};
use crate::error::DataSourceError;
use crate::models::{EvaluatedPayload, ModelConfigSet};
use crossterm::event::{self, Event as CEvent, KeyEvent, KeyEventKind};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;

type SourceResult<T> = Result<Resolution<T>, DataSourceError>;

pub enum Event {
    Input(KeyEvent),
    Tick,
    Backend(BackendEvent),
}

/// 后台工作线程完成后发回主循环的结果
#[derive(Debug)]
pub enum BackendEvent {
    ConfigLoaded {
        generation: u64,
        result: SourceResult<ModelConfigSet>,
    },
    Pushed {
        generation: u64,
        outcome: PushOutcome,
    },
    Evaluated {
        generation: u64,
        result: SourceResult<EvaluatedPayload>,
    },
    Health(SourceResult<HealthReport>),
    RefreshDue, // 后端更新成功后延迟刷新
}

pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            Self::event_loop(input_tx, tick_rate);
        });

        EventHandler { rx, tx }
    }

    /// 给工作线程使用的发送端
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    /// 事件循环处理函数，主循环退出后发送失败即结束
    fn event_loop(tx: mpsc::Sender<Event>, tick_rate: Duration) {
        let mut last_tick = Instant::now();

        loop {
            let timeout = Self::calculate_timeout(tick_rate, last_tick);

            // 处理按键事件
            if !Self::process_key_events(&tx, timeout) {
                return;
            }

            // 处理定时器事件
            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    return;
                }
                last_tick = Instant::now();
            }
        }
    }

    /// 处理按键事件，返回事件循环是否应继续
    fn process_key_events(tx: &mpsc::Sender<Event>, timeout: Duration) -> bool {
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                // 只处理按下事件，避免部分终端上一次按键触发两次
                Ok(CEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(Event::Input(key)).is_ok()
                }
                Ok(_) => true,
                Err(e) => {
                    error!(error = %e, "Failed to read terminal event");
                    false
                }
            },
            Ok(false) => true,
            Err(e) => {
                error!(error = %e, "Failed to poll terminal events");
                false
            }
        }
    }

    /// 计算超时时间
    fn calculate_timeout(tick_rate: Duration, last_tick: Instant) -> Duration {
        tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0))
    }

    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
