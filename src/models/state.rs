use crate::data_source::{HealthReport, PushOutcome, Resolution};
use crate::error::DataSourceError;
use crate::models::config::Config;
use crate::models::model_config::{ModelConfigSet, compute_stats};
use crate::models::scores::EvaluatedPayload;
use tracing::{debug, info, warn};

/// 当前数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Live, // 后端服务
    Mock, // 本地模拟数据
}

impl DataMode {
    pub fn label(&self) -> &'static str {
        match self {
            DataMode::Live => "live",
            DataMode::Mock => "mock",
        }
    }
}

/// 模型配置的加载状态
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// 评测状态数据的加载状态
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationState {
    Loading,
    Ready(EvaluatedPayload),
    Failed(String),
}

/// 请求代数：新请求发出后，旧请求的结果到达时直接丢弃
#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: u64,
    latest_config: u64,
    latest_evaluation: u64,
}

impl RequestTracker {
    pub fn begin_config(&mut self) -> u64 {
        self.issued += 1;
        self.latest_config = self.issued;
        self.issued
    }

    pub fn begin_evaluation(&mut self) -> u64 {
        self.issued += 1;
        self.latest_evaluation = self.issued;
        self.issued
    }

    pub fn is_current_config(&self, generation: u64) -> bool {
        generation == self.latest_config
    }

    pub fn is_current_evaluation(&self, generation: u64) -> bool {
        generation == self.latest_evaluation
    }
}

/// 应用程序状态：数据、数据来源模式和状态栏文本都是显式字段
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub mode: DataMode,
    pub configs: ModelConfigSet,
    pub catalog: Vec<String>,
    pub load: LoadState,
    pub evaluation: EvaluationState,
    pub status: String,
    pub requests: RequestTracker,
}

impl AppState {
    pub fn new(config: Config, catalog: Vec<String>) -> Self {
        Self {
            config,
            mode: DataMode::Live,
            configs: ModelConfigSet::new(),
            catalog,
            load: LoadState::Loading,
            evaluation: EvaluationState::Loading,
            status: "Connecting to backend...".to_string(),
            requests: RequestTracker::default(),
        }
    }

    /// 状态栏中的模型统计
    pub fn stats_line(&self) -> String {
        let stats = compute_stats(&self.configs);
        format!(
            "{} models | {} evaluated | {} pending",
            stats.total_models, stats.completed_eval, stats.pending_eval
        )
    }

    /// 应用一次配置拉取的结果，返回数据是否发生变化
    pub fn apply_config_loaded(
        &mut self,
        generation: u64,
        result: Result<Resolution<ModelConfigSet>, DataSourceError>,
    ) -> bool {
        if !self.requests.is_current_config(generation) {
            debug!(generation, "Discarding superseded config response");
            return false;
        }

        match result {
            Ok(resolution) => {
                self.mode = resolution.mode;
                self.configs = resolution.value;
                self.load = LoadState::Ready;
                let count = self.configs.len();
                self.status = match (resolution.mode, resolution.fallback_reason) {
                    (DataMode::Live, _) => {
                        format!("✅ Connected to backend | models: {}", count)
                    }
                    (DataMode::Mock, Some(reason)) => format!(
                        "⚠️ Backend unavailable ({}), switched to mock mode | models: {}",
                        reason, count
                    ),
                    (DataMode::Mock, None) => format!("⚠️ Mock mode | models: {}", count),
                };
                info!(mode = self.mode.label(), count, "Model configs loaded");
            }
            Err(e) => {
                warn!(error = %e, "Backend and mock data both unavailable");
                self.configs.clear();
                self.load = LoadState::Failed(e.to_string());
                self.status = "❌ Backend unavailable and mock data not loaded".to_string();
            }
        }
        true
    }

    /// 应用一次推送的结果，返回是否需要稍后从后端刷新
    pub fn apply_push(&mut self, generation: u64, outcome: PushOutcome) -> bool {
        if !self.requests.is_current_config(generation) {
            debug!(generation, "Discarding superseded push response");
            return false;
        }

        match outcome {
            PushOutcome::Saved { mode, receipt } => {
                let message = receipt.message.unwrap_or_default();
                self.status = match mode {
                    DataMode::Live => format!("✅ Backend update succeeded | {}", message),
                    DataMode::Mock => format!("✅ Mock data updated | {}", message),
                };
                mode == DataMode::Live
            }
            PushOutcome::FellBack { reason, replacement } => {
                warn!(%reason, "Backend update failed, switching to mock mode");
                self.mode = DataMode::Mock;
                match replacement {
                    Some(configs) => {
                        self.configs = configs;
                        self.load = LoadState::Ready;
                        self.status =
                            "❌ Backend update failed, switched to mock mode".to_string();
                    }
                    None => {
                        self.status =
                            "❌ Backend update failed and mock data not loaded".to_string();
                    }
                }
                false
            }
        }
    }

    /// 应用评测状态数据
    pub fn apply_evaluated(
        &mut self,
        generation: u64,
        result: Result<Resolution<EvaluatedPayload>, DataSourceError>,
    ) -> bool {
        if !self.requests.is_current_evaluation(generation) {
            debug!(generation, "Discarding superseded evaluation response");
            return false;
        }

        self.evaluation = match result {
            Ok(resolution) => {
                if let Some(reason) = resolution.fallback_reason {
                    info!(%reason, "Evaluation data served from mock store");
                }
                EvaluationState::Ready(resolution.value)
            }
            Err(e) => EvaluationState::Failed(format!("Failed to load evaluation data: {}", e)),
        };
        true
    }

    pub fn apply_health(&mut self, result: Result<Resolution<HealthReport>, DataSourceError>) {
        self.status = match result {
            Ok(resolution) => format!(
                "Health ({}): {}{}",
                resolution.mode.label(),
                resolution.value.status,
                resolution
                    .value
                    .message
                    .map(|m| format!(" | {}", m))
                    .unwrap_or_default()
            ),
            Err(e) => format!("❌ Health check failed: {}", e),
        };
    }
}
