use crate::data_source::{
    DataSource, HealthReport, LiveSource, MockSource, PushOutcome, Resolution,
};
use crate::error::{DataSourceError, Result};
use crate::models::{Config, DataMode, EvaluatedPayload, ModelConfig, ModelConfigSet, next_model_id};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 删除操作的结果
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub message: String,
    pub needs_push: bool, // 后端模式下删除需要立即推送整个映射
}

/// 数据源选择器
///
/// 每个读写操作都先尝试后端（有超时），任何失败都透明地切换到模拟数据，
/// 不做重试，也不做自动重连：模式一直保持到下一次显式拉取。
/// 模式本身保存在 `AppState` 中，选择器只负责给出结果与实际来源。
#[derive(Clone)]
pub struct DataSourceResolver {
    live: Option<Arc<dyn DataSource>>,
    mock: Option<Arc<MockSource>>,
}

impl DataSourceResolver {
    pub fn new(live: Option<Arc<dyn DataSource>>, mock: Option<Arc<MockSource>>) -> Self {
        Self { live, mock }
    }

    pub fn from_config(config: &Config) -> Self {
        let live: Option<Arc<dyn DataSource>> = if config.mock.offline {
            None
        } else {
            Some(Arc::new(LiveSource::from_config(&config.backend)))
        };
        let mock = config
            .mock
            .enabled
            .then(|| Arc::new(MockSource::from_file(&config.mock.data_file)));
        Self::new(live, mock)
    }

    pub fn mock(&self) -> Option<&Arc<MockSource>> {
        self.mock.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.live.is_none()
    }

    /// 数据集目录始终来自模拟数据文件
    pub fn catalog(&self) -> Vec<String> {
        self.mock.as_ref().map(|m| m.catalog()).unwrap_or_default()
    }

    fn require_mock(&self, reason: Option<&str>) -> Result<&Arc<MockSource>> {
        self.mock.as_ref().ok_or_else(|| {
            DataSourceError::MockUnavailable(
                reason.unwrap_or("mock data is disabled").to_string(),
            )
        })
    }

    /// 拉取模型配置：后端优先，失败时返回模拟数据的深拷贝
    #[instrument(skip(self))]
    pub fn fetch_config(&self) -> Result<Resolution<ModelConfigSet>> {
        let reason = match &self.live {
            Some(live) => match live.fetch_config() {
                Ok(configs) => {
                    return Ok(Resolution {
                        value: configs,
                        mode: DataMode::Live,
                        fallback_reason: None,
                    });
                }
                Err(e) => {
                    warn!(source = live.name(), error = %e, "Backend fetch failed, switching to mock mode");
                    Some(e.to_string())
                }
            },
            None => None,
        };

        let mock = self.require_mock(reason.as_deref())?;
        let configs = mock.fetch_config()?;
        info!(count = configs.len(), "Serving model configs from mock data");
        Ok(Resolution {
            value: configs,
            mode: DataMode::Mock,
            fallback_reason: reason,
        })
    }

    /// 推送整个映射
    ///
    /// 模拟模式下直接更新模拟数据，不访问后端；后端模式下失败则切换到
    /// 模拟模式并返回模拟数据用于显示，不重试。
    #[instrument(skip(self, configs), fields(mode = mode.label(), count = configs.len()))]
    pub fn push_config(&self, mode: DataMode, configs: &ModelConfigSet) -> PushOutcome {
        let live = match (mode, &self.live) {
            (DataMode::Live, Some(live)) => live,
            _ => return self.push_to_mock(configs),
        };

        match live.push_config(configs) {
            Ok(receipt) => PushOutcome::Saved {
                mode: DataMode::Live,
                receipt,
            },
            Err(e) => {
                warn!(error = %e, "Backend update failed, switching to mock mode");
                PushOutcome::FellBack {
                    reason: e.to_string(),
                    replacement: self.mock.as_ref().map(|m| m.data()),
                }
            }
        }
    }

    fn push_to_mock(&self, configs: &ModelConfigSet) -> PushOutcome {
        let result = self
            .require_mock(None)
            .and_then(|mock| mock.push_config(configs));
        match result {
            Ok(receipt) => PushOutcome::Saved {
                mode: DataMode::Mock,
                receipt,
            },
            Err(e) => PushOutcome::FellBack {
                reason: e.to_string(),
                replacement: None,
            },
        }
    }

    /// 拉取评测状态，不影响模型配置的模式标志
    #[instrument(skip(self))]
    pub fn fetch_evaluated(&self) -> Result<Resolution<EvaluatedPayload>> {
        let reason = match &self.live {
            Some(live) => match live.fetch_evaluated() {
                Ok(payload) => {
                    return Ok(Resolution {
                        value: payload,
                        mode: DataMode::Live,
                        fallback_reason: None,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Backend evaluation fetch failed, using mock data");
                    Some(e.to_string())
                }
            },
            None => None,
        };

        let mock = self.require_mock(reason.as_deref())?;
        Ok(Resolution {
            value: mock.fetch_evaluated()?,
            mode: DataMode::Mock,
            fallback_reason: reason,
        })
    }

    pub fn health(&self, mode: DataMode) -> Result<Resolution<HealthReport>> {
        let (report, mode) = match (mode, &self.live) {
            (DataMode::Live, Some(live)) => (live.health()?, DataMode::Live),
            _ => (self.require_mock(None)?.health()?, DataMode::Mock),
        };
        Ok(Resolution {
            value: report,
            mode,
            fallback_reason: None,
        })
    }

    /// 新增模型，返回分配的ID；模型同时写入 `configs`
    pub fn add_model(
        &self,
        mode: DataMode,
        configs: &mut ModelConfigSet,
        model: ModelConfig,
    ) -> String {
        let id = match (mode, &self.mock) {
            (DataMode::Mock, Some(mock)) => {
                let id = mock.add_model(model.clone());
                // 模拟数据与本地映射的ID不一致时以本地为准
                if configs.contains_key(&id) {
                    next_model_id(configs)
                } else {
                    id
                }
            }
            _ => next_model_id(configs),
        };
        configs.insert(id.clone(), model);
        id
    }

    /// 删除模型
    ///
    /// 模拟模式下立即从模拟数据中删除，不存在的ID会被拒绝且不修改映射；
    /// 后端模式下从本地映射删除，由调用方随后推送。
    pub fn delete_model(
        &self,
        mode: DataMode,
        configs: &mut ModelConfigSet,
        id: &str,
    ) -> Result<DeleteOutcome> {
        match (mode, &self.mock) {
            (DataMode::Mock, Some(mock)) => {
                let message = mock.delete_model(id)?;
                configs.remove(id);
                Ok(DeleteOutcome {
                    message,
                    needs_push: false,
                })
            }
            _ => {
                if configs.remove(id).is_none() {
                    return Err(DataSourceError::ModelNotFound(id.to_string()));
                }
                Ok(DeleteOutcome {
                    message: format!("Model {} deleted", id),
                    needs_push: true,
                })
            }
        }
    }
}
