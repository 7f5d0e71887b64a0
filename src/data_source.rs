// data_source.rs - 数据来源：后端服务与本地模拟数据
pub mod live;
pub mod mock;
pub mod resolver;

use crate::error::Result;
use crate::models::{DataMode, EvaluatedPayload, ModelConfigSet};
use serde::Deserialize;

pub use live::LiveSource;
pub use mock::{MockDataManager, MockDataStore, MockDelays, MockDocument, MockSource};
pub use resolver::DataSourceResolver;

/// 推送成功后的回执
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "updatedCount")]
    pub updated_count: Option<usize>,
}

/// 健康检查结果
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// 一次读取操作的结果以及它实际来自哪个数据源
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub value: T,
    pub mode: DataMode,
    pub fallback_reason: Option<String>, // 回退到模拟数据的原因
}

/// 推送操作的结果
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Saved {
        mode: DataMode,
        receipt: PushReceipt,
    },
    // ————————————————————————————————————————————————————————————————————————
    // 后端推送失败，切换到模拟数据；模拟数据不可用时 replacement 为 None
    // ————————————————————————————————————————————————————————————————————————
    FellBack {
        reason: String,
        replacement: Option<ModelConfigSet>,
    },
}

/// 数据源接口，后端服务和模拟数据各有一个实现
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch_config(&self) -> Result<ModelConfigSet>;

    fn push_config(&self, configs: &ModelConfigSet) -> Result<PushReceipt>;

    fn fetch_evaluated(&self) -> Result<EvaluatedPayload>;

    fn health(&self) -> Result<HealthReport>;
}
