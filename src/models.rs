// models.rs - 作为模块目录入口文件（Rust 2018+ 风格）
// 导出所有子模块
pub mod config;
pub mod model_config;
pub mod scores;
pub mod state;
pub mod utils;

// 重新导出常用类型
pub use config::{BackendConfig, Config, IdOrder, KeybindingsConfig};
pub use model_config::{
    Benchmark, EvalStatu, ModelConfig, ModelConfigSet, ModelData, ModelStats, Suite, SuiteStatus,
    compute_stats, next_model_id,
};
pub use scores::{CommonDatasets, EvaluatedPayload, EvaluationStatus, ModelScores, ScoreMap};
pub use state::{AppState, DataMode, EvaluationState, LoadState};
pub use utils::{join_datasets, split_datasets};
