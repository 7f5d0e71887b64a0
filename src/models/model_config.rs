use crate::models::utils::deserialize_flag;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 模型ID到模型配置的映射，整体在客户端持有
pub type ModelConfigSet = BTreeMap<String, ModelConfig>;

/// 单个模型的元数据与各评测套件的完成状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub data: ModelData,
    #[serde(rename = "Eval_Statu")]
    pub eval_statu: EvalStatu,
}

/// 训练信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub trained_date: String,
    #[serde(default)]
    pub trained_time: String,
    #[serde(default)]
    pub model_path: String,
    #[serde(default)]
    pub model_name: String,
}

/// 一个评测套件的状态：是否已评 + 选中的数据集（逗号分隔）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteStatus {
    #[serde(rename = "Statu", default, deserialize_with = "deserialize_flag")]
    pub statu: u8,
    #[serde(rename = "Datasets", default)]
    pub datasets: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalStatu {
    #[serde(rename = "VLMEvalKit", default)]
    pub vlmevalkit: SuiteStatus,
    #[serde(rename = "VLMEvalKit_COT", default)]
    pub vlmevalkit_cot: SuiteStatus,
    #[serde(rename = "MIRB", default, deserialize_with = "deserialize_flag")]
    pub mirb: u8,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub mmiu: u8,
}

/// 带数据集选择的两个评测套件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    VlmEvalKit,
    VlmEvalKitCot,
}

impl Suite {
    pub fn label(&self) -> &'static str {
        match self {
            Suite::VlmEvalKit => "VLMEvalKit",
            Suite::VlmEvalKitCot => "VLM_COT",
        }
    }
}

/// 只有勾选状态的独立基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benchmark {
    Mirb,
    Mmiu,
}

impl Benchmark {
    pub fn label(&self) -> &'static str {
        match self {
            Benchmark::Mirb => "MIRB",
            Benchmark::Mmiu => "mmiu",
        }
    }
}

impl EvalStatu {
    pub fn suite(&self, suite: Suite) -> &SuiteStatus {
        match suite {
            Suite::VlmEvalKit => &self.vlmevalkit,
            Suite::VlmEvalKitCot => &self.vlmevalkit_cot,
        }
    }

    pub fn suite_mut(&mut self, suite: Suite) -> &mut SuiteStatus {
        match suite {
            Suite::VlmEvalKit => &mut self.vlmevalkit,
            Suite::VlmEvalKitCot => &mut self.vlmevalkit_cot,
        }
    }

    pub fn flag(&self, benchmark: Benchmark) -> bool {
        match benchmark {
            Benchmark::Mirb => self.mirb == 1,
            Benchmark::Mmiu => self.mmiu == 1,
        }
    }

    pub fn set_flag(&mut self, benchmark: Benchmark, on: bool) {
        let value = u8::from(on);
        match benchmark {
            Benchmark::Mirb => self.mirb = value,
            Benchmark::Mmiu => self.mmiu = value,
        }
    }
}

impl SuiteStatus {
    pub fn is_completed(&self) -> bool {
        self.statu == 1
    }
}

impl ModelConfig {
    /// 新增模型时使用的默认配置
    pub fn new_entry(trained_date: impl Into<String>) -> Self {
        Self {
            data: ModelData {
                trained_date: trained_date.into(),
                trained_time: "23:00".to_string(),
                model_path: String::new(),
                model_name: String::new(),
            },
            eval_statu: EvalStatu {
                vlmevalkit: SuiteStatus {
                    statu: 0,
                    datasets: "MMMU_DEV_VAL".to_string(),
                },
                vlmevalkit_cot: SuiteStatus {
                    statu: 0,
                    datasets: "MMMU_DEV_VAL".to_string(),
                },
                mirb: 1,
                mmiu: 1,
            },
        }
    }

    /// 任意一个 VLMEvalKit 套件已评即视为完成
    pub fn is_evaluated(&self) -> bool {
        self.eval_statu.vlmevalkit.is_completed() || self.eval_statu.vlmevalkit_cot.is_completed()
    }
}

/// 分配新ID：现有数字ID的最大值 + 1，集合为空（或全是非数字ID）时为 "1"
///
/// 最大值已是 `u64::MAX` 时改用最小的未占用正整数。
pub fn next_model_id(configs: &ModelConfigSet) -> String {
    let used: BTreeSet<u64> = configs
        .keys()
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .collect();
    let next = match used.last() {
        None => 1,
        Some(max) => max
            .checked_add(1)
            .unwrap_or_else(|| (1..u64::MAX).find(|n| !used.contains(n)).unwrap_or(1)),
    };
    next.to_string()
}

/// 模型统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStats {
    pub total_models: usize,
    pub completed_eval: usize,
    pub pending_eval: usize,
}

pub fn compute_stats(configs: &ModelConfigSet) -> ModelStats {
    let total_models = configs.len();
    let completed_eval = configs.values().filter(|m| m.is_evaluated()).count();
    ModelStats {
        total_models,
        completed_eval,
        pending_eval: total_models - completed_eval,
    }
}
