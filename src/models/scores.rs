use crate::models::utils::deserialize_scores;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 数据集名 -> 分数，0 表示未评测
pub type ScoreMap = BTreeMap<String, f64>;

/// 单个模型在 standard / COT 两个分区下的分数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    #[serde(default, deserialize_with = "deserialize_scores")]
    pub standard: ScoreMap,
    #[serde(rename = "COT", default, deserialize_with = "deserialize_scores")]
    pub cot: ScoreMap,
}

/// 模型名 -> 分数
pub type EvaluationStatus = BTreeMap<String, ModelScores>;

/// 评测表的列定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonDatasets {
    #[serde(default)]
    pub standard: Vec<String>,
    #[serde(rename = "COT", default)]
    pub cot: Vec<String>,
}

/// `/evaluated` 接口的响应体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub evaluation_status: EvaluationStatus,
    #[serde(default)]
    pub common_datasets: CommonDatasets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
