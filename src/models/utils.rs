use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// 标志位在线上可能是整数、布尔值或字符串，这里统一折叠成 0/1
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// 反序列化 0/1 标志位
///
/// 只有值等于 1（或 `true`、`"1"`）时得到 1，其余一律为 0。
pub fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<FlagRepr> = Option::deserialize(deserializer)?;
    let on = match repr {
        Some(FlagRepr::Int(n)) => n == 1,
        Some(FlagRepr::Float(f)) => f == 1.0,
        Some(FlagRepr::Bool(b)) => b,
        Some(FlagRepr::Text(s)) => s.trim() == "1",
        None => false,
    };
    Ok(u8::from(on))
}

/// 反序列化分数表，`null` 分数按 0（未评测）处理
pub fn deserialize_scores<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(dataset, score)| (dataset, score.unwrap_or(0.0)))
        .collect())
}

/// 把逗号分隔的数据集字符串拆成列表，去掉首尾空白和空项
pub fn split_datasets(datasets: &str) -> Vec<String> {
    datasets
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// 用 ", " 拼接数据集列表
pub fn join_datasets<S: AsRef<str>>(datasets: &[S]) -> String {
    datasets
        .iter()
        .map(|d| d.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
