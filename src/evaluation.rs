use crate::models::{EvaluatedPayload, ScoreMap};

/// 分数分档
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
    NotEvaluated,
}

impl ScoreBand {
    pub fn of(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= 90.0 => ScoreBand::High,
            Some(s) if s >= 80.0 => ScoreBand::Medium,
            Some(s) if s > 0.0 => ScoreBand::Low,
            // 0 与缺失都表示未评测
            _ => ScoreBand::NotEvaluated,
        }
    }
}

/// 评测表中的分区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Standard,
    Cot,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Standard => "Standard",
            Section::Cot => "COT",
        }
    }
}

/// 第一层表头：分区标签横跨若干数据集列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub section: Section,
    pub span: usize,
}

/// 第二层表头中的一列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalColumn {
    pub section: Section,
    pub dataset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCell {
    pub text: String,
    pub band: ScoreBand,
}

impl ScoreCell {
    fn new(score: Option<f64>) -> Self {
        let band = ScoreBand::of(score);
        let text = match (band, score) {
            (ScoreBand::NotEvaluated, _) | (_, None) => "✗".to_string(),
            (_, Some(s)) => format!("{:.1}", s),
        };
        Self { text, band }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalRow {
    pub model: String,
    pub cells: Vec<ScoreCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalTable {
    pub sections: Vec<SectionHeader>,
    pub columns: Vec<EvalColumn>,
    pub rows: Vec<EvalRow>,
}

/// 评测视图要展示的内容
#[derive(Debug, Clone, PartialEq)]
pub enum EvalView {
    Table(EvalTable),
    Empty(String),
    Error(String),
}

/// 由评测数据构建两层表头的评测表
pub fn build_eval_view(payload: &EvaluatedPayload) -> EvalView {
    let common = &payload.common_datasets;
    let mut sections = Vec::new();
    let mut columns = Vec::new();
    for (section, datasets) in [(Section::Standard, &common.standard), (Section::Cot, &common.cot)] {
        if datasets.is_empty() {
            continue;
        }
        sections.push(SectionHeader {
            section,
            span: datasets.len(),
        });
        columns.extend(datasets.iter().map(|dataset| EvalColumn {
            section,
            dataset: dataset.clone(),
        }));
    }

    if payload.evaluation_status.is_empty() || columns.is_empty() {
        return EvalView::Empty(
            payload
                .message
                .clone()
                .unwrap_or_else(|| "No evaluation data available".to_string()),
        );
    }

    // BTreeMap 的键本身有序
    let rows = payload
        .evaluation_status
        .iter()
        .map(|(model, scores)| EvalRow {
            model: model.clone(),
            cells: columns
                .iter()
                .map(|column| {
                    let map: &ScoreMap = match column.section {
                        Section::Standard => &scores.standard,
                        Section::Cot => &scores.cot,
                    };
                    ScoreCell::new(map.get(&column.dataset).copied())
                })
                .collect(),
        })
        .collect();

    EvalView::Table(EvalTable {
        sections,
        columns,
        rows,
    })
}

/// 把容器宽度平均分给各数据集列
pub fn fit_column_width(container: u16, name_column: u16, min_width: u16, columns: usize) -> u16 {
    if columns == 0 {
        return min_width;
    }
    let columns = u16::try_from(columns).unwrap_or(u16::MAX);
    let available = container.saturating_sub(name_column) / columns;
    available.max(min_width)
}
