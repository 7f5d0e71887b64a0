use crate::models::{Benchmark, ModelConfigSet, Suite, join_datasets};
use crate::table::ModelTable;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tracing::{debug, warn};

/// 可以直接编辑的文本字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    TrainedDate,
    TrainedTime,
    ModelPath,
    ModelName,
}

impl EditField {
    pub fn label(&self) -> &'static str {
        match self {
            EditField::TrainedDate => "Trained date",
            EditField::TrainedTime => "Trained time",
            EditField::ModelPath => "Model path",
            EditField::ModelName => "Model name",
        }
    }

    fn validate(&self, value: &str) -> Result<(), EditError> {
        // 空值允许，与表单输入框一致
        if value.is_empty() {
            return Ok(());
        }
        match self {
            EditField::TrainedDate => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| EditError::InvalidDate(value.to_string())),
            EditField::TrainedTime => NaiveTime::parse_from_str(value, "%H:%M")
                .map(|_| ())
                .map_err(|_| EditError::InvalidTime(value.to_string())),
            EditField::ModelPath | EditField::ModelName => Ok(()),
        }
    }
}

/// 对单个模型的一次编辑
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    SetText {
        id: String,
        field: EditField,
        value: String,
    },
    SetStatus {
        id: String,
        suite: Suite,
        value: u8,
    },
    SetDatasets {
        id: String,
        suite: Suite,
        datasets: Vec<String>,
    },
    SetFlag {
        id: String,
        benchmark: Benchmark,
        value: bool,
    },
}

impl EditEvent {
    pub fn id(&self) -> &str {
        match self {
            EditEvent::SetText { id, .. }
            | EditEvent::SetStatus { id, .. }
            | EditEvent::SetDatasets { id, .. }
            | EditEvent::SetFlag { id, .. } => id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("model {0} does not exist")]
    UnknownModel(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
}

/// 把编辑同时写入模型映射和表格行
///
/// 映射和表格是同一份数据的两个视图，编辑后两者保持一致；
/// 校验失败时两者都不修改。
pub fn apply_edit(
    configs: &mut ModelConfigSet,
    table: &mut ModelTable,
    event: EditEvent,
) -> Result<(), EditError> {
    let id = event.id().to_string();
    let model = configs
        .get_mut(&id)
        .ok_or_else(|| EditError::UnknownModel(id.clone()))?;
    let preview = table.tag_preview;
    let row = table.row_mut(&id);

    match event {
        EditEvent::SetText { field, value, .. } => {
            field.validate(&value)?;
            let (model_field, row_field) = match field {
                EditField::TrainedDate => (&mut model.data.trained_date, row.map(|r| &mut r.trained_date)),
                EditField::TrainedTime => (&mut model.data.trained_time, row.map(|r| &mut r.trained_time)),
                EditField::ModelPath => (&mut model.data.model_path, row.map(|r| &mut r.model_path)),
                EditField::ModelName => (&mut model.data.model_name, row.map(|r| &mut r.model_name)),
            };
            if let Some(row_field) = row_field {
                row_field.clone_from(&value);
            }
            *model_field = value;
        }
        EditEvent::SetStatus { suite, value, .. } => {
            let value = u8::from(value == 1);
            model.eval_statu.suite_mut(suite).statu = value;
            if let Some(row) = row {
                row.status_mut(suite).value = value;
            }
        }
        EditEvent::SetDatasets {
            suite, datasets, ..
        } => {
            model.eval_statu.suite_mut(suite).datasets = join_datasets(&datasets);
            if let Some(row) = row {
                let picker = row.picker_mut(suite);
                picker.set_selected(&datasets);
                picker.refresh_summary(preview);
            }
        }
        EditEvent::SetFlag {
            benchmark, value, ..
        } => {
            model.eval_statu.set_flag(benchmark, value);
            if let Some(row) = row {
                *row.flag_mut(benchmark) = value;
            }
        }
    }
    debug!(id = %id, "Applied edit");
    Ok(())
}

/// 收集表格中的当前值，生成要推送的完整映射
///
/// 先提交仍然打开的下拉框；遍历映射中的每个ID，没有对应行的ID被丢弃，
/// 每个模型配置完全由行中的值重新构建。
pub fn collect(configs: &mut ModelConfigSet, table: &mut ModelTable) -> ModelConfigSet {
    if let Some(closed) = table.close_dropdown() {
        let event = EditEvent::SetDatasets {
            id: closed.id,
            suite: closed.suite,
            datasets: closed.selected,
        };
        if let Err(e) = apply_edit(configs, table, event) {
            warn!(error = %e, "Dropped dataset selection of open dropdown");
        }
    }

    configs
        .keys()
        .filter_map(|id| {
            table
                .row(id)
                .map(|row| (id.clone(), row.to_model_config()))
        })
        .collect()
}
