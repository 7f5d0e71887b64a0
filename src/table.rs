use crate::models::{
    Benchmark, EvalStatu, IdOrder, ModelConfig, ModelConfigSet, ModelData, Suite, SuiteStatus,
    join_datasets, split_datasets,
};
use std::cmp::Ordering;
use std::fmt;

/// 按配置的排序方式返回模型ID
pub fn sorted_ids(configs: &ModelConfigSet, order: IdOrder) -> Vec<String> {
    let mut ids: Vec<String> = configs.keys().cloned().collect();
    match order {
        IdOrder::Lexicographic => ids.sort(),
        IdOrder::Numeric => ids.sort_by(|a, b| compare_numeric(a, b)),
    }
    ids
}

/// 数字ID按数值排序，非数字ID排在最后并按字符串排序
fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// 状态选择器（0 待评 / 1 已评）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCell {
    pub value: u8,
}

impl StatusCell {
    pub fn label(&self) -> &'static str {
        if self.value == 1 { "已评" } else { "待评" }
    }

    /// 未完成时使用醒目样式
    pub fn not_completed(&self) -> bool {
        self.value != 1
    }

    pub fn toggled(&self) -> Self {
        Self {
            value: if self.value == 1 { 0 } else { 1 },
        }
    }
}

/// 数据集标签摘要：最多展示前 N 个，其余显示为 "+N more"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    pub tags: Vec<String>,
    pub overflow: usize,
}

impl TagSummary {
    pub fn new(selected: &[String], preview: usize) -> Self {
        Self {
            tags: selected.iter().take(preview).cloned().collect(),
            overflow: selected.len().saturating_sub(preview),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for TagSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.tags.join(" · "))?;
        if self.overflow > 0 {
            write!(f, " +{} more", self.overflow)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOption {
    pub name: String,
    pub checked: bool,
}

/// 数据集多选器：完整目录上的复选框列表
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPicker {
    pub suite: Suite,
    pub options: Vec<DatasetOption>,
    pub summary: TagSummary,
}

impl DatasetPicker {
    /// 根据逗号分隔的字符串预先勾选；不在目录中的数据集追加到末尾
    pub fn new(suite: Suite, datasets: &str, catalog: &[String], preview: usize) -> Self {
        let selected = split_datasets(datasets);
        let mut options: Vec<DatasetOption> = catalog
            .iter()
            .map(|name| DatasetOption {
                name: name.clone(),
                checked: selected.contains(name),
            })
            .collect();
        for name in &selected {
            if !catalog.contains(name) {
                options.push(DatasetOption {
                    name: name.clone(),
                    checked: true,
                });
            }
        }
        Self {
            suite,
            options,
            summary: TagSummary::new(&selected, preview),
        }
    }

    /// 按目录顺序返回勾选的数据集
    pub fn selected(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.name.clone())
            .collect()
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(option) = self.options.get_mut(index) {
            option.checked = !option.checked;
        }
    }

    pub fn select_all(&mut self) {
        self.options.iter_mut().for_each(|o| o.checked = true);
    }

    pub fn invert(&mut self) {
        self.options.iter_mut().for_each(|o| o.checked = !o.checked);
    }

    pub fn set_selected(&mut self, datasets: &[String]) {
        for option in &mut self.options {
            option.checked = datasets.contains(&option.name);
        }
        for name in datasets {
            if !self.options.iter().any(|o| &o.name == name) {
                self.options.push(DatasetOption {
                    name: name.clone(),
                    checked: true,
                });
            }
        }
    }

    pub fn refresh_summary(&mut self, preview: usize) {
        self.summary = TagSummary::new(&self.selected(), preview);
    }
}

/// 表格中的一行，即一个模型的所有可编辑单元格
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRow {
    pub id: String,
    pub trained_date: String,
    pub trained_time: String,
    pub model_path: String,
    pub model_name: String,
    pub vlm_status: StatusCell,
    pub vlm_datasets: DatasetPicker,
    pub cot_status: StatusCell,
    pub cot_datasets: DatasetPicker,
    pub mirb: bool,
    pub mmiu: bool,
}

impl ModelRow {
    pub fn new(id: &str, model: &ModelConfig, catalog: &[String], preview: usize) -> Self {
        let eval = &model.eval_statu;
        Self {
            id: id.to_string(),
            trained_date: model.data.trained_date.clone(),
            trained_time: model.data.trained_time.clone(),
            model_path: model.data.model_path.clone(),
            model_name: model.data.model_name.clone(),
            vlm_status: StatusCell {
                value: eval.vlmevalkit.statu,
            },
            vlm_datasets: DatasetPicker::new(
                Suite::VlmEvalKit,
                &eval.vlmevalkit.datasets,
                catalog,
                preview,
            ),
            cot_status: StatusCell {
                value: eval.vlmevalkit_cot.statu,
            },
            cot_datasets: DatasetPicker::new(
                Suite::VlmEvalKitCot,
                &eval.vlmevalkit_cot.datasets,
                catalog,
                preview,
            ),
            mirb: eval.flag(Benchmark::Mirb),
            mmiu: eval.flag(Benchmark::Mmiu),
        }
    }

    pub fn status(&self, suite: Suite) -> StatusCell {
        match suite {
            Suite::VlmEvalKit => self.vlm_status,
            Suite::VlmEvalKitCot => self.cot_status,
        }
    }

    pub fn status_mut(&mut self, suite: Suite) -> &mut StatusCell {
        match suite {
            Suite::VlmEvalKit => &mut self.vlm_status,
            Suite::VlmEvalKitCot => &mut self.cot_status,
        }
    }

    pub fn picker(&self, suite: Suite) -> &DatasetPicker {
        match suite {
            Suite::VlmEvalKit => &self.vlm_datasets,
            Suite::VlmEvalKitCot => &self.cot_datasets,
        }
    }

    pub fn picker_mut(&mut self, suite: Suite) -> &mut DatasetPicker {
        match suite {
            Suite::VlmEvalKit => &mut self.vlm_datasets,
            Suite::VlmEvalKitCot => &mut self.cot_datasets,
        }
    }

    pub fn flag(&self, benchmark: Benchmark) -> bool {
        match benchmark {
            Benchmark::Mirb => self.mirb,
            Benchmark::Mmiu => self.mmiu,
        }
    }

    pub fn flag_mut(&mut self, benchmark: Benchmark) -> &mut bool {
        match benchmark {
            Benchmark::Mirb => &mut self.mirb,
            Benchmark::Mmiu => &mut self.mmiu,
        }
    }

    /// 完全根据当前单元格的值重建模型配置
    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig {
            data: ModelData {
                trained_date: self.trained_date.clone(),
                trained_time: self.trained_time.clone(),
                model_path: self.model_path.clone(),
                model_name: self.model_name.clone(),
            },
            eval_statu: EvalStatu {
                vlmevalkit: SuiteStatus {
                    statu: self.vlm_status.value,
                    datasets: join_datasets(&self.vlm_datasets.selected()),
                },
                vlmevalkit_cot: SuiteStatus {
                    statu: self.cot_status.value,
                    datasets: join_datasets(&self.cot_datasets.selected()),
                },
                mirb: u8::from(self.mirb),
                mmiu: u8::from(self.mmiu),
            },
        }
    }
}

/// 当前打开的数据集下拉框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDropdown {
    pub row: usize,
    pub suite: Suite,
    pub cursor: usize,
}

/// 下拉框关闭时提交的选择
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedDropdown {
    pub id: String,
    pub suite: Suite,
    pub selected: Vec<String>,
}

/// 模型表格：由 `ModelConfigSet` 整体投影而来，数据变化时整体重建
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    pub rows: Vec<ModelRow>,
    pub dropdown: Option<OpenDropdown>,
    pub tag_preview: usize,
}

impl ModelTable {
    pub fn build(
        configs: &ModelConfigSet,
        catalog: &[String],
        order: IdOrder,
        tag_preview: usize,
    ) -> Self {
        let rows = sorted_ids(configs, order)
            .iter()
            .filter_map(|id| {
                configs
                    .get(id)
                    .map(|model| ModelRow::new(id, model, catalog, tag_preview))
            })
            .collect();
        Self {
            rows,
            dropdown: None,
            tag_preview,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, id: &str) -> Option<&ModelRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn row_mut(&mut self, id: &str) -> Option<&mut ModelRow> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    pub fn open_picker(&self) -> Option<&DatasetPicker> {
        let open = self.dropdown?;
        self.rows.get(open.row).map(|r| r.picker(open.suite))
    }

    fn open_picker_mut(&mut self) -> Option<&mut DatasetPicker> {
        let open = self.dropdown?;
        self.rows.get_mut(open.row).map(|r| r.picker_mut(open.suite))
    }

    /// 打开指定行的下拉框，同时关闭其他下拉框
    ///
    /// # 返回
    /// * `Option<ClosedDropdown>` - 被关闭的下拉框（如果有）
    pub fn open_dropdown(&mut self, row: usize, suite: Suite) -> Option<ClosedDropdown> {
        if row >= self.rows.len() {
            return None;
        }
        let closed = self.close_dropdown();
        self.dropdown = Some(OpenDropdown {
            row,
            suite,
            cursor: 0,
        });
        closed
    }

    /// 关闭下拉框并刷新标签摘要
    pub fn close_dropdown(&mut self) -> Option<ClosedDropdown> {
        let open = self.dropdown.take()?;
        let preview = self.tag_preview;
        let row = self.rows.get_mut(open.row)?;
        let id = row.id.clone();
        let picker = row.picker_mut(open.suite);
        picker.refresh_summary(preview);
        Some(ClosedDropdown {
            id,
            suite: open.suite,
            selected: picker.selected(),
        })
    }

    /// 切换下拉框：已打开则关闭，否则打开
    pub fn toggle_dropdown(&mut self, row: usize, suite: Suite) -> Option<ClosedDropdown> {
        match self.dropdown {
            Some(open) if open.row == row && open.suite == suite => self.close_dropdown(),
            _ => self.open_dropdown(row, suite),
        }
    }

    pub fn move_dropdown_cursor(&mut self, delta: isize) {
        let len = self.open_picker().map(|p| p.options.len()).unwrap_or(0);
        if let Some(open) = self.dropdown.as_mut() {
            if len == 0 {
                open.cursor = 0;
                return;
            }
            let next = open.cursor as isize + delta;
            open.cursor = next.clamp(0, len as isize - 1) as usize;
        }
    }

    /// 切换下拉框中光标所在的复选框
    pub fn toggle_dropdown_option(&mut self) {
        let Some(cursor) = self.dropdown.map(|d| d.cursor) else {
            return;
        };
        if let Some(picker) = self.open_picker_mut() {
            picker.toggle(cursor);
        }
    }

    /// 全选，只作用于当前打开的下拉框
    pub fn select_all_in_dropdown(&mut self) {
        if let Some(picker) = self.open_picker_mut() {
            picker.select_all();
        }
    }

    /// 反选，只作用于当前打开的下拉框
    pub fn invert_dropdown(&mut self) {
        if let Some(picker) = self.open_picker_mut() {
            picker.invert();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::MockDocument;
    use std::collections::BTreeSet;

    fn catalog() -> Vec<String> {
        ["refcoco", "refcoco+", "mmiu", "MMMU_DEV_VAL", "refbet"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn configs_with_ids(ids: &[&str]) -> ModelConfigSet {
        ids.iter()
            .map(|id| (id.to_string(), ModelConfig::new_entry("2024-01-01")))
            .collect()
    }

    fn model_with_datasets(vlm: &str, cot: &str) -> ModelConfig {
        let mut model = ModelConfig::new_entry("2024-01-01");
        model.eval_statu.vlmevalkit.datasets = vlm.to_string();
        model.eval_statu.vlmevalkit_cot.datasets = cot.to_string();
        model
    }

    #[test]
    fn test_rows_sorted_as_strings_by_default() {
        let configs = configs_with_ids(&["2", "10", "1"]);
        let table = ModelTable::build(&configs, &catalog(), IdOrder::Lexicographic, 3);
        let ids: Vec<&str> = table.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "10", "2"]);
    }

    #[test]
    fn test_rows_sorted_numerically_when_configured() {
        let configs = configs_with_ids(&["2", "10", "1", "draft"]);
        let ids = sorted_ids(&configs, IdOrder::Numeric);
        assert_eq!(ids, vec!["1", "2", "10", "draft"]);
    }

    #[test]
    fn test_status_cell_labels() {
        let done = StatusCell { value: 1 };
        let pending = StatusCell { value: 0 };
        assert_eq!(done.label(), "已评");
        assert!(!done.not_completed());
        assert_eq!(pending.label(), "待评");
        assert!(pending.not_completed());
        assert_eq!(pending.toggled(), done);
    }

    #[test]
    fn test_tag_summary_display() {
        let selected: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(TagSummary::new(&selected, 3).to_string(), "a · b · c +2 more");
        assert_eq!(TagSummary::new(&selected[..2], 3).to_string(), "a · b");
        assert_eq!(TagSummary::new(&[], 3).to_string(), "none");
    }

    #[test]
    fn test_picker_prechecked_from_string() {
        let picker = DatasetPicker::new(Suite::VlmEvalKit, "refbet, mmiu, custom_set", &catalog(), 3);

        let checked: Vec<&str> = picker
            .options
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(checked, vec!["mmiu", "refbet", "custom_set"]);
        assert_eq!(picker.options.len(), 6);
        assert_eq!(picker.summary.tags, vec!["refbet", "mmiu", "custom_set"]);
    }

    #[test]
    fn test_picker_round_trip_is_order_insensitive() {
        let model = model_with_datasets("MMMU_DEV_VAL, refcoco", "");
        let row = ModelRow::new("1", &model, &catalog(), 3);

        let rebuilt = row.to_model_config();
        let original: BTreeSet<String> = split_datasets(&model.eval_statu.vlmevalkit.datasets).into_iter().collect();
        let parsed: BTreeSet<String> = split_datasets(&rebuilt.eval_statu.vlmevalkit.datasets).into_iter().collect();
        assert_eq!(parsed, original);
        assert_eq!(rebuilt.eval_statu.vlmevalkit_cot.datasets, "");
    }

    #[test]
    fn test_summary_updates_only_on_close() {
        let mut configs = ModelConfigSet::new();
        configs.insert("1".to_string(), model_with_datasets("refcoco", ""));
        let mut table = ModelTable::build(&configs, &catalog(), IdOrder::Lexicographic, 3);

        table.open_dropdown(0, Suite::VlmEvalKit);
        table.move_dropdown_cursor(2);
        table.toggle_dropdown_option(); // mmiu
        assert_eq!(table.rows[0].vlm_datasets.summary.tags, vec!["refcoco"]);

        let closed = table.close_dropdown().unwrap();
        assert_eq!(closed.id, "1");
        assert_eq!(closed.selected, vec!["refcoco", "mmiu"]);
        assert_eq!(table.rows[0].vlm_datasets.summary.tags, vec!["refcoco", "mmiu"]);
        assert!(table.dropdown.is_none());
    }

    #[test]
    fn test_select_all_and_invert_affect_only_open_dropdown() {
        let mut configs = ModelConfigSet::new();
        configs.insert("1".to_string(), model_with_datasets("refcoco", "refbet"));
        configs.insert("2".to_string(), model_with_datasets("", ""));
        let mut table = ModelTable::build(&configs, &catalog(), IdOrder::Lexicographic, 3);

        // 没有打开的下拉框时不做任何事
        table.select_all_in_dropdown();
        assert_eq!(table.rows[0].vlm_datasets.selected(), vec!["refcoco"]);

        table.open_dropdown(0, Suite::VlmEvalKitCot);
        table.invert_dropdown();
        assert_eq!(
            table.rows[0].cot_datasets.selected(),
            vec!["refcoco", "refcoco+", "mmiu", "MMMU_DEV_VAL"]
        );
        assert_eq!(table.rows[0].vlm_datasets.selected(), vec!["refcoco"]);

        table.select_all_in_dropdown();
        assert_eq!(table.rows[0].cot_datasets.selected().len(), 5);
        assert!(table.rows[1].cot_datasets.selected().is_empty());
    }

    #[test]
    fn test_opening_one_dropdown_closes_others() {
        let configs = configs_with_ids(&["1", "2"]);
        let mut table = ModelTable::build(&configs, &catalog(), IdOrder::Lexicographic, 3);

        assert!(table.open_dropdown(0, Suite::VlmEvalKit).is_none());
        let closed = table.open_dropdown(1, Suite::VlmEvalKitCot).unwrap();
        assert_eq!(closed.id, "1");
        assert_eq!(closed.suite, Suite::VlmEvalKit);
        assert_eq!(
            table.dropdown,
            Some(OpenDropdown {
                row: 1,
                suite: Suite::VlmEvalKitCot,
                cursor: 0
            })
        );

        // 再次切换同一个下拉框会关闭它
        assert!(table.toggle_dropdown(1, Suite::VlmEvalKitCot).is_some());
        assert!(table.dropdown.is_none());
    }

    #[test]
    fn test_dropdown_cursor_is_clamped() {
        let configs = configs_with_ids(&["1"]);
        let mut table = ModelTable::build(&configs, &catalog(), IdOrder::Lexicographic, 3);
        table.open_dropdown(0, Suite::VlmEvalKit);

        table.move_dropdown_cursor(-3);
        assert_eq!(table.dropdown.unwrap().cursor, 0);
        table.move_dropdown_cursor(100);
        // 目录 5 项 + 模型自带的 MMMU_DEV_VAL 已在目录中
        assert_eq!(table.dropdown.unwrap().cursor, 4);
    }

    #[test]
    fn test_default_dataset_row() {
        let document = MockDocument::builtin_default();
        let table = ModelTable::build(
            &document.model_configs,
            &document.datasets.predefined,
            IdOrder::Lexicographic,
            3,
        );
        assert_eq!(table.len(), 1);
        let row = table.row("1").unwrap();
        assert_eq!(row.model_name, "LLaMA2-7B-Chat");
        assert_eq!(row.vlm_status.label(), "已评");
        assert_eq!(row.cot_status.label(), "待评");
        assert_eq!(row.vlm_datasets.summary.to_string(), "refcoco · refcoco+ · mmiu +1 more");
        assert_eq!(row.cot_datasets.summary.to_string(), "MMMU_DEV_VAL · refbet");
        assert_eq!(row.vlm_datasets.options.len(), 16);
        assert!(row.mirb && row.mmiu);
    }
}
