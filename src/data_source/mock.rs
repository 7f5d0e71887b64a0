use crate::data_source::{DataSource, HealthReport, PushReceipt};
use crate::error::{DataSourceError, Result};
use crate::models::{
    CommonDatasets, EvaluatedPayload, EvaluationStatus, ModelConfig, ModelConfigSet, ModelStats,
    compute_stats, next_model_id,
};
use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 模拟网络延迟，来自 `systemConfig.mock.delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDelays {
    pub load: Duration,
    pub update: Duration,
    pub health: Duration,
}

impl Default for MockDelays {
    fn default() -> Self {
        Self {
            load: Duration::from_millis(500),
            update: Duration::from_millis(300),
            health: Duration::from_millis(100),
        }
    }
}

impl MockDelays {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            load: Duration::ZERO,
            update: Duration::ZERO,
            health: Duration::ZERO,
        }
    }

    /// 从系统配置中读取延迟，缺失的项使用默认值
    pub fn from_system_config(system_config: &Value) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: Duration| {
            system_config
                .pointer(&format!("/mock/delay/{}", key))
                .and_then(Value::as_u64)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        Self {
            load: read("load", defaults.load),
            update: read("update", defaults.update),
            health: read("health", defaults.health),
        }
    }
}

/// 数据集目录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetCatalog {
    #[serde(default)]
    pub predefined: Vec<String>,
    #[serde(default)]
    pub categories: Value,
}

/// 模拟数据文件的完整结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDocument {
    pub model_configs: ModelConfigSet,
    #[serde(default)]
    pub datasets: DatasetCatalog,
    #[serde(default)]
    pub evaluation_metrics: Value,
    #[serde(default)]
    pub model_types: Value,
    #[serde(default)]
    pub system_config: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub evaluation_status: EvaluationStatus,
    #[serde(default)]
    pub common_datasets: CommonDatasets,
}

impl MockDocument {
    /// 内置的默认数据：模拟数据文件不可用时保证界面不为空
    pub fn builtin_default() -> Self {
        let model_configs: ModelConfigSet = serde_json::from_value(json!({
            "1": {
                "data": {
                    "trained_date": "2024-01-15",
                    "trained_time": "14:30",
                    "model_path": "/models/llama2-7b-chat",
                    "model_name": "LLaMA2-7B-Chat"
                },
                "Eval_Statu": {
                    "VLMEvalKit": {
                        "Statu": 1,
                        "Datasets": "refcoco, refcoco+, mmiu, MMMU_DEV_VAL"
                    },
                    "VLMEvalKit_COT": {
                        "Statu": 0,
                        "Datasets": "MMMU_DEV_VAL, refbet"
                    },
                    "MIRB": 1,
                    "mmiu": 1
                }
            }
        }))
        .unwrap_or_default();

        let predefined = [
            "refcoco", "refcoco+", "mmiu", "MMMU_DEV_VAL", "refbet", "coco", "imagenet", "vqa",
            "gqa", "vcr", "visual7w", "clevr", "nlvr", "textvqa", "stvqa", "ocr-vqa",
        ]
        .iter()
        .map(|d| d.to_string())
        .collect();

        Self {
            model_configs,
            datasets: DatasetCatalog {
                predefined,
                categories: Value::Null,
            },
            ..Default::default()
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<MockDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read mock data file: {}", path.display()))?;
    let document = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse mock data file: {}", path.display()))?;
    Ok(document)
}

/// 模拟数据加载器：只加载一次，`reload` 强制重新读取
#[derive(Debug)]
pub struct MockDataStore {
    path: PathBuf,
    document: Option<MockDocument>,
    loaded_from_file: bool,
    load_count: usize,
}

impl MockDataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: None,
            loaded_from_file: false,
            load_count: 0,
        }
    }

    /// 读取模拟数据文件，失败时使用内置默认数据
    ///
    /// # 返回
    /// * `bool` - 是否成功从文件加载
    pub fn load(&mut self) -> bool {
        self.load_count += 1;
        match read_document(&self.path) {
            Ok(document) => {
                info!(
                    path = %self.path.display(),
                    models = document.model_configs.len(),
                    metadata = %document.metadata,
                    "Mock data loaded"
                );
                self.document = Some(document);
                self.loaded_from_file = true;
                true
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(error = %reason, "Failed to load mock data, using built-in defaults");
                self.document = Some(MockDocument::builtin_default());
                self.loaded_from_file = false;
                false
            }
        }
    }

    pub fn ensure_loaded(&mut self) {
        if !self.is_loaded() {
            self.load();
        }
    }

    pub fn reload(&mut self) -> bool {
        self.load()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn loaded_from_file(&self) -> bool {
        self.loaded_from_file
    }

    /// 实际读取文件的次数
    pub fn load_count(&self) -> usize {
        self.load_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&self) -> Option<&MockDocument> {
        self.document.as_ref()
    }

    pub fn model_configs(&self) -> ModelConfigSet {
        self.document()
            .map(|d| d.model_configs.clone())
            .unwrap_or_default()
    }

    pub fn datasets(&self) -> Vec<String> {
        self.document()
            .map(|d| d.datasets.predefined.clone())
            .unwrap_or_default()
    }

    pub fn dataset_categories(&self) -> Value {
        self.value_or_empty(|d| &d.datasets.categories)
    }

    pub fn evaluation_metrics(&self) -> Value {
        self.value_or_empty(|d| &d.evaluation_metrics)
    }

    pub fn model_types(&self) -> Value {
        self.value_or_empty(|d| &d.model_types)
    }

    pub fn system_config(&self) -> Value {
        self.value_or_empty(|d| &d.system_config)
    }

    pub fn metadata(&self) -> Value {
        self.value_or_empty(|d| &d.metadata)
    }

    pub fn evaluation_status(&self) -> EvaluationStatus {
        self.document()
            .map(|d| d.evaluation_status.clone())
            .unwrap_or_default()
    }

    pub fn common_datasets(&self) -> CommonDatasets {
        self.document()
            .map(|d| d.common_datasets.clone())
            .unwrap_or_default()
    }

    pub fn delays(&self) -> MockDelays {
        MockDelays::from_system_config(&self.system_config())
    }

    fn value_or_empty(&self, field: impl Fn(&MockDocument) -> &Value) -> Value {
        match self.document().map(field) {
            Some(Value::Null) | None => json!({}),
            Some(value) => value.clone(),
        }
    }
}

/// 模拟数据的统计信息
#[derive(Debug, Clone)]
pub struct MockStats {
    pub models: ModelStats,
    pub last_update: DateTime<Local>,
    pub metadata: Value,
}

/// 模拟数据管理器：在加载数据的深拷贝上做增删改
#[derive(Debug)]
pub struct MockDataManager {
    store: MockDataStore,
    current: ModelConfigSet,
    initialized: bool,
    last_update: DateTime<Local>,
}

impl MockDataManager {
    pub fn new(store: MockDataStore) -> Self {
        Self {
            store,
            current: ModelConfigSet::new(),
            initialized: false,
            last_update: Local::now(),
        }
    }

    /// 确保数据已加载，并从加载的数据重建工作副本
    pub fn initialize(&mut self) {
        self.store.ensure_loaded();
        self.current = self.store.model_configs();
        self.initialized = true;
    }

    pub fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.initialize();
        }
    }

    pub fn data(&self) -> &ModelConfigSet {
        &self.current
    }

    pub fn store(&self) -> &MockDataStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MockDataStore {
        &mut self.store
    }

    pub fn update_data(&mut self, configs: ModelConfigSet) -> PushReceipt {
        let updated_count = configs.len();
        self.current = configs;
        self.last_update = Local::now();
        debug!(updated_count, "Mock data replaced");
        PushReceipt {
            message: Some("Mock data updated".to_string()),
            updated_count: Some(updated_count),
        }
    }

    /// 新增模型，ID 为现有最大数字ID + 1
    pub fn add_model(&mut self, model: ModelConfig) -> String {
        let id = next_model_id(&self.current);
        self.current.insert(id.clone(), model);
        info!(id = %id, "Mock model added");
        id
    }

    pub fn delete_model(&mut self, id: &str) -> Result<String> {
        if self.current.remove(id).is_none() {
            return Err(DataSourceError::ModelNotFound(id.to_string()));
        }
        info!(id, "Mock model deleted");
        Ok(format!("Model {} deleted", id))
    }

    pub fn stats(&self) -> MockStats {
        MockStats {
            models: compute_stats(&self.current),
            last_update: self.last_update,
            metadata: self.store.metadata(),
        }
    }

    /// 模拟服务的健康信息：数据来源与已加载内容的概况
    pub fn health_summary(&self) -> String {
        let store = &self.store;
        let source = if store.loaded_from_file() {
            store.path().display().to_string()
        } else {
            "built-in defaults".to_string()
        };
        let entries = |value: Value| value.as_object().map_or(0, |o| o.len());
        format!(
            "Mock service running | source: {} | models: {} | dataset categories: {} | metrics: {} | model types: {} | updated {}",
            source,
            self.current.len(),
            entries(store.dataset_categories()),
            entries(store.evaluation_metrics()),
            entries(store.model_types()),
            self.last_update.format("%H:%M:%S")
        )
    }

    /// 重新读取模拟数据文件并重建工作副本
    pub fn reload_data(&mut self) -> bool {
        let from_file = self.store.reload();
        self.current = self.store.model_configs();
        self.initialized = true;
        self.last_update = Local::now();
        from_file
    }
}

/// 作为数据源使用的模拟数据，带模拟延迟
#[derive(Debug)]
pub struct MockSource {
    manager: Mutex<MockDataManager>,
    delays: Option<MockDelays>, // 覆盖数据文件中配置的延迟
}

impl MockSource {
    pub fn new(manager: MockDataManager) -> Self {
        Self {
            manager: Mutex::new(manager),
            delays: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(MockDataManager::new(MockDataStore::new(path)))
    }

    #[cfg(test)]
    pub fn with_delays(mut self, delays: MockDelays) -> Self {
        self.delays = Some(delays);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockDataManager> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delays(&self) -> MockDelays {
        self.delays.unwrap_or_else(|| self.lock().store().delays())
    }

    pub fn add_model(&self, model: ModelConfig) -> String {
        let mut manager = self.lock();
        manager.ensure_initialized();
        manager.add_model(model)
    }

    pub fn delete_model(&self, id: &str) -> Result<String> {
        let mut manager = self.lock();
        manager.ensure_initialized();
        manager.delete_model(id)
    }

    /// 当前的工作副本（深拷贝）
    pub fn data(&self) -> ModelConfigSet {
        let mut manager = self.lock();
        manager.ensure_initialized();
        manager.data().clone()
    }

    pub fn catalog(&self) -> Vec<String> {
        let mut manager = self.lock();
        manager.store_mut().ensure_loaded();
        manager.store().datasets()
    }

    pub fn stats(&self) -> MockStats {
        let mut manager = self.lock();
        manager.ensure_initialized();
        manager.stats()
    }

    pub fn reload(&self) -> ModelConfigSet {
        let mut manager = self.lock();
        manager.reload_data();
        manager.data().clone()
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.lock().store().is_loaded()
    }

    #[cfg(test)]
    pub fn load_count(&self) -> usize {
        self.lock().store().load_count()
    }
}

impl DataSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn fetch_config(&self) -> Result<ModelConfigSet> {
        let data = self.data();
        thread::sleep(self.delays().load);
        Ok(data)
    }

    fn push_config(&self, configs: &ModelConfigSet) -> Result<PushReceipt> {
        thread::sleep(self.delays().update);
        let mut manager = self.lock();
        manager.ensure_initialized();
        Ok(manager.update_data(configs.clone()))
    }

    fn fetch_evaluated(&self) -> Result<EvaluatedPayload> {
        let payload = {
            let mut manager = self.lock();
            manager.store_mut().ensure_loaded();
            EvaluatedPayload {
                status: "success".to_string(),
                evaluation_status: manager.store().evaluation_status(),
                common_datasets: manager.store().common_datasets(),
                message: Some("Evaluation status loaded".to_string()),
            }
        };
        thread::sleep(self.delays().load);
        Ok(payload)
    }

    fn health(&self) -> Result<HealthReport> {
        thread::sleep(self.delays().health);
        let message = {
            let mut manager = self.lock();
            manager.ensure_initialized();
            manager.health_summary()
        };
        Ok(HealthReport {
            status: "healthy".to_string(),
            message: Some(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    const MOCK_JSON: &str = r#"{
        "modelConfigs": {
            "2": {
                "data": {"trained_date": "2024-02-01", "trained_time": "09:00",
                         "model_path": "/m/qwen", "model_name": "Qwen-VL"},
                "Eval_Statu": {
                    "VLMEvalKit": {"Statu": 0, "Datasets": "coco"},
                    "VLMEvalKit_COT": {"Statu": 1, "Datasets": "vqa, gqa"},
                    "MIRB": 0, "mmiu": 1
                }
            },
            "5": {
                "data": {"trained_date": "2024-03-01", "trained_time": "10:00",
                         "model_path": "/m/intern", "model_name": "InternVL"},
                "Eval_Statu": {
                    "VLMEvalKit": {"Statu": 1, "Datasets": ""},
                    "VLMEvalKit_COT": {"Statu": 0, "Datasets": ""},
                    "MIRB": 1, "mmiu": 0
                }
            }
        },
        "datasets": {"predefined": ["coco", "vqa", "gqa"], "categories": {"vqa": ["vqa", "gqa"]}},
        "systemConfig": {"mock": {"delay": {"load": 0, "update": 0}}},
        "metadata": {"version": "1.0.0"},
        "evaluationStatus": {"Qwen-VL": {"standard": {"coco": 85.5}, "COT": {}}},
        "commonDatasets": {"standard": ["coco"], "COT": ["vqa"]}
    }"#;

    fn write_mock_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn source_for(path: &Path) -> MockSource {
        MockSource::from_file(path).with_delays(MockDelays::none())
    }

    #[test]
    fn test_missing_file_uses_builtin_default() {
        let dir = tempdir().unwrap();
        let mut store = MockDataStore::new(dir.path().join("missing.json"));

        assert!(!store.load());
        assert!(store.is_loaded());
        assert!(!store.loaded_from_file());

        let configs = store.model_configs();
        assert_eq!(configs.len(), 1);
        let model = &configs["1"];
        assert_eq!(model.data.model_name, "LLaMA2-7B-Chat");
        assert!(model.eval_statu.vlmevalkit.is_completed());
        assert_eq!(store.datasets().len(), 16);
    }

    #[test]
    fn test_malformed_file_uses_builtin_default() {
        let file = write_mock_file("{ not json");
        let mut store = MockDataStore::new(file.path());

        assert!(!store.load());
        assert_eq!(store.model_configs().len(), 1);
        assert_eq!(store.delays(), MockDelays::default());
    }

    #[test]
    fn test_load_document_getters() {
        let file = write_mock_file(MOCK_JSON);
        let mut store = MockDataStore::new(file.path());

        assert!(store.load());
        assert_eq!(store.model_configs().len(), 2);
        assert_eq!(store.datasets(), vec!["coco", "vqa", "gqa"]);
        assert_eq!(store.dataset_categories()["vqa"][1], "gqa");
        assert_eq!(store.metadata()["version"], "1.0.0");
        assert_eq!(store.evaluation_metrics(), json!({}));
        assert_eq!(store.model_types(), json!({}));
        assert_eq!(store.common_datasets().cot, vec!["vqa"]);
        assert_eq!(store.evaluation_status()["Qwen-VL"].standard["coco"], 85.5);

        let delays = store.delays();
        assert_eq!(delays.load, Duration::ZERO);
        assert_eq!(delays.update, Duration::ZERO);
        assert_eq!(delays.health, Duration::from_millis(100));
    }

    #[test]
    fn test_initialization_is_idempotent() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());

        source.fetch_config().unwrap();
        source.fetch_config().unwrap();
        source.fetch_evaluated().unwrap();
        assert_eq!(source.load_count(), 1);

        source.reload();
        assert_eq!(source.load_count(), 2);
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());
        assert_eq!(source.data().len(), 2);

        fs::write(file.path(), r#"{"modelConfigs": {}}"#).unwrap();
        assert_eq!(source.data().len(), 2);

        assert!(source.reload().is_empty());
    }

    #[test]
    fn test_add_model_uses_max_id_plus_one() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());

        let id = source.add_model(ModelConfig::new_entry("2024-04-01"));
        assert_eq!(id, "6");
        let id = source.add_model(ModelConfig::new_entry("2024-04-01"));
        assert_eq!(id, "7");
    }

    #[test]
    fn test_delete_missing_model_rejects_without_mutation() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());
        let before = source.data();

        let err = source.delete_model("42").unwrap_err();
        assert_eq!(err, DataSourceError::ModelNotFound("42".to_string()));
        assert_eq!(err.to_string(), "model 42 does not exist");
        assert_eq!(source.data(), before);

        assert_eq!(source.delete_model("2").unwrap(), "Model 2 deleted");
        assert_eq!(source.data().len(), 1);
    }

    #[test]
    fn test_working_copy_is_independent_of_loaded_document() {
        let file = write_mock_file(MOCK_JSON);
        let mut manager = MockDataManager::new(MockDataStore::new(file.path()));
        manager.initialize();

        manager.delete_model("2").unwrap();
        let receipt = manager.update_data(ModelConfigSet::new());
        assert_eq!(receipt.updated_count, Some(0));

        assert!(manager.data().is_empty());
        assert_eq!(manager.store().model_configs().len(), 2);
    }

    #[test]
    fn test_push_then_fetch_returns_updated_data() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());

        let mut configs = source.fetch_config().unwrap();
        configs.get_mut("2").unwrap().data.model_name = "Qwen-VL-Chat".to_string();
        source.push_config(&configs).unwrap();

        let fetched = source.fetch_config().unwrap();
        assert_eq!(fetched["2"].data.model_name, "Qwen-VL-Chat");
    }

    #[test]
    fn test_stats() {
        let file = write_mock_file(MOCK_JSON);
        let source = source_for(file.path());

        let stats = source.stats();
        assert_eq!(stats.models.total_models, 2);
        assert_eq!(stats.models.completed_eval, 2);
        assert_eq!(stats.models.pending_eval, 0);
        assert_eq!(stats.metadata["version"], "1.0.0");
    }

    #[test]
    fn test_health_summary_describes_loaded_file() {
        let file = write_mock_file(MOCK_JSON);
        let mut manager = MockDataManager::new(MockDataStore::new(file.path()));
        manager.initialize();

        let summary = manager.health_summary();
        assert!(summary.contains(&file.path().display().to_string()));
        assert!(summary.contains("models: 2"));
        assert!(summary.contains("dataset categories: 1"));
        assert!(summary.contains("metrics: 0"));
    }

    #[test]
    fn test_mock_health() {
        let dir = tempdir().unwrap();
        let source = source_for(&dir.path().join("mock.json"));
        let report = source.health().unwrap();
        assert_eq!(report.status, "healthy");
        let message = report.message.unwrap();
        assert!(message.contains("source: built-in defaults"));
        assert!(message.contains("models: 1"));
    }
}
