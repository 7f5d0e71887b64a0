use serde::Deserialize;

/// 应用程序配置结构
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub mock: MockConfig,
    pub table: TableConfig,
    pub evaluation: EvaluationConfig,
    pub tui: TuiConfig,
    pub keybindings: KeybindingsConfig,
    pub logging: LoggingConfig,
}

/// 后端服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub config_url: String,    // 配置服务地址（/config、/update、/health）
    pub evaluated_url: String, // 评测状态服务地址（/evaluated），端口与配置服务不同
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub refresh_after_update_ms: u64, // 后端更新成功后延迟刷新
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            config_url: "http://localhost:8009".to_string(),
            evaluated_url: "http://localhost:5001".to_string(),
            read_timeout_ms: 3000,
            write_timeout_ms: 5000,
            refresh_after_update_ms: 1000,
        }
    }
}

/// 模拟数据配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub enabled: bool,
    pub data_file: String,
    // ————————————————————————————————————————————————————————————————————————
    // 离线模式：完全不访问后端，只使用模拟数据
    // ————————————————————————————————————————————————————————————————————————
    pub offline: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_file: "mock.json".to_string(),
            offline: false,
        }
    }
}

/// 模型ID的排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdOrder {
    /// 按字符串排序，"10" 排在 "2" 之前
    #[default]
    Lexicographic,
    Numeric,
}

/// 模型表格配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub id_order: IdOrder,
    pub tag_preview: usize, // 数据集摘要中最多展示的标签数
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            id_order: IdOrder::Lexicographic,
            tag_preview: 3,
        }
    }
}

/// 评测状态表配置，宽度单位为终端列
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub name_column_width: u16,
    pub min_column_width: u16,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            name_column_width: 24,
            min_column_width: 8,
        }
    }
}

/// TUI界面配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    pub refresh_rate_ms: u64,
    pub table_panel_proportion: u16,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 250,
            table_panel_proportion: 70,
        }
    }
}

/// 键盘绑定配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub toggle: String,
    pub confirm: String,
    pub quit: String,
    pub help: String,
    pub refresh: String,
    pub add: String,
    pub update: String,
    pub delete: String,
    pub health: String,
    pub reload_mock: String,
    pub select_all: String,
    pub invert_selection: String,
    pub switch_view: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            up: "up".to_string(),
            down: "down".to_string(),
            left: "left".to_string(),
            right: "right".to_string(),
            toggle: "space".to_string(),
            confirm: "enter".to_string(),
            quit: "q".to_string(),
            help: "?".to_string(),
            refresh: "r".to_string(),
            add: "n".to_string(),
            update: "w".to_string(),
            delete: "d".to_string(),
            health: "h".to_string(),
            reload_mock: "m".to_string(),
            select_all: "a".to_string(),
            invert_selection: "i".to_string(),
            switch_view: "tab".to_string(),
        }
    }
}

/// 日志配置，TUI 占用了 stdout，日志只写文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_name: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_name: "evalboard.log".to_string(),
            filter: "evalboard=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
        [backend]
        config_url = "http://10.0.0.2:8009"
        read_timeout_ms = 1500

        [mock]
        offline = true

        [table]
        id_order = "numeric"

        [keybindings]
        quit = "x"
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize config");

        assert_eq!(config.backend.config_url, "http://10.0.0.2:8009");
        assert_eq!(config.backend.read_timeout_ms, 1500);
        // 未给出的字段使用默认值
        assert_eq!(config.backend.write_timeout_ms, 5000);
        assert_eq!(config.backend.evaluated_url, "http://localhost:5001");
        assert!(config.mock.offline);
        assert!(config.mock.enabled);
        assert_eq!(config.table.id_order, IdOrder::Numeric);
        assert_eq!(config.table.tag_preview, 3);
        assert_eq!(config.keybindings.quit, "x");
        assert_eq!(config.keybindings.up, "up");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mock.data_file, "mock.json");
        assert_eq!(config.table.id_order, IdOrder::Lexicographic);
        assert_eq!(config.tui.refresh_rate_ms, 250);
        assert_eq!(config.logging.filter, "evalboard=info");
    }
}
