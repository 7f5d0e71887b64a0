use crate::models::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"[backend]
config_url = "http://localhost:8009"
evaluated_url = "http://localhost:5001"
read_timeout_ms = 3000
write_timeout_ms = 5000
refresh_after_update_ms = 1000

[mock]
enabled = true
data_file = "mock.json"
offline = false

[table]
id_order = "lexicographic"
tag_preview = 3

[evaluation]
name_column_width = 24
min_column_width = 8

[tui]
refresh_rate_ms = 250
table_panel_proportion = 70

[keybindings]
up = "up"
down = "down"
left = "left"
right = "right"
toggle = "space"
confirm = "enter"
quit = "q"
help = "?"
refresh = "r"
add = "n"
update = "w"
delete = "d"
health = "h"
reload_mock = "m"
select_all = "a"
invert_selection = "i"
switch_view = "tab"

[logging]
directory = "."
file_name = "evalboard.log"
filter = "evalboard=info"
"#;

pub fn load_config(config_path: &str) -> Result<Config> {
    // 检查配置文件是否存在，如果不存在则创建默认配置
    if !Path::new(config_path).exists() {
        create_default_config(config_path)?;
    }

    // 读取配置文件内容
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path))?;

    // 解析TOML配置
    let config: Config = toml::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file: {}", config_path))?;

    Ok(config)
}

fn create_default_config(config_path: &str) -> Result<()> {
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to create default config file: {}", config_path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdOrder;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_created_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evalboard.toml");
        let path_str = path.to_str().unwrap();

        let config = load_config(path_str).unwrap();

        assert!(path.exists());
        assert_eq!(config.backend.config_url, "http://localhost:8009");
        assert_eq!(config.backend.write_timeout_ms, 5000);
        assert_eq!(config.table.id_order, IdOrder::Lexicographic);
        assert_eq!(config.keybindings.switch_view, "tab");
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.backend.evaluated_url, defaults.backend.evaluated_url);
        assert_eq!(parsed.mock.data_file, defaults.mock.data_file);
        assert_eq!(parsed.tui.refresh_rate_ms, defaults.tui.refresh_rate_ms);
        assert_eq!(parsed.logging.filter, defaults.logging.filter);
        assert_eq!(parsed.keybindings.reload_mock, defaults.keybindings.reload_mock);
    }

    #[test]
    fn test_existing_config_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[table]\nid_order = \"numeric\"\n").unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();

        assert_eq!(config.table.id_order, IdOrder::Numeric);
        assert_eq!(config.table.tag_preview, 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[table]\nid_order = \"numeric\"\n");
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[backend\nconfig_url = 1").unwrap();

        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
    }
}
