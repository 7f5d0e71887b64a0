// src/main.rs
mod config;
mod data_source;
mod editor;
mod error;
mod evaluation;
mod models;
mod table;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use config::load_config;
use data_source::DataSourceResolver;
use models::{AppState, Config, DataMode};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tui::{App, TuiApp};

/// 模型评测状态看板
#[derive(Parser, Debug)]
#[command(name = "evalboard", version)]
struct Cli {
    /// 配置文件路径，不存在时创建默认配置
    #[arg(long, default_value = "evalboard.toml")]
    config: String,

    /// 直接使用模拟数据，不访问后端
    #[arg(long)]
    mock: bool,

    /// 模拟数据文件路径
    #[arg(long, value_name = "PATH")]
    mock_file: Option<String>,

    /// 日志文件路径
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// 命令行参数覆盖配置文件中的值
    fn apply_to(&self, config: &mut Config) {
        if self.mock {
            config.mock.offline = true;
            config.mock.enabled = true;
        }
        if let Some(path) = &self.mock_file {
            config.mock.data_file = path.clone();
        }
        if let Some(path) = &self.log_file {
            if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                config.logging.directory = dir.to_string_lossy().into_owned();
            }
            if let Some(name) = path.file_name() {
                config.logging.file_name = name.to_string_lossy().into_owned();
            }
        }
    }
}

/// 终端被 TUI 占用，日志只写入文件
fn init_logging(config: &Config) -> WorkerGuard {
    let logging = &config.logging;
    let file_appender = tracing_appender::rolling::never(&logging.directory, &logging.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置文件
    let config_existed = Path::new(&cli.config).exists();
    let mut config = load_config(&cli.config)?;
    cli.apply_to(&mut config);

    let _guard = init_logging(&config);
    if !config_existed {
        info!(path = %cli.config, "Created default config file");
    }
    info!(
        config_url = %config.backend.config_url,
        evaluated_url = %config.backend.evaluated_url,
        offline = config.mock.offline,
        mock_file = %config.mock.data_file,
        "EvalBoard starting"
    );

    let resolver = DataSourceResolver::from_config(&config);
    let mut state = AppState::new(config, resolver.catalog());
    if resolver.is_offline() {
        state.mode = DataMode::Mock;
    }
    let app = App::new(state);

    let mut tui = TuiApp::new(app, resolver).context("Failed to initialize terminal")?;
    tui.run()?;

    info!("EvalBoard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "evalboard",
            "--mock",
            "--mock-file",
            "data/mock.json",
            "--log-file",
            "/tmp/evalboard/run.log",
        ]);
        let mut config = Config::default();
        config.mock.enabled = false;

        cli.apply_to(&mut config);

        assert!(config.mock.offline);
        assert!(config.mock.enabled);
        assert_eq!(config.mock.data_file, "data/mock.json");
        assert_eq!(config.logging.directory, "/tmp/evalboard");
        assert_eq!(config.logging.file_name, "run.log");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["evalboard"]);
        let mut config = Config::default();

        cli.apply_to(&mut config);

        assert_eq!(cli.config, "evalboard.toml");
        assert!(!config.mock.offline);
        assert_eq!(config.logging.file_name, "evalboard.log");
    }
}
