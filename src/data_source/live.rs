use crate::data_source::{DataSource, HealthReport, PushReceipt};
use crate::error::{DataSourceError, Result};
use crate::models::{BackendConfig, EvaluatedPayload, ModelConfigSet};
use serde::de::DeserializeOwned;
use std::io;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(3);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// 后端服务客户端
///
/// 配置接口和评测接口运行在不同端口上，因此分别持有两个基础地址。
/// 每次调用都有独立的超时，超时按失败处理，由上层决定是否回退。
#[derive(Debug, Clone)]
pub struct LiveSource {
    config_url: String,
    evaluated_url: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl LiveSource {
    pub fn new(config_url: impl Into<String>, evaluated_url: impl Into<String>) -> Self {
        Self {
            config_url: trim_base(config_url.into()),
            evaluated_url: trim_base(evaluated_url.into()),
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.config_url, &config.evaluated_url).with_timeouts(
            Duration::from_millis(config.read_timeout_ms),
            Duration::from_millis(config.write_timeout_ms),
        )
    }

    pub fn with_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = ureq::get(url)
            .set("Content-Type", "application/json")
            .timeout(self.read_timeout)
            .call()
            .map_err(|e| map_ureq_error(e, self.read_timeout))?;

        response
            .into_json::<T>()
            .map_err(|e| decode_error(e, self.read_timeout))
    }
}

impl DataSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    #[instrument(skip(self), fields(url = %self.config_url))]
    fn fetch_config(&self) -> Result<ModelConfigSet> {
        debug!("Fetching model configs from backend");
        let configs: ModelConfigSet = self.get_json(&format!("{}/config", self.config_url))?;
        info!(count = configs.len(), "Fetched model configs from backend");
        Ok(configs)
    }

    #[instrument(skip(self, configs), fields(url = %self.config_url, count = configs.len()))]
    fn push_config(&self, configs: &ModelConfigSet) -> Result<PushReceipt> {
        let url = format!("{}/update", self.config_url);
        let response = ureq::post(&url)
            .set("Content-Type", "application/json")
            .timeout(self.write_timeout)
            .send_json(configs)
            .map_err(|e| map_ureq_error(e, self.write_timeout))?;

        // 响应体里只有可选的 message，解析失败不影响推送结果
        let body = response
            .into_string()
            .map_err(|e| decode_error(e, self.write_timeout))?;
        let receipt = serde_json::from_str::<PushReceipt>(&body).unwrap_or_default();
        info!(message = ?receipt.message, "Pushed model configs to backend");
        Ok(receipt)
    }

    #[instrument(skip(self), fields(url = %self.evaluated_url))]
    fn fetch_evaluated(&self) -> Result<EvaluatedPayload> {
        let payload: EvaluatedPayload =
            self.get_json(&format!("{}/evaluated", self.evaluated_url))?;
        info!(
            models = payload.evaluation_status.len(),
            "Fetched evaluation status from backend"
        );
        Ok(payload)
    }

    #[instrument(skip(self), fields(url = %self.config_url))]
    fn health(&self) -> Result<HealthReport> {
        self.get_json(&format!("{}/health", self.config_url))
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// 把 ureq 错误映射为数据层错误，区分非2xx、超时与网络故障
fn map_ureq_error(e: ureq::Error, timeout: Duration) -> DataSourceError {
    match e {
        ureq::Error::Status(code, _) => {
            warn!(code, "Backend responded with error status");
            DataSourceError::Status(code)
        }
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                warn!(?timeout, "Backend request timed out");
                return DataSourceError::Timeout(timeout);
            }
            warn!(error = %transport, "Backend unreachable");
            DataSourceError::Network(transport.to_string())
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|io_err| is_timeout_kind(io_err.kind()))
}

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// 读取响应体时也可能超时
fn decode_error(e: io::Error, timeout: Duration) -> DataSourceError {
    if is_timeout_kind(e.kind()) {
        DataSourceError::Timeout(timeout)
    } else {
        DataSourceError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelConfig;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// 启动一个只应答一次的本地 HTTP 服务，返回基础地址和收到的请求行
    fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request_line.trim().to_string()
        });

        (url, handle)
    }

    fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[test]
    fn test_fetch_config_success() {
        let body = r#"{"1": {"data": {"model_name": "m1"}, "Eval_Statu": {}}}"#;
        let (url, handle) = serve_once("200 OK", body);
        let source = LiveSource::new(&url, &url);

        let configs = source.fetch_config().unwrap();
        assert_eq!(configs["1"].data.model_name, "m1");
        assert_eq!(handle.join().unwrap(), "GET /config HTTP/1.1");
    }

    #[test]
    fn test_non_2xx_is_status_error() {
        let (url, handle) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#);
        let source = LiveSource::new(&url, &url);

        assert_eq!(source.fetch_config(), Err(DataSourceError::Status(500)));
        handle.join().unwrap();
    }

    #[test]
    fn test_unreachable_backend_is_network_error() {
        let url = unreachable_url();
        let source = LiveSource::new(&url, &url)
            .with_timeouts(Duration::from_millis(500), Duration::from_millis(500));

        assert!(matches!(
            source.fetch_config(),
            Err(DataSourceError::Network(_)) | Err(DataSourceError::Timeout(_))
        ));
    }

    #[test]
    fn test_silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        // 接受连接但从不应答
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(1500));
            drop(stream);
        });
        let timeout = Duration::from_millis(300);
        let source = LiveSource::new(&url, &url).with_timeouts(timeout, timeout);

        assert_eq!(source.fetch_config(), Err(DataSourceError::Timeout(timeout)));
        handle.join().unwrap();
    }

    #[test]
    fn test_push_config_reads_message() {
        let (url, handle) = serve_once(
            "200 OK",
            r#"{"status": "success", "message": "Configuration updated"}"#,
        );
        let source = LiveSource::new(format!("{}/", url), &url);

        let mut configs = ModelConfigSet::new();
        configs.insert("1".to_string(), ModelConfig::new_entry("2024-01-01"));

        let receipt = source.push_config(&configs).unwrap();
        assert_eq!(receipt.message.as_deref(), Some("Configuration updated"));
        assert_eq!(handle.join().unwrap(), "POST /update HTTP/1.1");
    }

    #[test]
    fn test_fetch_evaluated_uses_evaluation_endpoint() {
        let body = r#"{"status": "success", "evaluation_status": {}, "common_datasets": {"standard": ["A"], "COT": []}}"#;
        let (eval_url, handle) = serve_once("200 OK", body);
        let source = LiveSource::new(unreachable_url(), &eval_url);

        let payload = source.fetch_evaluated().unwrap();
        assert_eq!(payload.common_datasets.standard, vec!["A"]);
        assert_eq!(handle.join().unwrap(), "GET /evaluated HTTP/1.1");
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let (url, handle) = serve_once("200 OK", "not json");
        let source = LiveSource::new(&url, &url);

        assert!(matches!(source.fetch_config(), Err(DataSourceError::Decode(_))));
        handle.join().unwrap();
    }
}
