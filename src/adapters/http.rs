use crate::domain::model::Point;
use crate::domain::ports::SourceCall;
use crate::utils::error::SourceError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// 以 HTTP GET 查詢後端的資料來源：`{base_url}{path}?lat=..&lon=..&<parameters>`
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
    parameters: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, client: Client, base_url: &str, path: &str) -> Self {
        Self {
            name: name.into(),
            client,
            endpoint: join_url(base_url, path),
            headers: HashMap::new(),
            parameters: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl SourceCall for HttpSource {
    async fn call(&self, point: Point) -> std::result::Result<serde_json::Value, SourceError> {
        // 構建請求
        let mut request = self.client.get(&self.endpoint).query(&[
            ("lat", point.lat().to_string()),
            ("lon", point.lon().to_string()),
        ]);

        // 來源專屬參數，例如機場檢查的 buffer_m
        for (key, value) in &self.parameters {
            request = request.query(&[(key, value)]);
        }

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("📡 {}: GET {} ({})", self.name, self.endpoint, point);

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 {}: response status {}", self.name, status);

        if !status.is_success() {
            // 保留回應內容供診斷
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body: error_detail(&body),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            message: e.to_string(),
        })
    }
}

/// FastAPI 類後端會以 `{"detail": "..."}` 回傳錯誤，盡量取出人看得懂的部分
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

/// 檢查後端健康狀態（`GET /health` 回傳 `{"status": "ok"}`）
pub async fn probe_health(
    client: &Client,
    base_url: &str,
    timeout: Duration,
) -> std::result::Result<bool, SourceError> {
    let url = join_url(base_url, "/health");
    tracing::debug!("🩺 Probing backend health at {}", url);

    let response = client.get(&url).timeout(timeout).send().await?;
    if !response.status().is_success() {
        return Ok(false);
    }

    let body: serde_json::Value = response.json().await?;
    Ok(body.get("status").and_then(|s| s.as_str()) == Some("ok"))
}
