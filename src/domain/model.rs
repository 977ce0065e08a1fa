use crate::domain::ports::SourceCall;
use crate::utils::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// WGS84 經緯度點（十進位度數）。兩個值都保證為有限數，不做地理範圍檢查。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawPoint> for Point {
    type Error = ValidationError;

    fn try_from(raw: RawPoint) -> std::result::Result<Self, Self::Error> {
        Point::new(raw.lat, raw.lon)
    }
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> std::result::Result<Self, ValidationError> {
        check_finite("latitude", lat)?;
        check_finite("longitude", lon)?;
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// 交換緯度與經度
    pub fn swapped(self) -> Self {
        Self {
            lat: self.lon,
            lon: self.lat,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

fn check_finite(field: &str, value: f64) -> std::result::Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "value must be a finite number".to_string(),
        })
    }
}

/// 一個已註冊的外部資料來源
#[derive(Clone)]
pub struct SourceSpec {
    pub id: String,
    /// 決定報告如何解讀回應內容，預設與 id 相同
    pub kind: String,
    pub label: String,
    pub call: Arc<dyn SourceCall>,
    pub required: bool,
    pub silent_on_failure: bool,
}

impl SourceSpec {
    pub fn new(id: impl Into<String>, call: Arc<dyn SourceCall>) -> Self {
        let id = id.into();
        Self {
            kind: id.clone(),
            label: id.clone(),
            id,
            call,
            required: true,
            silent_on_failure: false,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn silent_on_failure(mut self, silent: bool) -> Self {
        self.silent_on_failure = silent;
        self
    }
}

impl fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("required", &self.required)
            .field("silent_on_failure", &self.silent_on_failure)
            .finish_non_exhaustive()
    }
}

/// 單一來源在一次查詢中的最終結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Success { payload: serde_json::Value },
    Unavailable { reason: String },
    Failure { message: String },
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceOutcome::Success { .. })
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            SourceOutcome::Success { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            SourceOutcome::Success { .. } => "success",
            SourceOutcome::Unavailable { .. } => "unavailable",
            SourceOutcome::Failure { .. } => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub source_id: String,
    pub message: String,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source_id, self.message)
    }
}

/// 一次查詢的完整快照。建立後不再變動，由呼叫端獨佔。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub point: Point,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    entries: Vec<SourceEntry>,
    errors: Vec<ErrorEntry>,
}

impl AggregateResult {
    pub fn new(
        point: Point,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        entries: Vec<SourceEntry>,
        errors: Vec<ErrorEntry>,
    ) -> Self {
        Self {
            point,
            started_at,
            duration_ms,
            entries,
            errors,
        }
    }

    /// 依註冊順序排列的所有來源結果
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn outcome(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.id == source_id)
            .map(|entry| &entry.outcome)
    }

    /// 必要來源的錯誤，依完成順序
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    /// 錯誤紀錄的純文字版本，每個失敗一行
    pub fn error_log_text(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
