use crate::adapters::http::HttpSource;
use crate::core::report::KNOWN_KINDS;
use crate::domain::model::SourceSpec;
use crate::utils::error::{Result, SiteGeoError};
use crate::utils::validation::{self, Validate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub id: String,
    /// 報告的呈現方式，未設定時沿用 id
    pub kind: Option<String>,
    pub label: Option<String>,
    pub path: String,
    /// 覆蓋 backend.base_url
    pub endpoint: Option<String>,
    pub enabled: Option<bool>,
    pub required: Option<bool>,
    pub silent_on_failure: Option<bool>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    pub parameters: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_path: Option<String>,
    pub archive_name: Option<String>,
}

impl SourceDefinition {
    fn new(id: &str, label: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: None,
            label: Some(label.to_string()),
            path: path.to_string(),
            endpoint: None,
            enabled: None,
            required: None,
            silent_on_failure: None,
            timeout_seconds: None,
            headers: None,
            parameters: None,
        }
    }

    /// 後端尚未提供的來源：失敗時視為「不可用」
    fn not_yet_deployed(mut self) -> Self {
        self.required = Some(false);
        self.silent_on_failure = Some(true);
        self
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.id)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_silent(&self) -> bool {
        self.silent_on_failure.unwrap_or(false)
    }

    /// 預設為必要來源，靜默來源則預設為非必要
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(!self.is_silent())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let airport = {
            let mut def = SourceDefinition::new("airport", "Airport proximity", "/airport/check");
            def.parameters = Some(HashMap::from([("buffer_m".to_string(), "1000".to_string())]));
            def
        };

        Self {
            backend: BackendConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
                headers: None,
            },
            sources: vec![
                SourceDefinition::new("cadastre", "Cadastral sheet", "/sheet/by-point"),
                SourceDefinition::new("zoning", "Zoning (PLU)", "/plu/by-point"),
                SourceDefinition::new("urban_planning", "Urban-planning document", "/du/by-point")
                    .not_yet_deployed(),
                SourceDefinition::new("heritage", "Heritage protection", "/heritage/by-point"),
                SourceDefinition::new("parcel", "Parcel reference", "/parcel/by-point")
                    .not_yet_deployed(),
                airport,
            ],
            report: None,
        }
    }
}

impl RegistryConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SiteGeoError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SiteGeoError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})，未設定者保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("backend.base_url", &self.backend.base_url)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            validation::validate_positive_number("backend.timeout_seconds", timeout, 1)?;
        }

        validation::validate_unique_ids("sources.id", self.sources.iter().map(|s| s.id.as_str()))?;

        for source in &self.sources {
            validation::validate_non_empty_string("sources.id", &source.id)?;
            validation::validate_endpoint_path(&format!("sources.{}.path", source.id), &source.path)?;

            if let Some(kind) = &source.kind {
                if !KNOWN_KINDS.contains(&kind.as_str()) {
                    return Err(SiteGeoError::InvalidConfigValueError {
                        field: format!("sources.{}.kind", source.id),
                        value: kind.clone(),
                        reason: format!("expected one of: {}", KNOWN_KINDS.join(", ")),
                    });
                }
            }
            if let Some(endpoint) = &source.endpoint {
                validation::validate_url(&format!("sources.{}.endpoint", source.id), endpoint)?;
            }
            if let Some(timeout) = source.timeout_seconds {
                validation::validate_positive_number(
                    &format!("sources.{}.timeout_seconds", source.id),
                    timeout,
                    1,
                )?;
            }
            // 必要來源不能同時被靜默
            if source.required == Some(true) && source.is_silent() {
                return Err(SiteGeoError::ConfigValidationError {
                    field: format!("sources.{}", source.id),
                    message: "a required source cannot be silent_on_failure".to_string(),
                });
            }
        }

        if let Some(path) = self.report.as_ref().and_then(|r| r.output_path.as_deref()) {
            validation::validate_path("report.output_path", path)?;
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn output_path(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.output_path.as_deref())
    }

    pub fn archive_name(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.archive_name.as_deref())
    }

    /// 依設定建立來源登錄表，略過停用的來源
    pub fn build_registry(&self, client: &Client) -> Vec<SourceSpec> {
        self.sources
            .iter()
            .filter(|def| {
                if !def.is_enabled() {
                    tracing::info!("⏭️ Source '{}' disabled in configuration", def.id);
                }
                def.is_enabled()
            })
            .map(|def| {
                let base_url = def.endpoint.as_deref().unwrap_or(&self.backend.base_url);

                let mut headers = self.backend.headers.clone().unwrap_or_default();
                headers.extend(def.headers.clone().unwrap_or_default());

                let timeout = def
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| self.timeout());

                let source = HttpSource::new(def.id.clone(), client.clone(), base_url, &def.path)
                    .with_headers(headers)
                    .with_parameters(def.parameters.clone().unwrap_or_default())
                    .with_timeout(timeout);

                tracing::debug!("🔧 Registered source '{}' -> {}", def.id, source.endpoint());

                SourceSpec::new(def.id.clone(), Arc::new(source))
                    .with_kind(def.kind())
                    .with_label(def.label.clone().unwrap_or_else(|| def.id.clone()))
                    .required(def.is_required())
                    .silent_on_failure(def.is_silent())
            })
            .collect()
    }
}

impl Validate for RegistryConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
