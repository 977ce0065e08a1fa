use crate::domain::model::{AggregateResult, SourceEntry, SourceOutcome};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

// 欄位缺漏或型別不符時視為不存在，不會失敗
fn text(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match payload.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn number(payload: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match payload.get(*key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

fn flag(payload: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_bool))
}

fn strings(payload: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => text(other, &["url", "href"]),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLink {
    pub label: Option<String>,
    pub url: String,
}

fn links(payload: &Value, keys: &[&str]) -> Vec<DocumentLink> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(url) => Some(DocumentLink {
                        label: None,
                        url: url.clone(),
                    }),
                    other => text(other, &["url", "href"]).map(|url| DocumentLink {
                        label: text(other, &["label", "title", "name"]),
                        url,
                    }),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// 地籍圖幅
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CadastreSheet {
    pub provenance: Option<String>,
    pub download_url: Option<String>,
}

impl CadastreSheet {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            provenance: text(payload, &["source", "provenance"]),
            download_url: text(payload, &["download_url", "url"]),
        }
    }
}

/// 分區（PLU）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoningInfo {
    pub zone_code: Option<String>,
    pub nature: Option<String>,
    pub zone_type: Option<String>,
    pub regulation_urls: Vec<String>,
    pub documents: Vec<DocumentLink>,
    pub note: Option<String>,
}

impl ZoningInfo {
    pub fn from_payload(payload: &Value) -> Self {
        let mut regulation_urls = strings(payload, &["regulation_urls", "reglement_urls"]);
        // 後端也可能只回傳單一下載連結
        if regulation_urls.is_empty() {
            if let Some(url) = text(payload, &["download_url"]) {
                regulation_urls.push(url);
            }
        }

        Self {
            zone_code: text(payload, &["zone_code", "libelle", "zone"]),
            nature: text(payload, &["nature", "libelong"]),
            zone_type: text(payload, &["type", "typezone"]),
            regulation_urls,
            documents: links(payload, &["documents", "atom_links"]),
            note: text(payload, &["note"]),
        }
    }
}

/// 都市計畫文件狀態
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanningStatus {
    pub status: Option<String>,
    pub commune_name: Option<String>,
    pub commune_code: Option<String>,
    pub document_type: Option<String>,
    pub document_ids: Vec<String>,
}

impl PlanningStatus {
    pub fn from_payload(payload: &Value) -> Self {
        let mut document_ids = strings(payload, &["document_ids", "idurbas"]);
        if document_ids.is_empty() {
            if let Some(id) = text(payload, &["idurba", "document_id"]) {
                document_ids.push(id);
            }
        }

        Self {
            status: text(payload, &["status", "etat"]),
            commune_name: text(payload, &["commune", "commune_name"]),
            commune_code: text(payload, &["insee", "commune_code"]),
            document_type: text(payload, &["du_type", "document_type"]),
            document_ids,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeritageLayer {
    pub label: Option<String>,
    pub count: u64,
    pub items: Vec<String>,
    pub error: Option<String>,
}

/// 文化資產保護範圍摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeritageSummary {
    pub any_found: bool,
    pub total: u64,
    pub layers: BTreeMap<String, HeritageLayer>,
}

impl HeritageSummary {
    pub fn from_payload(payload: &Value) -> Self {
        let layers: BTreeMap<String, HeritageLayer> = payload
            .get("layers")
            .and_then(Value::as_object)
            .map(|layers| {
                layers
                    .iter()
                    .map(|(key, layer)| {
                        let items: Vec<String> = layer
                            .get("items")
                            .and_then(Value::as_array)
                            .map(|items| {
                                items
                                    .iter()
                                    .filter_map(|item| match item {
                                        Value::String(s) => Some(s.clone()),
                                        other => text(other, &["label", "name"]),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();
                        let count = number(layer, &["count"])
                            .map(|c| c.max(0.0) as u64)
                            .unwrap_or(items.len() as u64);
                        (
                            key.clone(),
                            HeritageLayer {
                                label: text(layer, &["label"]),
                                count,
                                items,
                                error: text(layer, &["error"]),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let total = number(payload, &["total", "count"])
            .map(|t| t.max(0.0) as u64)
            .unwrap_or_else(|| layers.values().map(|l| l.count).sum());

        Self {
            any_found: flag(payload, &["any_found", "found"]).unwrap_or(total > 0),
            total,
            layers,
        }
    }
}

/// 地號參考連結
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParcelReference {
    pub url: Option<String>,
}

impl ParcelReference {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            url: text(payload, &["url", "reference_url"]),
        }
    }
}

/// 機場鄰近檢查
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirportCheck {
    pub status: Option<String>,
    pub distance_m: Option<f64>,
    pub buffer_m: Option<f64>,
    /// (lon, lat)
    pub closest_airport: Option<(f64, f64)>,
}

impl AirportCheck {
    pub fn from_payload(payload: &Value) -> Self {
        let closest_airport = payload
            .get("closest_airport_lonlat")
            .and_then(Value::as_array)
            .and_then(|pair| match pair.as_slice() {
                [lon, lat, ..] => Some((lon.as_f64()?, lat.as_f64()?)),
                _ => None,
            });

        Self {
            status: text(payload, &["status"]),
            distance_m: number(payload, &["distance_m"]),
            buffer_m: number(payload, &["buffer_m"]),
            closest_airport,
        }
    }

    pub fn is_within_buffer(&self) -> Option<bool> {
        match self.status.as_deref() {
            Some("KO") => Some(true),
            Some("OK") => Some(false),
            _ => None,
        }
    }
}

/// 依來源種類選擇對應的檢視
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceView {
    Cadastre(CadastreSheet),
    Zoning(ZoningInfo),
    UrbanPlanning(PlanningStatus),
    Heritage(HeritageSummary),
    Parcel(ParcelReference),
    Airport(AirportCheck),
    Raw { payload: Value },
}

/// 報告認得的來源種類；其他種類以原始 JSON 呈現
pub const KNOWN_KINDS: &[&str] = &[
    "cadastre",
    "zoning",
    "urban_planning",
    "heritage",
    "parcel",
    "airport",
    "raw",
];

impl SourceView {
    pub fn from_payload(kind: &str, payload: &Value) -> Self {
        match kind {
            "cadastre" => SourceView::Cadastre(CadastreSheet::from_payload(payload)),
            "zoning" => SourceView::Zoning(ZoningInfo::from_payload(payload)),
            "urban_planning" => SourceView::UrbanPlanning(PlanningStatus::from_payload(payload)),
            "heritage" => SourceView::Heritage(HeritageSummary::from_payload(payload)),
            "parcel" => SourceView::Parcel(ParcelReference::from_payload(payload)),
            "airport" => SourceView::Airport(AirportCheck::from_payload(payload)),
            _ => SourceView::Raw {
                payload: payload.clone(),
            },
        }
    }

    fn lines(&self) -> Vec<String> {
        let or_none = |v: &Option<String>| v.clone().unwrap_or_else(|| NO_DATA.to_string());
        let mut lines = Vec::new();

        match self {
            SourceView::Cadastre(sheet) => {
                lines.push(format!("provenance: {}", or_none(&sheet.provenance)));
                lines.push(format!("archive: {}", or_none(&sheet.download_url)));
            }
            SourceView::Zoning(zoning) => {
                lines.push(format!("zone: {}", or_none(&zoning.zone_code)));
                lines.push(format!("nature: {}", or_none(&zoning.nature)));
                lines.push(format!("type: {}", or_none(&zoning.zone_type)));
                push_list(&mut lines, "regulation", &zoning.regulation_urls);
                let documents: Vec<String> = zoning
                    .documents
                    .iter()
                    .map(|d| match &d.label {
                        Some(label) => format!("{} ({})", label, d.url),
                        None => d.url.clone(),
                    })
                    .collect();
                push_list(&mut lines, "documents", &documents);
                if let Some(note) = &zoning.note {
                    lines.push(format!("note: {}", note));
                }
            }
            SourceView::UrbanPlanning(status) => {
                lines.push(format!("status: {}", or_none(&status.status)));
                let commune = match (&status.commune_name, &status.commune_code) {
                    (Some(name), Some(code)) => format!("{} ({})", name, code),
                    (Some(name), None) => name.clone(),
                    (None, Some(code)) => code.clone(),
                    (None, None) => NO_DATA.to_string(),
                };
                lines.push(format!("commune: {}", commune));
                lines.push(format!("document type: {}", or_none(&status.document_type)));
                push_list(&mut lines, "documents", &status.document_ids);
            }
            SourceView::Heritage(summary) => {
                lines.push(format!(
                    "protection found: {} ({} hits)",
                    if summary.any_found { "yes" } else { "no" },
                    summary.total
                ));
                for (key, layer) in &summary.layers {
                    let label = layer.label.as_deref().unwrap_or(key);
                    match &layer.error {
                        Some(error) => lines.push(format!("{}: error: {}", label, error)),
                        None => lines.push(format!("{}: {}", label, layer.count)),
                    }
                    for item in &layer.items {
                        lines.push(format!("  - {}", item));
                    }
                }
            }
            SourceView::Parcel(parcel) => {
                lines.push(format!("reference: {}", or_none(&parcel.url)));
            }
            SourceView::Airport(check) => {
                lines.push(format!("status: {}", or_none(&check.status)));
                lines.push(format!(
                    "nearest distance: {}",
                    check
                        .distance_m
                        .map(|d| format!("{:.0} m", d))
                        .unwrap_or_else(|| NO_DATA.to_string())
                ));
                if let Some(buffer) = check.buffer_m {
                    lines.push(format!("buffer: {:.0} m", buffer));
                }
                if let Some((lon, lat)) = check.closest_airport {
                    lines.push(format!("nearest airport: {}, {}", lat, lon));
                }
            }
            SourceView::Raw { payload } => {
                lines.push(payload.to_string());
            }
        }
        lines
    }
}

const NO_DATA: &str = "no data";

fn push_list(lines: &mut Vec<String>, name: &str, items: &[String]) {
    if items.is_empty() {
        lines.push(format!("{}: {}", name, NO_DATA));
    } else {
        lines.push(format!("{}:", name));
        lines.extend(items.iter().map(|item| format!("  - {}", item)));
    }
}

/// 一個來源的單行摘要，供 CSV 匯出使用
pub fn outcome_detail(entry: &SourceEntry) -> String {
    match &entry.outcome {
        SourceOutcome::Success { payload } => {
            SourceView::from_payload(&entry.kind, payload).lines().join("; ")
        }
        SourceOutcome::Unavailable { reason } => reason.clone(),
        SourceOutcome::Failure { message } => message.clone(),
    }
}

/// 純文字報告：每個來源一段，最後附上錯誤紀錄
pub fn render_text(result: &AggregateResult) -> String {
    let mut out = Vec::new();
    out.push(format!("Point: {}", result.point));
    out.push(format!(
        "Queried at {} ({} ms)",
        result.started_at.to_rfc3339(),
        result.duration_ms
    ));

    for entry in result.entries() {
        out.push(String::new());
        out.push(format!("== {} ==", entry.label));
        match &entry.outcome {
            SourceOutcome::Success { payload } => {
                out.extend(SourceView::from_payload(&entry.kind, payload).lines());
            }
            SourceOutcome::Unavailable { .. } => out.push("not available".to_string()),
            SourceOutcome::Failure { message } => out.push(format!("error: {}", message)),
        }
    }

    if !result.errors().is_empty() {
        out.push(String::new());
        out.push("Errors:".to_string());
        out.push(result.error_log_text());
    }

    out.join("\n")
}
