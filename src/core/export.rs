use crate::core::report::{outcome_detail, render_text, SourceView};
use crate::domain::model::AggregateResult;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const DEFAULT_ARCHIVE_NAME: &str = "site_report.zip";

#[derive(Serialize)]
struct ReportDocument<'a> {
    #[serde(flatten)]
    result: &'a AggregateResult,
    views: Vec<(&'a str, SourceView)>,
}

/// 把一次查詢的結果打包成 zip 寫入存儲
pub struct ReportExporter<S: Storage> {
    storage: S,
}

impl<S: Storage> ReportExporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// 產生 report.json、sources.csv、report.txt，有錯誤時另附 errors.txt
    pub async fn export(&self, result: &AggregateResult, archive_name: &str) -> Result<String> {
        let json = self.to_json(result)?;
        let csv = self.to_csv(result)?;
        let text = render_text(result);

        tracing::debug!(
            "Creating report archive with {} files",
            3 + usize::from(!result.errors().is_empty())
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("report.json", FileOptions::default())?;
            zip.write_all(json.as_bytes())?;

            zip.start_file::<_, ()>("sources.csv", FileOptions::default())?;
            zip.write_all(&csv)?;

            zip.start_file::<_, ()>("report.txt", FileOptions::default())?;
            zip.write_all(text.as_bytes())?;

            if !result.errors().is_empty() {
                zip.start_file::<_, ()>("errors.txt", FileOptions::default())?;
                zip.write_all(result.error_log_text().as_bytes())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing report archive ({} bytes) to storage", zip_data.len());
        self.storage.write_file(archive_name, &zip_data).await?;

        tracing::info!("💾 Report archive saved: {}", archive_name);
        Ok(archive_name.to_string())
    }

    fn to_json(&self, result: &AggregateResult) -> Result<String> {
        let views = result
            .entries()
            .iter()
            .filter_map(|entry| {
                entry
                    .outcome
                    .payload()
                    .map(|payload| (entry.id.as_str(), SourceView::from_payload(&entry.kind, payload)))
            })
            .collect();

        let document = ReportDocument { result, views };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn to_csv(&self, result: &AggregateResult) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", "label", "status", "detail"])?;

        for entry in result.entries() {
            writer.write_record([
                entry.id.as_str(),
                entry.label.as_str(),
                entry.outcome.status_label(),
                outcome_detail(entry).as_str(),
            ])?;
        }

        writer
            .into_inner()
            .map_err(|e| crate::utils::error::SiteGeoError::IoError(e.into_error()))
    }
}
