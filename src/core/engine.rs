use crate::core::aggregator::MultiSourceAggregator;
use crate::core::export::{ReportExporter, DEFAULT_ARCHIVE_NAME};
use crate::core::session::{ReportSession, RunId};
use crate::domain::model::{AggregateResult, Point};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, SiteGeoError};
use crate::utils::monitor::RunMonitor;
use std::sync::Arc;

pub struct EngineOutput {
    pub run_id: RunId,
    pub result: AggregateResult,
    pub archive_path: Option<String>,
}

/// 查詢流程：送出查詢、等待結果、（選擇性）匯出報告
pub struct ReportEngine<S: Storage> {
    session: ReportSession,
    exporter: Option<(ReportExporter<S>, String)>,
    monitor: RunMonitor,
}

impl<S: Storage> ReportEngine<S> {
    pub fn new(aggregator: Arc<MultiSourceAggregator>) -> Self {
        Self {
            session: ReportSession::new(aggregator),
            exporter: None,
            monitor: RunMonitor::default(),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = RunMonitor::new(enabled);
        self
    }

    pub fn with_export(mut self, storage: S, archive_name: Option<&str>) -> Self {
        let name = archive_name.unwrap_or(DEFAULT_ARCHIVE_NAME).to_string();
        self.exporter = Some((ReportExporter::new(storage), name));
        self
    }

    pub async fn run(&mut self, point: Point) -> Result<EngineOutput> {
        self.monitor.log_stats("Run started");

        let submitted = self.session.submit(point);
        let (run_id, result) =
            self.session
                .settled()
                .await
                .ok_or_else(|| SiteGeoError::QueryCancelled {
                    run: submitted.to_string(),
                })?;

        self.monitor.log_stats("Run settled");

        let archive_path = match &self.exporter {
            Some((exporter, name)) => Some(exporter.export(&result, name).await?),
            None => None,
        };

        Ok(EngineOutput {
            run_id,
            result,
            archive_path,
        })
    }
}
