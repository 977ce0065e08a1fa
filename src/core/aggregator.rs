use crate::domain::model::{
    AggregateResult, ErrorEntry, Point, SourceEntry, SourceOutcome, SourceSpec,
};
use crate::utils::error::SourceError;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// 同時查詢所有來源；結果依註冊順序排列，錯誤紀錄依失敗發生的順序
pub struct MultiSourceAggregator {
    sources: Arc<[SourceSpec]>,
}

impl MultiSourceAggregator {
    pub fn new(sources: Vec<SourceSpec>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// 對所有來源發出查詢，等全部完成後回傳全新的結果
    pub async fn run(&self, point: Point) -> AggregateResult {
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            "🚀 Dispatching {} sources for point ({})",
            self.sources.len(),
            point
        );

        let mut pending: FuturesUnordered<_> = self
            .sources
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let span = tracing::info_span!("source", id = %spec.id);
                dispatch(spec, point)
                    .map(move |result| (index, result))
                    .instrument(span)
            })
            .collect();

        let mut slots: Vec<Option<SourceOutcome>> = vec![None; self.sources.len()];
        let mut errors = Vec::new();

        // 依完成順序記錄，錯誤紀錄因此反映實際的失敗順序
        while let Some((index, result)) = pending.next().await {
            let spec = &self.sources[index];
            let outcome = classify(spec, result);

            if let SourceOutcome::Failure { message } = &outcome {
                if spec.required {
                    errors.push(ErrorEntry {
                        source_id: spec.id.clone(),
                        message: message.clone(),
                    });
                }
            }
            slots[index] = Some(outcome);
        }

        let entries = self
            .sources
            .iter()
            .zip(slots)
            .map(|(spec, outcome)| SourceEntry {
                id: spec.id.clone(),
                kind: spec.kind.clone(),
                label: spec.label.clone(),
                // FuturesUnordered 會把每個來源都跑完
                outcome: outcome.unwrap_or_else(|| SourceOutcome::Failure {
                    message: "source did not settle".to_string(),
                }),
            })
            .collect();

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = AggregateResult::new(point, started_at, duration_ms, entries, errors);

        tracing::info!(
            "✅ Run settled: {}/{} sources succeeded, {} errors ({} ms)",
            result.success_count(),
            result.len(),
            result.errors().len(),
            duration_ms
        );
        result
    }
}

async fn dispatch(
    spec: &SourceSpec,
    point: Point,
) -> std::result::Result<serde_json::Value, SourceError> {
    let call = Arc::clone(&spec.call);
    tracing::debug!("📡 Calling source");

    match AssertUnwindSafe(call.call(point)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SourceError::Other {
                message: format!("source panicked: {}", detail),
            })
        }
    }
}

fn classify(
    spec: &SourceSpec,
    result: std::result::Result<serde_json::Value, SourceError>,
) -> SourceOutcome {
    match result {
        Ok(payload) => {
            tracing::debug!("📥 {}: success", spec.id);
            SourceOutcome::Success { payload }
        }
        Err(e) if spec.silent_on_failure => {
            tracing::debug!("⏭️ {}: unavailable ({})", spec.id, e);
            SourceOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
        Err(e) => {
            tracing::warn!("❌ {}: {}", spec.id, e);
            SourceOutcome::Failure {
                message: e.to_string(),
            }
        }
    }
}
