use crate::core::aggregator::MultiSourceAggregator;
use crate::domain::model::{AggregateResult, Point};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

struct InFlight {
    id: RunId,
    handle: JoinHandle<()>,
}

/// 持有「最新查詢」：新查詢會中止舊查詢，非目前 RunId 的結果一律丟棄
pub struct ReportSession {
    aggregator: Arc<MultiSourceAggregator>,
    sink_tx: mpsc::UnboundedSender<(RunId, AggregateResult)>,
    sink_rx: mpsc::UnboundedReceiver<(RunId, AggregateResult)>,
    current: Option<InFlight>,
    next_id: u64,
}

impl ReportSession {
    pub fn new(aggregator: Arc<MultiSourceAggregator>) -> Self {
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        Self {
            aggregator,
            sink_tx,
            sink_rx,
            current: None,
            next_id: 1,
        }
    }

    /// 開始新的查詢；仍在執行的舊查詢會被中止
    pub fn submit(&mut self, point: Point) -> RunId {
        if let Some(stale) = self.current.take() {
            tracing::debug!("🛑 Aborting {} superseded by a new query", stale.id);
            stale.handle.abort();
        }

        let id = RunId(self.next_id);
        self.next_id += 1;

        let aggregator = Arc::clone(&self.aggregator);
        let sink = self.sink_tx.clone();
        let handle = tokio::spawn(async move {
            let result = aggregator.run(point).await;
            // 接收端已關閉代表 session 已結束
            let _ = sink.send((id, result));
        });

        tracing::info!("🔎 Submitted {} for point ({})", id, point);
        self.current = Some(InFlight { id, handle });
        id
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.current.as_ref().map(|run| run.id)
    }

    /// 等待目前查詢完成；沒有進行中的查詢時回傳 None
    pub async fn settled(&mut self) -> Option<(RunId, AggregateResult)> {
        loop {
            let current = self.current.as_ref()?.id;
            let (id, result) = self.sink_rx.recv().await?;

            if id == current {
                self.current = None;
                return Some((id, result));
            }
            tracing::debug!("🗑️ Discarding stale result from {} (current is {})", id, current);
        }
    }

    /// 中止目前查詢，不產生任何結果
    pub fn cancel(&mut self) {
        if let Some(run) = self.current.take() {
            tracing::debug!("🛑 Cancelling {}", run.id);
            run.handle.abort();
        }
    }
}

impl Drop for ReportSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
