use crate::domain::model::Point;
use crate::utils::error::{Result, SourceError};
use async_trait::async_trait;
use std::future::Future;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 對單一外部資料來源發出一次以點為參數的查詢
#[async_trait]
pub trait SourceCall: Send + Sync {
    async fn call(&self, point: Point) -> std::result::Result<serde_json::Value, SourceError>;
}

/// 以閉包實作的來源，方便組裝與測試
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Point) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<serde_json::Value, SourceError>> + Send + 'static,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> SourceCall for FnSource<F>
where
    F: Fn(Point) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<serde_json::Value, SourceError>> + Send + 'static,
{
    async fn call(&self, point: Point) -> std::result::Result<serde_json::Value, SourceError> {
        (self.f)(point).await
    }
}
