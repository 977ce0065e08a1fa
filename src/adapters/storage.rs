use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;

/// 寫入本機目錄的報告存儲
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("reports"));

        storage.write_file("nested/report.txt", b"hello").await.unwrap();

        let data = storage.read_file("nested/report.txt").await.unwrap();
        assert_eq!(data, b"hello");
        assert!(temp_dir.path().join("reports/nested/report.txt").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        let err = storage.read_file("missing.json").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::SiteGeoError::IoError(_)));
    }

    #[test]
    fn test_overwrite_from_sync_context() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        tokio_test::block_on(async {
            storage.write_file("site_report.zip", b"first").await.unwrap();
            storage.write_file("site_report.zip", b"second").await.unwrap();
        });

        let data = tokio_test::block_on(storage.read_file("site_report.zip")).unwrap();
        assert_eq!(data, b"second");
    }
}
