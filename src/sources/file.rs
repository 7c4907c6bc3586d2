use super::FragmentSource;
use crate::error::SourceError;
use async_trait::async_trait;
use std::path::PathBuf;

/// A `tweets.js` (or `tweets-partN.js`) file from an unpacked export.
pub struct FileFragment {
    path: PathBuf,
}

impl FileFragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FragmentSource for FileFragment {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<String, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8(self.describe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tweets.js");
        std::fs::write(&path, "window.YTD.tweets.part0 = []").unwrap();

        let fragment = FileFragment::new(&path);
        assert_eq!(fragment.read().await.unwrap(), "window.YTD.tweets.part0 = []");
        assert!(fragment.describe().ends_with("tweets.js"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let tmp = tempdir().unwrap();
        let fragment = FileFragment::new(tmp.path().join("missing.js"));
        let err = fragment.read().await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_read_non_utf8_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("binary.js");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let err = FileFragment::new(&path).read().await.unwrap_err();
        assert!(matches!(err, SourceError::NotUtf8(_)));
    }
}
