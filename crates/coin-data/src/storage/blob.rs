//! 아이콘 파일 저장소.
//!
//! 미디어 루트 아래 `coins/<id>.png` 경로에 아이콘을 저장합니다.
//! 임시 파일에 쓴 뒤 rename하므로 읽는 쪽이 반쯤 쓰인 파일을 보지 않습니다.

use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};

/// 아이콘 저장 디렉토리 (미디어 루트 기준)
const ICON_DIR: &str = "coins";

/// 파일 시스템 기반 아이콘 저장소.
#[derive(Debug, Clone)]
pub struct IconBlobStore {
    root: PathBuf,
}

impl IconBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 미디어 루트
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 자산 ID에 대한 blob 참조 (미디어 루트 기준 상대 경로)
    pub fn blob_ref(id: &str) -> Result<String> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(DataError::Storage(format!("잘못된 자산 ID: {:?}", id)));
        }
        Ok(format!("{}/{}.png", ICON_DIR, id))
    }

    fn resolve(&self, blob_ref: &str) -> Result<PathBuf> {
        if blob_ref.contains("..") || Path::new(blob_ref).is_absolute() {
            return Err(DataError::Storage(format!("잘못된 blob 참조: {:?}", blob_ref)));
        }
        Ok(self.root.join(blob_ref))
    }

    /// 아이콘 저장 후 blob 참조 반환.
    pub async fn save(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let blob_ref = Self::blob_ref(id)?;
        let path = self.resolve(&blob_ref)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("png.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(id = %id, path = %path.display(), size = bytes.len(), "아이콘 저장");
        Ok(blob_ref)
    }

    /// blob 존재 여부.
    pub async fn exists(&self, blob_ref: &str) -> Result<bool> {
        let path = self.resolve(blob_ref)?;
        Ok(tokio::fs::try_exists(path).await?)
    }
}
