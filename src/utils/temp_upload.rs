use std::fs::File;
use std::io;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tokio::io::AsyncWriteExt;

/// 上传文件的临时落盘副本
///
/// 写入走 tokio 异步文件句柄；处理完成后调用 `discard` 删除，
/// 未调用时（panic、请求中断）在 drop 时删除。
pub struct TempUpload {
    file: NamedTempFile,
    writer: tokio::fs::File,
    bytes: u64,
}

impl TempUpload {
    pub async fn create_in(dir: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let dir = dir.to_path_buf();
        let file = tokio::task::spawn_blocking(move || {
            Builder::new()
                .prefix("upload-")
                .suffix(".csv")
                .tempfile_in(&dir)
        })
        .await
        .map_err(io::Error::other)??;

        let writer = tokio::fs::File::from_std(file.as_file().try_clone()?);
        Ok(Self {
            file,
            writer,
            bytes: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer.write_all(chunk).await?;
        self.bytes += chunk.len() as u64;
        Ok(())
    }

    /// 等待后台写入全部落盘，之后才能 `reopen`
    pub async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    /// 以只读方式重新打开，从文件开头读取
    pub fn reopen(&self) -> io::Result<File> {
        self.file.reopen()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            tracing::warn!("Failed to remove upload file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[tokio::test]
    async fn round_trips_written_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let mut upload = TempUpload::create_in(dir.path()).await.unwrap();
        upload.write_chunk(b"Date,Symbol\n").await.unwrap();
        upload.write_chunk(b"2023-01-02,TCS\n").await.unwrap();
        upload.finish().await.unwrap();

        let mut content = String::new();
        upload.reopen().unwrap().read_to_string(&mut content).unwrap();

        assert_eq!(content, "Date,Symbol\n2023-01-02,TCS\n");
        assert_eq!(upload.len(), 27);
    }

    #[tokio::test]
    async fn discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::create_in(&dir.path().join("nested")).await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());

        upload.discard();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let upload = TempUpload::create_in(dir.path()).await.unwrap();
            upload.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
