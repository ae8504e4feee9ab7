use super::{RangeFetcher, check_range};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Local file fetcher with random access support
pub struct LocalFileFetcher {
    file: Arc<File>,
    size: u64,
    path: String,
}

impl LocalFileFetcher {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Arc::new(file),
            size,
            path: path.display().to_string(),
        })
    }
}

#[async_trait]
impl RangeFetcher for LocalFileFetcher {
    async fn fetch(&self, start: u64, end: u64) -> Result<Bytes> {
        check_range(start, end, self.size)?;

        // Positional reads block, keep them off the async workers
        let file = Arc::clone(&self.file);
        let buf = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; (end - start + 1) as usize];
            read_exact_at(&file, &mut buf, start).map(|()| buf)
        })
        .await??;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::io::{Error, ErrorKind};
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(Error::from(ErrorKind::UnexpectedEof)),
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_local_fetch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let fetcher = LocalFileFetcher::open(file.path()).unwrap();
        assert_eq!(fetcher.size(), 10);
        assert_eq!(&fetcher.fetch(2, 5).await.unwrap()[..], b"2345");
        assert_eq!(&fetcher.fetch(9, 9).await.unwrap()[..], b"9");
        assert!(fetcher.fetch(5, 10).await.is_err());
    }
}
