//! Parallel extraction of several entries.
//!
//! Every requested entry becomes its own tokio task; at most
//! [`ExtractOptions::workers`] of them run at once and the rest queue. Tasks
//! share only the read-only entry table and the fetcher, and one task failing
//! never cancels the others.

use futures::stream::{self, StreamExt};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, ZipError};
use crate::io::RangeFetcher;

use super::extractor::ZipArchive;
use super::options::ExtractOptions;

/// An entry that could not be extracted, and why
#[derive(Debug)]
pub struct FailedEntry {
    pub name: String,
    pub error: ZipError,
}

/// Outcome of a batch extraction
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Destination paths written successfully, in completion order
    pub extracted: Vec<PathBuf>,
    /// Entries whose job failed
    pub failed: Vec<FailedEntry>,
}

impl BatchReport {
    /// Whether every job succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<F: RangeFetcher + 'static> ZipArchive<F> {
    /// Extract `names` below `dest`, keeping each entry's directory structure.
    ///
    /// # Errors
    ///
    /// If any name is not in the archive the whole batch is rejected with
    /// [`ZipError::MissingEntry`] before any job starts. Failures of
    /// individual jobs are reported in the returned [`BatchReport`] instead.
    pub async fn extract_parallel<S: AsRef<str>>(
        &self,
        names: &[S],
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<BatchReport> {
        let missing: Vec<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !self.contains(name))
            .map(str::to_owned)
            .collect();
        if !missing.is_empty() {
            return Err(ZipError::MissingEntry(missing));
        }

        let workers = options.workers.max(1);
        debug!(jobs = names.len(), workers, "scheduling extraction jobs");

        let mut jobs = stream::iter(names.iter().map(|name| name.as_ref().to_owned()))
            .map(|name| {
                let archive = self.clone();
                let dest = dest.to_path_buf();
                let options = options.clone();
                let task_name = name.clone();
                async move {
                    let handle = tokio::spawn(async move {
                        archive.extract_job(&task_name, &dest, &options).await
                    });
                    let outcome = handle.await.map_err(ZipError::from).and_then(|result| result);
                    (name, outcome)
                }
            })
            .buffer_unordered(workers);

        let mut report = BatchReport::default();
        while let Some((name, outcome)) = jobs.next().await {
            match outcome {
                Ok(path) => {
                    debug!(entry = %name, path = %path.display(), "extracted");
                    report.extracted.push(path);
                }
                Err(error) => {
                    warn!(entry = %name, %error, "extraction failed");
                    report.failed.push(FailedEntry { name, error });
                }
            }
        }

        Ok(report)
    }

    /// One job: resolve, decode and write a single entry.
    async fn extract_job(
        &self,
        name: &str,
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<PathBuf> {
        let path = destination_path(dest, name)?;

        if self.entry(name)?.is_directory {
            tokio::fs::create_dir_all(&path).await?;
            return Ok(path);
        }

        self.extract_to_file(name, &path, options).await?;
        Ok(path)
    }
}

/// Path below `dest` for entry `name`.
///
/// Absolute names and names climbing out with `..` are rejected.
pub fn destination_path(dest: &Path, name: &str) -> Result<PathBuf> {
    let unsafe_path = || ZipError::UnsafePath {
        name: name.to_string(),
    };

    let mut path = dest.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path());
            }
        }
    }

    if depth == 0 {
        return Err(unsafe_path());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_path() {
        let dest = Path::new("/tmp/out");
        assert_eq!(
            destination_path(dest, "a/b.txt").unwrap(),
            PathBuf::from("/tmp/out/a/b.txt")
        );
        assert_eq!(
            destination_path(dest, "./a.txt").unwrap(),
            PathBuf::from("/tmp/out/a.txt")
        );
        assert_eq!(
            destination_path(dest, "dir/").unwrap(),
            PathBuf::from("/tmp/out/dir")
        );
    }

    #[test]
    fn test_destination_path_rejects_escapes() {
        let dest = Path::new("/tmp/out");
        for name in ["../evil.txt", "a/../../evil.txt", "/etc/passwd", "", "."] {
            assert!(
                matches!(
                    destination_path(dest, name),
                    Err(ZipError::UnsafePath { .. })
                ),
                "{name} should be rejected"
            );
        }
    }
}
