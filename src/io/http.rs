use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{RangeFetcher, check_range};
use crate::error::{Result, ZipError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP Range fetcher for remote ZIP files
pub struct HttpRangeFetcher {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeFetcher {
    /// Create a new HTTP Range fetcher
    ///
    /// This probes the resource once to learn its total size. Redirects are
    /// followed by the underlying client.
    pub async fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(client, url).await
    }

    /// Create a fetcher that issues its requests through `client`
    pub async fn with_client(client: Client, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let size = probe_size(&client, &url).await?;
        debug!(%url, size, "probed remote archive size");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 0,
        })
    }

    /// Retry timed-out or refused connections up to `max_retry` times per fetch
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    fn status_error(&self, status: StatusCode) -> ZipError {
        ZipError::HttpStatus {
            url: self.url.clone(),
            status: status.as_u16(),
        }
    }
}

/// Learn the resource length from HEAD, falling back to a one-byte range GET.
async fn probe_size(client: &Client, url: &str) -> Result<u64> {
    let resp = client.head(url).send().await?;
    if resp.status().is_success() {
        if let Some(len) = header_u64(resp.headers()).filter(|&len| len > 0) {
            return Ok(len);
        }
        debug!(%url, "HEAD response carried no content length");
    } else {
        debug!(%url, status = %resp.status(), "HEAD refused");
    }

    let resp = client.get(url).header(RANGE, "bytes=0-0").send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ZipError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    resp.headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(content_range_total)
        .filter(|&len| len > 0)
        .ok_or_else(|| ZipError::SizeUnknown {
            location: url.to_string(),
        })
}

fn header_u64(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Total length from a `Content-Range: bytes 0-0/12345` header.
fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch(&self, start: u64, end: u64) -> Result<Bytes> {
        check_range(start, end, self.size)?;
        let expected_size = (end - start + 1) as usize;

        let mut buf = BytesMut::new();
        let mut retry_count = 0;

        while buf.len() < expected_size {
            let current_start = start + buf.len() as u64;
            let range = format!("bytes={current_start}-{end}");
            trace!(url = %self.url, %range, "range request");

            let result = self
                .client
                .get(&self.url)
                .header(RANGE, &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(self.status_error(resp.status()));
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return Err(ZipError::EmptyResponse {
                            url: self.url.clone(),
                            start: current_start,
                            end,
                        });
                    }

                    let chunk_len = bytes.len().min(expected_size - buf.len());
                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);

                    // Common case: the whole range arrived in one response
                    if buf.is_empty() && chunk_len == expected_size {
                        return Ok(bytes.slice(..chunk_len));
                    }
                    buf.extend_from_slice(&bytes[..chunk_len]);
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && retry_count < self.max_retry => {
                    retry_count += 1;
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(retry_count))).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(buf.freeze())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> &str {
        &self.url
    }
}
