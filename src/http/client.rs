use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, StatusCode};
use std::io::Write;

use super::progress::{ProgressObserver, ProgressTracker};
use super::retry::{NonRetryableError, check_retryable, classify_status};

/// The process-wide HTTP client. One request per call; no retrying here.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and return the whole body. Any non-2xx status is an error.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(check_retryable)
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .map_err(check_retryable)?;

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Body of {} was cut short", url))?;
        Ok(body.to_vec())
    }

    /// Stream `url` into the writer built by `open_dest`, which is only
    /// called once the server has answered HTTP 200.
    ///
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, open_dest, observer))]
    pub async fn stream_to<W, F>(
        &self,
        url: &str,
        open_dest: F,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(check_retryable)
            .with_context(|| format!("Download from {} failed", url))?;

        match response.status() {
            StatusCode::OK => {}
            status => {
                return Err(classify_status(status, url)
                    .err()
                    .map(anyhow::Error::from)
                    .unwrap_or_else(|| anyhow::anyhow!("{} answered HTTP {}", url, status)));
            }
        }

        let mut progress = ProgressTracker::new(response.content_length(), observer);
        let mut dest = open_dest()?;
        let mut received = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Download from {} was interrupted", url))?
        {
            dest.write_all(&chunk)?;
            received += chunk.len() as u64;
            progress.advance(received);
        }
        dest.flush()?;

        debug!("{} byte(s) from {}", received, url);
        Ok(received)
    }
}

/// True when `err` carries an HTTP 404 from [`HttpClient`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<NonRetryableError>(),
            Some(NonRetryableError::NotFound { .. })
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn client() -> HttpClient {
        HttpClient::new(Client::new())
    }

    #[tokio::test]
    async fn test_fetch_returns_listing_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/package/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"full_name": "Owner-Modname"}]"#)
            .expect(1)
            .create_async()
            .await;

        let body = client()
            .fetch(&format!("{}/api/v1/package/", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, br#"[{"full_name": "Owner-Modname"}]"#);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_a_single_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/package/")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let err = client()
            .fetch(&format!("{}/api/v1/package/", server.url()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(!is_not_found(&err));
    }

    #[tokio::test]
    async fn test_stream_to_writes_body_and_reports_progress() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/download/Owner/Modname/1.0.0/")
            .with_status(200)
            .with_body(vec![1u8; 10_000])
            .create_async()
            .await;

        let percents = Mutex::new(Vec::new());
        let observer = |p: u8| percents.lock().unwrap().push(p);
        let mut sink = Vec::new();
        let dest = &mut sink;

        let written = client()
            .stream_to(
                &format!("{}/download/Owner/Modname/1.0.0/", server.url()),
                move || Ok(dest),
                Some(&observer as &dyn ProgressObserver),
            )
            .await
            .unwrap();

        assert_eq!(written, 10_000);
        assert_eq!(sink.len(), 10_000);
        let percents = percents.lock().unwrap();
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_stream_to_missing_archive_never_opens_destination() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/download/Owner/Gone/1.0.0/")
            .with_status(404)
            .create_async()
            .await;

        let err = client()
            .stream_to(
                &format!("{}/download/Owner/Gone/1.0.0/", server.url()),
                || -> Result<Vec<u8>> { panic!("destination opened for a 404") },
                None,
            )
            .await
            .unwrap_err();

        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn test_stream_to_rejects_other_success_codes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/download/")
            .with_status(204)
            .create_async()
            .await;

        let err = client()
            .stream_to(
                &format!("{}/download/", server.url()),
                || Ok(std::io::sink()),
                None,
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 204"));
    }
}
