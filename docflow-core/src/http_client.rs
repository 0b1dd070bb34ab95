use std::time::Instant;

use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::HttpCfg;
use crate::error::{CoreResult, DocflowError};

/// Represents a single Server-Sent-Event line (already split on `\n`).
#[derive(Debug, Clone)]
pub struct SseLine {
    pub line: String,
}

/// A boxed stream of `SseLine` results.
pub type SseStream = std::pin::Pin<
    Box<dyn futures_util::stream::Stream<Item = crate::error::CoreResult<SseLine>> + Send>,
>;

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
    request_timeout: std::time::Duration,
}

impl HttpClient {
    pub fn new_default() -> CoreResult<Self> {
        Self::from_cfg(&HttpCfg::default())
    }

    pub fn from_cfg(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(std::time::Duration::from_millis(cfg.connect_timeout_ms));
        if let Some(cap) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(cap);
        }
        let inner = builder
            .build()
            .map_err(|e| DocflowError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "docflow/0.1".to_string(),
            request_timeout: std::time::Duration::from_millis(cfg.request_timeout_ms),
        })
    }

    /// POST JSON and decode a JSON response (blocking response mode).
    pub async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        app: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let start = Instant::now();
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .timeout(self.request_timeout)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|_e| {
            DocflowError::UpstreamUnavailable {
                app: app.to_string(),
            }
        })?;

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let ra = parse_retry_after(&resp_headers);
            return Err(map_http_error(app, status, ra, &text));
        }

        let parsed = resp.json::<R>().await.map_err(|e| DocflowError::UpstreamError {
            app: app.to_string(),
            code: status.as_u16().to_string(),
            message: format!("json decode error: {e}"),
        })?;
        tracing::debug!(app, latency_ms = start.elapsed().as_millis() as u64, "blocking call ok");
        Ok(parsed)
    }

    /// POST JSON and return an SSE (Server-Sent Events) line stream.
    /// Each yielded item is one raw line (trim not applied) from the SSE channel.
    pub async fn post_sse_lines<T: Serialize + ?Sized>(
        &self,
        app: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<SseStream> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/event-stream");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|_| DocflowError::UpstreamUnavailable {
            app: app.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let resp_headers = resp.headers().clone();
            let ra = parse_retry_after(&resp_headers);
            let body = resp.text().await.unwrap_or_default();
            return Err(map_http_error(app, status, ra, &body));
        }

        // Stream body as bytes and split on '\n'
        let byte_stream = resp.bytes_stream();
        let line_stream = LineStream::new(app.to_string(), Box::pin(byte_stream));
        Ok(Box::pin(line_stream))
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    if let Some(v) = headers.get("retry-after")
        && let Ok(s) = v.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
    {
        return Some(secs);
    }
    // Non-numeric (HTTP-date) forms are ignored.
    None
}

fn map_http_error(app: &str, status: StatusCode, retry_after: Option<u64>, body: &str) -> DocflowError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => DocflowError::RateLimited {
            app: app.to_string(),
            retry_after,
        },
        s if s.is_server_error() => DocflowError::UpstreamUnavailable {
            app: app.to_string(),
        },
        s => DocflowError::UpstreamError {
            app: app.to_string(),
            code: s.as_u16().to_string(),
            message: truncate(body, 300),
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        // Never cut inside a multibyte character.
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut t = s[..end].to_string();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

/// Internal line splitter over a bytes stream; yields `SseLine`s separated by '\n'.
struct LineStream {
    app: String,
    inner: std::pin::Pin<
        Box<dyn futures_util::stream::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>,
    >,
    buf: String,
    flushed_tail: bool,
}

impl LineStream {
    fn new(
        app: String,
        inner: std::pin::Pin<
            Box<dyn futures_util::stream::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>,
        >,
    ) -> Self {
        Self {
            app,
            inner,
            buf: String::new(),
            flushed_tail: false,
        }
    }
}

impl futures_util::stream::Stream for LineStream {
    type Item = CoreResult<SseLine>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;
        loop {
            // If we already have a newline in the buffer, split and yield immediately.
            if let Some(idx) = self.buf.find('\n') {
                let mut line = self.buf.drain(..=idx).collect::<String>();
                if line.ends_with('\n') {
                    if line.ends_with("\r\n") {
                        line.truncate(line.len() - 2);
                    } else {
                        line.truncate(line.len() - 1);
                    }
                }
                return Poll::Ready(Some(Ok(SseLine { line })));
            }

            // Otherwise, poll the inner stream for more bytes
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let s = String::from_utf8_lossy(&chunk);
                    self.buf.push_str(&s);
                    continue;
                }
                Poll::Ready(Some(Err(_e))) => {
                    let app = self.app.clone();
                    return Poll::Ready(Some(Err(DocflowError::UpstreamUnavailable { app })));
                }
                Poll::Ready(None) => {
                    if !self.flushed_tail && !self.buf.is_empty() {
                        self.flushed_tail = true;
                        let line = std::mem::take(&mut self.buf);
                        return Poll::Ready(Some(Ok(SseLine { line })));
                    } else {
                        return Poll::Ready(None);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
