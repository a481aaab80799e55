use crate::request::{Body, HttpRequest};
use anyhow::{Context, anyhow};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Returns the body of a 2xx response, or an error naming the provider and status.
    pub fn into_success_body(self, provider: &str) -> anyhow::Result<Vec<u8>> {
        if self.is_success() {
            return Ok(self.body);
        }
        let mut snippet = String::from_utf8_lossy(&self.body).into_owned();
        if snippet.len() > 512 {
            let mut cut = 512;
            while !snippet.is_char_boundary(cut) {
                cut -= 1;
            }
            snippet.truncate(cut);
        }
        Err(anyhow!(
            "{provider} request failed: status={} body={}",
            self.status,
            snippet
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            total: Duration::from_secs(30),
        }
    }
}

impl HttpTimeouts {
    pub fn total_secs(secs: u64) -> Self {
        let total = Duration::from_secs(secs.max(1));
        Self {
            connect: total.min(Duration::from_secs(10)),
            total,
        }
    }
}

pub async fn execute(req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    execute_with(req, HttpTimeouts::default()).await
}

pub async fn execute_with(req: &HttpRequest, timeouts: HttpTimeouts) -> anyhow::Result<HttpResponse> {
    // Without an explicit timeout a broken endpoint would hold the in-flight slot forever
    // and every later sampling tick would be skipped.
    let client = reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.total)
        .build()
        .context("build http client")?;

    let mut headers = HeaderMap::new();
    for (k, v) in &req.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name: {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }

    let builder = match req.method.as_str() {
        "GET" => client.get(&req.url),
        "POST" => client.post(&req.url),
        other => return Err(anyhow!("unsupported method: {other}")),
    }
    .headers(headers);

    let builder = match &req.body {
        Body::Empty => builder,
        Body::Json(s) => builder.body(s.clone()),
    };

    let resp = builder.send().await.context("http request failed")?;
    let status = resp.status().as_u16();
    let body = resp
        .bytes()
        .await
        .context("failed reading response body")?
        .to_vec();

    Ok(HttpResponse { status, body })
}
