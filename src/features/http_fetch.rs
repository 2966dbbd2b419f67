/// Size-capped JSON-over-HTTP transport shared by the RPC, relayer and metadata clients.
///
/// `ureq` is blocking, so every request runs on the tokio blocking pool. Each request
/// is bounded by the agent's timeout, after which the socket is closed and the pool
/// thread released. Bodies larger than `max_response_bytes` are rejected rather than
/// truncated.
use serde_json::Value;
use std::io::Read;
use std::time::Duration;

/// Upper bound for any response this crate will buffer, 8 MiB.
const MAX_RESPONSE_BYTES_CEILING: u64 = 8 * 1024 * 1024;
const MIN_RESPONSE_BYTES: u64 = 256;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
    max_response_bytes: u64,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(max_response_bytes: u64) -> Self {
        Self::with_request_timeout(max_response_bytes, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `request_timeout` covers connect, send and the whole response read.
    pub fn with_request_timeout(max_response_bytes: u64, request_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(request_timeout).build(),
            max_response_bytes: clamp_response_bytes(max_response_bytes),
            request_timeout,
        }
    }

    pub fn max_response_bytes(&self) -> u64 {
        self.max_response_bytes
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, String> {
        let payload = serde_json::to_vec(body)
            .map_err(|error| format!("failed to serialize request body: {error}"))?;
        let raw = self.post_bytes(url, payload).await?;
        parse_json_body(&raw, url)
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, String> {
        let url_owned = url.to_string();
        let max = self.max_response_bytes;
        let agent = self.agent.clone();
        let raw = run_blocking(move || {
            let response = agent
                .get(&url_owned)
                .set("accept", "application/json")
                .call()
                .map_err(|error| describe_ureq_error(&url_owned, error))?;
            read_capped(response, max)
        })
        .await?;
        parse_json_body(&raw, url)
    }

    async fn post_bytes(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let url_owned = url.to_string();
        let max = self.max_response_bytes;
        let agent = self.agent.clone();
        run_blocking(move || {
            let response = agent
                .post(&url_owned)
                .set("content-type", "application/json")
                .send_bytes(&body)
                .map_err(|error| describe_ureq_error(&url_owned, error))?;
            read_capped(response, max)
        })
        .await
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|error| format!("http worker task failed: {error}"))?
}

fn describe_ureq_error(url: &str, error: ureq::Error) -> String {
    match error {
        ureq::Error::Status(status, _) => format!("{url} returned status {status}"),
        ureq::Error::Transport(transport) => format!("transport to {url} failed: {transport}"),
    }
}

fn read_capped(response: ureq::Response, max_response_bytes: u64) -> Result<Vec<u8>, String> {
    let mut raw = Vec::new();
    response
        .into_reader()
        .take(max_response_bytes.saturating_add(1))
        .read_to_end(&mut raw)
        .map_err(|error| format!("failed to read response body: {error}"))?;
    ensure_within_cap(raw.len(), max_response_bytes)?;
    Ok(raw)
}

fn ensure_within_cap(len: usize, max_response_bytes: u64) -> Result<(), String> {
    if u64::try_from(len).unwrap_or(u64::MAX) > max_response_bytes {
        return Err(format!(
            "response exceeded max_response_bytes={max_response_bytes}"
        ));
    }
    Ok(())
}

fn parse_json_body(raw: &[u8], url: &str) -> Result<Value, String> {
    serde_json::from_slice(raw)
        .map_err(|error| format!("response from {url} is not valid JSON: {error}"))
}

pub fn clamp_response_bytes(max_response_bytes: u64) -> u64 {
    max_response_bytes.clamp(MIN_RESPONSE_BYTES, MAX_RESPONSE_BYTES_CEILING)
}
