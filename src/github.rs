// src/github.rs
use log::info;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::client::{RequestClient, content_type, decode_response};
use crate::config::StatusTarget;
use crate::errors::Result;
use crate::payload::Payload;

pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT_VALUE: &str = concat!("eval-session-runner/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Error,
    Failure,
    Success,
}

/// Body of `POST /repos/{repo}/statuses/{commit}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommitStatus {
    pub state: CommitState,
    pub target_url: Option<String>,
    pub description: String,
    pub context: String,
}

/// Headers the statuses endpoint expects, as name/value pairs.
pub fn status_headers(token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("X-GitHub-Api-Version", GITHUB_API_VERSION.to_string()),
        ("Accept", GITHUB_ACCEPT.to_string()),
        ("Authorization", format!("Bearer {}", token)),
    ]
}

fn header_map(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in status_headers(token) {
        headers.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(&value)?);
    }
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    Ok(headers)
}

/// Sets a commit status. Non-2xx replies come back as `RunnerError::Server`;
/// a 2xx reply counts as success whatever its body.
pub async fn post_commit_status(
    client: &RequestClient,
    api_base: &str,
    target: &StatusTarget<'_>,
    status: &CommitStatus,
) -> Result<Payload> {
    let url = target.statuses_url(api_base);
    let headers = header_map(target.token)?;

    info!("📡 Setting commit status '{:?}' on {}@{}", status.state, target.repo, target.commit);

    let resp = client
        .send_with_retry(|| client.http().post(&url).headers(headers.clone()).json(status))
        .await?;

    if resp.status().is_success() {
        let content_type = content_type(&resp);
        let bytes = resp.bytes().await?;
        return Ok(Payload::decode_lenient(content_type.as_deref(), &bytes));
    }
    decode_response(resp).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commit_status_serializes_null_target() {
        let status = CommitStatus {
            state: CommitState::Error,
            target_url: None,
            description: "Evaluation session started".to_string(),
            context: "evaluation-session-runner".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "state": "error",
                "target_url": null,
                "description": "Evaluation session started",
                "context": "evaluation-session-runner"
            })
        );
    }

    #[test]
    fn test_header_map() {
        let headers = header_map("tok").unwrap();
        assert_eq!(headers["authorization"], "Bearer tok");
        assert_eq!(headers["x-github-api-version"], GITHUB_API_VERSION);
        assert_eq!(headers["accept"], GITHUB_ACCEPT);
        assert!(headers.contains_key(USER_AGENT));
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(header_map("bad\ntoken").is_err());
    }
}
