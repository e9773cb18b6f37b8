// src/session.rs
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::client::RequestClient;
use crate::config::{Context, StatusTarget};
use crate::errors::{Result, RunnerError};
use crate::github::{self, CommitState, CommitStatus};
use crate::payload::{Data, Payload};
use crate::reporter::Reporter;

pub const SESSION_ENDPOINT: &str = "/evaluationsession";
pub const STARTED_DESCRIPTION: &str = "Evaluation session started";
pub const SESSION_ID_OUTPUT: &str = "evaluation-session-id";
pub const REPORT_LINK_OUTPUT: &str = "report-link";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMethod {
    Email,
    Webhook,
}

/// Something the evaluation service should do once the session finishes.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: NotifyMethod,
    pub destination: WebhookRequest,
}

/// A request the service performs on completion, described as data.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub json: StatusTemplate,
}

/// Commit status to send back. The service picks `on_success` or
/// `on_failure` and fills the target URL with the session's report link.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusTemplate {
    pub context: String,
    pub target_url_from: String,
    pub on_success: StatusOutcome,
    pub on_failure: StatusOutcome,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusOutcome {
    pub state: CommitState,
    pub description: String,
}

#[derive(Serialize, Debug)]
struct SessionRequest<'a> {
    origin: &'a str,
    evaluation_id: &'a str,
    evaluatee_id: &'a str,
    is_human_being_evaluated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify: Option<Vec<Notification>>,
}

/// Builds the completion callback, or `None` when commit status reporting
/// is not configured.
pub fn build_notification(ctx: &Context) -> Option<Vec<Notification>> {
    let target = ctx.status_target()?;
    let headers = github::status_headers(target.token)
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    Some(vec![Notification {
        method: NotifyMethod::Webhook,
        destination: WebhookRequest {
            method: "POST".to_string(),
            url: target.statuses_url(&ctx.github_api_url),
            headers,
            json: StatusTemplate {
                context: target.context.to_string(),
                target_url_from: "report".to_string(),
                on_success: StatusOutcome {
                    state: CommitState::Success,
                    description: "Evaluation session successful".to_string(),
                },
                on_failure: StatusOutcome {
                    state: CommitState::Failure,
                    description: "Evaluation session failed".to_string(),
                },
            },
        },
    }])
}

/// Starts evaluation sessions and reports how that went.
pub struct SessionLauncher<'a, R: Reporter> {
    client: &'a RequestClient,
    reporter: &'a R,
}

impl<'a, R: Reporter> SessionLauncher<'a, R> {
    pub fn new(client: &'a RequestClient, reporter: &'a R) -> Self {
        Self { client, reporter }
    }

    /// Starts one session and, if configured, sets the commit status.
    ///
    /// Failures to start are reported through `Reporter::set_failed` and
    /// yield `None`; they are never returned as errors.
    pub async fn run_eval_session(&self, ctx: &Context) -> Option<Payload> {
        let started = match self.start_session(ctx).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                self.report_start_failure(&e);
                None
            }
        };

        let is_started = started.as_ref().is_some_and(Payload::is_structured);
        let report_link = started.as_ref().and_then(|p| p.field("report_link"));

        if let Some(payload) = &started {
            self.publish_session(payload, report_link.as_deref());
        }

        if let Some(target) = ctx.status_target() {
            let status = CommitStatus {
                state: if is_started {
                    CommitState::Pending
                } else {
                    CommitState::Error
                },
                target_url: report_link,
                description: STARTED_DESCRIPTION.to_string(),
                context: target.context.to_string(),
            };
            self.report_status(ctx, &target, &status).await;
        }

        started
    }

    async fn start_session(&self, ctx: &Context) -> Result<Payload> {
        let evaluation_id = ctx
            .evaluation_id
            .as_deref()
            .ok_or_else(|| RunnerError::Validation("no evaluation id provided".to_string()))?;
        let model_id = ctx
            .model_id
            .as_deref()
            .ok_or_else(|| RunnerError::Validation("no model id provided".to_string()))?;

        let request = SessionRequest {
            origin: "user",
            evaluation_id,
            evaluatee_id: model_id,
            is_human_being_evaluated: false,
            notify: build_notification(ctx),
        };

        info!("🎯 Starting evaluation session for {} on {}", model_id, evaluation_id);
        self.client
            .post(ctx, SESSION_ENDPOINT, &Data::from_serialize(&request)?)
            .await
    }

    fn report_start_failure(&self, e: &RunnerError) {
        if let RunnerError::Server { status, body } = e {
            self.reporter.error(&format!("Evaluation service responded with status {}", status));
            self.reporter.error(&format!("Error body: {}", body));
        }
        self.reporter
            .set_failed(&format!("Could not start evaluation session: {}", e));
    }

    fn publish_session(&self, payload: &Payload, report_link: Option<&str>) {
        let session_id = match payload.as_str() {
            Some(text) => Some(text.to_string()),
            None => payload.field("id"),
        };

        if payload.is_structured() {
            self.reporter.info(&format!(
                "✅ Evaluation session {} started",
                session_id.as_deref().unwrap_or("<unknown>")
            ));
        } else {
            self.reporter
                .warning(&format!("Evaluation service did not start a session: {}", payload));
        }

        if let Some(id) = &session_id {
            self.reporter.set_output(SESSION_ID_OUTPUT, id);
        }
        if let Some(link) = report_link {
            self.reporter.info(&format!("📊 Report: {}", link));
            self.reporter.set_output(REPORT_LINK_OUTPUT, link);
        }
    }

    async fn report_status(&self, ctx: &Context, target: &StatusTarget<'_>, status: &CommitStatus) {
        match github::post_commit_status(self.client, &ctx.github_api_url, target, status).await {
            Ok(_) => self.reporter.debug(&format!(
                "Commit status '{}' set on {}",
                status.context, target.commit
            )),
            Err(e) => self
                .reporter
                .error(&format!("Could not set commit status: {}", e)),
        }
    }
}
