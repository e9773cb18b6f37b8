// src/config.rs
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Result, RunnerError};

pub const DEFAULT_HOST: &str = "https://equistamp.net";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_STATUS_CONTEXT: &str = "evaluation-session-runner";

/// The commands this runner knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
}

impl Command {
    pub const ALL: [Command; 1] = [Command::Run];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Run => "run",
        }
    }

    /// Comma separated, sorted list of valid command names.
    pub fn names() -> String {
        let mut names: Vec<_> = Self::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.join(",")
    }
}

impl FromStr for Command {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| RunnerError::InvalidCommand(Self::names()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one invocation needs. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Context {
    pub command: Command,
    pub api_token: String,
    pub evaluation_id: Option<String>,
    pub model_id: Option<String>,
    pub host: String,

    pub github_key: Option<String>,
    pub repo: Option<String>,
    pub commit: Option<String>,
    pub commit_status_id: Option<String>,
    pub github_api_url: String,
}

/// Where to report a commit status. Only exists when the repository,
/// commit and GitHub token are all configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTarget<'a> {
    pub repo: &'a str,
    pub commit: &'a str,
    pub token: &'a str,
    pub context: &'a str,
}

impl StatusTarget<'_> {
    pub fn statuses_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/statuses/{}",
            api_base.trim_end_matches('/'),
            self.repo,
            self.commit
        )
    }
}

impl Context {
    /// A `run` context against `host` with no evaluation or commit status set.
    pub fn new(host: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            command: Command::Run,
            api_token: api_token.into(),
            evaluation_id: None,
            model_id: None,
            host: host.into(),
            github_key: None,
            repo: None,
            commit: None,
            commit_status_id: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }

    pub fn with_evaluation(mut self, evaluation_id: &str, model_id: &str) -> Self {
        self.evaluation_id = Some(evaluation_id.to_string());
        self.model_id = Some(model_id.to_string());
        self
    }

    pub fn with_commit_status(
        mut self,
        repo: &str,
        commit: &str,
        github_key: &str,
        commit_status_id: Option<&str>,
    ) -> Self {
        self.repo = Some(repo.to_string());
        self.commit = Some(commit.to_string());
        self.github_key = Some(github_key.to_string());
        self.commit_status_id = commit_status_id.map(str::to_string);
        self
    }

    pub fn with_github_api_url(mut self, url: &str) -> Self {
        self.github_api_url = url.to_string();
        self
    }

    /// Load the context from the GitHub Actions environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the context through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = |name: &str| -> Option<String> {
            lookup(&input_variable(name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let command: Command = input("command").unwrap_or_default().parse()?;
        let api_token = input("api-token").ok_or_else(|| {
            RunnerError::Config("Input required and not supplied: api-token".to_string())
        })?;

        let repo = input("repository");
        if let Some(repo) = &repo {
            validate_repository(repo)?;
        }

        let github_api_url = lookup("GITHUB_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Context {
            command,
            api_token,
            evaluation_id: input("evaluation"),
            model_id: input("model"),
            host: input("host").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            github_key: input("github-key"),
            repo,
            commit: input("commit"),
            commit_status_id: input("commit-status-id"),
            github_api_url,
        })
    }

    pub fn status_target(&self) -> Option<StatusTarget<'_>> {
        match (&self.repo, &self.github_key, &self.commit) {
            (Some(repo), Some(token), Some(commit)) => Some(StatusTarget {
                repo,
                commit,
                token,
                context: self.status_context(),
            }),
            _ => None,
        }
    }

    /// The configured status key, or the default one.
    pub fn status_context(&self) -> &str {
        self.commit_status_id
            .as_deref()
            .unwrap_or(DEFAULT_STATUS_CONTEXT)
    }
}

/// Name of the environment variable GitHub Actions uses for an input.
fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

fn validate_repository(repo: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$")
        .map_err(|e| RunnerError::Config(e.to_string()))?;
    if re.is_match(repo) {
        Ok(())
    } else {
        Err(RunnerError::Config(format!(
            "repository must look like 'owner/name', got '{}'",
            repo
        )))
    }
}
