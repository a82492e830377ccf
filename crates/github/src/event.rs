use std::{fmt, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dispatch::{DispatchError, SkipReason};

/// Webhook event payload as delivered to the job.
///
/// Only the fields used for dispatching are modelled, and all of them are
/// optional: the same payload shape covers `issue_comment` and
/// `workflow_dispatch` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub repository: Option<EventRepository>,
    pub comment: Option<EventComment>,
    pub issue: Option<EventIssue>,
    pub inputs: Option<EventInputs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRepository {
    pub name: Option<String>,
    pub owner: Option<EventUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUser {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventComment {
    pub id: Option<u64>,
    /// Kept untyped so that a non-string body can be told apart from a missing one.
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventIssue {
    pub number: Option<u64>,
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventInputs {
    #[serde(rename = "commentId")]
    pub comment_id: Option<CommentIdInput>,
}

/// Workflow dispatch inputs are strings, but accept a bare number too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommentIdInput {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Fields extracted from a payload that passed the initial checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub repo: Repo,
    pub comment_id: u64,
    pub issue_number: Option<u64>,
    /// `None` when the body is missing or isn't a string.
    pub comment_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ready(EventContext),
    Skip(SkipReason),
}

impl EventPayload {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open event payload {}", path.display()))?,
        );
        serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse event payload {}", path.display()))
    }

    /// Check the payload and pull out the fields needed to react to the comment.
    pub fn validate(&self) -> Result<Validation, DispatchError> {
        let repository = self.repository.as_ref();
        let owner = repository
            .and_then(|r| r.owner.as_ref())
            .and_then(|o| o.login.clone())
            .ok_or(DispatchError::MissingField("repository owner"))?;
        let name = repository
            .and_then(|r| r.name.clone())
            .ok_or(DispatchError::MissingField("repository name"))?;

        let fallback_id = self.inputs.as_ref().and_then(|i| i.comment_id.as_ref());
        let direct_id = self.comment.as_ref().and_then(|c| c.id);
        if direct_id.is_none() && fallback_id.is_none() {
            return Ok(Validation::Skip(SkipReason::NoCommentId));
        }

        let issue = self.issue.as_ref();
        if issue.and_then(|i| i.pull_request.as_ref()).is_none() {
            return Ok(Validation::Skip(SkipReason::NotPullRequest));
        }

        // The fallback input is only parsed once the event is known to be a PR comment.
        let comment_id = match (direct_id, fallback_id) {
            (Some(id), _) => id,
            (None, Some(CommentIdInput::Number(id))) => *id,
            (None, Some(CommentIdInput::Text(text))) => text
                .trim()
                .parse()
                .map_err(|_| DispatchError::InvalidCommentId(text.clone()))?,
            (None, None) => return Ok(Validation::Skip(SkipReason::NoCommentId)),
        };

        Ok(Validation::Ready(EventContext {
            repo: Repo { owner, name },
            comment_id,
            issue_number: issue.and_then(|i| i.number),
            comment_body: self
                .comment
                .as_ref()
                .and_then(|c| c.body.as_ref())
                .and_then(|b| b.as_str())
                .map(str::to_string),
        }))
    }
}
