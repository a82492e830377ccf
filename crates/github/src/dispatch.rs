use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use slash_dispatch_core::config::TriggerConfig;

use crate::{
    command::parse_command,
    event::{EventPayload, Repo, Validation},
};

/// Page size used when listing repository workflows.
pub const WORKFLOWS_PER_PAGE: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub author: String,
    pub head_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowPage {
    pub workflows: Vec<WorkflowInfo>,
    /// Total number of workflows in the repository, if reported.
    pub total_count: Option<u64>,
}

/// Inputs passed to the dispatched workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchInputs {
    pub comment: String,
    pub user: String,
    #[serde(rename = "commentId")]
    pub comment_id: String,
}

/// Remote operations needed to dispatch a workflow from a comment.
#[allow(async_fn_in_trait)]
pub trait WorkflowApi {
    async fn create_comment_reaction(&self, repo: &Repo, comment_id: u64) -> Result<()>;

    async fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequestInfo>;

    async fn list_workflows(&self, repo: &Repo, page: u32, per_page: u8) -> Result<WorkflowPage>;

    async fn dispatch_workflow(
        &self,
        repo: &Repo,
        workflow_id: u64,
        git_ref: &str,
        inputs: &DispatchInputs,
    ) -> Result<()>;
}

/// Why a run finished without dispatching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoCommentId,
    NotPullRequest,
    NoCommentBody,
    NoCommand,
    TriggerMismatch { command: String, trigger: String },
    WorkflowNotFound { workflow: String },
}

impl SkipReason {
    /// Log the reason, for the skips that are reported to the job output.
    pub fn log(&self) {
        match self {
            Self::NoCommentId | Self::NoCommentBody => {}
            _ => tracing::info!("{}", self),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCommentId => write!(f, "No comment id in event"),
            Self::NotPullRequest => write!(f, "No PR found in event. Ignoring."),
            Self::NoCommentBody => write!(f, "Comment has no body"),
            Self::NoCommand => write!(f, "No command found"),
            Self::TriggerMismatch { command, trigger } => {
                write!(f, "{command} does not match trigger {trigger}")
            }
            Self::WorkflowNotFound { workflow } => write!(f, "did not find workflow {workflow}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dispatched { workflow_id: u64, git_ref: String },
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no {0} found in payload")]
    MissingField(&'static str),
    #[error("invalid comment id {0:?} in payload")]
    InvalidCommentId(String),
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

pub struct Dispatcher<'a, A> {
    api: &'a A,
    trigger: &'a TriggerConfig,
}

impl<'a, A: WorkflowApi> Dispatcher<'a, A> {
    pub fn new(api: &'a A, trigger: &'a TriggerConfig) -> Self { Self { api, trigger } }

    /// Handle a single comment event.
    ///
    /// The comment is acknowledged with a reaction as soon as the event is known
    /// to be a pull request comment, before the command itself is checked.
    /// Nothing is undone if a later step fails.
    pub async fn run(&self, payload: &EventPayload) -> Result<Outcome, DispatchError> {
        let context = match payload.validate()? {
            Validation::Ready(context) => context,
            Validation::Skip(reason) => return Ok(self.skip(reason)),
        };
        let repo = &context.repo;

        self.api
            .create_comment_reaction(repo, context.comment_id)
            .await
            .with_context(|| format!("Failed to react to comment {}", context.comment_id))?;

        let number = context.issue_number.ok_or(DispatchError::MissingField("issue number"))?;
        let pull_request = self
            .api
            .get_pull_request(repo, number)
            .await
            .with_context(|| format!("Failed to fetch pull request {repo}#{number}"))?;

        let Some(comment) = context.comment_body.as_deref() else {
            return Ok(self.skip(SkipReason::NoCommentBody));
        };
        let Some(command) = parse_command(comment) else {
            return Ok(self.skip(SkipReason::NoCommand));
        };
        if command != self.trigger.command {
            return Ok(self.skip(SkipReason::TriggerMismatch {
                command: command.to_string(),
                trigger: self.trigger.command.clone(),
            }));
        }

        let Some(workflow) = self.resolve_workflow(repo).await? else {
            return Ok(self.skip(SkipReason::WorkflowNotFound {
                workflow: self.trigger.workflow.clone(),
            }));
        };

        let inputs = DispatchInputs {
            comment: comment.to_string(),
            user: pull_request.author,
            comment_id: context.comment_id.to_string(),
        };
        self.api
            .dispatch_workflow(repo, workflow.id, &pull_request.head_ref, &inputs)
            .await
            .with_context(|| format!("Failed to dispatch workflow {}", workflow.name))?;
        tracing::info!(
            "Dispatched workflow {} ({}) on {} for {}",
            workflow.name,
            workflow.id,
            pull_request.head_ref,
            repo
        );
        Ok(Outcome::Dispatched { workflow_id: workflow.id, git_ref: pull_request.head_ref })
    }

    fn skip(&self, reason: SkipReason) -> Outcome {
        reason.log();
        Outcome::Skipped(reason)
    }

    /// Find the configured workflow by name, scanning pages in order.
    ///
    /// Stops on an empty page, once every reported workflow has been seen, or
    /// after `max_pages` pages.
    pub async fn resolve_workflow(&self, repo: &Repo) -> Result<Option<WorkflowInfo>> {
        let mut seen = 0u64;
        for page in 1..=self.trigger.max_pages {
            let result = self
                .api
                .list_workflows(repo, page, WORKFLOWS_PER_PAGE)
                .await
                .with_context(|| format!("Failed to fetch workflows page {page}"))?;
            if result.workflows.is_empty() {
                return Ok(None);
            }
            seen += result.workflows.len() as u64;
            if let Some(workflow) =
                result.workflows.into_iter().find(|w| w.name == self.trigger.workflow)
            {
                return Ok(Some(workflow));
            }
            if result.total_count.is_some_and(|total| seen >= total) {
                return Ok(None);
            }
        }
        tracing::warn!(
            "Stopped looking for workflow {} after {} pages",
            self.trigger.workflow,
            self.trigger.max_pages
        );
        Ok(None)
    }
}
