pub mod command;
pub mod dispatch;
pub mod event;

use anyhow::{Context, Result};
use dispatch::{DispatchInputs, PullRequestInfo, WorkflowApi, WorkflowInfo, WorkflowPage};
use event::Repo;
use octocrab::{Octocrab, models::reactions::ReactionContent};
use slash_dispatch_core::config::GitHubConfig;

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

impl GitHub {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(config.token.clone());
        if let Some(api_url) = &config.api_url {
            builder = builder
                .base_uri(api_url.as_str())
                .with_context(|| format!("Invalid GitHub API URL {api_url}"))?;
        }
        let client = builder.build().context("Failed to create GitHub client")?;
        Ok(Self { client })
    }
}

impl WorkflowApi for GitHub {
    async fn create_comment_reaction(&self, repo: &Repo, comment_id: u64) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.name)
            .create_comment_reaction(comment_id, ReactionContent::Eyes)
            .await?;
        Ok(())
    }

    async fn get_pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequestInfo> {
        let pull_request = self.client.pulls(&repo.owner, &repo.name).get(number).await?;
        let author = pull_request.user.map(|u| u.login).context("Pull request has no author")?;
        Ok(PullRequestInfo { author, head_ref: pull_request.head.ref_field })
    }

    async fn list_workflows(&self, repo: &Repo, page: u32, per_page: u8) -> Result<WorkflowPage> {
        let result = self
            .client
            .workflows(&repo.owner, &repo.name)
            .list()
            .per_page(per_page)
            .page(page)
            .send()
            .await?;
        tracing::debug!("Fetched {} workflows for {} (page {})", result.items.len(), repo, page);
        Ok(WorkflowPage {
            workflows: result
                .items
                .into_iter()
                .map(|w| WorkflowInfo { id: w.id.into_inner(), name: w.name })
                .collect(),
            total_count: result.total_count,
        })
    }

    async fn dispatch_workflow(
        &self,
        repo: &Repo,
        workflow_id: u64,
        git_ref: &str,
        inputs: &DispatchInputs,
    ) -> Result<()> {
        self.client
            .actions()
            .create_workflow_dispatch(&repo.owner, &repo.name, workflow_id.to_string(), git_ref)
            .inputs(serde_json::to_value(inputs)?)
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use slash_dispatch_core::config::GitHubConfig;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path, query_param},
    };

    use super::*;

    fn repo() -> Repo { Repo { owner: "octo".to_string(), name: "widgets".to_string() } }

    fn client(server: &MockServer) -> GitHub {
        GitHub::new(&GitHubConfig { token: "ghp_test".to_string(), api_url: Some(server.uri()) })
            .unwrap()
    }

    fn user(login: &str) -> Value {
        let url = format!("https://api.github.com/users/{login}");
        json!({
            "login": login,
            "id": 583231,
            "node_id": "MDQ6VXNlcjU4MzIzMQ==",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "gravatar_id": "",
            "url": url,
            "html_url": format!("https://github.com/{login}"),
            "followers_url": format!("{url}/followers"),
            "following_url": format!("{url}/following"),
            "gists_url": format!("{url}/gists"),
            "starred_url": format!("{url}/starred"),
            "subscriptions_url": format!("{url}/subscriptions"),
            "organizations_url": format!("{url}/orgs"),
            "repos_url": format!("{url}/repos"),
            "events_url": format!("{url}/events"),
            "received_events_url": format!("{url}/received_events"),
            "type": "User",
            "site_admin": false,
        })
    }

    fn workflow(id: u64, name: &str) -> Value {
        let url = format!("https://api.github.com/repos/octo/widgets/actions/workflows/{id}");
        json!({
            "id": id,
            "node_id": format!("W_{id}"),
            "name": name,
            "path": format!(".github/workflows/{id}.yml"),
            "state": "active",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "url": url,
            "html_url": "https://github.com/octo/widgets/actions",
            "badge_url": "https://github.com/octo/widgets/workflows/badge.svg",
        })
    }

    #[tokio::test]
    async fn test_create_comment_reaction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/issues/comments/555/reactions"))
            .and(body_partial_json(json!({ "content": "eyes" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1,
                "node_id": "MDg6UmVhY3Rpb24x",
                "user": user("slash-bot"),
                "content": "eyes",
                "created_at": "2024-01-01T00:00:00Z",
            })))
            .expect(1)
            .mount(&server)
            .await;
        client(&server).create_comment_reaction(&repo(), 555).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_pull_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://api.github.com/repos/octo/widgets/pulls/12",
                "id": 1200,
                "number": 12,
                "user": user("mona"),
                "head": { "label": "mona:feature/x", "ref": "feature/x", "sha": "abc123" },
                "base": { "label": "octo:main", "ref": "main", "sha": "def456" },
            })))
            .expect(1)
            .mount(&server)
            .await;
        let pull_request = client(&server).get_pull_request(&repo(), 12).await.unwrap();
        assert_eq!(pull_request, PullRequestInfo {
            author: "mona".to_string(),
            head_ref: "feature/x".to_string()
        });
    }

    #[tokio::test]
    async fn test_list_workflows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/actions/workflows"))
            .and(query_param("per_page", "50"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 52,
                "workflows": [workflow(41, "Lint"), workflow(42, "CI")],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/actions/workflows"))
            .and(query_param("per_page", "50"))
            .and(query_param("page", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total_count": 52, "workflows": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let github = client(&server);
        let page = github.list_workflows(&repo(), 2, 50).await.unwrap();
        assert_eq!(page, WorkflowPage {
            workflows: vec![
                WorkflowInfo { id: 41, name: "Lint".to_string() },
                WorkflowInfo { id: 42, name: "CI".to_string() },
            ],
            total_count: Some(52),
        });
        let page = github.list_workflows(&repo(), 3, 50).await.unwrap();
        assert!(page.workflows.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_workflow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/widgets/actions/workflows/42/dispatches"))
            .and(body_partial_json(json!({
                "ref": "feature/x",
                "inputs": { "comment": "/build now", "user": "mona", "commentId": "555" },
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let inputs = DispatchInputs {
            comment: "/build now".to_string(),
            user: "mona".to_string(),
            comment_id: "555".to_string(),
        };
        client(&server).dispatch_workflow(&repo(), 42, "feature/x", &inputs).await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_error_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls/12"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest",
            })))
            .mount(&server)
            .await;
        assert!(client(&server).get_pull_request(&repo(), 12).await.is_err());
    }
}
