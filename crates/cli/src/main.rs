mod util;

use std::process::ExitCode;

use anyhow::{Context, Result};
use argp::FromArgs;
use slash_dispatch_core::{
    actions,
    config::{Config, ConfigLayer, GitHubLayer, TriggerLayer},
};
use slash_dispatch_github::{
    GitHub,
    dispatch::{Dispatcher, Outcome, SkipReason},
    event::{EventPayload, Validation},
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use typed_path::Utf8NativePathBuf;

use crate::util::{event_path, native_path};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Dispatch a workflow when a pull request comment carries the trigger command.
///
/// Options not given on the command line are read from the action inputs
/// (INPUT_PAT, INPUT_COMMAND, INPUT_WORKFLOW) and then from the config file.
struct TopLevel {
    #[argp(option, from_str_fn(native_path))]
    /// event payload JSON (defaults to $GITHUB_EVENT_PATH)
    event: Option<Utf8NativePathBuf>,
    #[argp(option, short = 'c', from_str_fn(native_path))]
    /// YAML config file
    config: Option<Utf8NativePathBuf>,
    #[argp(option)]
    /// GitHub token
    token: Option<String>,
    #[argp(option)]
    /// slash-command that triggers the dispatch, without the leading /
    command: Option<String>,
    #[argp(option)]
    /// name of the workflow to dispatch
    workflow: Option<String>,
    #[argp(option)]
    /// GitHub REST API base URL
    api_url: Option<String>,
    #[argp(option)]
    /// maximum number of workflow list pages to scan
    max_pages: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    match run(args).await {
        Ok(Outcome::Dispatched { workflow_id, git_ref }) => {
            tracing::debug!("Dispatched workflow {} on {}", workflow_id, git_ref);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Skipped(reason)) => {
            tracing::debug!("Nothing dispatched: {}", reason);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::info!("error");
            tracing::info!("{:?}", e);
            actions::set_failed(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TopLevel) -> Result<Outcome> {
    let layer = load_config(&args)?;
    let path = event_path(args.event.as_ref())
        .context("No event payload: pass --event or set GITHUB_EVENT_PATH")?;
    let payload = EventPayload::from_path(path.with_platform_encoding())?;
    let config = match prepare(layer, &payload)? {
        Prepared::Ready(config) => config,
        Prepared::Skipped(reason) => {
            reason.log();
            return Ok(Outcome::Skipped(reason));
        }
    };
    let github = GitHub::new(&config.github)?;
    let outcome = Dispatcher::new(&github, &config.trigger).run(&payload).await?;
    Ok(outcome)
}

enum Prepared {
    Ready(Config),
    Skipped(SkipReason),
}

/// Inputs are only required once the event is known to be a pull request comment.
fn prepare(layer: ConfigLayer, payload: &EventPayload) -> Result<Prepared> {
    if let Validation::Skip(reason) = payload.validate()? {
        return Ok(Prepared::Skipped(reason));
    }
    Ok(Prepared::Ready(layer.resolve()?))
}

fn load_config(args: &TopLevel) -> Result<ConfigLayer> {
    let cli = ConfigLayer {
        github: GitHubLayer { token: args.token.clone(), api_url: args.api_url.clone() },
        trigger: TriggerLayer {
            command: args.command.clone(),
            workflow: args.workflow.clone(),
            max_pages: args.max_pages,
        },
    };
    let inputs = ConfigLayer::from_inputs(|key| std::env::var(key).ok())?;
    let file = match &args.config {
        Some(path) => ConfigLayer::from_file(path.with_platform_encoding())?,
        None => ConfigLayer::default(),
    };
    Ok(cli.merge(inputs).merge(file))
}
