// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `trellis run` command: wire the singletons, execute one run, report.

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use trellis_core::{SystemClock, TrellisConfig};
use trellis_graph::{GraphSink, LoggingSink, Neo4jConfig, Neo4jSink};
use trellis_llm::{HttpTransport, HttpTransportConfig, LlmClient, TokenCounter};
use trellis_pipeline::{PipelineContext, PipelineRunner};
use trellis_queue::{Backend, MemoryBackend, QueueManager, RedisBackend};
use trellis_storage::Store;

#[derive(Args)]
pub struct RunArgs {
    /// Directory to analyse.
    pub path: PathBuf,

    /// SQLite database path (defaults to trellis.db in the working dir).
    #[arg(long, default_value = "trellis.db")]
    pub db: PathBuf,

    /// Redis URL for the queue backend; in-process queues when omitted.
    #[arg(long, env = "TRELLIS_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Chat-completions endpoint of the LLM provider.
    #[arg(long, env = "TRELLIS_LLM_ENDPOINT")]
    pub llm_endpoint: String,

    #[arg(long, env = "TRELLIS_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: String,

    #[arg(long, env = "TRELLIS_LLM_MODEL", default_value = "deepseek-chat")]
    pub llm_model: String,

    /// Neo4j bolt URI; graph commits are logged and dropped when omitted.
    #[arg(long, env = "TRELLIS_NEO4J_URI")]
    pub neo4j_uri: Option<String>,

    #[arg(long, env = "TRELLIS_NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    #[arg(long, env = "TRELLIS_NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    pub neo4j_password: String,

    /// Include globs, relative to the target (repeatable).
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Exclude globs, relative to the target (repeatable).
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

pub async fn execute(config_path: Option<&Path>, args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut config = match config_path {
        Some(path) => TrellisConfig::load(path).context("loading configuration")?,
        None => TrellisConfig::default(),
    };
    config.run.target_root = args.path.clone();
    if !args.include.is_empty() {
        config.run.include_patterns = args.include.clone();
    }
    if !args.exclude.is_empty() {
        config.run.exclude_patterns = args.exclude.clone();
    }

    let backend: Arc<dyn Backend> = match &args.redis_url {
        Some(url) => {
            let backend = RedisBackend::connect(url, Duration::from_secs(60))
                .await
                .context("connecting to the queue backend")?;
            Arc::new(backend)
        }
        None => {
            tracing::info!("no redis url given, using the in-process queue backend");
            Arc::new(MemoryBackend::new(SystemClock))
        }
    };
    let queues = Arc::new(QueueManager::new(backend, config.queue.clone()));

    let graph: Arc<dyn GraphSink> = match &args.neo4j_uri {
        Some(uri) => Arc::new(
            Neo4jSink::connect(Neo4jConfig {
                uri: uri.clone(),
                user: args.neo4j_user.clone(),
                password: args.neo4j_password.clone(),
            })
            .await
            .context("connecting to the graph store")?,
        ),
        None => {
            tracing::warn!("no graph store configured, committed edges stay in sqlite only");
            Arc::new(LoggingSink)
        }
    };

    let transport = HttpTransport::new(HttpTransportConfig {
        endpoint: args.llm_endpoint.clone(),
        api_key: args.llm_api_key.clone(),
        model: args.llm_model.clone(),
        max_tokens: 8_192,
    });
    let llm = Arc::new(LlmClient::new(Arc::new(transport), config.llm.clone()));

    let store = Store::open(&args.db).await.context("opening the operational store")?;
    let tokens = TokenCounter::new().context("initialising the tokenizer")?;

    let ctx = Arc::new(PipelineContext {
        store,
        queues,
        llm,
        graph,
        tokens,
        config,
        clock: SystemClock,
    });

    let mut runner = PipelineRunner::new(ctx);
    runner.start();

    let outcome = {
        let run_future = runner.run(&args.path);
        tokio::pin!(run_future);
        tokio::select! {
            outcome = &mut run_future => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    match outcome {
        Some(outcome) => {
            let outcome = outcome.context("pipeline run failed")?;
            println!("run {} finished: {}", outcome.run_id, outcome.status);
            println!("{}", outcome.summary);
            let code = outcome.exit_code();
            runner.shutdown().await;
            Ok(ExitCode::from(code as u8))
        }
        None => {
            tracing::warn!("interrupt received, draining in-flight jobs");
            runner.shutdown().await;
            Ok(ExitCode::from(130))
        }
    }
}
