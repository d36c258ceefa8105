//! Offline benchmark scoring entrypoint.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;

use editgate::batch::{BatchArgs, BenchmarkRunner};
use editgate::oracle::RemoteEvaluator;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = BatchArgs::parse();
    init_tracing(args.log_json);

    tracing::info!(
        benchmark_dir = %args.benchmark_dir.display(),
        result_dir = %args.result_dir.display(),
        backbone = %args.backbone,
        model = %args.model_name_or_path,
        max_workers = args.max_workers,
        "Editgate batch starting"
    );

    let evaluator = RemoteEvaluator::new(
        args.oracle_url.clone(),
        args.key.clone(),
        args.oracle_timeout(),
    )?;
    let runner = BenchmarkRunner::new(args, Arc::new(evaluator))?;
    let summary = runner.run().await?;

    tracing::info!(
        tasks = summary.tasks.len(),
        evaluated = summary.evaluated(),
        failed = summary.failed(),
        files_failed = summary.files_failed(),
        cache_entries = runner.cache().len(),
        "Editgate batch finished"
    );

    if summary.files_failed() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
