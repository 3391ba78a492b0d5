use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use delayq_core::domain::{Message, ProcessingFailure};
use delayq_core::telemetry::init_tracing;
use delayq_core::{AuthContext, Handler, LogProcessor, QueueBuilder, QueueConfig, TypedArguments};

/// Pass interval used when neither `--config` nor `--interval-ms` is given.
const DEMO_INTERVAL_MS: u64 = 200;

#[derive(Parser)]
#[command(name = "delayq", about = "Delayed message queue")]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue a few messages and run the worker until the queue drains
    Demo {
        /// Messages submitted to the `hello` processor
        #[arg(long, default_value_t = 3)]
        messages: u32,

        /// Failures injected before `hello` starts succeeding
        #[arg(long, default_value_t = 2)]
        failures: u32,

        /// Overrides `worker.interval_ms` (200 when no config file is given)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many passes even if records remain
        #[arg(long, default_value_t = 20)]
        max_passes: u64,
    },
}

#[derive(Debug, Deserialize)]
struct Hello {
    name: String,
}

impl TypedArguments for Hello {
    const PROCESSOR: &'static str = "hello";
}

/// Fails the first `n` calls, then greets.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<Hello> for HelloHandler {
    async fn handle(&self, args: Hello, message: &Message) -> Result<(), ProcessingFailure> {
        // decrement only while positive; concurrent attempts must not wrap it
        let left = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if let Ok(left) = left {
            return Err(ProcessingFailure::new(format!(
                "intentional failure (left={left})"
            )));
        }

        println!("Hello, {}! (attempt {})", args.name, message.next_attempt());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => QueueConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => QueueConfig::default(),
    };

    match cli.command {
        Command::Demo {
            messages,
            failures,
            interval_ms,
            max_passes,
        } => {
            apply_interval(&mut config, cli.config.is_some(), interval_ms);
            demo(config, messages, failures, max_passes).await
        }
    }
}

/// `--interval-ms` wins; otherwise a config file's value is kept, and
/// without one the demo interval replaces the one-minute default.
fn apply_interval(config: &mut QueueConfig, from_file: bool, interval_ms: Option<u64>) {
    match interval_ms {
        Some(interval_ms) => config.worker.interval_ms = interval_ms,
        None if !from_file => config.worker.interval_ms = DEMO_INTERVAL_MS,
        None => {}
    }
}

async fn demo(
    config: QueueConfig,
    messages: u32,
    failures: u32,
    max_passes: u64,
) -> anyhow::Result<()> {
    let queue = QueueBuilder::new()
        .config(config)
        .register(LogProcessor::NAME, LogProcessor)?
        .register_typed::<Hello, _>(HelloHandler::new(failures))?
        .expect_processors(&[LogProcessor::NAME, Hello::PROCESSOR])
        .build()?;

    let auth = AuthContext::authenticated("demo");
    for i in 0..messages {
        let id = queue
            .gateway()
            .submit(
                &auth,
                serde_json::json!({
                    "processor": Hello::PROCESSOR,
                    "arguments": { "name": format!("delayq-{i}") },
                }),
            )
            .await?;
        println!("enqueued: {id}");
    }
    queue
        .gateway()
        .submit(
            &auth,
            serde_json::json!({
                "processor": LogProcessor::NAME,
                "arguments": { "note": "demo finished submitting" },
            }),
        )
        .await?;

    let worker = queue.spawn_worker();
    let mut progress = worker.progress();

    loop {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }

        let passes = progress.borrow_and_update().passes;
        if queue.store().is_empty().await? || passes >= max_passes {
            break;
        }
    }

    let progress = worker.shutdown_and_join().await;
    println!(
        "passes={} timed_out={} remaining={}",
        progress.passes,
        progress.timed_out,
        queue.store().len().await?
    );
    if let Some(last) = progress.last {
        println!("last pass: {last:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use delayq_core::domain::{NewMessage, Timestamp};

    fn hello_message() -> Message {
        Message::admit(NewMessage::new(Hello::PROCESSOR), Timestamp::from_millis(0))
    }

    fn hello() -> Hello {
        Hello {
            name: "test".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn injected_failures_are_consumed_exactly_once() {
        let handler = Arc::new(HelloHandler::new(1));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let handler = Arc::clone(&handler);
            tasks.spawn(async move { handler.handle(hello(), &hello_message()).await });
        }
        let mut failures = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap().is_err() {
                failures += 1;
            }
        }

        assert_eq!(failures, 1);
        assert_eq!(handler.remaining_failures.load(Ordering::SeqCst), 0);
        assert!(handler.handle(hello(), &hello_message()).await.is_ok());
    }

    #[test]
    fn interval_flag_overrides_the_config_file() {
        let mut config = QueueConfig::default();
        config.worker.interval_ms = 5_000;
        apply_interval(&mut config, true, Some(50));
        assert_eq!(config.worker.interval_ms, 50);
    }

    #[test]
    fn config_file_interval_is_kept_without_the_flag() {
        let mut config = QueueConfig::default();
        config.worker.interval_ms = 5_000;
        apply_interval(&mut config, true, None);
        assert_eq!(config.worker.interval_ms, 5_000);
    }

    #[test]
    fn demo_interval_applies_without_config_or_flag() {
        let mut config = QueueConfig::default();
        apply_interval(&mut config, false, None);
        assert_eq!(config.worker.interval_ms, DEMO_INTERVAL_MS);
    }
}
