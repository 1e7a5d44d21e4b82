//! Replay a captured generation stream through the session engine.
//!
//! Input is a JSONL file, one frame per line, as emitted by the
//! generation service. The final transcript and artifact are printed so
//! reducer behavior can be inspected offline.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use easel_session::{EngineConfig, HighlightSpan, RunContext, SessionEngine};
use easel_store::{MemoryVersionStore, StoreError};
use futures::stream;
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Command::new("easel-replay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Replay a captured generation stream against the session engine")
        .arg(
            Arg::new("file")
                .required(true)
                .help("JSONL file with one stream frame per line"),
        )
        .arg(
            Arg::new("thread")
                .long("thread")
                .default_value("replay")
                .help("Thread id to replay into"),
        )
        .arg(
            Arg::new("code")
                .long("code")
                .value_name("LANGUAGE")
                .help("Treat a created artifact as code in LANGUAGE"),
        )
        .arg(
            Arg::new("highlight")
                .long("highlight")
                .num_args(2)
                .value_names(["START", "END"])
                .value_parser(value_parser!(usize))
                .help("Char span for scoped patch frames"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print final state as JSON"),
        );

    let matches = cli.get_matches();
    let path = matches
        .get_one::<String>("file")
        .context("missing frame file")?;
    let thread = matches
        .get_one::<String>("thread")
        .context("missing thread id")?;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading frames from {path}"))?;
    let frames: Vec<Value> = raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).with_context(|| format!("parsing frame: {line}")))
        .collect::<Result<_>>()?;

    let mut ctx = RunContext::new();
    if let Some(language) = matches.get_one::<String>("code") {
        ctx = ctx.for_code(language.clone());
    }
    if let Some(mut span) = matches.get_many::<usize>("highlight") {
        let (start, end) = (span.next(), span.next());
        if let (Some(&start), Some(&end)) = (start, end) {
            ctx = ctx.with_highlight(HighlightSpan { start, end });
        }
    }

    let store = Arc::new(MemoryVersionStore::new());
    let engine = SessionEngine::new(store, thread.clone(), EngineConfig::default());

    let items = stream::iter(frames.into_iter().map(Ok::<_, StoreError>));
    engine.consume(items, ctx).await?;

    if let Some(error) = engine.reported_error() {
        eprintln!("stream reported error: {error}");
    }

    if matches.get_flag("json") {
        let summary = serde_json::json!({
            "threadId": engine.thread_id(),
            "threadTitle": engine.thread_title(),
            "messages": engine.messages(),
            "artifact": engine.artifact(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("thread: {}", engine.thread_id());
    if let Some(title) = engine.thread_title() {
        println!("title:  {title}");
    }
    println!("messages: {}", engine.messages().len());
    for message in engine.messages() {
        if let Some(content) = message.content() {
            println!("  [{}] {}", message.id, content);
        }
    }
    if let Some(artifact) = engine.artifact() {
        println!(
            "artifact: {} versions, current {}",
            artifact.len(),
            artifact.current_index()
        );
        if let Some(current) = artifact.current() {
            println!("--- {} ---", current.title());
            println!("{}", current.content());
        }
    } else {
        println!("artifact: none");
    }
    Ok(())
}
