mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use catoon_contracts::events::{EventPayload, EventWriter};
use catoon_contracts::records::{GenerationRecord, RecordStore};
use catoon_contracts::storage::{
    content_type_for_path, resolve_served_path, validate_upload, BlobStore, InlineBlobStore,
    LocalBlobStore, UploadCheck,
};
use catoon_contracts::Style;
use catoon_engine::pipeline::AttemptOutcome;
use catoon_engine::prompt::{build_host_prompt, build_prompt};
use catoon_engine::providers::HuggingFaceProvider;
use catoon_engine::{feature_extractor_for, AvatarPipeline, EngineConfig};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "catoon", version, about = "Turn a cat photo into a cartoon avatar")]
struct Cli {
    /// Repeat for more log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Features(FeaturesArgs),
    Status(StatusArgs),
    Probe,
    ServePath(ServePathArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, default_value = "cartoon")]
    style: String,
    #[arg(long)]
    out: PathBuf,
    /// Store blobs as data URLs instead of files under --out.
    #[arg(long)]
    inline: bool,
}

#[derive(Debug, Parser)]
struct FeaturesArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, default_value = "cartoon")]
    style: String,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    id: Option<String>,
    /// Summarize every record under --out.
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Parser)]
struct ServePathArgs {
    #[arg(long)]
    path: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("catoon error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    match cli.command {
        Command::Generate(args) => runtime.block_on(run_generate(args)),
        Command::Features(args) => run_features(args),
        Command::Status(args) => run_status(args),
        Command::Probe => runtime.block_on(run_probe()),
        Command::ServePath(args) => run_serve_path(args),
    }
}

async fn run_generate(args: GenerateArgs) -> Result<i32> {
    let bytes = fs::read(&args.image)
        .with_context(|| format!("failed reading {}", args.image.display()))?;
    let config = EngineConfig::from_env();
    let pipeline = AvatarPipeline::from_config(&config);
    tracing::info!(
        image = %args.image.display(),
        style = %args.style,
        stages = ?pipeline.stage_names(),
        "generating avatar"
    );
    let summary = generate_into(
        &pipeline,
        &bytes,
        Style::new(args.style),
        &args.out,
        args.inline,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

/// Blob stores for uploads and generated avatars.
fn blob_stores(out: &Path, inline: bool) -> (Box<dyn BlobStore>, Box<dyn BlobStore>) {
    if inline {
        return (Box::new(InlineBlobStore), Box::new(InlineBlobStore));
    }
    (
        Box::new(LocalBlobStore::new(out.join("uploads"), "/uploads")),
        Box::new(LocalBlobStore::new(out.join("generated"), "/generated")),
    )
}

async fn generate_into(
    pipeline: &AvatarPipeline,
    bytes: &[u8],
    style: Style,
    out: &Path,
    inline: bool,
) -> Result<Value> {
    let upload = validate_upload(bytes)?;
    let (uploads, generated) = blob_stores(out, inline);
    let original_url = uploads.put(&format!("{}.{}", Uuid::new_v4(), upload.extension), bytes)?;

    let records = RecordStore::new(out.join("records.json"));
    let record = GenerationRecord::new(original_url, style.clone());
    records.create(&record)?;
    let events = EventWriter::new(out.join("events.jsonl"), record.id.clone());

    let result = run_generation(
        pipeline,
        bytes,
        &style,
        &upload,
        generated.as_ref(),
        &records,
        &record.id,
        &events,
    )
    .await;
    if let Err(err) = &result {
        if let Err(mark_err) = records.mark_failed(&record.id) {
            tracing::error!(
                id = %record.id,
                error = %format!("{mark_err:#}"),
                "failed to mark generation failed"
            );
        }
        if let Err(emit_err) = events.emit(
            "generation_failed",
            payload(json!({ "error": format!("{err:#}") })),
        ) {
            tracing::warn!(
                id = %record.id,
                error = %format!("{emit_err:#}"),
                "failed to log generation_failed"
            );
        }
    }
    result
}

/// Everything after the record exists; any error here leaves it `failed`.
#[allow(clippy::too_many_arguments)]
async fn run_generation(
    pipeline: &AvatarPipeline,
    bytes: &[u8],
    style: &Style,
    upload: &UploadCheck,
    generated: &dyn BlobStore,
    records: &RecordStore,
    id: &str,
    events: &EventWriter,
) -> Result<Value> {
    records.mark_processing(id)?;
    events.emit(
        "generation_started",
        payload(json!({
            "style": style.as_str(),
            "stages": pipeline.stage_names(),
            "upload_bytes": upload.size,
            "upload_sha256": upload.digest,
        })),
    )?;

    let started = Instant::now();
    let outcome = pipeline.generate_avatar_with_report(bytes, style).await;
    for attempt in &outcome.attempts {
        let event_type = match attempt.outcome {
            AttemptOutcome::Succeeded => "attempt_succeeded",
            AttemptOutcome::Failed => "attempt_failed",
        };
        events.emit(event_type, payload(serde_json::to_value(attempt)?))?;
    }

    let generated_url = generated
        .put(&format!("generated_{id}.png"), &outcome.image.bytes)
        .context("failed to store generated avatar")?;
    let processing_time_s = started.elapsed().as_secs();
    let done = records.mark_completed(id, generated_url.clone(), processing_time_s)?;
    events.emit(
        "generation_completed",
        payload(json!({
            "served_by": outcome.served_by,
            "generated_url": generated_url,
            "bytes": outcome.image.len(),
            "processing_time_s": processing_time_s,
        })),
    )?;

    Ok(json!({
        "id": done.id,
        "originalUrl": done.original_image_url,
        "generatedUrl": done.generated_image_url,
        "style": done.style,
        "status": done.status,
        "servedBy": outcome.served_by,
    }))
}

fn run_features(args: FeaturesArgs) -> Result<i32> {
    let bytes = fs::read(&args.image)
        .with_context(|| format!("failed reading {}", args.image.display()))?;
    let config = EngineConfig::from_env();
    let extractor = feature_extractor_for(config.extractor);
    let features = extractor.extract(&bytes);
    let style = Style::new(args.style);
    let report = json!({
        "extractor": extractor.name(),
        "features": features,
        "prompt": build_prompt(&features, &style),
        "hostPrompt": build_host_prompt(&style),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

fn run_status(args: StatusArgs) -> Result<i32> {
    let records = RecordStore::new(args.out.join("records.json"));
    let report = match args.id {
        Some(id) => {
            let Some(record) = records.get(&id)? else {
                bail!("generation record '{id}' not found");
            };
            serde_json::to_value(record)?
        }
        None => status_summary(&records)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

fn status_summary(records: &RecordStore) -> Result<Value> {
    let rows = records.list()?;
    let in_flight = rows.iter().filter(|row| !row.status.is_terminal()).count();
    let summaries: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "status": row.status.as_str(),
                "style": row.style.as_str(),
                "createdAt": row.created_at,
                "generatedUrl": row.generated_image_url,
            })
        })
        .collect();
    Ok(json!({
        "total": rows.len(),
        "inFlight": in_flight,
        "records": summaries,
    }))
}

async fn run_probe() -> Result<i32> {
    let config = EngineConfig::from_env();
    let provider = HuggingFaceProvider::new(&config, reqwest::Client::new());
    let report = provider.probe().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.ok { 0 } else { 2 })
}

fn run_serve_path(args: ServePathArgs) -> Result<i32> {
    let path = resolve_served_path(&args.path)?;
    let bytes = fs::read(&path).with_context(|| format!("failed reading {}", path.display()))?;
    let report = json!({
        "path": path.display().to_string(),
        "contentType": content_type_for_path(&path),
        "bytes": bytes.len(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}

fn payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}
