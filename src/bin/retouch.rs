//! CLI for gemini-retouch - batch photo retouching via the Gemini API.

use clap::{Args, Parser, Subcommand, ValueEnum};
use gemini_retouch::batch::{parse_result_manifest, write_images, BatchState, RequestManifest};
use gemini_retouch::process::{list_image_files, mirror_output_dir, retouch_file};
use gemini_retouch::storage::{GcsLocation, GcsUploader};
use gemini_retouch::{GeminiClient, GeminiModel, DEFAULT_PROMPT};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Retouch photos with the Gemini image API (per-image or batch jobs)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retouch every image in a directory, one request at a time
    Process(ProcessArgs),

    /// Upload images to Cloud Storage and register a batch retouch job
    Submit(SubmitArgs),

    /// Check a batch job and download its results when finished
    Fetch(FetchArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Directory containing raw images to process
    #[arg(long, default_value = "./data/raw")]
    raw_dir: PathBuf,

    /// Directory to save processed images
    #[arg(long, default_value = "./data/processed")]
    processed_dir: PathBuf,

    /// Gemini model to use
    #[arg(long, value_enum, default_value = "gemini-2.5-flash-image")]
    model: ModelArg,

    /// Retouch instruction for the model (defaults to the standard retouch
    /// prompt)
    #[arg(long)]
    prompt: Option<String>,
}

#[derive(Args)]
struct SubmitArgs {
    /// Directory containing raw images to upload
    #[arg(long, default_value = "./data/raw")]
    raw_dir: PathBuf,

    /// Cloud Storage location the raw images are uploaded to
    #[arg(long, default_value = "gs://gemini-image-retouch/raw/")]
    input_uri: String,

    /// Cloud Storage location for the result manifest
    #[arg(long, default_value = "gs://gemini-image-retouch/processed/")]
    output_uri: String,

    /// Gemini model to use
    #[arg(long, value_enum, default_value = "gemini-2.5-flash")]
    model: ModelArg,

    /// Retouch instruction applied to every image in the batch
    #[arg(long)]
    prompt: Option<String>,

    /// Where to write the request manifest
    #[arg(long, default_value = "batch_requests.jsonl")]
    manifest: PathBuf,
}

#[derive(Args)]
struct FetchArgs {
    /// Batch job name (batches/...)
    #[arg(long)]
    job: String,

    /// Directory to save decoded result images
    #[arg(long, default_value = "./data/processed")]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    #[value(name = "gemini-2.5-flash-image")]
    Flash25Image,
    #[value(name = "gemini-3-pro-image-preview")]
    Pro3ImagePreview,
    #[value(name = "gemini-2.5-flash")]
    Flash25,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash25Image => GeminiModel::Flash25Image,
            ModelArg::Pro3ImagePreview => GeminiModel::Pro3ImagePreview,
            ModelArg::Flash25 => GeminiModel::Flash25,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(args).await,
        Commands::Submit(args) => run_submit(args).await,
        Commands::Fetch(args) => run_fetch(args).await,
    }
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    Ok(bar)
}

async fn run_process(args: ProcessArgs) -> anyhow::Result<()> {
    let model: GeminiModel = args.model.into();
    let prompt = args.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let out_dir = mirror_output_dir(&args.raw_dir, &args.processed_dir);
    std::fs::create_dir_all(&out_dir)?;

    let client = GeminiClient::builder().build()?;
    let files = list_image_files(&args.raw_dir, false)?;

    println!("Processing images from: {}", args.raw_dir.display());
    println!("Saving processed images to: {}", out_dir.display());
    println!("Using model: {model}");
    println!("Prompt: {prompt}\n");

    let bar = progress_bar(files.len() as u64)?;
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut saved_total = 0usize;

    for file_name in &files {
        bar.set_message(file_name.clone());
        let input = args.raw_dir.join(file_name);
        match retouch_file(&client, model, &prompt, &input, &out_dir).await {
            Ok(saved) => {
                succeeded += 1;
                saved_total += saved.len();
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %file_name, "retouch failed: {e}");
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!(
        "\nProcessing complete! {succeeded} succeeded, {failed} failed, \
         {saved_total} images saved to {}",
        out_dir.display()
    );
    Ok(())
}

async fn run_submit(args: SubmitArgs) -> anyhow::Result<()> {
    let model: GeminiModel = args.model.into();
    let prompt = args.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let input = GcsLocation::parse(&args.input_uri)?;
    let output = GcsLocation::parse(&args.output_uri)?;

    let files = list_image_files(&args.raw_dir, true)?;
    if files.is_empty() {
        println!("No images found to upload.");
        return Ok(());
    }

    println!("Uploading {} images from {} to {input}...", files.len(), args.raw_dir.display());
    let uploader = GcsUploader::new()?;
    let bar = progress_bar(files.len() as u64)?;
    for file_name in &files {
        bar.set_message(file_name.clone());
        let bytes = std::fs::read(args.raw_dir.join(file_name))?;
        uploader.upload(&input, file_name, bytes).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    let manifest = RequestManifest::build(&files, model, &prompt, &input);
    manifest.write_to(&args.manifest)?;
    println!(
        "Created {} ({} requests)",
        args.manifest.display(),
        manifest.len()
    );

    let client = GeminiClient::builder().build()?;

    println!("Uploading {} to the Files API...", args.manifest.display());
    let manifest_bytes = std::fs::read(&args.manifest)?;
    let manifest_file = client
        .upload_file(manifest_bytes, "application/jsonl")
        .await?;
    println!("Manifest uploaded: {manifest_file}");

    println!("Creating batch job...");
    let dest = output.to_string();
    let job = client.create_batch(model, &manifest_file, Some(&dest)).await?;

    println!("\nBatch job created!");
    println!("  Job: {}", job.name);
    println!("  Status: {}", job.state);
    println!("\nCheck status later with:");
    println!("  retouch fetch --job {}", job.name);
    Ok(())
}

async fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let client = GeminiClient::builder().build()?;

    println!("Checking status for job: {}", args.job);
    let job = client.get_batch(&args.job).await?;
    println!("Status: {}", job.state);

    match &job.state {
        BatchState::Pending | BatchState::Active => {
            println!("Job is still running. Please wait.");
            Ok(())
        }
        BatchState::Failed => {
            anyhow::bail!(
                "job failed: {}",
                job.error.as_deref().unwrap_or("no detail reported")
            );
        }
        BatchState::Other(state) => {
            anyhow::bail!("job is in an unrecognized state: {state}");
        }
        BatchState::Succeeded => {
            let output_file = job.result_file()?;
            println!("Job completed successfully. Downloading results...");
            println!("Output file: {output_file}");

            let raw = client.download_file(output_file).await?;
            let summary = parse_result_manifest(&raw);

            let written = write_images(&summary.images, &args.output_dir)?;
            for path in &written {
                println!("Saved: {}", path.display());
            }
            for failure in &summary.failures {
                tracing::warn!(line = failure.line, "skipped line: {}", failure.reason);
            }
            for item in &summary.item_errors {
                tracing::warn!(custom_id = %item.custom_id, "item error: {}", item.detail);
            }

            println!(
                "\nProcessing complete. Saved {} images to {} \
                 ({} undecodable lines, {} item errors)",
                written.len(),
                args.output_dir.display(),
                summary.failures.len(),
                summary.item_errors.len()
            );
            Ok(())
        }
    }
}
