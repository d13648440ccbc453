use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use futures::StreamExt;
use iocraft::prelude::*;
use tokio::sync::watch;
use url::Url;

use blobzip::client::{BlobClient, UploadEvent};
use blobzip::config;
use blobzip::format::format_file_size;
use blobzip::ui::{ErrorMessage, FilesList, ProgressBar, SuccessMessage};

#[derive(Parser)]
#[command(name = "blobzip")]
#[command(version)]
#[command(about = "CLI tool for the BlobZip file hosting service")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    upload: UploadArgs,
}

#[derive(Args)]
struct UploadArgs {
    /// Path of the file to upload
    #[arg(value_hint = ValueHint::FilePath)]
    file_path: Option<PathBuf>,
    /// Server origin (defaults to $BLOBZIP_URL, then https://blob.zip)
    base_url: Option<Url>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all uploaded files
    List {
        /// Custom server URL
        #[arg(short, long)]
        url: Option<Url>,
    },
    /// Download a file
    Download {
        file_url: Url,
        /// Output path (defaults to the last URL segment)
        #[arg(value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
    /// Delete a file (use the pathname shown by `blobzip list`)
    Delete {
        pathname: String,
        /// Custom server URL
        #[arg(short, long)]
        url: Option<Url>,
    },
    /// Show the resolved configuration
    Config,
}

fn main() -> ExitCode {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Every failure is terminal; diagnostics stay on stdout.
            element!(ErrorMessage(message: format!("{error:#}"))).print();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::List { url }) => list_files(&client_for(url)?).await,
        Some(Commands::Download { file_url, output }) => {
            download_file(&client_for(None)?, file_url, output).await
        }
        Some(Commands::Delete { pathname, url }) => {
            delete_file(&client_for(url)?, &pathname).await
        }
        Some(Commands::Config) => show_config(),
        None => {
            let Some(file_path) = cli.upload.file_path else {
                println!("Usage: blobzip <file_path> [base_url]");
                println!("Example: blobzip large-file.zip https://blob.zip");
                bail!("Missing required <file_path> argument");
            };
            upload_file(&client_for(cli.upload.base_url)?, &file_path).await
        }
    }
}

fn client_for(base_url: Option<Url>) -> Result<BlobClient> {
    let base_url = match base_url {
        Some(url) => url,
        None => config::read_config()?.base_url,
    };
    Ok(BlobClient::new(base_url))
}

async fn upload_file(client: &BlobClient, file_path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(file_path)
        .with_context(|| format!("File '{}' not found", file_path.display()))?;
    let filename = file_path
        .file_name()
        .ok_or_else(|| anyhow!("'{}' has no file name", file_path.display()))?
        .to_string_lossy();

    println!("Uploading file: {}", filename);
    println!("File size: {}", format_file_size(metadata.len()));

    let mut stream = client.chunked_upload(file_path)?;

    let (tx, rx) = watch::channel(0.0f32);

    let process_stream = async {
        let mut receipt = None;
        while let Some(event) = stream.next().await {
            match event? {
                UploadEvent::Progress(p) => {
                    let percent = if p.total_bytes == 0 {
                        100.0
                    } else {
                        (p.bytes_uploaded as f32 / p.total_bytes as f32) * 100.0
                    };
                    let _ = tx.send(percent);
                }
                UploadEvent::Complete(r) => {
                    receipt = Some(r);
                    break;
                }
            }
        }
        receipt.ok_or_else(|| anyhow!("Upload stream ended without a completion event"))
    };

    let mut progress_bar =
        element!(ProgressBar(title: "Uploading".to_string(), progress: Some(rx)));

    let receipt = tokio::select! {
        result = process_stream => result?,
        _ = progress_bar.render_loop() => {
            unreachable!("render_loop should not terminate")
        }
    };

    element!(SuccessMessage(message: "Upload completed successfully!".to_string())).print();
    println!("Download URL: {}", receipt.url);
    println!("File ID: {}", receipt.id);
    println!("Expires: {}", receipt.expires_at);

    Ok(())
}

async fn list_files(client: &BlobClient) -> Result<()> {
    let files = client.list_files().await?;
    element!(SuccessMessage(message: format!("Found {} files", files.len()))).print();
    if files.is_empty() {
        println!("No files found");
        return Ok(());
    }
    println!();
    element!(FilesList(files: files)).print();
    Ok(())
}

async fn download_file(client: &BlobClient, file_url: Url, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        let segment = file_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("downloaded-file");
        PathBuf::from(segment)
    });

    let written = client.download(file_url, &output).await?;

    element!(SuccessMessage(
        message: format!("File downloaded successfully as {}", output.display())
    ))
    .print();
    println!("File size: {}", format_file_size(written));
    Ok(())
}

async fn delete_file(client: &BlobClient, pathname: &str) -> Result<()> {
    client.delete_file(pathname).await?;
    element!(SuccessMessage(message: "File deleted successfully!".to_string())).print();
    Ok(())
}

fn show_config() -> Result<()> {
    let config = config::read_config()?;
    println!("BlobZip CLI configuration:");
    println!("Server URL: {}", config.base_url);
    println!(
        "BLOBZIP_URL: {}",
        std::env::var("BLOBZIP_URL").unwrap_or_else(|_| "not set".to_string())
    );
    Ok(())
}
