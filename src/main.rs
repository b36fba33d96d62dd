use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cadvec::config::Config;
use cadvec::container::ContainerFormat;
use cadvec::export::ArtifactWriter;
use cadvec::latent::LatentModel;
use cadvec::pipeline::{Pipeline, PipelineSettings, Request, RequestKind, Storage};
use cadvec::reconstruct::Reconstructor;
use cadvec::sequence::SequenceCodec;
use cadvec::server::{app, AppState};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadvec")]
#[command(about = "Solids and meshes from parametric CAD sequence vectors", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,
    /// Run one request against the storage areas
    Run {
        /// Request kind: export, h5_to_vis, encode, decode or encode_decode
        kind: String,
        /// Input container file
        file: PathBuf,
        /// Chord deflection of the exported mesh
        #[arg(short, long)]
        deflection: Option<f64>,
    },
    /// Write the default spectral weights to a container file
    InitModel {
        /// Destination file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve => serve(&config),
        Commands::Run {
            kind,
            file,
            deflection,
        } => run_once(&config, &kind, &file, deflection),
        Commands::InitModel { path } => init_model(&config, &path),
    }
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let quantization = config.pipeline.quantization();
    let transform = config.transform.config(quantization);
    let model = match &config.transform.weights {
        Some(path) => LatentModel::load(path, transform)
            .with_context(|| format!("loading weights from {}", path.display()))?,
        None => LatentModel::spectral(transform)?,
    };
    let pipeline = Pipeline::new(
        Storage::new(&config.storage.root),
        SequenceCodec::new(quantization),
        Reconstructor::new(config.pipeline.probe_deflection)?,
        Arc::new(model),
        PipelineSettings {
            container_formats: config.pipeline.container_formats.clone(),
            default_deflection: config.pipeline.default_deflection,
            validity_policy: config.pipeline.validity_policy,
        },
    )?;
    Ok(pipeline)
}

fn serve(config: &Config) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(config)?);
    let state = AppState::new(pipeline, &config.server.public_url);
    let router = app(state, &config.server.allowed_origins);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.server.bind.as_str())
            .await
            .with_context(|| format!("binding {}", config.server.bind))?;
        info!(bind = %config.server.bind, root = %config.storage.root.display(), "listening");
        axum::serve(listener, router).await?;
        Ok(())
    })
}

fn run_once(config: &Config, kind: &str, file: &Path, deflection: Option<f64>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let request = Request {
        kind: RequestKind::parse(kind)?,
        file_name: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_format: ContainerFormat::from_path(file)
            .unwrap_or(ContainerFormat::Json)
            .tag()
            .to_string(),
        deflection,
        bytes,
    };
    let outcome = pipeline.run(&request)?;
    for artifact in &outcome.artifacts {
        println!("{}", artifact.path.display());
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(count) = outcome.triangle_count {
        info!(triangles = count, "done");
    }
    Ok(())
}

fn init_model(config: &Config, path: &Path) -> Result<()> {
    let transform = config.transform.config(config.pipeline.quantization());
    let model = LatentModel::spectral(transform)?;
    let written = model.save(&ArtifactWriter::new(), path)?;
    info!(path = %written.display(), "wrote spectral weights");
    Ok(())
}
