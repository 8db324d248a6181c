use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vision_classify::config::{AppConfig, LogFormat, LoggingConfig};
use vision_classify::grpc::image_classifier_server::ImageClassifierServer;
use vision_classify::{
    Args, ClassifierService, Command, InferencePipeline, ModelProfile, OnnxClassifier, OnnxModel,
    Upload, render,
};

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

fn load_pipeline(
    config: &AppConfig,
    cuda: bool,
    profile: &str,
    model: Option<PathBuf>,
) -> Result<InferencePipeline<OnnxClassifier>> {
    let profile = ModelProfile::resolve(profile)
        .with_context(|| format!("Failed to resolve profile `{profile}`"))?;
    let model_path = model
        .or_else(|| profile.model_path.clone())
        .context("No model path given and the profile has none")?;

    let classifier = OnnxModel::new(cuda || config.runtime.cuda)
        .with_intra_threads(config.runtime.intra_threads)
        .load_classifier(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    Ok(InferencePipeline::new(profile, classifier)?)
}

fn classify(
    pipeline: &InferencePipeline<OnnxClassifier>,
    source: Option<&Path>,
    top_k: usize,
) -> Result<()> {
    let upload = source
        .map(Upload::from_path)
        .transpose()
        .context("Failed to read image")?;
    let outcome = pipeline.classify_upload(upload.as_ref())?;

    let profile = pipeline.profile();
    println!("# {}", profile.title);
    print!("{}", render::render_outcome(profile, &outcome));
    if let vision_classify::Outcome::Classified(prediction) = &outcome {
        if top_k > 0 {
            println!();
            print!("{}", render::render_ranking(prediction, top_k));
        }
    }
    Ok(())
}

async fn serve(pipeline: InferencePipeline<OnnxClassifier>, addr: &str) -> Result<()> {
    let addr = addr
        .parse()
        .with_context(|| format!("Invalid listen address `{addr}`"))?;
    let service = ClassifierService::new(pipeline);
    info!(%addr, "ImageClassifier server listening");

    Server::builder()
        .add_service(ImageClassifierServer::new(service))
        .serve(addr)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    match args.command {
        Command::Classify {
            model,
            source,
            top_k,
        } => {
            let pipeline = load_pipeline(&config, args.cuda, &model.profile, model.model)?;
            classify(&pipeline, source.as_deref(), top_k)
        }
        Command::Labels { profile } => {
            let profile = ModelProfile::resolve(&profile)?;
            let labels = profile.label_map()?;
            let names: Vec<&str> = labels.names().collect();
            print!("{}", render::render_profile(&profile, &names));
            Ok(())
        }
        Command::Serve { model, addr } => {
            let pipeline = load_pipeline(&config, args.cuda, &model.profile, model.model)?;
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            serve(pipeline, &addr).await
        }
    }
}
