use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Application config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run the model on CUDA
    #[arg(long, global = true)]
    pub cuda: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Classify a single image
    Classify {
        #[command(flatten)]
        model: ModelArgs,

        /// image path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Also list the k most likely classes
        #[arg(long, default_value_t = 0)]
        top_k: usize,
    },
    /// Print a profile's labels and settings
    Labels {
        /// Built-in profile name (chess, fashion) or profile file
        #[arg(long, default_value_t = String::from("chess"))]
        profile: String,
    },
    /// Serve the classifier over gRPC
    Serve {
        #[command(flatten)]
        model: ModelArgs,

        /// Listen address, overrides the config file
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ModelArgs {
    /// Built-in profile name (chess, fashion) or profile file
    #[arg(long, default_value_t = String::from("chess"))]
    pub profile: String,

    /// ONNX model path, overrides the profile
    #[arg(long)]
    pub model: Option<PathBuf>,
}
