//! Registry admin tool: register artifacts and promote versions.
//!
//! Promotion is a manual step. After promoting, call
//! `POST /admin/model/reload` on the running service.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use iris_serving::model::{FsRegistry, ModelArtifact, ModelRegistry};

#[derive(Parser)]
#[command(name = "promote")]
#[command(about = "Manage model versions in the iris-serving registry")]
struct Args {
    /// Registry root directory
    #[arg(long, env = "MODEL_REGISTRY_DIR", default_value = "./mlruns-registry")]
    registry_dir: PathBuf,

    /// Registered model name
    #[arg(long, env = "MODEL_NAME", default_value = "iris-classifier")]
    model_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate an artifact file and store it as the next version
    Register {
        /// Path to a model.json artifact
        artifact: PathBuf,
    },
    /// Promote a version (the latest if omitted) to production
    Promote {
        #[arg(long)]
        version: Option<u64>,
    },
    /// List registered versions
    List,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iris_serving=info".into()),
        )
        .init();

    let args = Args::parse();
    let registry = FsRegistry::new(&args.registry_dir);

    match args.command {
        Command::Register { artifact } => {
            let bytes = std::fs::read(&artifact)
                .with_context(|| format!("Failed to read {}", artifact.display()))?;
            ModelArtifact::parse(&bytes)
                .with_context(|| format!("{} is not a valid model artifact", artifact.display()))?;
            let version = registry.register(&args.model_name, &bytes)?;
            println!("Registered {} version {}", args.model_name, version);
        }
        Command::Promote { version } => {
            let version = match version {
                Some(v) => {
                    registry.promote(&args.model_name, v)?;
                    v
                }
                None => registry.promote_latest(&args.model_name)?,
            };
            println!("Successfully promoted version {} to production", version);
        }
        Command::List => {
            let promoted = registry.promoted_version(&args.model_name)?;
            for v in registry.list_versions(&args.model_name)? {
                let marker = if Some(v) == promoted { " (production)" } else { "" };
                println!("{} {}{}", args.model_name, v, marker);
            }
        }
    }

    Ok(())
}
