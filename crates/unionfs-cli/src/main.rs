//! Union filesystem command-line front end.
//!
//! Usage:
//!   # Merge two directories, extra wins over base
//!   unionfs --layer mods/extra --layer mods/base ls /
//!
//!   # Same stack from a RON file
//!   unionfs --config stack.ron cat /masktest.txt
//!
//!   # Debug layer resolution
//!   RUST_LOG=unionfs=trace unionfs --config stack.ron which /masktest.txt

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use tracing_subscriber::{EnvFilter, fmt};

use unionfs::{LayerSpec, MaskPredicate, Providers, StackConfig, UnionFs};

/// Inspect a merged view of several directories.
#[derive(Parser, Debug)]
#[command(name = "unionfs")]
#[command(about = "Read-only union filesystem inspector")]
struct Args {
    /// RON layer stack (root, additional, exclude)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layer directory, highest priority first. Placed ahead of config layers.
    #[arg(short, long = "layer")]
    layers: Vec<PathBuf>,

    /// Hide entries whose relative path starts with this prefix
    #[arg(short, long = "exclude")]
    excludes: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List merged directory contents
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file
    Cat { path: String },
    /// Walk the tree depth-first
    Walk {
        #[arg(default_value = "/")]
        path: String,

        /// Print regular files only
        #[arg(long)]
        files_only: bool,

        /// Maximum depth below the start path
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Show which layer serves a path
    Which { path: String },
    /// Print the union:// URI of a path
    Uri { path: String },
}

/// Build the layer stack from `--config`, `--layer` and `--exclude`.
fn stack(args: &Args) -> Result<(Vec<LayerSpec>, MaskPredicate)> {
    let config = args
        .config
        .as_ref()
        .map(|path| {
            StackConfig::load(path).with_context(|| format!("loading {}", path.display()))
        })
        .transpose()?;

    let mut layers: Vec<LayerSpec> = args.layers.iter().cloned().map(LayerSpec::from).collect();
    let mut excludes = args.excludes.clone();
    if let Some(config) = &config {
        layers.extend(config.layers());
        excludes.extend(config.exclude.iter().cloned());
    }
    if layers.is_empty() {
        bail!("no layers given; pass --layer or --config");
    }

    let mask = if excludes.is_empty() {
        MaskPredicate::AllowAll
    } else {
        MaskPredicate::exclude_prefixes(excludes)
    };
    Ok((layers, mask))
}

async fn run(fs: &Arc<UnionFs>, command: Command) -> Result<()> {
    match command {
        Command::Ls { path } => {
            let dir = fs.get_path(&path);
            for child in fs.read_dir(&dir).await? {
                let name = child
                    .file_name()
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                if fs.is_dir(&child).await? {
                    println!("{}/", name);
                } else {
                    println!("{}", name);
                }
            }
        }
        Command::Cat { path } => {
            let mut stream = fs.open(&fs.get_path(&path)).await?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut stream, &mut stdout).await?;
        }
        Command::Walk {
            path,
            files_only,
            max_depth,
        } => {
            let start = fs.get_path(&path);
            let mut walk = fs
                .walk_max_depth(&start, max_depth.unwrap_or(usize::MAX))
                .await?;
            while let Some(entry) = walk.try_next().await? {
                if files_only && !fs.is_file(&entry).await? {
                    continue;
                }
                println!("{}", entry);
            }
        }
        Command::Which { path } => {
            let target = fs.get_path(&path);
            match fs.resolve_layer(&target).await? {
                Some(layer) => println!("{}", layer.location()),
                None => bail!("not found: {}", target),
            }
        }
        Command::Uri { path } => {
            println!("{}", fs.get_path(&path).to_absolute().to_uri());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let (layers, mask) = stack(&args)?;

    let providers = Providers::installed();
    let fs = providers.union().new_filtered_filesystem(mask, layers)?;
    tracing::debug!(key = %fs.key(), layers = fs.layers().len(), "filesystem ready");

    let result = run(&fs, args.command).await;
    fs.close().await?;
    result
}
