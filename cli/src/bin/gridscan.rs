use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use gridscan::{Pipeline, ScanConfig};
use gridscan_cli::{ScanOverrides, resolve_config, server};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Screenshot of the table to convert
    image: Option<PathBuf>,

    /// TOML or JSON scan configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ScanOverrides,

    /// Print the scan as JSON instead of the table view
    #[arg(long)]
    json: bool,

    /// Include cell geometry in the JSON output
    #[arg(long, requires = "json")]
    geometry: bool,

    /// Write intermediate masks and the annotated table crop here
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the converter over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Where uploaded screenshots are kept
        #[arg(long, default_value = "input_images")]
        upload_dir: PathBuf,
        /// TOML or JSON scan configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        overrides: ScanOverrides,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Serve { host, port, upload_dir, config, overrides }) => {
            let config = resolve_config(config.as_deref(), overrides)?;
            serve(host, *port, upload_dir, config).await?;
        }
        Some(Commands::Schema) => {
            println!("{}", serde_json::to_string_pretty(&ScanConfig::schema())?);
        }
        None => {
            let image = cli
                .image
                .as_deref()
                .ok_or_else(|| eyre!("No image given. Pass a screenshot path or use a subcommand (see --help)"))?;
            let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;
            convert(image, config, &cli).await?;
        }
    }

    Ok(())
}

async fn convert(image: &Path, config: ScanConfig, cli: &Cli) -> Result<()> {
    let mut builder = Pipeline::builder().config(config);
    if let Some(dir) = &cli.debug_dir {
        builder = builder.debug_dir(dir);
    }

    let image = image.to_path_buf();
    let scan = tokio::task::spawn_blocking(move || {
        let pipeline = builder.build()?;
        info!("{}", pipeline.info());
        pipeline.process_path(&image)
    })
    .await??;

    if cli.json {
        let output = if cli.geometry {
            serde_json::to_string_pretty(&scan)?
        } else {
            serde_json::to_string_pretty(&scan.table.rows)?
        };
        println!("{output}");
    } else {
        print!("{}", scan.table.render());
    }
    Ok(())
}

async fn serve(host: &str, port: u16, upload_dir: &Path, config: ScanConfig) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let pipeline = tokio::task::spawn_blocking(move || Pipeline::builder().config(config).build()).await??;
    info!("{}", pipeline.info());

    let listener = TcpListener::bind(addr).await?;
    server::serve(listener, server::AppState::new(pipeline, upload_dir)).await?;
    Ok(())
}
