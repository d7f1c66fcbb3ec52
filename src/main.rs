//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A server-rendered blog front-end for a Prismic repository", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Write every post, not only the pre-rendered paths
        #[arg(short, long)]
        all: bool,
    },

    /// List the posts in the repository
    List,

    /// Clean the public folder
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,tower_http=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Serve { port, ip } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling::server::start(&blog, &ip, port).await?;
        }

        Commands::Generate { all } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            spacetraveling::commands::generate::run(&blog, all).await?;
            println!("Generated successfully!");
        }

        Commands::List => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            spacetraveling::commands::list::run(&blog).await?;
        }

        Commands::Clean => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
