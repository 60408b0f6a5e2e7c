mod cli;

use kino::{
    catalog::Snapshot,
    config::{self, Config},
    scanner::{self, Synchronizer},
    server,
};
use kino_av::{FfmpegExtractor, ToolRegistry};
use kino_db::pool::{get_conn, init_pool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How long in-flight streams may keep the process alive after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Reconcile the store with the library tree and persist the catalog.
async fn synchronize(config: &Config) -> Result<Snapshot> {
    scanner::ensure_media_link(&config.media_link_path(), &config.library.source_root);

    let thumbnails = config.thumbnail_target();
    if let Err(e) = std::fs::create_dir_all(&thumbnails.dir) {
        tracing::warn!("Cannot create thumbnail directory {:?}: {}", thumbnails.dir, e);
    }

    tracing::info!("Opening catalog store at {:?}", config.library.db_path);
    let pool = init_pool(&config.library.db_path).context("Failed to open catalog store")?;

    let tools = ToolRegistry::discover(&config.tools);
    for name in ["ffprobe", "ffmpeg"] {
        if !tools.is_available(name) {
            tracing::warn!("{} not found; new files get no duration or thumbnails", name);
        }
    }

    let extractor = Arc::new(FfmpegExtractor::new(tools, thumbnails));
    let synchronizer = Synchronizer::new(pool.clone(), extractor, config.library.clone());
    synchronizer.run(scanner::unix_now()).await?;

    let snapshot = Snapshot::export(&*get_conn(&pool)?)?;
    snapshot.write_document(&config.library.snapshot_path)?;
    Ok(snapshot)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    skip_sync: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting kino");

    let snapshot = if skip_sync {
        tracing::info!("Skipping synchronization");
        Snapshot::load_document(&config.library.snapshot_path)
            .context("No usable catalog document; run without --skip-sync")?
    } else {
        synchronize(&config).await?
    };

    server::start_server(&config, snapshot).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "kino=trace,kino_av=trace,kino_db=debug,kino_common=debug,tower_http=debug".to_string()
        } else {
            "kino=info,kino_av=info,kino_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            skip_sync,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let result = rt.block_on(start_server(host, port, skip_sync, cli.config.as_deref()));
            rt.shutdown_timeout(SHUTDOWN_GRACE);
            result
        }
        Commands::Sync => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            let snapshot = rt.block_on(synchronize(&config))?;
            println!(
                "Catalog: {} entries written to {}",
                snapshot.len(),
                config.library.snapshot_path.display()
            );
            Ok(())
        }
        Commands::Catalog { json } => show_catalog(cli.config.as_deref(), json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("kino {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn show_catalog(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let snapshot = Snapshot::load_document(&config.library.snapshot_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for entry in &snapshot.movies {
        let secs = entry.duration as u64;
        println!(
            "{:02}:{:02}:{:02}  {}/{}  {}  ({} thumbnails)",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            entry.kind,
            entry.category,
            entry.title,
            entry.thumbnails.len()
        );
    }
    println!("\n{} entries", snapshot.len());

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. New files will be cataloged without duration or thumbnails.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Serve root: {}", config.server.serve_root.display());
    println!("  Library: {}", config.library.source_root.display());
    println!(
        "  Media path: /{}/",
        config.library.web_video_dir.trim_matches('/')
    );
    println!(
        "  Thumbnails: {} per file in {}",
        config.library.thumbnail_count, config.library.thumbnail_dir
    );

    Ok(())
}
