//! ObjectIO server binary - wires config, logging and both the S3 and
//! Console endpoints into a single process.

use anyhow::Context;
use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use clap::Parser;
use objectio_auth::{IpRateLimiter, LockoutPolicy, SigV4Verifier, UserStore};
use objectio_common::config::Config;
use objectio_manager::ObjectManager;
use objectio_meta_store::MetaStore;
use objectio_storage::BlobStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-server")]
#[command(about = "ObjectIO S3-compatible object store server")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (commit: unknown, built: unknown)"))]
struct Args {
    /// Directory holding the metadata store, blob store and temp files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Listen address for the S3-compatible API.
    #[arg(long)]
    s3_listen: Option<SocketAddr>,

    /// Listen address for the JSON console API.
    #[arg(long)]
    console_listen: Option<SocketAddr>,

    /// Log level filter, e.g. trace/debug/info/warn/error.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// YAML configuration file. Flags override the file; the file
    /// overrides the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => ::config::Config::builder()
            .add_source(::config::File::from(path.as_path()))
            .build()
            .context("reading config file")?
            .try_deserialize()
            .context("parsing config file")?,
        None => Config::default(),
    };

    if let Some(dir) = &args.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(addr) = args.s3_listen {
        cfg.s3.listen = addr;
    }
    if let Some(addr) = args.console_listen {
        cfg.console.listen = addr;
    }
    Ok(cfg)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let cfg = load_config(&args).context("loading configuration")?;
    cfg.validate().map_err(anyhow::Error::msg)?;

    std::fs::create_dir_all(cfg.meta_dir()).context("creating meta_dir")?;
    std::fs::create_dir_all(cfg.blobs_dir()).context("creating blobs_dir")?;
    std::fs::create_dir_all(cfg.tmp_dir()).context("creating tmp_dir")?;

    let meta = MetaStore::open(cfg.meta_dir().join("objectio.redb")).context("opening metadata store")?;
    let blobs = BlobStore::open(cfg.blobs_dir()).await.context("opening blob store")?;

    let manager = ObjectManager::new(meta.clone(), blobs.clone());
    let verifier = SigV4Verifier::new(UserStore::new(meta.clone()), "us-east-1");
    let s3_state = Arc::new(objectio_s3::AppState::new(manager, verifier, cfg.cors.s3.clone()));
    let s3_router = objectio_s3::build_router(s3_state);

    let rate_limiter = IpRateLimiter::from_config(&cfg.ratelimit);
    let lockout = LockoutPolicy::from_config(&cfg.lockout);
    let console_state = Arc::new(objectio_console::AppState::new(
        meta,
        blobs,
        cfg.blobs_dir(),
        rate_limiter,
        lockout,
        cfg.auth.jwt_secret.clone(),
    ));
    let console_router: IntoMakeServiceWithConnectInfo<axum::Router, SocketAddr> =
        objectio_console::build_router(console_state).into_make_service_with_connect_info::<SocketAddr>();

    let s3_listener = TcpListener::bind(cfg.s3.listen).await.context("binding S3 listen address")?;
    let console_listener = TcpListener::bind(cfg.console.listen).await.context("binding console listen address")?;

    info!(addr = %cfg.s3.listen, "S3 endpoint listening");
    info!(addr = %cfg.console.listen, "Console endpoint listening");

    let s3_server = axum::serve(s3_listener, s3_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let console_server = axum::serve(console_listener, console_router).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async { s3_server.await.context("S3 server") },
        async { console_server.await.context("console server") },
    )?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            if e.chain().any(|cause| cause.downcast_ref::<std::io::Error>().is_some()) {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
