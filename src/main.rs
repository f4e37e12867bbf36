//! tls-statusd entry point: CLI parsing, tracing setup, runtime bootstrap.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tls_statusd::config::ServerOptions;
use tls_statusd::net::{AdmissionStatus, Server};
use tls_statusd::tls::{TlsContext, TlsPolicy};

#[derive(Parser)]
#[command(name = "tls-statusd")]
#[command(about = "Minimal TLS-terminating HTTP status server", long_about = None)]
struct Cli {
    /// PEM certificate chain file.
    server_cert: PathBuf,

    /// PEM private key file.
    server_key: PathBuf,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 443)]
    port: u16,

    /// TLS policy: default, tls12 or tls13.
    #[arg(long, default_value = "default")]
    policy: String,

    /// Worker threads; 0 means one per available CPU.
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Stop accepting after this many clients; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    max_clients: usize,

    /// Persistent session store path (requires session-store support).
    #[arg(long)]
    session_db: Option<PathBuf>,

    /// Passphrase for the persistent session store.
    #[arg(long)]
    session_db_pass: Option<String>,
}

impl Cli {
    fn into_options(self) -> Result<ServerOptions, Box<dyn std::error::Error>> {
        Ok(ServerOptions {
            policy: self.policy.parse::<TlsPolicy>()?,
            server_cert: self.server_cert,
            server_key: self.server_key,
            port: self.port,
            threads: self.threads,
            max_clients: self.max_clients,
            session_db: self.session_db,
            session_db_pass: self.session_db_pass,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tls_statusd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = Cli::parse().into_options()?;

    // Configuration errors are startup-fatal: fail before serving anything.
    let tls = TlsContext::new(
        &options.server_cert,
        &options.server_key,
        options.policy,
        options.session_db.as_deref(),
    )
    .inspect_err(|err| tracing::error!(error = %err, "startup failed"))?;

    let workers = options.worker_threads();

    tracing::info!(
        port = options.port,
        policy = ?options.policy,
        workers,
        max_clients = options.max_clients,
        "tls-statusd starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), options.port);
        let server = Server::bind(
            addr,
            Arc::new(tls),
            Arc::new(AdmissionStatus::new(options.max_clients)),
        )
        .await?;

        server.run().await;
        Ok::<_, std::io::Error>(())
    })?;

    tracing::info!("shutdown complete");
    Ok(())
}
