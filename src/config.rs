//! Server configuration.

use std::path::PathBuf;

use crate::tls::TlsPolicy;

/// Everything the operator can set, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// PEM certificate chain file.
    pub server_cert: PathBuf,

    /// PEM private key file.
    pub server_key: PathBuf,

    /// TCP port to listen on.
    pub port: u16,

    /// TLS policy name (protocol version selection).
    pub policy: TlsPolicy,

    /// Worker thread count; 0 means one per available CPU (or 2).
    pub threads: usize,

    /// Stop accepting after this many clients; 0 means unlimited.
    pub max_clients: usize,

    /// Optional persistent session store (not compiled in; see tls::context).
    pub session_db: Option<PathBuf>,
    pub session_db_pass: Option<String>,
}

impl ServerOptions {
    /// Resolve the worker thread count: the configured value, else the
    /// available CPU count, else 2.
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(threads: usize) -> ServerOptions {
        ServerOptions {
            server_cert: PathBuf::from("server.crt"),
            server_key: PathBuf::from("server.key"),
            port: 443,
            policy: TlsPolicy::Default,
            threads,
            max_clients: 0,
            session_db: None,
            session_db_pass: None,
        }
    }

    #[test]
    fn explicit_thread_count_wins() {
        assert_eq!(options(7).worker_threads(), 7);
    }

    #[test]
    fn zero_threads_resolves_to_cpus() {
        assert!(options(0).worker_threads() >= 1);
    }
}
