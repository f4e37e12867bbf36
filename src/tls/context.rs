//! Server credentials and shared TLS configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::ServerSessionMemoryCache;
use rustls::{ServerConfig, SupportedProtocolVersion};
use thiserror::Error;

/// Startup-fatal configuration failures. The process must not begin serving
/// when any of these occur.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificate found in {0:?}")]
    NoCertificate(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("invalid certificate/key pair: {0}")]
    BadCredentials(rustls::Error),

    #[error("unknown TLS policy '{0}' (expected default, tls12 or tls13)")]
    UnknownPolicy(String),

    #[error("persistent session store support is not built in")]
    SessionDbUnsupported,
}

/// Named TLS policy selecting the permitted protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// All supported versions (TLS 1.2 and 1.3).
    #[default]
    Default,
    /// TLS 1.2 only.
    Tls12,
    /// TLS 1.3 only.
    Tls13,
}

impl TlsPolicy {
    fn protocol_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
        static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];
        match self {
            TlsPolicy::Default => rustls::ALL_VERSIONS,
            TlsPolicy::Tls12 => TLS12_ONLY,
            TlsPolicy::Tls13 => TLS13_ONLY,
        }
    }
}

impl FromStr for TlsPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(TlsPolicy::Default),
            "tls12" => Ok(TlsPolicy::Tls12),
            "tls13" => Ok(TlsPolicy::Tls13),
            other => Err(ConfigError::UnknownPolicy(other.to_owned())),
        }
    }
}

/// Immutable TLS state shared by every connection: credentials, policy, and
/// the session-resumption store. Constructed once at startup and `Arc`-shared
/// read-only across sessions.
#[derive(Debug)]
pub struct TlsContext {
    base: ServerConfig,
}

impl TlsContext {
    /// Build the shared configuration from PEM credential files.
    ///
    /// `session_db` is accepted for CLI compatibility but persistent session
    /// stores are not compiled in; requesting one fails startup. The default
    /// store is rustls's in-memory resumption cache.
    pub fn new(
        cert_path: &Path,
        key_path: &Path,
        policy: TlsPolicy,
        session_db: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        if session_db.is_some() {
            return Err(ConfigError::SessionDbUnsupported);
        }

        let certs = load_certs(cert_path)?;
        let key = load_private_key(key_path)?;

        let mut base = ServerConfig::builder_with_protocol_versions(policy.protocol_versions())
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(ConfigError::BadCredentials)?;

        base.session_storage = ServerSessionMemoryCache::new(256);

        Ok(Self { base })
    }

    /// Per-connection config: a copy of the base with the application
    /// protocol chosen for this connection, ready for handshake resumption.
    pub(crate) fn config_with_alpn(&self, alpn: Option<Vec<u8>>) -> Arc<ServerConfig> {
        let mut config = self.base.clone();
        if let Some(proto) = alpn {
            config.alpn_protocols = vec![proto];
        }
        Arc::new(config)
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<_, _>>()
        .map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

    if certs.is_empty() {
        return Err(ConfigError::NoCertificate(path.to_owned()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;

    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?
        .ok_or_else(|| ConfigError::NoPrivateKey(path.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse() {
        assert_eq!("default".parse::<TlsPolicy>().unwrap(), TlsPolicy::Default);
        assert_eq!("tls12".parse::<TlsPolicy>().unwrap(), TlsPolicy::Tls12);
        assert_eq!("tls13".parse::<TlsPolicy>().unwrap(), TlsPolicy::Tls13);
        assert!(matches!(
            "bogus".parse::<TlsPolicy>(),
            Err(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn session_db_is_rejected_at_startup() {
        let err = TlsContext::new(
            Path::new("does-not-matter.crt"),
            Path::new("does-not-matter.key"),
            TlsPolicy::Default,
            Some(Path::new("sessions.db")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SessionDbUnsupported));
    }

    #[test]
    fn missing_certificate_fails() {
        let err = TlsContext::new(
            Path::new("/nonexistent/server.crt"),
            Path::new("/nonexistent/server.key"),
            TlsPolicy::Default,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
