//! Plugin server: listener, optional TLS, handshake and shutdown

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::path::PathBuf;
use std::time::Duration;
use tonic::transport::{Identity, Server, ServerTlsConfig};

pub const CERT_ENV: &str = "TF_PLUGIN_CERT";
pub const KEY_ENV: &str = "TF_PLUGIN_KEY";

/// Log level for the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Maps a `TF_LOG` value; `JSON` is Terraform's alias for trace
    pub fn from_tf_log(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate; TLS is enabled only when both files exist
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    pub log_level: LogLevel,
    /// How long in-flight requests may run after shutdown starts
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            max_message_size: 256 << 20, // 256MB
            log_level: LogLevel::Info,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TF_PLUGIN_CERT`, `TF_PLUGIN_KEY` and `TF_LOG`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.cert_path = std::env::var_os(CERT_ENV).map(PathBuf::from);
        config.key_path = std::env::var_os(KEY_ENV).map(PathBuf::from);
        if let Some(level) = std::env::var("TF_LOG")
            .ok()
            .as_deref()
            .and_then(LogLevel::from_tf_log)
        {
            config.log_level = level;
        }
        config
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = Some(path);
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = Some(path);
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Both identity paths, if both point at existing files
    fn identity_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) if cert.is_file() && key.is_file() => Some((cert, key)),
            _ => None,
        }
    }
}

async fn load_identity(cert_path: &PathBuf, key_path: &PathBuf) -> Result<Identity> {
    let cert = tokio::fs::read(cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;
    Ok(Identity::from_pem(cert, key))
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    // tonic's rustls needs a process-wide crypto provider; install errors mean one is already set
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let grpc_server = GrpcProviderServer::new(provider);
    let root_ctx = grpc_server.context();
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder().timeout(config.shutdown_timeout);
    if let Some((cert, key)) = config.identity_paths() {
        let identity = load_identity(cert, key).await?;
        builder = builder
            .tls_config(ServerTlsConfig::new().identity(identity))
            .map_err(|e| TfplugError::TlsError(e.to_string()))?;
        tracing::debug!(cert = %cert.display(), "serving with TLS");
    } else {
        tracing::debug!("no TLS identity configured, serving plaintext");
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let actual_addr = listener.local_addr()?;

    // go-plugin handshake: core version | protocol version | network | address | protocol
    println!("1|6|tcp|{}|grpc", actual_addr);

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received, shutting down"),
            _ = root_ctx.cancelled() => tracing::info!("provider stopped, shutting down"),
        }
    };

    builder
        .add_service(provider_service)
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    Ok(())
}

/// Convenience function to run a provider configured from the environment
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::from_env()).await
}
