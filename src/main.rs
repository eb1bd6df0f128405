//! rabbitwire - broker transport probe
//!
//! Connects to an AMQP broker, sends the protocol header and reports the
//! first frame the broker answers with.

use clap::Parser;
use rabbitwire_client::{ClientConfig, ClientError, Endpoint, FrameHandler, TlsClientConfig};
use rabbitwire_protocol::{Frame, ProtocolError, ProtocolVersion, DEFAULT_PORT, DEFAULT_TLS_PORT};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rabbitwire")]
#[command(about = "Probe an AMQP broker at the transport level")]
#[command(version)]
struct Cli {
    /// Broker host
    #[arg(long, default_value = "localhost", env = "RABBITWIRE_HOST")]
    host: String,

    /// Broker port (defaults to 5672, or 5671 with --tls)
    #[arg(short, long, env = "RABBITWIRE_PORT")]
    port: Option<u16>,

    /// Speak the legacy 0-8 protocol header
    #[arg(long)]
    legacy: bool,

    /// YAML transport configuration
    #[arg(short, long, env = "RABBITWIRE_CONFIG")]
    config: Option<PathBuf>,

    // ===== TLS Options =====
    /// Enable TLS connection
    #[arg(long, env = "RABBITWIRE_TLS")]
    tls: bool,

    /// Path to CA certificate for broker verification
    #[arg(long, env = "RABBITWIRE_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Path to client certificate (for mTLS)
    #[arg(long, env = "RABBITWIRE_CLIENT_CERT", requires = "client_key")]
    client_cert: Option<PathBuf>,

    /// Path to client private key (for mTLS)
    #[arg(long, env = "RABBITWIRE_CLIENT_KEY", requires = "client_cert")]
    client_key: Option<PathBuf>,

    /// Skip broker certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    /// Server name for TLS SNI (defaults to the host)
    #[arg(long)]
    server_name: Option<String>,
}

impl Cli {
    fn tls_config(&self) -> TlsClientConfig {
        let mut tls = TlsClientConfig::new();
        tls.enabled = self.tls || self.ca_cert.is_some() || self.client_cert.is_some();
        if let Some(ref path) = self.ca_cert {
            tls = tls.with_ca_cert(path);
        }
        if let (Some(cert), Some(key)) = (&self.client_cert, &self.client_key) {
            tls = tls.with_client_cert(cert, key);
        }
        if self.insecure {
            tls = tls.with_insecure();
        }
        if let Some(ref name) = self.server_name {
            tls = tls.with_server_name(name);
        }
        tls
    }

    fn endpoint(&self) -> Result<Endpoint, ClientError> {
        let tls = self.tls_config();
        let default_port = if tls.enabled {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        };
        let protocol = if self.legacy {
            ProtocolVersion::AMQP_0_8
        } else {
            ProtocolVersion::AMQP_0_9_1
        };

        Ok(Endpoint::new(&self.host, self.port.unwrap_or(default_port))?
            .with_protocol(protocol)
            .with_tls(tls))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => {
            let config = ClientConfig::load_from(path)?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => ClientConfig::load()?,
    };

    let endpoint = cli.endpoint()?;
    tracing::info!("Probing {} ({})", endpoint, endpoint.protocol());

    let handler = FrameHandler::connect(endpoint, &config).await?;
    tracing::info!("  Local address: {:?}", handler.local_addr());
    tracing::info!("  Peer address: {:?}", handler.peer_addr());
    tracing::info!(
        "  TLS: {}",
        if handler.is_tls() { "enabled" } else { "disabled" }
    );

    handler.send_header().await?;

    let outcome = handler.read_frame().await;
    handler.close().await;

    match outcome {
        Ok(frame) => {
            report(&frame);
            Ok(())
        }
        Err(ClientError::Protocol(ProtocolError::VersionMismatch(offered))) => {
            tracing::error!("Broker rejected the header and offered {}", offered);
            Err(ProtocolError::VersionMismatch(offered).into())
        }
        Err(e) => {
            tracing::error!("Probe failed: {}", e);
            Err(e.into())
        }
    }
}

fn report(frame: &Frame) {
    tracing::info!(
        "Received frame type={} channel={} size={}",
        frame.frame_type,
        frame.channel,
        frame.payload.len()
    );

    if frame.frame_type == Frame::METHOD && frame.payload.len() >= 4 {
        let class_id = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
        let method_id = u16::from_be_bytes([frame.payload[2], frame.payload[3]]);
        tracing::info!("  Method: class={} method={}", class_id, method_id);
    }
}
