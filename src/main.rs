use clap::Parser;
use peerip::config::{self, Config};
use peerip::constants::rpc::DISCOVER_IP;
use peerip::error::AppError;
use peerip::network::client::TcpRpcClient;
use peerip::network::ip_discovery::IpDiscovery;
use peerip::network::ip_responder::DiscoverIpHandler;
use peerip::network::server::RpcServer;
use peerip::peer_manager::PeerManager;
use peerip::shutdown::ShutdownManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "peerip")]
#[command(about = "Learns this node's public IP from its peers", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[arg(long)]
    listen_addr: Option<String>,

    /// Extra peer to poll (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Skip discovery and use this address
    #[arg(long)]
    external_addr: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.generate_config {
        match Config::default().save_to_file(&args.config) {
            Ok(_) => {
                println!("✅ Generated default config at: {}", args.config);
                return;
            }
            Err(e) => {
                eprintln!("❌ Failed to generate config: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut config = match Config::load_or_create(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(listen) = args.listen_addr {
        config.network.listen_address = listen;
    }
    if let Some(external) = args.external_addr {
        config.network.external_address = Some(external);
    }
    config.network.bootstrap_peers.extend(args.peers);

    // Flushes the file writer on drop; keep alive until exit
    let _log_guard = setup_logging(&config.logging, args.verbose);

    if let Err(e) = run(config).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let mut shutdown_manager = ShutdownManager::new();
    let shutdown_token = shutdown_manager.token();

    let network_type = config.node.network_type();
    let params = config.discovery.resolve(&network_type);
    let magic = network_type.magic_bytes();
    let listen_addr = config.network.full_listen_address(&network_type);

    info!(
        "🚀 {} v{} on {}",
        config.node.name,
        env!("CARGO_PKG_VERSION"),
        network_type
    );

    let mut server = RpcServer::bind(&listen_addr, magic, params.conn_std_deadline)
        .await
        .map_err(|e| AppError::Network(format!("failed to bind {}: {}", listen_addr, e)))?;
    server.register_rpc(
        DISCOVER_IP,
        Arc::new(DiscoverIpHandler::new(params.conn_std_deadline)),
    );
    let local_addr = server.local_addr()?;
    info!("📡 Answering {} on {}", DISCOVER_IP, local_addr);

    let token = shutdown_token.clone();
    shutdown_manager.register_task(tokio::spawn(async move {
        if let Err(e) = server.run(token).await {
            error!("RPC server stopped: {}", e);
        }
    }));

    if let Some(external) = config.network.configured_external_address() {
        info!("🌐 Using configured external address {}", external);
    } else {
        let peers = Arc::new(
            PeerManager::with_bootstrap_peers(
                &config.network.bootstrap_peers,
                network_type.default_p2p_port(),
            )
            .await,
        );
        info!(
            "🔍 Discovering external IP from {} known peer(s) (need {})",
            peers.peer_count().await,
            params.min_peers_for_ip_discovery
        );

        let rpc = Arc::new(TcpRpcClient::new(magic, params.conn_std_deadline));
        let discovery = IpDiscovery::new(peers, rpc, params, shutdown_token.clone());
        let port = local_addr.port();

        shutdown_manager.register_task(tokio::spawn(async move {
            match discovery.discover_external_ip().await {
                Ok(ip) => info!("✓ External address: {}", SocketAddr::new(ip, port)),
                Err(e) => info!("IP discovery stopped: {}", e),
            }
        }));
    }

    shutdown_manager.wait_for_shutdown().await;
    Ok(())
}

fn setup_logging(
    config: &config::LoggingConfig,
    verbose: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "trace" } else { &config.level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = if config.output == "file" {
        let appender = tracing_appender::rolling::daily(&config.file_path, "peerip.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (BoxMakeWriter::new(writer), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };
    let ansi = guard.is_none();

    // Detect if running under systemd/journald
    let is_systemd =
        std::env::var("JOURNAL_STREAM").is_ok() || std::env::var("INVOCATION_ID").is_ok();

    // Get hostname - shorten to first part before dot
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    let short_hostname = hostname.split('.').next().unwrap_or(&hostname).to_string();

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_thread_ids(false)
                .init();
        }
        _ if is_systemd && ansi => {
            // journald already adds timestamp and hostname
            fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .without_time()
                .compact()
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_timer(CustomTimer {
                    hostname: short_hostname,
                })
                .compact()
                .init();
        }
    }

    guard
}

// Custom timer that shows UTC time and hostname
struct CustomTimer {
    hostname: String,
}

impl tracing_subscriber::fmt::time::FormatTime for CustomTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();

        // Format: "YYYY-MM-DD HH:MM:SS.mmm [hostname]"
        write!(
            w,
            "{}.{:03} [{}]",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.timestamp_subsec_millis(),
            self.hostname
        )
    }
}
