use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ipnet::IpNet;
use podnet::driver::{Backend, Networks, TenantResolver};
use podnet::grpc::PodnetServer;
use podnet::memory::{MemoryConfig, MemoryDriver};
use podnet::model::Network;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "podnetd")]
#[command(about = "Pod network backend daemon")]
struct Args {
    /// gRPC listen address
    #[arg(long, default_value = "[::1]:4237")]
    listen: SocketAddr,

    /// Per-request time limit in seconds (0 disables)
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Address range for floating IPs
    #[arg(long, default_value = "172.24.4.0/24")]
    floating_range: IpNet,

    /// Identifier of the external network floating IPs belong to
    #[arg(long, default_value = "public")]
    floating_network: String,

    /// Address range for load balancer VIPs
    #[arg(long, default_value = "10.254.0.0/16")]
    vip_range: IpNet,

    /// Tenant name to id mapping, as name=id (repeatable)
    #[arg(long = "tenant", value_parser = parse_tenant)]
    tenants: Vec<(String, String)>,

    /// Tenant id for resources that carry none
    #[arg(long, default_value = "")]
    default_tenant: String,

    /// JSON file with networks to create at startup
    #[arg(long)]
    seed: Option<PathBuf>,
}

fn parse_tenant(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => {
            Ok((name.to_string(), id.to_string()))
        }
        _ => Err(format!("expected name=id, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "podnet=info,podnetd=info,tonic=warn,tower=warn,h2=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting podnetd");

    let mut config = MemoryConfig::new(args.floating_range, args.vip_range)
        .with_floating_network(args.floating_network)
        .with_default_tenant(args.default_tenant);
    for (name, id) in args.tenants {
        config = config.with_tenant(name, id);
    }
    let driver = Arc::new(MemoryDriver::new(config));

    if let Some(path) = &args.seed {
        seed_networks(&driver, path).await?;
    }

    let mut server = PodnetServer::new(Backend::from_driver(driver));
    if args.request_timeout > 0 {
        server = server.with_request_timeout(Duration::from_secs(args.request_timeout));
    }

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "Starting gRPC server");

    let mut sigint = signal(SignalKind::interrupt()).context("Failed to set up SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;

    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    };

    if let Err(e) = server.serve(listener, shutdown).await {
        error!(error = %e, "gRPC server error");
        bail!("gRPC server failed: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

/// Create the networks listed in a JSON seed file.
async fn seed_networks(driver: &MemoryDriver, path: &Path) -> Result<()> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let networks: Vec<Network> = serde_json::from_str(&data)
        .with_context(|| format!("Invalid seed file {}", path.display()))?;

    for mut network in networks {
        network.tenant_id = driver.to_tenant_id(&network.tenant_id).await;
        let name = network.name.clone();
        driver
            .create_network(network)
            .await
            .with_context(|| format!("Failed to seed network {}", name))?;
        info!(name = %name, "Seeded network");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tenant() {
        assert_eq!(
            parse_tenant("demo=t-demo"),
            Ok(("demo".to_string(), "t-demo".to_string()))
        );
        assert!(parse_tenant("demo").is_err());
        assert!(parse_tenant("=t-demo").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["podnetd", "--tenant", "demo=t-demo"]);
        assert_eq!(args.listen.port(), 4237);
        assert_eq!(args.request_timeout, 30);
        assert_eq!(args.floating_network, "public");
        assert_eq!(args.tenants.len(), 1);
        assert!(args.seed.is_none());
    }

    #[tokio::test]
    async fn test_seed_networks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"[{"name": "net1", "tenant_id": "demo", "subnets": [{"name": "sub1", "cidr": "10.0.0.0/24"}]}]"#,
        )
        .unwrap();

        let driver = MemoryDriver::new(
            MemoryConfig::new(
                "172.24.4.0/24".parse().unwrap(),
                "10.254.0.0/16".parse().unwrap(),
            )
            .with_tenant("demo", "t-demo"),
        );
        seed_networks(&driver, &path).await.unwrap();

        let net = driver.get_network_by_name("net1").await.unwrap();
        assert_eq!(net.tenant_id, "t-demo");
        assert_eq!(net.subnets[0].gateway, "10.0.0.1");
    }
}
