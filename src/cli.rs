use clap::{ArgAction, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::GatewayConfig;

#[derive(Parser, Debug, Default)]
#[command(name = "nsgate")]
#[command(about = "HTTP gateway for listing and creating Kubernetes namespaces")]
#[command(version)]
pub struct Args {
    /// Enable verbose logging output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a YAML config file (default: ~/.nsgate/config.yaml if present)
    #[arg(short, long, value_name = "FILE", env = "NSGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP listener to
    #[arg(long, value_name = "ADDR", env = "NSGATE_BIND_ADDR")]
    pub bind_addr: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "NSGATE_PORT")]
    pub port: Option<u16>,

    /// Seconds before /readyz reports ready
    #[arg(long, value_name = "SECS", env = "NSGATE_WARMUP_SECS")]
    pub warmup_secs: Option<u64>,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long, value_name = "SECS", env = "NSGATE_SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: Option<u64>,

    /// Timeout for a single cluster API call, in seconds
    #[arg(long, value_name = "SECS", env = "NSGATE_GATEWAY_TIMEOUT_SECS")]
    pub gateway_timeout_secs: Option<u64>,

    /// Status for creating an existing namespace (400 or 409)
    #[arg(long, value_name = "STATUS", env = "NSGATE_CONFLICT_STATUS")]
    pub conflict_status: Option<u16>,

    /// Kubeconfig file to use instead of the default discovery
    #[arg(long, value_name = "FILE", env = "NSGATE_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Serve from an in-process cluster with the default namespaces
    #[arg(long, env = "NSGATE_IN_MEMORY")]
    pub in_memory: bool,
}

impl Args {
    /// Overlay the flags that were given on top of `config`.
    /// Pure function - no I/O.
    pub fn apply(&self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.warmup_secs {
            config.warmup_secs = secs;
        }
        if let Some(secs) = self.shutdown_grace_secs {
            config.shutdown_grace_secs = secs;
        }
        if let Some(secs) = self.gateway_timeout_secs {
            config.gateway_timeout_secs = secs;
        }
        if let Some(status) = self.conflict_status {
            config.conflict_status = status;
        }
        if let Some(path) = &self.kubeconfig {
            config.kubeconfig = Some(path.clone());
        }
        if self.in_memory {
            config.in_memory = true;
        }
        config
    }
}
