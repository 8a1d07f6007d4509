use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

pub const DEFAULT_PORT: u16 = 1127;

/// Command line of the adapter server.
#[derive(Debug, Parser)]
#[command(name = "gridflow", version, about = "JSON load flow adapter over HTTP")]
pub struct Cli {
    /// Bind to localhost only and log at debug level.
    #[arg(short, long)]
    pub debug: bool,

    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub debug: bool,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        let host = if cli.debug {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        ServerConfig {
            host,
            port: cli.port,
            debug: cli.debug,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
