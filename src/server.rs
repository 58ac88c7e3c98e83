//! DNS listener setup and lifecycle management.

use hickory_server::ServerFuture;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::GslbError;
use crate::resolver::GslbHandler;
use crate::state::ServerContext;

/// Idle timeout for TCP connections.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// The DNS server: one UDP socket and one TCP listener per address.
pub struct GslbServer {
    ctx: Arc<ServerContext>,
    listen: Vec<SocketAddr>,
}

impl GslbServer {
    /// Server answering from the given context on the given addresses.
    pub fn new(ctx: Arc<ServerContext>, listen: Vec<SocketAddr>) -> Self {
        Self { ctx, listen }
    }

    /// Run until the shutdown token fires, then drain gracefully.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), GslbError> {
        let handler = GslbHandler::new(self.ctx);
        let mut server = ServerFuture::new(handler);

        for addr in &self.listen {
            let udp = UdpSocket::bind(addr).await?;
            info!(%addr, "DNS UDP listening");
            server.register_socket(udp);

            let tcp = TcpListener::bind(addr).await?;
            info!(%addr, "DNS TCP listening");
            server.register_listener(tcp, TCP_TIMEOUT);
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(err) = result {
                    error!(%err, "DNS server error");
                }
                return Ok(());
            }
        }

        let _ = server.shutdown_gracefully().await;
        info!("DNS server stopped");
        Ok(())
    }
}

/// Parse the comma-separated listener list, applying the default port.
///
/// Accepts bare addresses (`10.0.0.1`), address:port pairs
/// (`10.0.0.1:5353`, `[::1]:53`) and `*` for all-interfaces.
pub fn parse_listen_addrs(interfaces: &str, default_port: u16) -> Result<Vec<SocketAddr>, GslbError> {
    let mut out = Vec::new();

    for part in interfaces.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let addr = if part == "*" {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), default_port)
        } else if let Ok(addr) = part.parse::<SocketAddr>() {
            addr
        } else if let Ok(ip) = part.parse::<IpAddr>() {
            SocketAddr::new(ip, default_port)
        } else {
            return Err(GslbError::ConfigParse(format!(
                "bad listen address '{part}'"
            )));
        };

        if !out.contains(&addr) {
            out.push(addr);
        }
    }

    if out.is_empty() {
        out.push(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            default_port,
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_addresses_get_the_default_port() {
        let addrs = parse_listen_addrs("127.0.0.1,10.0.0.1:5353", 53).unwrap();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0], "127.0.0.1:53".parse().unwrap());
        assert_eq!(addrs[1], "10.0.0.1:5353".parse().unwrap());
    }

    #[test]
    fn duplicates_collapse() {
        let addrs = parse_listen_addrs("127.0.0.1,127.0.0.1:53", 53).unwrap();
        assert_eq!(addrs.len(), 1);
    }

    #[test]
    fn wildcard_and_empty_default_to_all_interfaces() {
        let addrs = parse_listen_addrs("*", 53).unwrap();
        assert_eq!(addrs[0], "0.0.0.0:53".parse().unwrap());
        let addrs = parse_listen_addrs("", 5300).unwrap();
        assert_eq!(addrs[0], "0.0.0.0:5300".parse().unwrap());
    }

    #[test]
    fn ipv6_forms_parse() {
        let addrs = parse_listen_addrs("::1,[fd00::1]:5353", 53).unwrap();
        assert_eq!(addrs[0], "[::1]:53".parse().unwrap());
        assert_eq!(addrs[1], "[fd00::1]:5353".parse().unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_listen_addrs("not-an-ip", 53).is_err());
    }
}
