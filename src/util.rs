use std::net::{Ipv4Addr, SocketAddr};

const PORT: &str = "PORT";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_port() -> Option<String> {
    std::env::var(PORT).ok()
}

/// Address of the health endpoint
///
/// An explicit listen address wins, otherwise `PORT` selects a port on all
/// interfaces. Without either no endpoint is served.
pub fn get_listen_addr(listen: Option<SocketAddr>) -> Option<SocketAddr> {
    listen_addr_from(listen, get_port())
}

/// Parse `host:port`, or `:port` for all interfaces
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix(':') {
        Some(port) => port
            .parse::<u16>()
            .map(|port| SocketAddr::from((DEFAULT_ADDR, port)))
            .map_err(|e| e.to_string()),
        None => value.parse::<SocketAddr>().map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| format!("invalid listen address {value:?}: {e}"))
}

fn listen_addr_from(listen: Option<SocketAddr>, port: Option<String>) -> Option<SocketAddr> {
    listen.or_else(|| {
        port.and_then(|port| port.parse::<u16>().ok())
            .map(|port| SocketAddr::from((DEFAULT_ADDR, port)))
    })
}
