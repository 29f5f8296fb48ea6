use std::net::{AddrParseError, SocketAddr};
use std::num::ParseIntError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Reads the listen address from HOST and PORT, defaulting to `127.0.0.1:3000`.
pub fn get_bind_addr() -> Result<SocketAddr, HostPortError> {
    let host = std::env::var("HOST").ok();
    let port = std::env::var("PORT").ok();
    bind_addr(host.as_deref(), port.as_deref())
}

fn bind_addr(host: Option<&str>, port: Option<&str>) -> Result<SocketAddr, HostPortError> {
    let host = host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or(DEFAULT_HOST);
    let port = match port.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.parse::<u16>()?,
        None => DEFAULT_PORT,
    };
    Ok(format!("{}:{}", host, port).parse::<SocketAddr>()?)
}

#[derive(Debug, thiserror::Error)]
pub enum HostPortError {
    #[error("Invalid port: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Invalid hostname: {0}")]
    InvalidHostname(#[from] AddrParseError),
}
