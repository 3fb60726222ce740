//! Web server command.

use crate::cli::icons::arrow;
use crate::config::Settings;

/// Port used when the bind address names only a host.
const DEFAULT_PORT: u16 = 3030;

/// Start the web server.
pub async fn cmd_serve(settings: Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or(settings.bind.as_str()).to_string();
    let (host, port) = parse_bind_address(&bind)?;

    println!(
        "{} Starting summarist at http://{}:{} (model {})",
        arrow(),
        host,
        port,
        settings.llm.model
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Bind address is empty");
    }

    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    // Bracketed IPv6, e.g. "[::1]:8080"
    if let Some(rest) = bind.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| anyhow::anyhow!("Invalid bind address: {}", bind))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("Invalid port in bind address: {}", bind))?,
            None => DEFAULT_PORT,
        };
        return Ok((host.to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        // A bare IPv6 address has several colons and no port
        if !host.contains(':') {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("Invalid port in bind address: {}", bind))?;
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_only() {
        assert_eq!(
            parse_bind_address("8080").unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
    }

    #[test]
    fn test_host_only() {
        assert_eq!(
            parse_bind_address("0.0.0.0").unwrap(),
            ("0.0.0.0".to_string(), 3030)
        );
        assert_eq!(
            parse_bind_address("localhost").unwrap(),
            ("localhost".to_string(), 3030)
        );
    }

    #[test]
    fn test_host_and_port() {
        assert_eq!(
            parse_bind_address("0.0.0.0:9000").unwrap(),
            ("0.0.0.0".to_string(), 9000)
        );
        assert_eq!(
            parse_bind_address("[::1]:8080").unwrap(),
            ("::1".to_string(), 8080)
        );
    }

    #[test]
    fn test_invalid_port() {
        assert!(parse_bind_address("localhost:http").is_err());
        assert!(parse_bind_address("").is_err());
    }
}
