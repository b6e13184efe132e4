use reqwest::Url;
use std::time::Duration;

pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// `host:port` the client will dial for `url`, with the scheme's default port
/// filled in. `None` for URLs without a host (e.g. `mailto:`).
pub fn target_address(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    // IPv6 hosts already come back bracketed
    Some(format!("{}:{}", host, port))
}
