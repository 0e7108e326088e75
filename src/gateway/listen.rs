//! Usage: Bind address helpers.

pub(crate) fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::")
}

pub(crate) fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// URL a local operator can open; wildcard binds are reported as loopback.
pub(crate) fn local_base_url(host: &str, port: u16) -> String {
    let host = host.trim();
    let host = if is_wildcard_host(host) {
        "127.0.0.1"
    } else {
        host
    };
    format!("http://{}", format_host_port(host, port))
}
