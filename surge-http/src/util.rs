pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// `url` already omits the port when it is the scheme default.
pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> url::Url {
        url::Url::parse(s).unwrap_or_else(|e| panic!("bad url {s}: {e}"))
    }

    #[test]
    fn host_header_omits_default_ports() {
        assert_eq!(
            host_header_value(&parse("http://example.com:80/")).as_deref(),
            Some("example.com")
        );
        assert_eq!(
            host_header_value(&parse("https://example.com:443/x")).as_deref(),
            Some("example.com")
        );
        assert_eq!(
            host_header_value(&parse("http://127.0.0.1:8080/")).as_deref(),
            Some("127.0.0.1:8080")
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = vec![("Host".to_string(), "x".to_string())];
        assert!(has_header(&headers, "host"));
        assert!(!has_header(&headers, "content-length"));
    }
}
