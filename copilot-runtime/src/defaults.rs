use copilot_core::config::{ClientConfig, DEFAULT_ENDPOINT};

pub fn default_client_config() -> ClientConfig {
    ClientConfig::with_endpoint(DEFAULT_ENDPOINT)
}

/// Picks the endpoint by precedence: explicit override, then config file, then default.
///
/// Blank overrides are ignored.
pub fn resolve_client_config(
    endpoint_override: Option<&str>,
    from_file: Option<ClientConfig>,
) -> ClientConfig {
    let endpoint_override = endpoint_override
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (endpoint_override, from_file) {
        (Some(endpoint), _) => ClientConfig::with_endpoint(endpoint),
        (None, Some(cfg)) => cfg,
        (None, None) => default_client_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_file() {
        let cfg = resolve_client_config(
            Some("wss://prod.example.com/ws/assistant"),
            Some(ClientConfig::with_endpoint("ws://file/ws")),
        );
        assert_eq!(cfg.endpoint, "wss://prod.example.com/ws/assistant");
    }

    #[test]
    fn file_wins_over_default() {
        let cfg = resolve_client_config(None, Some(ClientConfig::with_endpoint("ws://file/ws")));
        assert_eq!(cfg.endpoint, "ws://file/ws");
    }

    #[test]
    fn blank_override_falls_through() {
        let cfg = resolve_client_config(Some("   "), None);
        assert_eq!(cfg, default_client_config());
        assert_eq!(cfg.endpoint, "ws://localhost:8080/ws/assistant");
    }
}
