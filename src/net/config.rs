//! Endpoint configuration
//!
//! A single base-URL value determines both the REST and WebSocket
//! endpoints. It is derived from the serving host at startup or supplied
//! as an explicit override; no other externally significant configuration
//! exists.

use crate::types::RegisterError;
use reqwest::Url;

/// Resolved REST and WebSocket endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Create endpoints from an explicit base URL
    ///
    /// The URL must be http or https; a trailing slash is added so path
    /// joins always append.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unparseable URLs or non-HTTP
    /// schemes.
    pub fn new(base_url: &str) -> Result<Self, RegisterError> {
        let mut base = Url::parse(base_url).map_err(|e| {
            RegisterError::validation(format!("invalid base URL '{base_url}': {e}"))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(RegisterError::validation(format!(
                "unsupported scheme '{}' in base URL",
                base.scheme()
            )));
        }

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Endpoints { base })
    }

    /// Derive endpoints from the serving host name
    pub fn from_host(host: &str) -> Result<Self, RegisterError> {
        Self::new(&format!("http://{host}/api"))
    }

    /// The configured base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a REST endpoint path against the base
    pub fn rest(&self, path: &str) -> Result<Url, RegisterError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| RegisterError::validation(format!("invalid endpoint path '{path}': {e}")))
    }

    /// The WebSocket endpoint derived from the base URL
    ///
    /// http becomes ws, https becomes wss; the realtime channel lives at
    /// `/ws` on the same host.
    pub fn websocket(&self) -> Result<Url, RegisterError> {
        let mut url = self.base.clone();
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(RegisterError::validation(format!(
                    "cannot derive a websocket endpoint from scheme '{other}'"
                )))
            }
        };

        url.set_scheme(scheme)
            .map_err(|_| RegisterError::validation("cannot derive a websocket endpoint"))?;
        url.set_path("/ws");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_host_derives_api_base() {
        let endpoints = Endpoints::from_host("pos.example.local").unwrap();
        assert_eq!(endpoints.base().as_str(), "http://pos.example.local/api/");
    }

    #[test]
    fn test_rest_joins_paths() {
        let endpoints = Endpoints::new("https://pos.example.local/api").unwrap();

        let url = endpoints.rest("cajas/evidencia-fotografica").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pos.example.local/api/cajas/evidencia-fotografica"
        );

        // Leading slashes do not escape the base path
        let url = endpoints.rest("/whatsapp/enviar").unwrap();
        assert_eq!(url.as_str(), "https://pos.example.local/api/whatsapp/enviar");
    }

    #[rstest]
    #[case::http("http://pos.example.local/api", "ws://pos.example.local/ws")]
    #[case::https("https://pos.example.local/api", "wss://pos.example.local/ws")]
    fn test_websocket_swaps_scheme(#[case] base: &str, #[case] expected: &str) {
        let endpoints = Endpoints::new(base).unwrap();
        assert_eq!(endpoints.websocket().unwrap().as_str(), expected);
    }

    #[rstest]
    #[case::garbage("not a url")]
    #[case::bad_scheme("ftp://pos.example.local/api")]
    fn test_invalid_base_is_rejected(#[case] base: &str) {
        assert!(matches!(
            Endpoints::new(base),
            Err(RegisterError::Validation { .. })
        ));
    }
}
