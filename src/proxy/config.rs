//! Proxy gateway configuration

/// Default gateway host
pub const DEFAULT_HOST: &str = "pr.oxylabs.io";
/// Default port for HTTP egress (more reliable for browsers with auth)
pub const DEFAULT_PORT: u16 = 60000;
/// Default session time in minutes
pub const DEFAULT_SESSTIME: u16 = 10;

/// Credentials and egress parameters for the rotating proxy gateway.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProxyConfig {
    /// Gateway customer ID
    pub customer: String,
    /// Gateway password
    pub password: String,
    /// Gateway host
    pub host: String,
    /// Gateway port
    pub port: u16,
    /// Default country code for egress
    pub country: String,
    /// Session time in minutes (how long one sessid keeps its IP)
    pub sesstime: u16,
    /// Proxy scheme (http, https, socks5, socks5h)
    pub scheme: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let scheme = std::env::var("PROXY_SCHEME").unwrap_or_else(|_| "http".to_string());

        Self {
            customer: String::new(),
            password: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            country: "us".to_string(),
            sesstime: DEFAULT_SESSTIME,
            scheme,
        }
    }
}

impl ProxyConfig {
    /// Create a new proxy configuration
    pub fn new(customer: &str, password: &str) -> Self {
        Self {
            customer: customer.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Set the default country code
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_lowercase();
        self
    }

    /// Set the session time in minutes
    pub fn with_sesstime(mut self, minutes: u16) -> Self {
        self.sesstime = minutes;
        self
    }

    /// Set the proxy scheme
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_lowercase();
        self
    }

    /// Check if the gateway is configured
    pub fn is_configured(&self) -> bool {
        !self.customer.is_empty() && !self.password.is_empty()
    }
}
