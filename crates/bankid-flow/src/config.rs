//! Engine configuration.

use std::time::Duration;

use url::Url;

/// Construction-time configuration for the engine and transport.
///
/// An explicit value built once and passed by reference; nothing is read
/// from ambient process state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base endpoint of the provider API, e.g.
    /// `https://appapi2.test.bankid.com`.
    pub api_base_url: Url,
    /// Client certificate and key, PEM-encoded. Opaque to the engine; handed
    /// to the transport for mutual TLS.
    pub identity_pem: Option<Vec<u8>>,
    /// Provider CA root certificate, PEM-encoded.
    pub ca_pem: Option<Vec<u8>>,
    /// How long orders stay retrievable in the store.
    pub store_ttl: Duration,
    /// Delay between successive collect polls in the stream adapter.
    pub poll_interval: Duration,
}

impl Config {
    /// Orders are retrievable for 15 minutes by default.
    pub const DEFAULT_STORE_TTL: Duration = Duration::from_secs(15 * 60);
    /// The provider prescribes collecting roughly every two seconds.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Configuration with defaults and no certificate material.
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            identity_pem: None,
            ca_pem: None,
            store_ttl: Self::DEFAULT_STORE_TTL,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the client certificate and key PEM.
    pub fn identity_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.identity_pem = Some(pem.into());
        self
    }

    /// Set the provider CA root certificate PEM.
    pub fn ca_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_pem = Some(pem.into());
        self
    }

    /// Override how long orders stay retrievable.
    pub fn store_ttl(mut self, ttl: Duration) -> Self {
        self.store_ttl = ttl;
        self
    }

    /// Override the inter-poll delay.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
