use std::time::Duration;

use crate::repo::NodeConfig;

/// Convinient wrapper to build a pkarr client from the node config.
/// Usage: `let pkarr_client = PkarrClientBuilder::from(&config).build()?;`.
#[derive(Debug, Clone, Default)]
pub struct PkarrClientBuilder {
    bootstrap_nodes: Option<Vec<String>>,
    request_timeout: Option<Duration>,
    no_relays: bool,
}

impl PkarrClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// DHT bootstrap nodes as `host:port`.
    pub fn bootstrap_nodes(&mut self, bootstrap_nodes: Vec<String>) -> &mut Self {
        self.bootstrap_nodes = Some(bootstrap_nodes);
        self
    }

    pub fn request_timeout(&mut self, request_timeout: Duration) -> &mut Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    /// Only talk to the DHT directly.
    pub fn no_relays(&mut self) -> &mut Self {
        self.no_relays = true;
        self
    }

    /// Get the pkarr client builder.
    pub fn build_builder(self) -> pkarr::ClientBuilder {
        let mut builder = pkarr::ClientBuilder::default();
        if let Some(bootstrap_nodes) = &self.bootstrap_nodes {
            builder.bootstrap(bootstrap_nodes);
        }
        if let Some(request_timeout) = self.request_timeout {
            builder.request_timeout(request_timeout);
        }
        if self.no_relays {
            builder.no_relays();
        }
        builder
    }

    /// Build the pkarr client.
    pub fn build(self) -> Result<pkarr::Client, pkarr::errors::BuildError> {
        self.build_builder().build()
    }
}

impl From<&NodeConfig> for PkarrClientBuilder {
    fn from(config: &NodeConfig) -> Self {
        let mut builder = PkarrClientBuilder::new();
        // Only addresses that name a host and a udp port can bootstrap the DHT.
        let nodes: Vec<String> = config
            .bootstrap
            .parsed_peers()
            .iter()
            .filter_map(|addr| addr.udp_host_port())
            .collect();
        if !nodes.is_empty() {
            builder.bootstrap_nodes(nodes);
        }
        if let Some(timeout_ms) = config.pkdns.dht_request_timeout_ms {
            builder.request_timeout(Duration::from_millis(timeout_ms.get()));
        }
        if !config.pkdns.dht_relays_enabled {
            builder.no_relays();
        }
        builder
    }
}
