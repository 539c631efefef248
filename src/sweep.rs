//! Self-polling unlock sweep.
//!
//! A singleton timer, started once at boot, hits the service's own
//! unlock-check endpoint on a fixed interval. There is no backoff and
//! no retry: a failed fetch is logged and ignored until the next tick.
//! The sweep itself is idempotent, so overlapping invocations (for
//! example an operator curling the endpoint while the poller runs) are
//! harmless.

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct SweepResponse {
    #[serde(default)]
    unlocked_vaults: Vec<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

pub struct UnlockPoller {
    endpoint: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl UnlockPoller {
    pub fn new(server_addr: SocketAddr, poll_interval: Duration) -> Self {
        // The server usually binds 0.0.0.0; poll over loopback.
        let host = if server_addr.ip().is_unspecified() {
            format!("127.0.0.1:{}", server_addr.port())
        } else {
            server_addr.to_string()
        };
        Self {
            endpoint: format!("http://{}/api/vaults/unlock-check", host),
            poll_interval,
            client: reqwest::Client::new(),
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        info!(
            "Unlock poller started: {} every {:?}",
            self.endpoint, self.poll_interval
        );
        let mut ticker = interval(self.poll_interval);
        // The first tick completes immediately; skip it so the server
        // has bound its listener before the first check.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = self.check_once().await {
                error!("Unlock check failed: {:#}", err);
            }
        }
    }

    async fn check_once(&self) -> Result<()> {
        let response = self.client.get(&self.endpoint).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("unlock check returned {}", response.status());
        }
        let body: SweepResponse = response.json().await?;
        if !body.unlocked_vaults.is_empty() {
            info!("Found {} newly unlocked vaults", body.unlocked_vaults.len());
            if let Some(message) = body.message {
                debug!("{}", message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_bind_polls_loopback() {
        let poller = UnlockPoller::new("0.0.0.0:3000".parse().unwrap(), Duration::from_secs(30));
        assert_eq!(
            poller.endpoint,
            "http://127.0.0.1:3000/api/vaults/unlock-check"
        );
    }

    #[test]
    fn test_concrete_bind_is_polled_directly() {
        let poller =
            UnlockPoller::new("192.168.1.5:8080".parse().unwrap(), Duration::from_secs(30));
        assert_eq!(
            poller.endpoint,
            "http://192.168.1.5:8080/api/vaults/unlock-check"
        );
    }

    #[test]
    fn test_sweep_response_tolerates_missing_fields() {
        let body: SweepResponse = serde_json::from_str(r#"{"unlocked_vaults": []}"#).unwrap();
        assert!(body.unlocked_vaults.is_empty());
        assert!(body.message.is_none());
    }
}
