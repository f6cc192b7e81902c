//! ICMP ping probe.
//!
//! Measures ICMP echo latency to a target host.

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::time::timeout;

use crate::probe::{Probe, ProbeError};

/// Default ping timeout (3 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// ICMP ping probe.
///
/// A fresh ICMP client is created per measurement, so a socket error on one
/// tick does not poison the following ones.
#[derive(Debug, Clone)]
pub struct IcmpProbe {
    host: String,
    timeout: Duration,
}

impl IcmpProbe {
    /// Create a probe for `host` (hostname or IP address).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Resolve hostname to IP address.
async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    // First, try to parse as an IP address directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    // Otherwise, resolve the hostname using tokio's DNS lookup
    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

#[async_trait::async_trait]
impl Probe for IcmpProbe {
    fn target(&self) -> &str {
        &self.host
    }

    async fn measure(&self) -> Result<Duration, ProbeError> {
        // Resolution shares the probe budget
        let ip_addr = timeout(self.timeout, resolve_host(&self.host))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(|source| ProbeError::Resolve {
                host: self.host.clone(),
                source,
            })?;

        // Create ICMP client based on IP version
        let client = match ip_addr {
            IpAddr::V4(_) => Client::new(&Config::default())?,
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build())?,
        };

        let mut pinger = client.pinger(ip_addr, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        match timeout(self.timeout, pinger.ping(PingSequence(0), &[])).await {
            Ok(Ok((_, rtt))) => {
                tracing::debug!(
                    host = %self.host,
                    latency_ms = rtt.as_secs_f64() * 1000.0,
                    "Ping probe successful"
                );
                Ok(rtt)
            }
            Ok(Err(e)) => Err(ProbeError::Icmp(e)),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icmp_probe_defaults() {
        let probe = IcmpProbe::new("8.8.8.8");
        assert_eq!(probe.target(), "8.8.8.8");
        assert_eq!(probe.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_icmp_probe_builder() {
        let probe = IcmpProbe::new("1.1.1.1").with_timeout(Duration::from_millis(500));
        assert_eq!(probe.timeout(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_resolve_host_ipv4() {
        let ip = resolve_host("127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[tokio::test]
    async fn test_resolve_host_ipv6() {
        let ip = resolve_host("::1").await.unwrap();
        assert_eq!(ip, IpAddr::V6(std::net::Ipv6Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_measure_unresolvable_host_is_error() {
        let probe =
            IcmpProbe::new("no-such-host.invalid").with_timeout(Duration::from_millis(500));
        assert!(probe.measure().await.is_err());
    }
}
