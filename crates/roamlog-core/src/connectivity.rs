//! Network reachability probing.
//!
//! The oracle never fails: any probe error reads as offline, since
//! falsely reporting online risks failed remote writes while falsely
//! reporting offline only delays sync.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Reports current network reachability on demand.
pub trait Connectivity {
    async fn is_online(&self) -> bool;
}

/// Probes reachability with a bounded-timeout TCP connect.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Derive a probe target from an `http(s)://host[:port]` base URL.
    pub fn from_base_url(base_url: &str) -> Option<Self> {
        let (default_port, rest) = if let Some(rest) = base_url.strip_prefix("https://") {
            (443, rest)
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            (80, rest)
        } else {
            return None;
        };

        let authority = rest.split('/').next()?;
        if authority.is_empty() {
            return None;
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().ok()?;
                Some(Self::new(host, port))
            }
            None => Some(Self::new(authority, default_port)),
        }
    }
}

impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        let address = format!("{}:{}", self.host, self.port);

        // Resolve then connect, both under the probe deadline.
        let connect = async {
            let addrs: Vec<SocketAddr> = match tokio::net::lookup_host(&address).await {
                Ok(addrs) => addrs.collect(),
                Err(_) => return false,
            };
            for addr in addrs {
                if TcpStream::connect(addr).await.is_ok() {
                    return true;
                }
            }
            false
        };

        tokio::time::timeout(self.timeout, connect)
            .await
            .unwrap_or(false)
    }
}

/// Host-controlled reachability switch.
///
/// Hosts flip this on platform connectivity events; tests use it to
/// simulate going offline and back.
#[derive(Debug, Clone, Default)]
pub struct ManualConnectivity {
    online: Arc<AtomicBool>,
}

impl ManualConnectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for ManualConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
