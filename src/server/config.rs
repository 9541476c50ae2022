//! Distributor configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::delivery::SlowConsumerPolicy;
use crate::error::ConfigError;
use crate::protocol::constants::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default listening port
pub const DEFAULT_PORT: u16 = 9775;

/// Default capacity of the shared event queue and of each write queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 8096;

/// Distributor configuration options
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Capacity of the shared event queue
    pub event_queue_capacity: usize,

    /// Capacity of each interactor's write queue
    pub write_queue_capacity: usize,

    /// Heartbeat period on the admin feed (zero disables)
    pub heartbeat_interval: Duration,

    /// Behaviour when a recipient's write queue is full
    pub slow_consumer_policy: SlowConsumerPolicy,

    /// Disconnect recipients that time out or overflow
    pub disconnect_slow_consumers: bool,

    /// Largest payload accepted from a client
    pub max_payload_size: usize,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,

    /// Stats logging period (zero disables)
    pub stats_interval: Duration,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            event_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            write_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_interval: Duration::from_millis(1000),
            slow_consumer_policy: SlowConsumerPolicy::default(),
            disconnect_slow_consumers: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            tcp_nodelay: true,
            stats_interval: Duration::from_secs(60),
        }
    }
}

impl DistributorConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Defaults overlaid with `FEEDBUS_*` environment variables
    ///
    /// | Variable | Value |
    /// |---|---|
    /// | `FEEDBUS_HOST` | IP address to bind |
    /// | `FEEDBUS_PORT` | port to bind |
    /// | `FEEDBUS_EVENT_QUEUE_CAPACITY` | shared event queue capacity |
    /// | `FEEDBUS_WRITE_QUEUE_CAPACITY` | per-interactor write queue capacity |
    /// | `FEEDBUS_HEARTBEAT_INTERVAL` | milliseconds, 0 disables |
    /// | `FEEDBUS_SLOW_CONSUMER` | `block`, `timeout` or `drop` |
    /// | `FEEDBUS_SLOW_CONSUMER_TIMEOUT` | milliseconds, for `timeout` |
    /// | `FEEDBUS_KEEP_SLOW_CONSUMERS` | `true` or `false` |
    /// | `FEEDBUS_STATS_INTERVAL` | seconds, 0 disables |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed like [`from_env`](Self::from_env)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("FEEDBUS_HOST") {
            config.bind_addr.set_ip(parse("FEEDBUS_HOST", &host)?);
        }
        if let Some(port) = lookup("FEEDBUS_PORT") {
            config.bind_addr.set_port(parse("FEEDBUS_PORT", &port)?);
        }
        if let Some(value) = lookup("FEEDBUS_EVENT_QUEUE_CAPACITY") {
            config.event_queue_capacity = parse("FEEDBUS_EVENT_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("FEEDBUS_WRITE_QUEUE_CAPACITY") {
            config.write_queue_capacity = parse("FEEDBUS_WRITE_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("FEEDBUS_HEARTBEAT_INTERVAL") {
            let millis: u64 = parse("FEEDBUS_HEARTBEAT_INTERVAL", &value)?;
            config.heartbeat_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup("FEEDBUS_SLOW_CONSUMER") {
            let mode = value.trim().to_ascii_lowercase();
            let policy = match mode.as_str() {
                "block" => SlowConsumerPolicy::Block,
                "drop" => SlowConsumerPolicy::Drop,
                "timeout" => SlowConsumerPolicy::default(),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "FEEDBUS_SLOW_CONSUMER".to_owned(),
                        value,
                    })
                }
            };
            config.slow_consumer_policy = policy;
        }
        if let Some(value) = lookup("FEEDBUS_SLOW_CONSUMER_TIMEOUT") {
            let millis: u64 = parse("FEEDBUS_SLOW_CONSUMER_TIMEOUT", &value)?;
            config = config.slow_consumer_timeout(Duration::from_millis(millis));
        }
        if let Some(value) = lookup("FEEDBUS_KEEP_SLOW_CONSUMERS") {
            let keep: bool = parse("FEEDBUS_KEEP_SLOW_CONSUMERS", &value)?;
            config.disconnect_slow_consumers = !keep;
        }
        if let Some(value) = lookup("FEEDBUS_STATS_INTERVAL") {
            let secs: u64 = parse("FEEDBUS_STATS_INTERVAL", &value)?;
            config.stats_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the distributor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("event_queue_capacity"));
        }
        if self.write_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("write_queue_capacity"));
        }
        Ok(())
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity;
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Disable heartbeats
    pub fn disable_heartbeat(mut self) -> Self {
        self.heartbeat_interval = Duration::ZERO;
        self
    }

    pub fn slow_consumer_policy(mut self, policy: SlowConsumerPolicy) -> Self {
        self.slow_consumer_policy = policy;
        self
    }

    /// Change the wait limit of the timeout policy
    ///
    /// Has no effect under the block or drop policies.
    pub fn slow_consumer_timeout(mut self, timeout: Duration) -> Self {
        if let SlowConsumerPolicy::Timeout(_) = self.slow_consumer_policy {
            self.slow_consumer_policy = SlowConsumerPolicy::Timeout(timeout);
        }
        self
    }

    /// Keep slow consumers connected, only dropping their messages
    pub fn keep_slow_consumers(mut self) -> Self {
        self.disconnect_slow_consumers = false;
        self
    }

    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
