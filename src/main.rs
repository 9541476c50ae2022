//! Feedbus distributor binary

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use feedbus_distributor::{DistributorConfig, DistributorServer, SlowConsumerPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SlowConsumerMode {
    /// Wait for queue space
    Block,
    /// Wait up to --slow-consumer-timeout
    Timeout,
    /// Drop immediately
    Drop,
}

/// Command line overrides, applied on top of the `FEEDBUS_*` environment
#[derive(Parser, Debug)]
#[command(author, version, about = "Feed/topic publish-subscribe distributor", long_about = None)]
struct Args {
    /// Address to listen on [default: 0.0.0.0]
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on [default: 9775]
    #[arg(short, long)]
    port: Option<u16>,

    /// Capacity of the shared event queue [default: 8096]
    #[arg(long)]
    event_queue_capacity: Option<usize>,

    /// Capacity of each client's write queue [default: 8096]
    #[arg(long)]
    write_queue_capacity: Option<usize>,

    /// Heartbeat interval in milliseconds, 0 disables [default: 1000]
    #[arg(long)]
    heartbeat_interval: Option<u64>,

    /// What to do when a client's write queue is full [default: timeout]
    #[arg(long, value_enum)]
    slow_consumer: Option<SlowConsumerMode>,

    /// Wait limit in milliseconds for the timeout policy [default: 5000]
    #[arg(long)]
    slow_consumer_timeout: Option<u64>,

    /// Keep slow consumers connected instead of disconnecting them
    #[arg(long)]
    keep_slow_consumers: bool,

    /// Stats logging interval in seconds, 0 disables [default: 60]
    #[arg(long)]
    stats_interval: Option<u64>,
}

impl Args {
    fn apply(self, mut config: DistributorConfig) -> DistributorConfig {
        if let Some(host) = self.host {
            config.bind_addr.set_ip(host);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(capacity) = self.event_queue_capacity {
            config = config.event_queue_capacity(capacity);
        }
        if let Some(capacity) = self.write_queue_capacity {
            config = config.write_queue_capacity(capacity);
        }
        if let Some(millis) = self.heartbeat_interval {
            config = config.heartbeat_interval(Duration::from_millis(millis));
        }
        if let Some(mode) = self.slow_consumer {
            let policy = match (mode, config.slow_consumer_policy) {
                (SlowConsumerMode::Block, _) => SlowConsumerPolicy::Block,
                (SlowConsumerMode::Drop, _) => SlowConsumerPolicy::Drop,
                (SlowConsumerMode::Timeout, current @ SlowConsumerPolicy::Timeout(_)) => current,
                (SlowConsumerMode::Timeout, _) => SlowConsumerPolicy::default(),
            };
            config = config.slow_consumer_policy(policy);
        }
        if let Some(millis) = self.slow_consumer_timeout {
            config = config.slow_consumer_timeout(Duration::from_millis(millis));
        }
        if self.keep_slow_consumers {
            config = config.keep_slow_consumers();
        }
        if let Some(secs) = self.stats_interval {
            config = config.stats_interval(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.apply(DistributorConfig::from_env().context("invalid FEEDBUS_* environment")?);

    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: DistributorConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let bind_addr = config.bind_addr;
    let server = DistributorServer::bind(config)
        .await
        .with_context(|| format!("start distributor on {bind_addr}"))?;

    tracing::info!(
        addr = %server.local_addr(),
        heartbeat_ms = server.config().heartbeat_interval.as_millis() as u64,
        slow_consumer = ?server.config().slow_consumer_policy,
        "Distributor started"
    );

    server.run_until(shutdown).await.context("distributor failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_keeps_config() {
        let config = Args::parse_from(["feedbus-distributor"]).apply(DistributorConfig::default());
        assert_eq!(config.bind_addr.port(), 9775);
        assert_eq!(config.event_queue_capacity, 8096);
        assert_eq!(
            config.slow_consumer_policy,
            SlowConsumerPolicy::Timeout(Duration::from_secs(5))
        );
        assert!(config.disconnect_slow_consumers);
    }

    #[test]
    fn test_args_override() {
        let config = Args::parse_from([
            "feedbus-distributor",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--heartbeat-interval",
            "0",
            "--slow-consumer",
            "drop",
            "--keep-slow-consumers",
        ])
        .apply(DistributorConfig::default());

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert!(config.heartbeat_interval.is_zero());
        assert_eq!(config.slow_consumer_policy, SlowConsumerPolicy::Drop);
        assert!(!config.disconnect_slow_consumers);
    }

    #[test]
    fn test_args_layer_over_environment() {
        let env = DistributorConfig::from_lookup(|key| match key {
            "FEEDBUS_PORT" => Some("9100".to_owned()),
            "FEEDBUS_WRITE_QUEUE_CAPACITY" => Some("32".to_owned()),
            "FEEDBUS_SLOW_CONSUMER_TIMEOUT" => Some("250".to_owned()),
            _ => None,
        })
        .unwrap();

        let config = Args::parse_from(["feedbus-distributor", "--port", "9200", "--slow-consumer", "timeout"])
            .apply(env);

        assert_eq!(config.bind_addr.port(), 9200);
        assert_eq!(config.write_queue_capacity, 32);
        assert_eq!(
            config.slow_consumer_policy,
            SlowConsumerPolicy::Timeout(Duration::from_millis(250))
        );
    }

    #[tokio::test]
    async fn test_zero_capacity_fails_to_start() {
        let config = DistributorConfig::with_addr("127.0.0.1:0".parse().unwrap()).event_queue_capacity(0);
        assert!(run_with_shutdown(config, async {}).await.is_err());
    }
}
