//! Latency probing over TCP connects.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use chrono::Utc;
use tokio::net::TcpStream;

use super::resolver::DEFAULT_RESOLVER;
use crate::aggregate::ResolveContext;
use crate::config::ToolboxConfig;
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::PerformanceMetrics;

/// Summary statistics over the successful probes of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// Mean absolute difference between consecutive samples.
    pub jitter: f64,
    pub loss_percent: f64,
}

impl LatencyStats {
    /// `samples` are round trips in milliseconds; `attempts` counts every
    /// probe, successful or not.
    pub fn from_samples(samples: &[f64], attempts: u32) -> Self {
        let loss_percent = if attempts == 0 {
            100.0
        } else {
            let lost = f64::from(attempts) - to_f64(samples.len());
            (lost / f64::from(attempts) * 100.0).max(0.0)
        };

        if samples.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                avg: 0.0,
                stddev: 0.0,
                jitter: 0.0,
                loss_percent,
            };
        }

        let n = to_f64(samples.len());
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;
        let jitter = if samples.len() < 2 {
            0.0
        } else {
            samples
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).abs())
                .sum::<f64>()
                / (n - 1.0)
        };

        Self {
            min,
            max,
            avg,
            stddev: variance.sqrt(),
            jitter,
            loss_percent,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(n: usize) -> f64 {
    n as f64
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Probe `target` (already validated host name or IP).
///
/// Resolution failure is reported in the metrics (`dns_resolution_ms = -1`,
/// 100% loss) rather than as an error; only interruption of `ctx` fails.
pub async fn analyze_performance(
    target: &str,
    config: &ToolboxConfig,
    ctx: &ResolveContext,
) -> ToolboxResult<PerformanceMetrics> {
    let (address, dns_resolution_ms) = match target.parse::<IpAddr>() {
        Ok(ip) => (Some(ip), 0.0),
        Err(_) => {
            let start = Instant::now();
            let lookup = ctx
                .guard(async {
                    DEFAULT_RESOLVER
                        .lookup_ip(target)
                        .await
                        .map_err(|e| ToolboxError::NetworkError(e.to_string()))
                })
                .await;
            match lookup {
                Ok(ips) => (ips.iter().next(), elapsed_ms(start)),
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    log::debug!("Resolution of {target} failed: {e}");
                    (None, -1.0)
                }
            }
        }
    };

    let mut samples = Vec::new();
    if let Some(ip) = address {
        let socket = SocketAddr::new(ip, config.probe_port);
        for _ in 0..config.probe_count {
            let start = Instant::now();
            let probe = tokio::time::timeout(config.probe_timeout(), TcpStream::connect(socket));
            match ctx.guard(async { Ok(probe.await) }).await? {
                Ok(Ok(_stream)) => samples.push(elapsed_ms(start)),
                Ok(Err(e)) => log::debug!("Probe to {socket} failed: {e}"),
                Err(_) => log::debug!("Probe to {socket} timed out"),
            }
        }
    }

    let stats = LatencyStats::from_samples(&samples, config.probe_count);
    Ok(PerformanceMetrics {
        target: target.to_string(),
        address: address.map(|ip| ip.to_string()),
        ping_min_ms: stats.min,
        ping_max_ms: stats.max,
        ping_avg_ms: stats.avg,
        ping_stddev_ms: stats.stddev,
        packet_loss_percent: stats.loss_percent,
        jitter_ms: stats.jitter,
        dns_resolution_ms,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_stats_basic() {
        let stats = LatencyStats::from_samples(&[10.0, 20.0, 30.0, 20.0], 5);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert!(approx(stats.avg, 20.0));
        // variance = (100 + 0 + 100 + 0) / 4 = 50
        assert!(approx(stats.stddev, 50.0_f64.sqrt()));
        // |10| + |10| + |10| over 3 gaps
        assert!(approx(stats.jitter, 10.0));
        assert!(approx(stats.loss_percent, 20.0));
    }

    #[test]
    fn test_stats_single_sample_has_no_jitter() {
        let stats = LatencyStats::from_samples(&[12.5], 1);
        assert_eq!(stats.min, 12.5);
        assert_eq!(stats.max, 12.5);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.jitter, 0.0);
        assert_eq!(stats.loss_percent, 0.0);
    }

    #[test]
    fn test_stats_total_loss() {
        let stats = LatencyStats::from_samples(&[], 10);
        assert_eq!(stats.avg, 0.0);
        assert_eq!(stats.loss_percent, 100.0);
    }

    #[test]
    fn test_stats_zero_attempts() {
        assert_eq!(LatencyStats::from_samples(&[], 0).loss_percent, 100.0);
    }

    #[tokio::test]
    async fn test_local_listener_probes_succeed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((_socket, _)) = listener.accept().await {}
        });

        let config = ToolboxConfig {
            probe_count: 3,
            probe_port: port,
            ..ToolboxConfig::default()
        };
        let metrics = analyze_performance("127.0.0.1", &config, &ResolveContext::new())
            .await
            .unwrap();
        assert_eq!(metrics.address.as_deref(), Some("127.0.0.1"));
        assert_eq!(metrics.dns_resolution_ms, 0.0);
        assert_eq!(metrics.packet_loss_percent, 0.0);
        assert!(metrics.ping_min_ms <= metrics.ping_max_ms);
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_probe() {
        let ctx = ResolveContext::new();
        ctx.cancel();
        let config = ToolboxConfig {
            probe_count: 1,
            ..ToolboxConfig::default()
        };
        let result = analyze_performance("127.0.0.1", &config, &ctx).await;
        assert_eq!(result.unwrap_err(), ToolboxError::Cancelled);
    }
}
