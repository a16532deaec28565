//! Shared DNS resolver helpers used across service modules.

use std::net::IpAddr;
use std::sync::LazyLock;

use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};

use crate::error::{ToolboxError, ToolboxResult};

/// Shared resolver built from the host configuration.
///
/// On Unix/Windows this reads the system configuration (e.g. `/etc/resolv.conf`);
/// if that fails it falls back to Hickory's default upstream set.
pub(crate) static DEFAULT_RESOLVER: LazyLock<TokioResolver> = LazyLock::new(build_system_resolver);

/// Human-readable description of the DNS servers used by the default resolver.
pub(crate) static SYSTEM_DNS_LABEL: LazyLock<String> = LazyLock::new(|| {
    #[cfg(any(unix, target_os = "windows"))]
    {
        if let Ok((config, _opts)) = hickory_resolver::system_conf::read_system_conf() {
            let ips = dedup_ips(&config);
            if !ips.is_empty() {
                return ips.join(", ");
            }
        }
    }

    let ips = dedup_ips(&ResolverConfig::default());
    if ips.is_empty() {
        "system".to_string()
    } else {
        ips.join(", ")
    }
});

/// Deduplicate nameserver IP addresses from a resolver configuration.
pub(crate) fn dedup_ips(config: &ResolverConfig) -> Vec<String> {
    let mut ips: Vec<String> = Vec::new();
    for ns in config.name_servers() {
        let ip = ns.socket_addr.ip().to_string();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}

/// Pick the resolver for a lookup and the label describing it.
///
/// `None` or an empty string selects the shared system resolver; anything
/// else must be a nameserver IP address.
pub(crate) fn resolver_for(nameserver: Option<&str>) -> ToolboxResult<(TokioResolver, String)> {
    match nameserver.map(str::trim).filter(|ns| !ns.is_empty()) {
        None => Ok((DEFAULT_RESOLVER.clone(), SYSTEM_DNS_LABEL.clone())),
        Some(ns) => {
            let ns_ip: IpAddr = ns.parse().map_err(|_| {
                ToolboxError::ValidationError(format!("Invalid DNS server address: {ns}"))
            })?;
            Ok((build_resolver_for_ns(ns_ip), ns_ip.to_string()))
        }
    }
}

/// Build a resolver that targets a single nameserver over UDP/TCP port 53.
pub(crate) fn build_resolver_for_ns(ns_ip: IpAddr) -> TokioResolver {
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
    );
    TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(ResolverOpts::default())
        .build()
}

/// Build a resolver using the host system DNS configuration (with fallback).
fn build_system_resolver() -> TokioResolver {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match TokioResolver::builder_tokio() {
            Ok(builder) => return builder.build(),
            Err(e) => {
                log::warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {e}"
                );
            }
        }
    }

    TokioResolver::builder_with_config(
        ResolverConfig::default(),
        TokioConnectionProvider::default(),
    )
    .with_options(ResolverOpts::default())
    .build()
}
