//! IP analysis: classification, geolocation, ISP and reverse DNS.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::Utc;
use hickory_resolver::TokioResolver;
use serde::Deserialize;

use super::dns::reverse_names;
use super::resolver::DEFAULT_RESOLVER;
use crate::aggregate::{ResolveContext, Resolver};
use crate::config::ToolboxConfig;
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    AnalysisOptions, GeoInfo, IpCategory, IpInfo, IpVersion, IspInfo, Reputation,
    ReverseDnsInfo, SecurityInfo,
};

/// Response structure from the ipinfo.io-compatible API.
#[derive(Debug, Default, Deserialize)]
struct IpinfoResponse {
    hostname: Option<String>,
    city: Option<String>,
    region: Option<String>,
    /// Two-letter country code.
    country: Option<String>,
    /// `"lat,lng"`.
    loc: Option<String>,
    /// Usually `"AS#### Provider Name"`.
    org: Option<String>,
    postal: Option<String>,
    timezone: Option<String>,
    #[serde(default)]
    bogon: bool,
}

impl IpinfoResponse {
    fn geo(&self) -> GeoInfo {
        let (latitude, longitude) = self.loc.as_deref().map_or((None, None), parse_loc);
        GeoInfo {
            country: self.country.clone(),
            country_code: self.country.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            postal: self.postal.clone(),
            latitude,
            longitude,
            timezone: self.timezone.clone(),
        }
    }

    fn isp(&self) -> IspInfo {
        isp_from(self.org.as_deref(), self.hostname.as_deref())
    }
}

/// Analyses single IP addresses; the resolver behind bulk analysis.
///
/// Cheap to clone: the HTTP client and DNS resolver are shared handles.
#[derive(Clone)]
pub struct IpAnalyzer {
    client: reqwest::Client,
    geolocation_url: String,
    resolver: TokioResolver,
    options: AnalysisOptions,
}

impl IpAnalyzer {
    pub fn new(config: &ToolboxConfig) -> ToolboxResult<Self> {
        let base = url::Url::parse(&config.geolocation_url).map_err(|e| {
            ToolboxError::ValidationError(format!(
                "Invalid geolocation URL {}: {e}",
                config.geolocation_url
            ))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ToolboxError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            geolocation_url: base.as_str().trim_end_matches('/').to_string(),
            resolver: DEFAULT_RESOLVER.clone(),
            options: AnalysisOptions::default(),
        })
    }

    /// Copy of this analyzer that only produces the requested sections.
    #[must_use]
    pub fn with_options(&self, options: AnalysisOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    /// Analyse one address.
    ///
    /// Only malformed input or an interrupted context fail the call; a failed
    /// geolocation or reverse lookup just leaves that section empty.
    pub async fn analyze(&self, ip: &str, ctx: &ResolveContext) -> ToolboxResult<IpInfo> {
        let ip = ip.trim();
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| ToolboxError::ValidationError(format!("Invalid IP address: {ip}")))?;
        let (version, category) = classify(addr);

        let geolocate = async {
            // Non-public ranges are bogons to the geolocation service.
            if !self.options.include_geolocation || category != IpCategory::Public {
                return Ok(None);
            }
            ctx.guard(self.fetch_ipinfo(ip)).await
        };
        let reverse = async {
            if !self.options.include_dns {
                return Ok(None);
            }
            ctx.guard(reverse_names(&self.resolver, addr))
                .await
                .map(Some)
        };
        let (geo, names) = tokio::join!(geolocate, reverse);

        let ipinfo = settle(geo, "Geolocation", ip)?;
        let dns = settle(names, "Reverse DNS", ip)?.map(|ptr| ReverseDnsInfo {
            hostname: ptr.first().cloned(),
            ptr,
        });

        Ok(IpInfo {
            ip: ip.to_string(),
            version,
            category,
            geolocation: ipinfo.as_ref().map(IpinfoResponse::geo),
            isp: ipinfo.as_ref().map(IpinfoResponse::isp),
            security: self
                .options
                .include_security
                .then(|| security_for(category)),
            dns,
            timestamp: Utc::now(),
        })
    }

    /// Fetch geolocation data; `None` for addresses the service calls bogons.
    async fn fetch_ipinfo(&self, ip: &str) -> ToolboxResult<Option<IpinfoResponse>> {
        let url = format!("{}/{ip}/json", self.geolocation_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolboxError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolboxError::NetworkError(format!(
                "Geolocation API returned status {}",
                status.as_u16()
            )));
        }

        let body: IpinfoResponse = response
            .json()
            .await
            .map_err(|e| ToolboxError::NetworkError(format!("Failed to parse response: {e}")))?;
        Ok((!body.bogon).then_some(body))
    }
}

#[async_trait]
impl Resolver<IpInfo> for IpAnalyzer {
    async fn resolve(&self, target: &str, ctx: &ResolveContext) -> ToolboxResult<IpInfo> {
        self.analyze(target, ctx).await
    }
}

/// Keep interruptions, downgrade enrichment failures to an empty section.
fn settle<T>(
    result: ToolboxResult<Option<T>>,
    section: &str,
    ip: &str,
) -> ToolboxResult<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_interruption() => Err(e),
        Err(e) => {
            log::debug!("{section} for {ip} unavailable: {e}");
            Ok(None)
        }
    }
}

/// Version and category of an address; IPv4-mapped IPv6 counts as IPv4.
pub(crate) fn classify(addr: IpAddr) -> (IpVersion, IpCategory) {
    let addr = addr.to_canonical();
    let version = if addr.is_ipv4() {
        IpVersion::V4
    } else {
        IpVersion::V6
    };

    let category = match addr {
        IpAddr::V4(v4) if v4.is_private() => IpCategory::Private,
        IpAddr::V6(v6) if v6.is_unique_local() => IpCategory::Private,
        a if a.is_loopback() => IpCategory::Loopback,
        a if a.is_multicast() => IpCategory::Multicast,
        IpAddr::V4(v4) if v4.is_link_local() => IpCategory::LinkLocal,
        IpAddr::V6(v6) if v6.is_unicast_link_local() => IpCategory::LinkLocal,
        _ => IpCategory::Public,
    };

    (version, category)
}

fn security_for(category: IpCategory) -> SecurityInfo {
    let (risk_score, reputation) = if category == IpCategory::Private {
        (10, Reputation::Good)
    } else {
        (0, Reputation::Neutral)
    };
    SecurityInfo {
        is_proxy: false,
        is_vpn: false,
        is_tor: false,
        is_threat: false,
        risk_score,
        reputation,
    }
}

fn parse_loc(loc: &str) -> (Option<f64>, Option<f64>) {
    match loc.split_once(',') {
        Some((lat, lng)) => (lat.trim().parse().ok(), lng.trim().parse().ok()),
        None => (None, None),
    }
}

fn isp_from(org: Option<&str>, hostname: Option<&str>) -> IspInfo {
    let mut isp = IspInfo {
        organization: org.map(str::to_string),
        ..IspInfo::default()
    };

    if let Some(org) = org.map(str::trim).filter(|o| !o.is_empty()) {
        match org.split_once(char::is_whitespace) {
            Some((asn, name)) if asn.starts_with("AS") => {
                isp.asn = Some(asn.to_string());
                isp.provider = Some(name.trim().to_string());
                isp.asn_name = isp.provider.clone();
            }
            None if org.starts_with("AS") => isp.asn = Some(org.to_string()),
            _ => isp.provider = Some(org.to_string()),
        }
    }

    if let Some(hostname) = hostname {
        let labels: Vec<&str> = hostname.trim_end_matches('.').split('.').collect();
        if labels.len() >= 2 {
            isp.domain = Some(labels[labels.len() - 2..].join("."));
        }
    }

    isp
}
