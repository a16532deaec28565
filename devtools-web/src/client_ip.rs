//! Client address extraction behind proxies and CDNs.

use std::net::IpAddr;

use actix_web::http::header::HeaderMap;
use actix_web::HttpRequest;

/// Checked in order; the first header carrying a valid IP wins.
const CLIENT_IP_HEADERS: [&str; 9] = [
    "CF-Connecting-IP",
    "True-Client-IP",
    "X-Real-IP",
    "X-Forwarded-For",
    "X-Client-IP",
    "X-Forwarded",
    "X-Cluster-Client-IP",
    "Forwarded-For",
    "Forwarded",
];

/// Best guess at the client's address: proxy headers first, then the peer.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    from_headers(req.headers())
        .or_else(|| req.peer_addr().map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
}

fn from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        first.parse().ok()
    })
}
