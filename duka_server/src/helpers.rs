use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace, warn};

/// Get the remote IP address from the request. The `X-Forwarded-For` header is preferred if
/// `use_x_forwarded_for` is set in the configuration. Otherwise, or if the header is unusable, the peer address from
/// the connection info is used.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The first entry is the original client. Proxies append themselves.
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

/// Whether a provider callback from this request may be processed. Without a whitelist, everyone is allowed.
pub fn peer_is_allowed(req: &HttpRequest, whitelist: Option<&[IpAddr]>, use_x_forwarded_for: bool) -> bool {
    let whitelist = match whitelist {
        Some(w) => w,
        None => return true,
    };
    match get_remote_ip(req, use_x_forwarded_for) {
        Some(ip) => {
            let allowed = whitelist.contains(&ip);
            if !allowed {
                warn!("📞️ Callback from {ip} is not on the whitelist. Denying access.");
            }
            allowed
        },
        None => {
            warn!("📞️ No IP address found in callback request, denying access.");
            false
        },
    }
}
