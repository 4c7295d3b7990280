// src/ratelimit.rs
//! Per-client request limiting (`RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX_REQUESTS`).
//!
//! A client may burst up to `max_requests` and then regains one request every
//! `window / max_requests`, which gives the same long-run ceiling as a fixed
//! window without the reset cliff.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use metrics::counter;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

use crate::api::AppState;
use crate::config::RateLimitConfig;
use crate::logging::anon_hash;

pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    trust_proxy: bool,
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { retry_after: Duration },
}

impl ClientRateLimiter {
    pub fn new(cfg: RateLimitConfig, trust_proxy: bool) -> Self {
        let burst = NonZeroU32::new(cfg.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = cfg.window / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            trust_proxy,
        }
    }

    pub fn check(&self, client: IpAddr) -> Decision {
        match self.limiter.check_key(&client) {
            Ok(()) => Decision::Allow,
            Err(not_until) => Decision::Deny {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Drop state for clients whose buckets are full again.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Socket peer address, or the first `X-Forwarded-For` hop when running
    /// behind a trusted proxy (or when no peer address is known).
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
        let forwarded = || {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        };
        if self.trust_proxy {
            if let Some(ip) = forwarded() {
                return ip;
            }
        }
        peer.map(|p| p.ip())
            .or_else(forwarded)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client = state.limiter.client_key(req.headers(), peer);

    match state.limiter.check(client) {
        Decision::Allow => next.run(req).await,
        Decision::Deny { retry_after } => {
            counter!("rate_limited_total").increment(1);
            warn!(
                target: "api",
                client = %anon_hash(&client.to_string()),
                path = %req.uri().path(),
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
            too_many_requests(retry_after)
        }
    }
}

fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let mut resp = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "Too many requests, please try again later."
        })),
    )
        .into_response();
    if let Ok(v) = HeaderValue::from_str(&secs.max(1).to_string()) {
        resp.headers_mut().insert(header::RETRY_AFTER, v);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> ClientRateLimiter {
        ClientRateLimiter::new(
            RateLimitConfig {
                window: Duration::from_secs(60),
                max_requests: max,
            },
            false,
        )
    }

    #[test]
    fn allows_burst_then_denies() {
        let l = limiter(3);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..3 {
            assert_eq!(l.check(ip), Decision::Allow);
        }
        match l.check(ip) {
            Decision::Deny { retry_after } => {
                assert!(retry_after <= Duration::from_secs(20), "{retry_after:?}")
            }
            Decision::Allow => panic!("fourth request should be limited"),
        }
    }

    #[test]
    fn clients_are_independent() {
        let l = limiter(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert_eq!(l.check(a), Decision::Allow);
        assert_eq!(l.check(b), Decision::Allow);
        assert!(matches!(l.check(a), Decision::Deny { .. }));
        assert_eq!(l.tracked_clients(), 2);
    }

    #[test]
    fn client_key_prefers_peer_unless_proxy_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "10.1.1.1:5555".parse().unwrap();

        let direct = limiter(1);
        assert_eq!(
            direct.client_key(&headers, Some(peer)),
            "10.1.1.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            direct.client_key(&headers, None),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );

        let proxied = ClientRateLimiter::new(
            RateLimitConfig {
                window: Duration::from_secs(60),
                max_requests: 1,
            },
            true,
        );
        assert_eq!(
            proxied.client_key(&headers, Some(peer)),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }
}
