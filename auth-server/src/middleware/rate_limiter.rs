// auth-server/src/middleware/rate_limiter.rs
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse, ResponseError,
};
use common::ErrorBody;
use dashmap::DashMap;
use futures_util::future::{ready, LocalBoxFuture, Ready};

// Challenge issuance and token minting write to the nonce/device stores,
// which makes them the abuse surface worth throttling
const DEFAULT_REQUESTS_PER_WINDOW: usize = 10;
const WINDOW_SECONDS: u64 = 60;

#[derive(Debug)]
struct RateLimitExceeded;

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "too many authentication requests, slow down")
    }
}

impl ResponseError for RateLimitExceeded {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, WINDOW_SECONDS.to_string()))
            .json(ErrorBody {
                error: self.to_string(),
                code: "resource-exhausted".to_string(),
            })
    }
}

/// Per-IP sliding-window limiter for the guarded paths
#[derive(Clone, Default)]
pub struct RateLimiter {
    paths: Vec<String>,
    budget: usize,
    hits: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            budget: DEFAULT_REQUESTS_PER_WINDOW,
            hits: Arc::new(DashMap::new()),
        }
    }

    pub fn with_budget(mut self, requests_per_window: usize) -> Self {
        self.budget = requests_per_window;
        self
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(WINDOW_SECONDS);

        let mut entry = self.hits.entry(ip.to_string()).or_default();
        entry.retain(|hit| now.duration_since(*hit) < window);

        if entry.len() >= self.budget {
            true
        } else {
            entry.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path();
        let guarded = self.limiter.paths.iter().any(|p| path.starts_with(p));

        if guarded {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP {} on {}", ip, path);
                return Box::pin(async { Err(RateLimitExceeded.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_kicks_in_after_allowance() {
        let limiter = RateLimiter::new(vec!["/api/auth/message".to_string()]).with_budget(3);

        for _ in 0..3 {
            assert!(!limiter.is_rate_limited("10.0.0.1"));
        }
        assert!(limiter.is_rate_limited("10.0.0.1"));

        // Other clients are unaffected
        assert!(!limiter.is_rate_limited("10.0.0.2"));
    }
}
