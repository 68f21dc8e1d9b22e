//! Rate limiting middleware
//!
//! Implements rate limiting using `tower-governor`, keyed by client IP
//! (there is no authenticated principal on the ingest surface).

use axum::{extract::ConnectInfo, http::Request};
use std::net::{IpAddr, SocketAddr};
use tower_governor::{errors::GovernorError, key_extractor::KeyExtractor};

// 300 requests/minute = 1 request every 200ms
pub const API_PERIOD_MS: u64 = 200;
pub const API_BURST_SIZE: u32 = 300;

#[derive(Clone)]
pub struct UserOrIpKeyExtractor;

impl KeyExtractor for UserOrIpKeyExtractor {
    type Key = IpAddr;

    fn extract<B>(&self, req: &Request<B>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        if let Some(header) = headers.get("x-forwarded-for")
            && let Ok(val) = header.to_str()
            && let Some(client_ip) = val.split(',').next()
            && let Ok(ip) = client_ip.trim().parse::<IpAddr>()
        {
            return Ok(ip);
        }

        if let Some(header) = headers.get("x-real-ip")
            && let Ok(val) = header.to_str()
            && let Ok(ip) = val.trim().parse::<IpAddr>()
        {
            return Ok(ip);
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return Ok(addr.ip());
        }

        Err(GovernorError::UnableToExtractKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::{Service, ServiceBuilder, ServiceExt};
    use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

    #[tokio::test]
    async fn extracts_connect_info_ip_by_default() {
        let extractor = UserOrIpKeyExtractor;
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(ConnectInfo(addr));
        let key = extractor.extract(&req).unwrap();
        assert_eq!(key, addr.ip());
    }

    #[tokio::test]
    async fn prefers_forwarded_for_header() {
        let extractor = UserOrIpKeyExtractor;
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(ConnectInfo(addr));
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.195".parse().unwrap());

        let key = extractor.extract(&req).unwrap();
        assert_eq!(key, "203.0.113.195".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn enforces_burst_limit() {
        let config = GovernorConfigBuilder::default()
            .period(Duration::from_secs(1))
            .burst_size(2)
            .key_extractor(UserOrIpKeyExtractor)
            .finish()
            .unwrap();

        let mut service = ServiceBuilder::new()
            .layer(GovernorLayer::new(config))
            .service_fn(|_req: Request<Body>| async {
                Ok::<_, Infallible>(axum::response::Response::new(Body::empty()))
            });

        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();

        for _ in 0..2 {
            let mut req = Request::new(Body::empty());
            req.extensions_mut().insert(ConnectInfo(addr));
            let res = service.ready().await.unwrap().call(req).await.unwrap();
            assert_eq!(res.status(), 200);
        }

        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(ConnectInfo(addr));
        match service.ready().await.unwrap().call(req).await {
            Ok(res) => assert_eq!(res.status(), 429),
            Err(e) => panic!("expected 429 response, got error: {e:?}"),
        }
    }
}
