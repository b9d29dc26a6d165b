//! HTTP prober

use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant};

use super::Probe;
use crate::config::{Defaults, TargetConfig};
use crate::data::Observation;

/// Fetches a target's URL and records timing, status and a body excerpt
///
/// Time to first byte is taken when the response headers arrive; total
/// duration once the body has been read to the end.
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpProber {
    pub fn new(defaults: &Defaults) -> Result<Self, reqwest::Error> {
        let redirects = if defaults.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .user_agent(defaults.user_agent.clone())
            .timeout(defaults.timeout)
            .connect_timeout(defaults.timeout)
            .redirect(redirects)
            .gzip(defaults.compressed)
            .build()?;

        Ok(Self {
            client,
            timeout: defaults.timeout,
            max_body_bytes: defaults.max_body_bytes,
        })
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Timeout after {}s", self.timeout.as_secs_f64())
        } else if err.is_connect() {
            format!("Connection failed: {}", err)
        } else if err.is_redirect() {
            format!("Redirect error: {}", err)
        } else {
            format!("Request failed: {}", err)
        }
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, target: &TargetConfig) -> Observation {
        let timestamp = Utc::now();
        let started = Instant::now();

        let mut response = match self.client.get(&target.url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(target_id = %target.id, error = %e, "Probe request failed");
                return Observation::failed(target.id.clone(), timestamp, self.describe(&e));
            }
        };
        let ttfb = started.elapsed();
        let status = response.status().as_u16();

        let mut excerpt = Vec::new();
        let mut size: u64 = 0;
        let mut read_error = None;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    size += chunk.len() as u64;
                    let room = self.max_body_bytes.saturating_sub(excerpt.len());
                    excerpt.extend_from_slice(&chunk[..room.min(chunk.len())]);
                }
                Ok(None) => break,
                Err(e) => {
                    read_error = Some(self.describe(&e));
                    break;
                }
            }
        }
        let total = started.elapsed();

        let body = String::from_utf8_lossy(&excerpt).into_owned();
        let observation = Observation::new(target.id.clone(), timestamp)
            .with_status(status)
            .with_timing(ttfb, total)
            .with_body(body, size);

        match read_error {
            Some(err) => observation.with_error(err),
            None => observation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TargetId;
    use axum::{response::Redirect, routing::get, Router};
    use std::net::SocketAddr;

    async fn spawn_site() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { "<html><title>Shop</title></html>" }))
            .route("/big", get(|| async { "x".repeat(4096) }))
            .route("/moved", get(|| async { Redirect::temporary("/ok") }))
            .route(
                "/hang",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn target(addr: SocketAddr, path: &str) -> TargetConfig {
        TargetConfig::new(
            "local",
            path.trim_start_matches('/'),
            format!("http://{}{}", addr, path),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_probe_success() {
        let addr = spawn_site().await;
        let prober = HttpProber::new(&Defaults::default()).unwrap();

        let obs = prober.probe(&target(addr, "/ok")).await;
        assert_eq!(obs.http_status, Some(200));
        assert!(obs.error.is_none());
        assert!(obs.body_excerpt.as_deref().unwrap().contains("<title>Shop"));
        assert!(obs.time_to_first_byte.unwrap() <= obs.total_duration.unwrap());
        assert_eq!(obs.target, TargetId::new("local", "ok"));
    }

    #[tokio::test]
    async fn test_body_truncated_size_counted() {
        let addr = spawn_site().await;
        let defaults = Defaults {
            max_body_bytes: 100,
            ..Defaults::default()
        };
        let prober = HttpProber::new(&defaults).unwrap();

        let obs = prober.probe(&target(addr, "/big")).await;
        assert_eq!(obs.size, Some(4096));
        assert_eq!(obs.body_excerpt.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_redirect_policy() {
        let addr = spawn_site().await;

        let follow = HttpProber::new(&Defaults::default()).unwrap();
        assert_eq!(follow.probe(&target(addr, "/moved")).await.http_status, Some(200));

        let defaults = Defaults {
            follow_redirects: false,
            ..Defaults::default()
        };
        let stay = HttpProber::new(&defaults).unwrap();
        assert_eq!(stay.probe(&target(addr, "/moved")).await.http_status, Some(307));
    }

    #[tokio::test]
    async fn test_timeout_recorded_as_error() {
        let addr = spawn_site().await;
        let defaults = Defaults {
            timeout: Duration::from_millis(200),
            ..Defaults::default()
        };
        let prober = HttpProber::new(&defaults).unwrap();

        let obs = prober.probe(&target(addr, "/hang")).await;
        assert!(obs.http_status.is_none());
        assert_eq!(obs.error.as_deref(), Some("Timeout after 0.2s"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new(&Defaults::default()).unwrap();
        let obs = prober.probe(&target(addr, "/ok")).await;
        assert!(obs.error.unwrap().starts_with("Connection failed"));
        assert!(obs.time_to_first_byte.is_none());
    }
}
