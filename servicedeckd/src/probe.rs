use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use shared::types::{HealthSnapshot, ProbeStatus, ServiceRecord};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Produces a fresh health snapshot for a service. Failures are data, never errors.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, service: &ServiceRecord) -> HealthSnapshot;
}

/// Probe every service concurrently and return snapshots in input order.
pub async fn probe_all(prober: &dyn HealthProbe, services: &[ServiceRecord]) -> Vec<HealthSnapshot> {
    join_all(services.iter().map(|service| prober.probe(service))).await
}

/// Single GET per probe with a fixed timeout; no retries, no caching.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("servicedeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpProber {
    async fn probe(&self, service: &ServiceRecord) -> HealthSnapshot {
        let url = normalize_url(&service.url);

        let (status, status_code, error) = match self.client.get(&*url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                if (200..400).contains(&code) {
                    (ProbeStatus::Up, None, None)
                } else {
                    (ProbeStatus::Down, Some(code), None)
                }
            }
            Err(e) => {
                let code = classify_error(&e);
                tracing::debug!("Probe of {} ({}) failed: {} [{}]", service.name, url, e, code);
                (ProbeStatus::Down, None, Some(code))
            }
        };

        HealthSnapshot {
            service: service.clone(),
            status,
            status_code,
            error,
            last_checked: Utc::now(),
        }
    }
}

/// Prefix `http://` when the stored URL carries no http(s) scheme.
pub fn normalize_url(url: &str) -> std::borrow::Cow<'_, str> {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.into()
    } else {
        format!("http://{}", url).into()
    }
}

/// Map a transport failure to a short errno-style code.
fn classify_error(err: &reqwest::Error) -> String {
    if let Some(status) = err.status() {
        return format!("Status {}", status.as_u16());
    }
    classify_transport(err).to_string()
}

fn classify_transport(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        return "ETIMEDOUT";
    }
    if err.is_builder() {
        return "EINVALIDURL";
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return "ECONNREFUSED",
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    return "ECONNRESET"
                }
                io::ErrorKind::TimedOut => return "ETIMEDOUT",
                _ => {}
            }
        }

        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return "ENOTFOUND";
        }
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return "ETLS";
        }

        source = cause.source();
    }

    "Error connecting"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    fn service(url: &str) -> ServiceRecord {
        ServiceRecord {
            id: "id".to_string(),
            name: "test".to_string(),
            url: url.to_string(),
            category: "General".to_string(),
            icon: String::new(),
        }
    }

    async fn spawn_server(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn test_app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/broken", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route("/moved", get(|| async { (StatusCode::NOT_MODIFIED, "") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            )
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("ftp://example.com"), "http://ftp://example.com");
    }

    #[tokio::test]
    async fn test_probe_up() {
        let addr = spawn_server(test_app()).await;
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let before = Utc::now();
        let snapshot = prober.probe(&service(&format!("http://{}/ok", addr))).await;

        assert_eq!(snapshot.status, ProbeStatus::Up);
        assert_eq!(snapshot.status_code, None);
        assert_eq!(snapshot.error, None);
        assert!(snapshot.last_checked >= before);
    }

    #[tokio::test]
    async fn test_probe_without_scheme_uses_http() {
        let addr = spawn_server(test_app()).await;
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let record = service(&format!("{}/ok", addr));
        let snapshot = prober.probe(&record).await;

        assert!(snapshot.is_up());
        assert_eq!(snapshot.service.url, record.url, "Stored URL must not change");
    }

    #[tokio::test]
    async fn test_probe_error_status_is_down() {
        let addr = spawn_server(test_app()).await;
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let snapshot = prober.probe(&service(&format!("http://{}/broken", addr))).await;
        assert_eq!(snapshot.status, ProbeStatus::Down);
        assert_eq!(snapshot.status_code, Some(503));

        let snapshot = prober.probe(&service(&format!("http://{}/missing", addr))).await;
        assert_eq!(snapshot.status_code, Some(404));
    }

    #[tokio::test]
    async fn test_probe_3xx_is_up() {
        let addr = spawn_server(test_app()).await;
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let snapshot = prober.probe(&service(&format!("http://{}/moved", addr))).await;
        assert!(snapshot.is_up());
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        // Grab a free port, then close it so nothing is listening
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let snapshot = prober.probe(&service(&format!("http://{}/", addr))).await;
        assert_eq!(snapshot.status, ProbeStatus::Down);
        assert_eq!(snapshot.error.as_deref(), Some("ECONNREFUSED"));
        assert_eq!(snapshot.status_code, None);
    }

    #[tokio::test]
    async fn test_unknown_host_is_enotfound() {
        // .invalid never resolves
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let snapshot = prober.probe(&service("http://no-such-host.invalid/")).await;
        assert_eq!(snapshot.status, ProbeStatus::Down);
        assert_eq!(snapshot.error.as_deref(), Some("ENOTFOUND"));
    }

    #[tokio::test]
    async fn test_unparsable_url_is_einvalidurl() {
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();

        let snapshot = prober.probe(&service("http://exa mple.com")).await;
        assert_eq!(snapshot.status, ProbeStatus::Down);
        assert_eq!(snapshot.error.as_deref(), Some("EINVALIDURL"));
        assert_eq!(snapshot.service.url, "http://exa mple.com");
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let addr = spawn_server(test_app()).await;
        let prober = HttpProber::new(Duration::from_millis(200)).unwrap();

        let snapshot = prober.probe(&service(&format!("http://{}/slow", addr))).await;
        assert_eq!(snapshot.status, ProbeStatus::Down);
        assert_eq!(snapshot.error.as_deref(), Some("ETIMEDOUT"));
    }

    struct DelayProbe;

    #[async_trait]
    impl HealthProbe for DelayProbe {
        async fn probe(&self, service: &ServiceRecord) -> HealthSnapshot {
            let delay = if service.name == "B" { 300 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            HealthSnapshot {
                service: service.clone(),
                status: ProbeStatus::Up,
                status_code: None,
                error: None,
                last_checked: Utc::now(),
            }
        }
    }

    #[tokio::test]
    async fn test_probe_all_preserves_order() {
        let services: Vec<ServiceRecord> = ["A", "B", "C"]
            .iter()
            .map(|name| ServiceRecord {
                name: name.to_string(),
                ..service("http://unused")
            })
            .collect();

        let started = std::time::Instant::now();
        let snapshots = probe_all(&DelayProbe, &services).await;

        let names: Vec<&str> = snapshots.iter().map(|s| s.service.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        // Concurrent: total time tracks the slowest probe, not the sum
        assert!(started.elapsed() < Duration::from_millis(600));
        // B finished last, so its timestamp is the latest
        assert!(snapshots[1].last_checked >= snapshots[2].last_checked);
    }

    #[tokio::test]
    async fn test_probe_all_empty() {
        let snapshots = probe_all(&DelayProbe, &[]).await;
        assert!(snapshots.is_empty());
    }
}
