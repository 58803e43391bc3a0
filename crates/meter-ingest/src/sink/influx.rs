use super::PointSink;
use crate::{Point, WriteError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InfluxSettings {
    pub url: String,
    pub token: Option<String>,
    pub org: String,
    pub bucket: String,
    /// Per-request timeout for writes and the health check.
    pub timeout: Duration,
}

/// InfluxDB v2 HTTP write API, one line-protocol point per request.
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: Url,
    health_url: Url,
    token: Option<String>,
    bucket: String,
}

impl InfluxSink {
    pub fn new(settings: &InfluxSettings) -> Result<Self, WriteError> {
        let mut base = settings.url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| WriteError::Config(format!("invalid url {}: {e}", settings.url)))?;
        if settings.bucket.trim().is_empty() {
            return Err(WriteError::Config("bucket must not be empty".to_string()));
        }
        let mut write_url = base
            .join("api/v2/write")
            .map_err(|e| WriteError::Config(e.to_string()))?;
        write_url
            .query_pairs_mut()
            .append_pair("org", &settings.org)
            .append_pair("bucket", &settings.bucket)
            .append_pair("precision", "ns");
        let health_url = base
            .join("health")
            .map_err(|e| WriteError::Config(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| WriteError::Config(e.to_string()))?;
        Ok(Self {
            client,
            write_url,
            health_url,
            token: settings.token.clone().filter(|t| !t.is_empty()),
            bucket: settings.bucket.clone(),
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Token {token}")),
            None => req,
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), WriteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(WriteError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write_point(&self, point: &Point) -> Result<(), WriteError> {
        let req = self
            .client
            .post(self.write_url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(point.to_line_protocol());
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;
        check_status(resp).await
    }

    async fn ping(&self) -> Result<(), WriteError> {
        let resp = self
            .authorize(self.client.get(self.health_url.clone()))
            .send()
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;
        check_status(resp).await
    }

    fn describe(&self) -> String {
        format!("influxdb:{}@{}", self.bucket, self.health_url.origin().ascii_serialization())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(url: &str) -> InfluxSettings {
        InfluxSettings {
            url: url.to_string(),
            token: Some("secret".to_string()),
            org: "maakleerplek vzw".to_string(),
            bucket: "db_meters".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    fn voltage() -> Point {
        Point {
            measurement: "energy_data".into(),
            tags: BTreeMap::from([("location".to_string(), "lab".to_string())]),
            field: "voltage".into(),
            value: 230.5,
            timestamp_nanos: 42,
        }
    }

    #[tokio::test]
    async fn test_write_posts_line_protocol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .and(query_param("org", "maakleerplek vzw"))
            .and(query_param("bucket", "db_meters"))
            .and(query_param("precision", "ns"))
            .and(header("authorization", "Token secret"))
            .and(body_string("energy_data,location=lab voltage=230.5 42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = InfluxSink::new(&settings(&server.uri())).unwrap();
        sink.write_point(&voltage()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized access"))
            .mount(&server)
            .await;

        let sink = InfluxSink::new(&settings(&server.uri())).unwrap();
        let err = sink.write_point(&voltage()).await.unwrap_err();
        assert_eq!(
            err,
            WriteError::Rejected {
                status: 401,
                body: "unauthorized access".into()
            }
        );
    }

    #[tokio::test]
    async fn test_ping_hits_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = InfluxSink::new(&settings(&server.uri())).unwrap();
        assert!(sink.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_sink_is_transport_error() {
        // Port 9 (discard) is closed on test hosts.
        let sink = InfluxSink::new(&settings("http://127.0.0.1:9")).unwrap();
        assert!(matches!(sink.ping().await, Err(WriteError::Transport(_))));
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            InfluxSink::new(&settings("not a url")),
            Err(WriteError::Config(_))
        ));
        let mut s = settings("http://localhost:8086");
        s.bucket.clear();
        assert!(matches!(InfluxSink::new(&s), Err(WriteError::Config(_))));
    }
}
