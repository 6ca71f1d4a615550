//! Measurement client backed by the speedtest.net server network.

use crate::client::MeasurementClient;
use crate::geo::distance_km;
use crate::types::{Identity, PingResult, Server, ServerId, ThroughputResult};
use async_trait::async_trait;
use common::{Error, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Default speedtest.net endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.speedtest.net";

/// Default number of servers requested from discovery
pub const DEFAULT_SERVER_LIMIT: u32 = 10;

/// Image edge lengths requested during the download test
const DOWNLOAD_SIZES: &[u32] = &[350, 500, 750, 1000];

/// Payload sizes posted during the upload test
const UPLOAD_SIZES: &[usize] = &[256 * 1024, 512 * 1024, 1024 * 1024];

/// Settings for [`SpeedtestNetClient`]
#[derive(Debug, Clone)]
pub struct SpeedtestNetConfig {
    /// Base URL for configuration and server discovery
    pub base_url: Url,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Number of latency samples; the minimum is reported
    pub ping_samples: u32,

    /// Maximum number of servers requested from discovery.
    ///
    /// Only the closest `server_limit` servers can ever be selected.
    pub server_limit: u32,

    /// Image sizes fetched by the download test
    pub download_sizes: Vec<u32>,

    /// Payload sizes posted by the upload test
    pub upload_sizes: Vec<usize>,
}

impl SpeedtestNetConfig {
    /// Create a configuration with default transfer sizes
    pub fn new(base_url: Url, request_timeout: Duration, ping_samples: u32) -> Self {
        Self {
            base_url,
            request_timeout,
            ping_samples,
            server_limit: DEFAULT_SERVER_LIMIT,
            download_sizes: DOWNLOAD_SIZES.to_vec(),
            upload_sizes: UPLOAD_SIZES.to_vec(),
        }
    }
}

/// speedtest.net measurement client
pub struct SpeedtestNetClient {
    config: SpeedtestNetConfig,
    client: reqwest::Client,
}

impl SpeedtestNetClient {
    /// Create a new client with its own connection pool
    pub fn new(config: SpeedtestNetConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("speedtest-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::http)?;

        Ok(Self::with_client(client, config))
    }

    /// Create a client on top of an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, config: SpeedtestNetConfig) -> Self {
        Self { config, client }
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(Error::http)?;
        check_status(response)?.text().await.map_err(Error::http)
    }
}

#[async_trait]
impl MeasurementClient for SpeedtestNetClient {
    async fn fetch_identity(&self) -> Result<Identity> {
        let url = self
            .config
            .base_url
            .join("speedtest-config.php")
            .map_err(Error::parse)?;

        let body = self.get_text(url).await?;
        let identity = parse_identity(&body)?;
        debug!(ip = %identity.ip, isp = %identity.isp, "Fetched identity");
        Ok(identity)
    }

    async fn fetch_servers(&self, identity: &Identity) -> Result<Vec<Server>> {
        let mut url = self
            .config
            .base_url
            .join("api/js/servers")
            .map_err(Error::parse)?;
        url.query_pairs_mut()
            .append_pair("engine", "js")
            .append_pair("limit", &self.config.server_limit.to_string());

        let body = self.get_text(url).await?;
        let servers = parse_servers(&body, identity)?;
        debug!(count = servers.len(), "Fetched server list");
        Ok(servers)
    }

    async fn ping(&self, server: &Server) -> Result<PingResult> {
        let url = resource_url(server, "latency.txt")?;

        let mut best: Option<Duration> = None;
        for _ in 0..self.config.ping_samples.max(1) {
            let start = Instant::now();
            let response = self.client.get(url.clone()).send().await.map_err(Error::http)?;
            check_status(response)?.bytes().await.map_err(Error::http)?;
            let rtt = start.elapsed();
            best = Some(best.map_or(rtt, |b| b.min(rtt)));
        }

        let latency = best.ok_or_else(|| Error::invalid_response("no latency samples taken"))?;
        debug!(server_id = %server.id, latency_ms = latency.as_millis(), "Ping complete");
        Ok(PingResult::new(latency))
    }

    async fn download(&self, server: &Server) -> Result<ThroughputResult> {
        let start = Instant::now();
        let mut total: u64 = 0;

        for size in &self.config.download_sizes {
            let url = resource_url(server, &format!("random{size}x{size}.jpg"))?;
            let response = self.client.get(url).send().await.map_err(Error::http)?;
            let mut response = check_status(response)?;
            while let Some(chunk) = response.chunk().await.map_err(Error::http)? {
                total += chunk.len() as u64;
            }
        }

        if total == 0 {
            return Err(Error::invalid_response("download transferred no data"));
        }

        let result = ThroughputResult::from_transfer(total, start.elapsed());
        info!(
            server_id = %server.id,
            bytes = total,
            mib_per_sec = result.mebibytes_per_second(),
            "Download complete"
        );
        Ok(result)
    }

    async fn upload(&self, server: &Server) -> Result<ThroughputResult> {
        let url = Url::parse(&server.url).map_err(Error::parse)?;
        let start = Instant::now();
        let mut total: u64 = 0;

        for size in &self.config.upload_sizes {
            let response = self
                .client
                .post(url.clone())
                .header("content-type", "application/x-www-form-urlencoded")
                .body(vec![b'0'; *size])
                .send()
                .await
                .map_err(Error::http)?;
            check_status(response)?.bytes().await.map_err(Error::http)?;
            total += *size as u64;
        }

        if total == 0 {
            return Err(Error::invalid_response("upload transferred no data"));
        }

        let result = ThroughputResult::from_transfer(total, start.elapsed());
        info!(
            server_id = %server.id,
            bytes = total,
            mib_per_sec = result.mebibytes_per_second(),
            "Upload complete"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "speedtest.net"
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::invalid_response(format!(
            "{} returned status {}",
            response.url(),
            status
        )))
    }
}

/// Resolve a test resource that lives next to the server's upload endpoint
fn resource_url(server: &Server, name: &str) -> Result<Url> {
    Url::parse(&server.url)
        .and_then(|base| base.join(name))
        .map_err(Error::parse)
}

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    client: ClientElement,
}

#[derive(Debug, Deserialize)]
struct ClientElement {
    #[serde(rename = "@ip")]
    ip: String,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
    #[serde(rename = "@isp")]
    isp: String,
}

/// Parse the `<client>` element of a speedtest-config.php document
pub fn parse_identity(xml: &str) -> Result<Identity> {
    let document: SettingsDocument = quick_xml::de::from_str(xml).map_err(Error::parse)?;
    let client = document.client;

    Ok(Identity {
        ip: client.ip,
        isp: client.isp,
        lat: client.lat,
        lon: client.lon,
    })
}

#[derive(Debug, Deserialize)]
struct RawServer {
    id: String,
    url: String,
    lat: String,
    lon: String,
    name: String,
    country: String,
    #[serde(default)]
    sponsor: String,
    #[serde(default)]
    host: String,
}

impl RawServer {
    /// Decode and convert one entry of the discovery response
    fn from_value(entry: serde_json::Value, identity: &Identity) -> Result<Server> {
        serde_json::from_value::<RawServer>(entry)?.into_server(identity)
    }

    fn into_server(self, identity: &Identity) -> Result<Server> {
        let id = self
            .id
            .parse::<u64>()
            .map_err(|e| Error::parse(format!("server id {:?}: {}", self.id, e)))?;
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|e| Error::parse(format!("server {} latitude: {}", id, e)))?;
        let lon = self
            .lon
            .parse::<f64>()
            .map_err(|e| Error::parse(format!("server {} longitude: {}", id, e)))?;

        Ok(Server {
            id: ServerId(id),
            name: self.name,
            sponsor: self.sponsor,
            country: self.country,
            host: self.host,
            url: self.url,
            lat,
            lon,
            distance: distance_km(identity.lat, identity.lon, lat, lon),
        })
    }
}

/// Parse a server discovery response and order it closest first.
///
/// Malformed entries are skipped; an empty result is an error.
pub fn parse_servers(json: &str, identity: &Identity) -> Result<Vec<Server>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;

    let mut servers: Vec<Server> = raw
        .into_iter()
        .filter_map(|entry| match RawServer::from_value(entry, identity) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(error = %e, "Skipping malformed server entry");
                None
            }
        })
        .collect();

    if servers.is_empty() {
        return Err(Error::invalid_response("server list is empty"));
    }

    servers.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings>
<client ip="203.0.113.7" lat="51.5074" lon="-0.1278" isp="Example Broadband" isprating="3.7" rating="0" ispdlavg="0" ispulavg="0" loggedin="0" country="GB" />
<server-config threadcount="4" ignoreids="" notonmap="" forcepingid="" preferredserverid=""/>
</settings>"#;

    fn london() -> Identity {
        Identity {
            ip: "203.0.113.7".to_string(),
            isp: "Example Broadband".to_string(),
            lat: 51.5074,
            lon: -0.1278,
        }
    }

    #[test]
    fn test_parse_identity() {
        let identity = parse_identity(CONFIG_XML).unwrap();
        assert_eq!(identity, london());
    }

    #[test]
    fn test_parse_identity_missing_client() {
        let result = parse_identity("<settings><server-config threadcount=\"4\"/></settings>");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_servers_sorted_by_distance() {
        let json = r#"[
            {"url":"http://paris.example.net:8080/speedtest/upload.php","lat":"48.8566","lon":"2.3522","name":"Paris","country":"France","sponsor":"Example FR","id":"200","host":"paris.example.net:8080"},
            {"url":"http://london.example.net:8080/speedtest/upload.php","lat":"51.5","lon":"-0.12","name":"London","country":"United Kingdom","sponsor":"Example UK","id":"100","host":"london.example.net:8080"}
        ]"#;

        let servers = parse_servers(json, &london()).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].id, ServerId(100));
        assert_eq!(servers[1].id, ServerId(200));
        assert!(servers[0].distance < servers[1].distance);
        assert_eq!(servers[1].country, "France");
    }

    #[test]
    fn test_parse_servers_skips_malformed() {
        let json = r#"[
            {"url":"http://a/upload.php","lat":"north","lon":"2.0","name":"Bad","country":"X","id":"1"},
            {"url":"http://b/upload.php","lat":"1.0","lon":"2.0","name":"Good","country":"Y","id":"2"}
        ]"#;

        let servers = parse_servers(json, &london()).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "Good");
    }

    #[test]
    fn test_parse_servers_skips_incomplete_entries() {
        let json = r#"[
            {"url":"http://a/upload.php","lat":"1.0","lon":"2.0","name":"NoCountry","id":"1"},
            {"url":"http://b/upload.php","lat":"1.0","lon":"2.0","name":"NumericId","country":"Z","id":3},
            {"url":"http://c/upload.php","lat":"1.0","lon":"2.0","name":"Good","country":"Y","id":"2"}
        ]"#;

        let servers = parse_servers(json, &london()).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "Good");
        assert_eq!(servers[0].id, ServerId(2));
    }

    #[test]
    fn test_parse_servers_all_incomplete_is_error() {
        let json = r#"[{"url":"http://a/upload.php","name":"NoCoordinates","country":"X","id":"1"}]"#;
        let result = parse_servers(json, &london());
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_servers_empty_is_error() {
        let result = parse_servers("[]", &london());
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_servers_invalid_json() {
        let result = parse_servers("{\"error\":", &london());
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_resource_url_is_sibling_of_upload() {
        let server = Server {
            id: ServerId(1),
            name: "London".to_string(),
            sponsor: String::new(),
            country: "United Kingdom".to_string(),
            host: "london.example.net:8080".to_string(),
            url: "http://london.example.net:8080/speedtest/upload.php".to_string(),
            lat: 51.5,
            lon: -0.12,
            distance: 1.0,
        };

        let url = resource_url(&server, "latency.txt").unwrap();
        assert_eq!(url.as_str(), "http://london.example.net:8080/speedtest/latency.txt");
    }
}
