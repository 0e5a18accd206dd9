// Data model and feed client for the Next Train Arrivals subway tracker
//
// Feed endpoints (relative to the configured base URL):
// - Upcoming arrivals: GET /upcoming/{stationId}      -> JSON array of train records
// - Car congestion:    GET /congestion/{line}/{train} -> JSON array of levels (0-3)
//
// Non-2xx responses carry the human-readable error message as their body.

use chrono::NaiveDateTime;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::nta_locale::Locale;

// ============================================================================
// Data Structures
// ============================================================================

/// Display language. Station names, countdown text and feed messages follow it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ko,
    En,
    Ja,
    Zh,
}

impl Lang {
    pub const ALL: [Lang; 4] = [Lang::Ko, Lang::En, Lang::Ja, Lang::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
            Lang::Ja => "ja",
            Lang::Zh => "zh",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = NTAError;

    fn from_str(s: &str) -> Result<Self> {
        Lang::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NTAError::ParseError(format!("Unknown language code '{}'", s)))
    }
}

/// Previous/next station of one station along one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAdjacency {
    #[serde(default)]
    pub prev_station: Option<String>,
    #[serde(default)]
    pub next_station: Option<String>,
}

/// One record of the static station dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: String,
    /// Language code ("ko", "en", ...) -> display name
    pub names: BTreeMap<String, String>,
    /// Line label -> adjacency on that line
    #[serde(default)]
    pub lines: BTreeMap<String, LineAdjacency>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Raw arrival record as returned by the arrivals feed.
///
/// `eta` is a wall-clock date-time in the feed's timezone, not UTC.
/// `train` stays the same for a physical train while it is in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRecord {
    pub eta: NaiveDateTime,
    pub eta_message: String,
    pub line: String,
    pub line_name: String,
    pub train: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub next_station: Option<String>,
}

/// Crowding of one car: `car` is 1-based, `value` is 0 (relaxed) to 3 (packed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionReading {
    pub car: u32,
    pub value: u8,
}

impl CongestionReading {
    pub const MAX_LEVEL: u8 = 3;
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum NTAError {
    NetworkError(String),
    /// Non-2xx feed response; holds the response body verbatim
    FeedError(String),
    ParseError(String),
    FileError(String),
    /// Synthesized without any I/O, already localized
    NoData(String),
    Cancelled,
}

impl NTAError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NTAError::Cancelled)
    }
}

impl fmt::Display for NTAError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NTAError::NetworkError(e) => write!(f, "Network error: {}", e),
            NTAError::FeedError(body) => write!(f, "{}", body),
            NTAError::ParseError(e) => write!(f, "Parse error: {}", e),
            NTAError::FileError(e) => write!(f, "File error: {}", e),
            NTAError::NoData(message) => write!(f, "{}", message),
            NTAError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for NTAError {}

pub type Result<T> = std::result::Result<T, NTAError>;

// ============================================================================
// Feed Transport
// ============================================================================

/// Fetches the body of `GET {base}/{segments...}` as text. Segments are raw
/// ids; the transport escapes them.
pub trait FeedTransport: Send + Sync {
    fn get(&self, segments: Vec<String>) -> BoxFuture<'static, Result<String>>;
}

/// reqwest-backed transport used outside of tests.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NTAError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| NTAError::ParseError(format!("Invalid feed URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(NTAError::ParseError(format!(
                "Feed URL '{}' cannot take a path",
                base_url
            )));
        }

        Ok(HttpTransport { client, base_url })
    }

    fn url(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                NTAError::ParseError(format!("Feed URL '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl FeedTransport for HttpTransport {
    fn get(&self, segments: Vec<String>) -> BoxFuture<'static, Result<String>> {
        let client = self.client.clone();
        let url = self.url(&segments);

        async move {
            let url = url?;
            debug!("GET {}", url);
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| NTAError::NetworkError(format!("Failed to reach feed: {}", e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| NTAError::NetworkError(format!("Failed to read response: {}", e)))?;

            if !status.is_success() {
                let message = if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                };
                return Err(NTAError::FeedError(message));
            }

            Ok(body)
        }
        .boxed()
    }
}

// ============================================================================
// Feeds
// ============================================================================

/// Upcoming arrivals for one station.
#[derive(Clone)]
pub struct ArrivalsFeed {
    transport: Arc<dyn FeedTransport>,
}

impl ArrivalsFeed {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        ArrivalsFeed { transport }
    }

    pub fn upcoming(&self, station_id: &str) -> BoxFuture<'static, Result<Vec<TrainRecord>>> {
        let request = self
            .transport
            .get(vec!["upcoming".to_string(), station_id.to_string()]);

        async move {
            let body = request.await?;
            Self::parse(&body)
        }
        .boxed()
    }

    pub fn parse(body: &str) -> Result<Vec<TrainRecord>> {
        serde_json::from_str(body)
            .map_err(|e| NTAError::ParseError(format!("Invalid arrivals response: {}", e)))
    }
}

/// Per-car congestion for one running train.
#[derive(Clone)]
pub struct CongestionFeed {
    transport: Arc<dyn FeedTransport>,
}

impl CongestionFeed {
    /// Lines without a congestion source. Requests for them never touch the network.
    pub const LINES_WITHOUT_DATA: [&'static str; 1] = ["9"];

    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        CongestionFeed { transport }
    }

    pub fn has_data(line: &str) -> bool {
        !Self::LINES_WITHOUT_DATA.contains(&line)
    }

    pub fn cars(
        &self,
        line: &str,
        train: &str,
        lang: Lang,
    ) -> BoxFuture<'static, Result<Vec<CongestionReading>>> {
        if !Self::has_data(line) {
            let message = Locale::of(lang).no_congestion_data.to_string();
            return futures::future::ready(Err(NTAError::NoData(message))).boxed();
        }

        let request = self.transport.get(vec![
            "congestion".to_string(),
            line.to_string(),
            train.to_string(),
        ]);

        async move {
            let body = request.await?;
            Self::parse(&body)
        }
        .boxed()
    }

    pub fn parse(body: &str) -> Result<Vec<CongestionReading>> {
        let levels: Vec<u8> = serde_json::from_str(body)
            .map_err(|e| NTAError::ParseError(format!("Invalid congestion response: {}", e)))?;

        levels
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                if value > CongestionReading::MAX_LEVEL {
                    return Err(NTAError::ParseError(format!(
                        "Congestion level {} out of range for car {}",
                        value,
                        index + 1
                    )));
                }
                Ok(CongestionReading {
                    car: index as u32 + 1,
                    value,
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Scripted transport that records every requested path, joined but not
    /// escaped. Responses are served in order; the last one repeats.
    pub(crate) struct FakeTransport {
        pub calls: Mutex<Vec<String>>,
        responses: Mutex<VecDeque<Result<String>>>,
    }

    impl FakeTransport {
        pub fn scripted(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(FakeTransport {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            })
        }

        pub fn ok(body: &str) -> Arc<Self> {
            Self::scripted(vec![Ok(body.to_string())])
        }

        pub fn failing(error: NTAError) -> Arc<Self> {
            Self::scripted(vec![Err(error)])
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl FeedTransport for FakeTransport {
        fn get(&self, segments: Vec<String>) -> BoxFuture<'static, Result<String>> {
            self.calls.lock().unwrap().push(format!("/{}", segments.join("/")));
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            };
            let response = response
                .unwrap_or_else(|| Err(NTAError::NetworkError("no scripted response".into())));
            futures::future::ready(response).boxed()
        }
    }

    #[tokio::test]
    async fn arrivals_are_parsed_from_camel_case_json() {
        let body = r#"[
            {"eta": "2024-05-01T08:01:00", "etaMessage": "전역 도착", "line": "2",
             "lineName": "2호선", "train": "2034", "destination": "City Hall",
             "nextStation": "Euljiro"},
            {"eta": "2024-05-01T08:05:00", "etaMessage": "5분 후", "line": "2",
             "lineName": "2호선", "train": "2040"}
        ]"#;
        let transport = FakeTransport::ok(body);
        let feed = ArrivalsFeed::new(transport.clone());

        let records = feed.upcoming("city hall").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].next_station.as_deref(), Some("Euljiro"));
        assert_eq!(records[1].destination, None);
        assert_eq!(transport.calls.lock().unwrap()[0], "/upcoming/city hall");
    }

    #[tokio::test]
    async fn feed_errors_surface_the_body_verbatim() {
        let transport = FakeTransport::failing(NTAError::FeedError("역 정보가 없습니다".into()));
        let feed = ArrivalsFeed::new(transport);

        let error = feed.upcoming("0000").await.unwrap_err();

        assert_eq!(error.to_string(), "역 정보가 없습니다");
    }

    /// Answers one request on a local port with `response` and hands back the
    /// request line it received.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (base_url, server)
    }

    fn local_transport(base_url: &str) -> HttpTransport {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpTransport::with_client(client, base_url).unwrap()
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn http_requests_escape_path_segments() {
        let (base_url, server) = serve_once(http_response("200 OK", "[]")).await;
        let feed = ArrivalsFeed::new(Arc::new(local_transport(&base_url)));

        let records = feed.upcoming("city hall/시청").await.unwrap();

        assert!(records.is_empty());
        assert_eq!(
            server.await.unwrap(),
            "GET /api/upcoming/city%20hall%2F%EC%8B%9C%EC%B2%AD HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn http_error_bodies_become_feed_errors() {
        let (base_url, server) =
            serve_once(http_response("503 Service Unavailable", "운행 정보가 없습니다")).await;
        let transport = local_transport(&base_url);

        let error = transport.get(vec!["upcoming".into(), "0150".into()]).await.unwrap_err();

        assert_eq!(error, NTAError::FeedError("운행 정보가 없습니다".into()));
        assert_eq!(error.to_string(), "운행 정보가 없습니다");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn empty_http_error_bodies_fall_back_to_the_status_line() {
        let (base_url, server) = serve_once(http_response("500 Internal Server Error", "")).await;
        let transport = local_transport(&base_url);

        let error = transport.get(vec!["upcoming".into(), "0150".into()]).await.unwrap_err();

        assert_eq!(error.to_string(), "500 Internal Server Error");
        server.await.unwrap();
    }

    #[test]
    fn feed_urls_must_take_a_path() {
        assert!(HttpTransport::new("mailto:feed@example.com", Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    async fn line_nine_congestion_fails_without_a_request() {
        let transport = FakeTransport::ok("[0, 1]");
        let feed = CongestionFeed::new(transport.clone());

        let error = feed.cars("9", "9101", Lang::En).await.unwrap_err();

        assert_eq!(
            error,
            NTAError::NoData(Locale::of(Lang::En).no_congestion_data.to_string())
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn congestion_levels_become_one_based_cars() {
        let transport = FakeTransport::ok("[0, 3, 2]");
        let feed = CongestionFeed::new(transport.clone());

        let cars = feed.cars("2", "2034", Lang::Ko).await.unwrap();

        assert_eq!(cars[0], CongestionReading { car: 1, value: 0 });
        assert_eq!(cars[2], CongestionReading { car: 3, value: 2 });
        assert_eq!(transport.calls.lock().unwrap()[0], "/congestion/2/2034");
    }

    #[test]
    fn out_of_range_congestion_is_rejected() {
        assert!(matches!(
            CongestionFeed::parse("[1, 4]"),
            Err(NTAError::ParseError(_))
        ));
    }

    #[test]
    fn lang_codes_round_trip_through_from_str() {
        assert_eq!("EN".parse::<Lang>().unwrap(), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
    }
}
