use chrono::NaiveDateTime;
use log::{info, trace};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

/// Anything that can tell us what time it is in a zone. The HTTP client is
/// the real one; tests substitute their own.
pub trait TimeApi: Send + Sync {
    /// Fetch the current time in an IANA zone. Blocking; the caller decides
    /// which thread this runs on.
    fn fetch_current_time(&self, zone: &str)
        -> Result<CurrentTime, FetchError>;
}

/// Failure to get a time from the API. Never retried.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FetchError {
    #[error("Failed to fetch time data from server: status {0}")]
    Status(u16),
    #[error("Failed to fetch time data from server: {0}")]
    Transport(String),
    #[error("Error parsing time data as JSON: {0}")]
    Body(String),
}

/// Client for https://timeapi.io
#[derive(Debug)]
pub struct HttpTimeApi {
    host: String,
    agent: ureq::Agent,
}

impl HttpTimeApi {
    pub const DEFAULT_HOST: &'static str = "https://timeapi.io";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(host: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("cityclock/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            host: host.trim_end_matches('/').to_owned(),
            agent,
        }
    }

    /// Build the request URL for a zone. The zone goes in the query string,
    /// so `/` is sent as `%2F`.
    pub fn zone_url(host: &str, zone: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("timeZone", zone)
            .finish();
        format!("{host}/api/time/current/zone?{query}")
    }
}

impl TimeApi for HttpTimeApi {
    fn fetch_current_time(
        &self,
        zone: &str,
    ) -> Result<CurrentTime, FetchError> {
        let url = Self::zone_url(&self.host, zone);
        trace!("Fetching {url}");
        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status(status))
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport(transport.to_string()))
            }
        };
        // Anything but a plain 200 is a failure, even other 2xx codes
        if response.status() != 200 {
            return Err(FetchError::Status(response.status()));
        }
        let current_time: CurrentTime = response
            .into_json()
            .map_err(|err| FetchError::Body(err.to_string()))?;
        info!("Fetched time in {zone}: {}", current_time.time);
        Ok(current_time)
    }
}

/// https://timeapi.io/swagger/index.html, `/api/time/current/zone`. Only
/// `time` is required; the rest is used for extra display detail if present.
/// A malformed optional field is dropped instead of failing the response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTime {
    pub time: String,
    #[serde(default, deserialize_with = "lenient")]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient")]
    pub day_of_week: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub time_zone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub dst_active: Option<bool>,
}

/// Deserialize an optional field, mapping any value of the wrong shape to
/// `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl CurrentTime {
    /// A response carrying nothing but the time string
    pub fn from_time(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            date_time: None,
            day_of_week: None,
            time_zone: None,
            dst_active: None,
        }
    }

    /// Long-form date, e.g. "Monday, Jan 1", if the API sent one
    pub fn date_label(&self) -> Option<String> {
        // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
        self.date_time
            .map(|date_time| date_time.format("%A, %b %-d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::CityTable;
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        sync::mpsc,
        thread::{self, JoinHandle},
    };

    #[test]
    fn test_zone_url_encodes_slash() {
        let table = CityTable::default();
        for city in table.cities() {
            let zone = table.resolve_time_zone(city).unwrap();
            let url = HttpTimeApi::zone_url(HttpTimeApi::DEFAULT_HOST, zone);
            let (_, query) = url.split_once('?').unwrap();
            assert!(!query.contains('/'), "{url}");
            assert_eq!(query, format!("timeZone={}", zone.replace('/', "%2F")));
        }
        assert_eq!(
            HttpTimeApi::zone_url(HttpTimeApi::DEFAULT_HOST, "America/New_York"),
            "https://timeapi.io/api/time/current/zone?timeZone=America%2FNew_York"
        );
    }

    #[test]
    fn test_host_trailing_slash() {
        let api = HttpTimeApi::new("http://localhost:8080/", Duration::from_secs(1));
        assert_eq!(api.host, "http://localhost:8080");
    }

    #[test]
    fn test_parse_minimal() {
        let current_time: CurrentTime =
            serde_json::from_str(r#"{"time": "2024-01-01T10:00:00"}"#).unwrap();
        assert_eq!(current_time, CurrentTime::from_time("2024-01-01T10:00:00"));
        assert_eq!(current_time.date_label(), None);
    }

    #[test]
    fn test_parse_full() {
        let current_time: CurrentTime = serde_json::from_str(
            r#"{
                "year": 2024,
                "month": 1,
                "day": 1,
                "hour": 10,
                "minute": 0,
                "seconds": 0,
                "milliSeconds": 123,
                "dateTime": "2024-01-01T10:00:00.1234567",
                "date": "01/01/2024",
                "time": "10:00",
                "timeZone": "Asia/Tokyo",
                "dayOfWeek": "Monday",
                "dstActive": false
            }"#,
        )
        .unwrap();
        assert_eq!(current_time.time, "10:00");
        assert_eq!(current_time.time_zone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(current_time.dst_active, Some(false));
        assert_eq!(current_time.date_label().as_deref(), Some("Monday, Jan 1"));
    }

    #[test]
    fn test_parse_missing_time() {
        assert!(serde_json::from_str::<CurrentTime>(r#"{"date": "x"}"#).is_err());
    }

    #[test]
    fn test_parse_bad_optional_fields() {
        let current_time: CurrentTime = serde_json::from_str(
            r#"{
                "time": "10:00",
                "dateTime": "2024-01-01T10:00:00+09:00",
                "dayOfWeek": 1,
                "timeZone": null,
                "dstActive": "no"
            }"#,
        )
        .unwrap();
        assert_eq!(current_time, CurrentTime::from_time("10:00"));
        assert_eq!(current_time.date_label(), None);
    }

    /// Serve a single canned HTTP response on a local port. The handle
    /// yields the request line the client sent.
    fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = stream;
            stream.write_all(response.as_bytes()).unwrap();
            request_line
        });
        (host, handle)
    }

    fn fetch(host: &str, timeout: Duration) -> Result<CurrentTime, FetchError> {
        HttpTimeApi::new(host, timeout).fetch_current_time("Asia/Tokyo")
    }

    #[test]
    fn test_fetch_ok() {
        let (host, handle) = serve_once(
            "HTTP/1.1 200 OK\r\n\
            Content-Type: application/json\r\n\
            Content-Length: 16\r\n\
            Connection: close\r\n\r\n\
            {\"time\":\"10:00\"}",
        );
        let result = fetch(&host, Duration::from_secs(5));
        assert_eq!(result, Ok(CurrentTime::from_time("10:00")));
        let request_line = handle.join().unwrap();
        assert!(
            request_line.starts_with(
                "GET /api/time/current/zone?timeZone=Asia%2FTokyo "
            ),
            "{request_line}"
        );
    }

    #[test]
    fn test_fetch_server_error() {
        let (host, handle) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\n\
            Content-Length: 0\r\n\
            Connection: close\r\n\r\n",
        );
        assert_eq!(
            fetch(&host, Duration::from_secs(5)),
            Err(FetchError::Status(500))
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_fetch_no_content() {
        let (host, handle) = serve_once(
            "HTTP/1.1 204 No Content\r\n\
            Connection: close\r\n\r\n",
        );
        assert_eq!(
            fetch(&host, Duration::from_secs(5)),
            Err(FetchError::Status(204))
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_fetch_bad_body() {
        let (host, handle) = serve_once(
            "HTTP/1.1 200 OK\r\n\
            Content-Type: application/json\r\n\
            Content-Length: 8\r\n\
            Connection: close\r\n\r\n\
            not json",
        );
        let result = fetch(&host, Duration::from_secs(5));
        assert!(matches!(result, Err(FetchError::Body(_))), "{result:?}");
        handle.join().unwrap();
    }

    #[test]
    fn test_fetch_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        // Accept, then hold the connection open without answering
        let (done, wait) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            let _ = wait.recv();
        });
        let result = fetch(&host, Duration::from_millis(200));
        assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
        drop(done);
        handle.join().unwrap();
    }
}
