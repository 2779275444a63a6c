use std::time::Duration;

use tracing::debug;
use ureq::Agent;
use ureq::http::StatusCode;

use crate::Error;

/// Daily rate table of the Central Bank of Russia.
pub const CBR_DAILY_URL: &str = "http://www.cbr.ru/scripts/XML_daily.asp";
pub const TIMEOUT: Duration = Duration::from_secs(5);

// The provider is known to turn away clients that do not look like a browser.
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_7_5) AppleWebKit/537.11 (KHTML, like Gecko) Chrome/23.0.1271.64 Safari/537.11";

/// Where and how long to ask for a rate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub endpoint: String,
    /// Covers connecting, sending and receiving the whole body.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: CBR_DAILY_URL.to_string(),
            timeout: TIMEOUT,
        }
    }
}

impl FetchConfig {
    /// Request URL for a date already in `DD/MM/YYYY` form.
    pub fn request_url(&self, request_date: &str) -> String {
        format!("{}?date_req={request_date}", self.endpoint)
    }
}

pub struct Fetcher {
    config: FetchConfig,
    agent: Agent,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    /// Issue one GET for the table of `request_date` (`DD/MM/YYYY`) and return the raw body.
    pub fn fetch(&self, request_date: &str) -> Result<Vec<u8>, Error> {
        let url = self.config.request_url(request_date);
        debug!(%url, "requesting rate table");

        // The response owns the connection and releases it when dropped, on every path out.
        let mut resp = self
            .agent
            .get(url.as_str())
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(Error::Network)?;

        let status = resp.status();
        debug!(%status, "received response");
        if status != StatusCode::OK {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        let body = resp.body_mut().read_to_vec().map_err(Error::Read)?;
        debug!(bytes = body.len(), "read response body");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAILY_PATH: &str = "/scripts/XML_daily.asp";

    fn fetcher_for(server: &MockServer, timeout: Duration) -> Fetcher {
        Fetcher::new(FetchConfig {
            endpoint: format!("{}{DAILY_PATH}", server.uri()),
            timeout,
        })
    }

    // The mock server splits received header values on commas before matching.
    fn comma_parts(value: &str) -> Vec<&str> {
        value.split(',').map(str::trim).collect()
    }

    async fn fetch_blocking(fetcher: Fetcher, request_date: &str) -> Result<Vec<u8>, Error> {
        let request_date = request_date.to_string();
        tokio::task::spawn_blocking(move || fetcher.fetch(&request_date))
            .await
            .expect("fetch task panicked")
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.request_url("08/10/2022"),
            "http://www.cbr.ru/scripts/XML_daily.asp?date_req=08/10/2022"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sends_date_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DAILY_PATH))
            .and(query_param("date_req", "08/10/2022"))
            .and(headers("Accept", comma_parts(ACCEPT)))
            .and(headers("User-Agent", comma_parts(USER_AGENT)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<ValCurs/>".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetch_blocking(fetcher_for(&server, TIMEOUT), "08/10/2022")
            .await
            .unwrap();
        assert_eq!(body, b"<ValCurs/>");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<ValCurs></ValCurs>"))
            .mount(&server)
            .await;

        let result = fetch_blocking(fetcher_for(&server, TIMEOUT), "08/10/2022").await;
        assert!(matches!(result, Err(Error::HttpStatus(404))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let result = fetch_blocking(
            fetcher_for(&server, Duration::from_millis(200)),
            "08/10/2022",
        )
        .await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[test]
    fn test_unreachable_host() {
        // Nothing listens on the discard port locally.
        let fetcher = Fetcher::new(FetchConfig {
            endpoint: "http://127.0.0.1:9/scripts/XML_daily.asp".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(fetcher.fetch("08/10/2022"), Err(Error::Network(_))));
    }
}
