use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

/// Connect timeout shared by every registry call. Per-request deadlines are
/// applied on top by the registry client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}
