//! HTTP clients for the two backends local writes are mirrored against.

pub mod coursework;
pub mod error;
pub mod restaurant;

use std::time::Duration;

use reqwest::{Client, Response, Url};
use tavola_types::api::ApiMessage;

pub use coursework::CourseworkClient;
pub use error::{RemoteError, RemoteResult};
pub use restaurant::RestaurantClient;

pub const DEFAULT_COURSEWORK_URL: &str = "http://10.240.72.69/comp2000/coursework/";
pub const DEFAULT_STUDENT_ID: &str = "12345";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub coursework_url: String,
    /// The restaurant REST backend is optional; without it menu and
    /// reservation data stay local.
    pub rest_url: Option<String>,
    pub student_id: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            coursework_url: DEFAULT_COURSEWORK_URL.to_string(),
            rest_url: None,
            student_id: DEFAULT_STUDENT_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteConfig {
    pub fn coursework_client(&self) -> RemoteResult<CourseworkClient> {
        CourseworkClient::new(&self.coursework_url, &self.student_id, self.timeout)
    }

    pub fn restaurant_client(&self) -> RemoteResult<Option<RestaurantClient>> {
        self.rest_url
            .as_deref()
            .map(|url| RestaurantClient::new(url, self.timeout))
            .transpose()
    }
}

fn http_client(timeout: Duration) -> RemoteResult<Client> {
    Ok(Client::builder().timeout(timeout).connect_timeout(timeout).build()?)
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> RemoteResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RemoteError::InvalidBase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pass success responses through; turn anything else into
/// [`RemoteError::Status`] with the most useful text the server sent.
async fn check(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .ok()
        .and_then(|m| m.detail.or(m.message))
        .or_else(|| Some(body).filter(|b| !b.trim().is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}
