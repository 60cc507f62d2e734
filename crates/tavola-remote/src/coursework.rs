use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, Url};
use tavola_types::api::{ApiMessage, CourseworkUserEnvelope, CourseworkUserList, CourseworkUserPayload};
use tracing::debug;

use crate::{RemoteError, RemoteResult, check, endpoint, http_client};

/// Client for the coursework user service. Every route is scoped by a
/// student id, which can be swapped at runtime.
#[derive(Clone)]
pub struct CourseworkClient {
    http: Client,
    base: Url,
    student_id: Arc<RwLock<String>>,
}

impl CourseworkClient {
    pub fn new(base_url: &str, student_id: &str, timeout: Duration) -> RemoteResult<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base: Url::parse(base_url)?,
            student_id: Arc::new(RwLock::new(student_id.to_string())),
        })
    }

    pub fn student_id(&self) -> String {
        match self.student_id.read() {
            Ok(id) => id.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn override_student_id(&self, id: &str) {
        let mut guard = match self.student_id.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = id.to_string();
    }

    fn url(&self, route: &str, user_id: Option<&str>) -> RemoteResult<Url> {
        let sid = self.student_id();
        match user_id {
            Some(uid) => endpoint(&self.base, &[route, sid.as_str(), uid]),
            None => endpoint(&self.base, &[route, sid.as_str()]),
        }
    }

    /// POST create_student/{sid}. The service answers with an error when the
    /// database already exists, so callers treat this as best effort.
    pub async fn create_student_database(&self) -> RemoteResult<ApiMessage> {
        let url = self.url("create_student", None)?;
        debug!(%url, "coursework: create student database");
        let response = check(self.http.post(url).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn create_user(&self, payload: &CourseworkUserPayload) -> RemoteResult<ApiMessage> {
        let url = self.url("create_user", None)?;
        debug!(%url, email = %payload.email, "coursework: create user");
        let response = check(self.http.post(url).json(payload).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn read_all_users(&self) -> RemoteResult<Vec<CourseworkUserPayload>> {
        let url = self.url("read_all_users", None)?;
        debug!(%url, "coursework: read all users");
        let response = check(self.http.get(url).send().await?).await?;
        let list: CourseworkUserList = response.json().await?;
        Ok(list.users)
    }

    pub async fn read_user(&self, user_id: &str) -> RemoteResult<CourseworkUserPayload> {
        let url = self.url("read_user", Some(user_id))?;
        debug!(%url, "coursework: read user");
        let response = check(self.http.get(url).send().await?).await?;
        let envelope: CourseworkUserEnvelope = response.json().await?;
        envelope
            .user
            .ok_or_else(|| RemoteError::NotFound(format!("user {user_id}")))
    }

    pub async fn update_user(&self, user_id: &str, payload: &CourseworkUserPayload) -> RemoteResult<ApiMessage> {
        let url = self.url("update_user", Some(user_id))?;
        debug!(%url, "coursework: update user");
        let response = check(self.http.put(url).json(payload).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_user(&self, user_id: &str) -> RemoteResult<ApiMessage> {
        let url = self.url("delete_user", Some(user_id))?;
        debug!(%url, "coursework: delete user");
        let response = check(self.http.delete(url).send().await?).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_use_current_student_id() {
        let client = CourseworkClient::new("http://api.local/coursework/", "s1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url("read_all_users", None).unwrap().as_str(),
            "http://api.local/coursework/read_all_users/s1"
        );

        client.override_student_id("s2");
        assert_eq!(
            client.url("delete_user", Some("u9")).unwrap().as_str(),
            "http://api.local/coursework/delete_user/s2/u9"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base = format!("http://127.0.0.1:{port}/");
        let client = CourseworkClient::new(&base, "s1", Duration::from_millis(500)).unwrap();
        let err = client.read_all_users().await.unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)));
    }
}
