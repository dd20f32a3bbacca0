use reqwest::{header::HeaderValue, Client, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};

use super::{DocumentStore, StoreError};

/// Firebase sends and expects entity tags through these headers for
/// conditional writes.
const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
const ETAG_MATCH_HEADER: &str = "if-match";

/// A document store client speaking the Firebase Realtime Database REST
/// protocol. One client (and its connection pool) serves the whole process.
pub struct FirebaseStore {
    http: Client,
    base_url: String,
    auth: Option<String>,
}

impl FirebaseStore {
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// REST endpoint for a path: `{base}/{path}.json`, plus the auth token
    /// when one is configured.
    fn url(&self, path: &str) -> String {
        match &self.auth {
            Some(auth) => format!("{}/{}.json?auth={}", self.base_url, path, auth),
            None => format!("{}/{}.json", self.base_url, path),
        }
    }

    async fn expect_ok(response: Response) -> Result<Response, StoreError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(StoreError::Protocol(format!(
                "unexpected status {} from {}",
                response.status(),
                response.url()
            )))
        }
    }

    async fn send_value(request: RequestBuilder, value: &Value) -> Result<(), StoreError> {
        let response = request.json(value).send().await?;
        Self::expect_ok(response).await?;
        Ok(())
    }
}

#[rocket::async_trait]
impl DocumentStore for FirebaseStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self.http.get(self.url(path)).send().await?;
        let value: Value = Self::expect_ok(response).await?.json().await?;
        Ok(non_null(value))
    }

    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        Self::send_value(self.http.put(self.url(path)), value).await
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError> {
        Self::send_value(self.http.patch(self.url(path)), &Value::Object(fields.clone())).await
    }

    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError> {
        let response = self.http.post(self.url(path)).json(value).send().await?;
        let body: Value = Self::expect_ok(response).await?.json().await?;
        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Protocol(format!("push to {path} returned no key")))
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&Value>,
        value: &Value,
    ) -> Result<bool, StoreError> {
        // Fetch the current value together with its entity tag.
        let response = self
            .http
            .get(self.url(path))
            .header(ETAG_REQUEST_HEADER, HeaderValue::from_static("true"))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Protocol(format!("no ETag returned for {path}")))?;
        let current: Value = response.json().await?;

        // The caller's expectation must still hold before we try the write.
        if non_null(current).as_ref() != expected {
            return Ok(false);
        }

        // Conditional overwrite; a concurrent writer invalidates the tag
        // and the store answers 412.
        let response = self
            .http
            .put(self.url(path))
            .header(ETAG_MATCH_HEADER, etag)
            .json(value)
            .send()
            .await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(false);
        }
        Self::expect_ok(response).await?;
        Ok(true)
    }
}

/// Firebase reports an absent path as JSON `null`.
fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}
