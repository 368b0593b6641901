use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use dashmap::DashMap;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Content type of every token endpoint request.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Encode set for application/x-www-form-urlencoded keeping unreserved characters as-is
const FORM_URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form POST issued against a token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    /// Target URL.
    pub url: String,
    /// Form fields in the order they are sent.
    pub fields: Vec<(String, String)>,
}

impl FormRequest {
    /// Creates an empty form request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), fields: Vec::new() }
    }

    /// Appends a form field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Value of the first field named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the fields as an url-encoded body.
    pub fn encode_body(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!(
                "{}={}",
                percent_encode(k.as_bytes(), FORM_URLENCODE_SET),
                percent_encode(v.as_bytes(), FORM_URLENCODE_SET),
            ))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Response of a form POST. The body is read completely before it is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response carrying a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self { status, body: body.to_string().into_bytes() }
    }
}

/// Failure raised by a transport before a response was read, such as a refused
/// connection or an elapsed timeout.
pub type HttpClientError = Box<dyn Error + Send + Sync>;

/// Transport capability the token exchange depends on.
///
/// Implementations own their timeout and cancellation behavior; the exchange
/// client never retries.
pub trait OAuthHttpClient: Send + Sync + Clone + 'static {
    /// POST the url-encoded form and return the status and the full body.
    fn post_form(
        &self,
        request: FormRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;
}

/// Transport that answers form POSTs from canned responses instead of the network.
///
/// Every [`FormRequest`] it is handed is kept, fields in send order, so callers can
/// assert on exactly what an exchange would have put on the wire.
#[derive(Clone, Default)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, HttpResponse>>,
    default_response: Option<HttpResponse>,
    requests: Arc<Mutex<Vec<FormRequest>>>,
}

impl InMemoryHttpClient {
    /// No canned responses; every POST fails until one is inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers POSTs to any URL without a canned response with `response`.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::default() }
    }

    /// Answers POSTs to `url` with `response`.
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.insert(url.into(), response);
    }

    /// Forms posted so far, oldest first.
    pub fn requests(&self) -> Vec<FormRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl OAuthHttpClient for InMemoryHttpClient {
    fn post_form(
        &self,
        request: FormRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let response = self
            .responses
            .get(&request.url)
            .map(|entry| entry.value().clone())
            .or_else(|| self.default_response.clone());
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        Box::pin(async move {
            response.ok_or_else(|| HttpClientError::from("no mock response for url"))
        })
    }
}

#[cfg(feature = "http")]
pub use reqwest_client::ReqwestHttpClient;

#[cfg(feature = "http")]
mod reqwest_client {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use reqwest::header::CONTENT_TYPE;
    use super::{FormRequest, HttpClientError, HttpResponse, OAuthHttpClient, FORM_CONTENT_TYPE};

    /// HTTP client backed by a pooled `reqwest::Client`. Redirects are never followed.
    #[derive(Clone, Debug)]
    pub struct ReqwestHttpClient {
        client: reqwest::Client,
    }

    impl ReqwestHttpClient {
        /// Builds a client, applying `timeout` to every request when set.
        pub fn new(timeout: Option<Duration>) -> Result<Self, HttpClientError> {
            let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            Ok(Self { client: builder.build()? })
        }

        /// Wraps an already configured `reqwest::Client`.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl OAuthHttpClient for ReqwestHttpClient {
        fn post_form(
            &self,
            request: FormRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
            let client = self.client.clone();
            Box::pin(async move {
                let body = request.encode_body();
                let response = client
                    .post(&request.url)
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .body(body)
                    .send()
                    .await?;
                let status = response.status().as_u16();
                let body = response.bytes().await?.to_vec();
                Ok::<_, HttpClientError>(HttpResponse { status, body })
            })
        }
    }
}
