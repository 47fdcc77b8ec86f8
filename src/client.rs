use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Proxy, RequestBuilder, StatusCode};
use url::Url;

use crate::config::ClientConfig;
use crate::types::{CaptchaKind, ChallengeResponse, VerifyRequest, VerifyResponse};
use crate::{Error, Result, SESSION_HEADER};

/// HTTP client for the chat service.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ChatClient {
    host: Url,
    config: ClientConfig,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(host: &str, config: ClientConfig) -> Result<Self> {
        // `Url::join` drops the last segment of a base without a trailing slash.
        let host = if host.ends_with('/') {
            Url::parse(host)?
        } else {
            Url::parse(&format!("{host}/"))?
        };

        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers(&config)?)
            .timeout(config.timeout);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            host,
            config,
            http: builder.build()?,
        })
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        session_token: Option<&str>,
    ) -> Result<RequestBuilder> {
        let url = self.host.join(path)?;
        let mut request = self.http.request(method, url);
        if let Some(token) = session_token {
            request = request.header(SESSION_HEADER, HeaderValue::from_str(token)?);
        }
        Ok(request)
    }

    /// Sends `request` and returns the status together with the raw body.
    pub(crate) async fn send(request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Submits a signed SIWE message and returns the issued session token.
    pub async fn verify(&self, body: &VerifyRequest) -> Result<String> {
        let request = self.request(Method::POST, "verify", None)?.json(body);
        let (status_code, text) = Self::send(request).await?;
        if !status_code.is_success() {
            return Err(Error::Status {
                status_code,
                method: Method::POST,
                path: "verify".to_owned(),
                message: text,
            });
        }

        let response: VerifyResponse = serde_json::from_str(&text)?;
        response
            .session_token
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingCredential)
    }

    /// Fetches a challenge token for `kind` from the service's token endpoint.
    pub async fn challenge_token(&self, kind: CaptchaKind) -> Result<String> {
        let Some(path) = kind.challenge_path() else {
            return Err(Error::Validation(format!(
                "{kind:?} has no challenge endpoint"
            )));
        };
        self.fetch_token(path).await
    }

    /// GETs `path` and reads a non-empty `token` field from the JSON body.
    pub async fn fetch_token(&self, path: &'static str) -> Result<String> {
        let (status_code, text) = Self::send(self.request(Method::GET, path, None)?).await?;
        if !status_code.is_success() {
            return Err(Error::Status {
                status_code,
                method: Method::GET,
                path: path.to_owned(),
                message: text,
            });
        }

        let response: ChallengeResponse = serde_json::from_str(&text)?;
        response
            .token
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingChallengeToken(path))
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let origin = config.origin.trim_end_matches('/');
    let referer = format!("{origin}/");

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::ORIGIN, HeaderValue::from_str(origin)?);
    headers.insert(header::REFERER, HeaderValue::from_str(&referer)?);
    headers.insert(header::USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    for (name, value) in [
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-site"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    Ok(headers)
}
