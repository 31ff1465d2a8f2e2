use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Credentials;
use crate::error::ReportError;
use crate::models::{Audit, TicketRecord, User};

/// The three helpdesk calls the report needs.
#[async_trait]
pub trait HelpdeskApi: Send + Sync {
    /// Runs a ticket search. `term` is the filter without the `type:ticket` prefix.
    async fn search_tickets(&self, term: &str) -> Result<Vec<TicketRecord>, ReportError>;

    async fn ticket_audits(&self, ticket_id: u64) -> Result<Vec<Audit>, ReportError>;

    async fn user_name(&self, user_id: u64) -> Result<String, ReportError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

pub struct ZendeskClient {
    base_url: String,
    email: String,
    token: String,
    options: ClientOptions,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<TicketRecord>,
    next_page: Option<String>,
}

#[derive(Deserialize)]
struct AuditPage {
    #[serde(default)]
    audits: Vec<Audit>,
    next_page: Option<String>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

impl ZendeskClient {
    pub fn new(credentials: &Credentials, options: ClientOptions) -> Result<Self, ReportError> {
        let base_url = credentials.base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("solved-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ReportError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            base_url,
            email: credentials.email.clone(),
            token: credentials.token.clone(),
            options,
            http,
        })
    }

    /// Fails fast on bad credentials before any search is issued.
    pub async fn current_user(&self) -> Result<User, ReportError> {
        let url = self.endpoint("/api/v2/users/me.json", &[])?;
        let envelope: UserEnvelope = self.get_json(url).await?;
        Ok(envelope.user)
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ReportError> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|err| ReportError::Api {
            url: raw,
            status: 0,
            body: err.to_string(),
        })
    }

    fn next_url(&self, next_page: Option<String>) -> Result<Option<Url>, ReportError> {
        next_page
            .map(|raw| {
                Url::parse(&raw).map_err(|err| ReportError::Api {
                    url: raw,
                    status: 0,
                    body: err.to_string(),
                })
            })
            .transpose()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ReportError> {
        let mut attempt = 0;
        loop {
            match self.get_once(&url).await {
                Ok(body) => {
                    let decoded = serde_json::from_slice(&body);
                    return decoded.map_err(|source| ReportError::Decode {
                        url: url.to_string(),
                        source,
                    });
                }
                Err((err, retry_after))
                    if err.is_retryable() && attempt < self.options.max_retries =>
                {
                    let delay = retry_after
                        .unwrap_or_else(|| backoff(self.options.retry_delay, attempt));
                    tracing::warn!(
                        url = %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err((err, _)) => return Err(err),
            }
        }
    }

    async fn get_once(&self, url: &Url) -> Result<Vec<u8>, (ReportError, Option<Duration>)> {
        let transport = |source| {
            (
                ReportError::Http {
                    url: url.to_string(),
                    source,
                },
                None,
            )
        };

        let response = self
            .http
            .get(url.clone())
            .basic_auth(format!("{}/token", self.email), Some(&self.token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
        } else {
            None
        };

        let body = response.bytes().await.map_err(transport)?;
        if status.is_success() {
            return Ok(body.to_vec());
        }

        Err((
            ReportError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(500).collect(),
            },
            retry_after,
        ))
    }
}

/// Doubles `base` per attempt, saturating instead of overflowing.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[async_trait]
impl HelpdeskApi for ZendeskClient {
    async fn search_tickets(&self, term: &str) -> Result<Vec<TicketRecord>, ReportError> {
        let query = format!("type:ticket {term}");
        let params = [("query", query.as_str())];
        let mut next = Some(self.endpoint("/api/v2/search.json", &params)?);
        let mut tickets = Vec::new();

        while let Some(url) = next {
            let page: SearchPage = self.get_json(url).await?;
            tickets.extend(page.results);
            next = self.next_url(page.next_page)?;
        }

        tracing::debug!(term, count = tickets.len(), "search complete");
        Ok(tickets)
    }

    async fn ticket_audits(&self, ticket_id: u64) -> Result<Vec<Audit>, ReportError> {
        let path = format!("/api/v2/tickets/{ticket_id}/audits.json");
        let mut next = Some(self.endpoint(&path, &[])?);
        let mut audits = Vec::new();

        while let Some(url) = next {
            let page: AuditPage = self.get_json(url).await?;
            audits.extend(page.audits);
            next = self.next_url(page.next_page)?;
        }

        Ok(audits)
    }

    async fn user_name(&self, user_id: u64) -> Result<String, ReportError> {
        let url = self.endpoint(&format!("/api/v2/users/{user_id}.json"), &[])?;
        let envelope: UserEnvelope = self.get_json(url).await?;
        Ok(envelope.user.name)
    }
}
