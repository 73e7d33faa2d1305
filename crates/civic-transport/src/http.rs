use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use civic_sync::api::PortalApi;
use civic_sync::error::{ClientError, Result};
use civic_types::api::{AssignRequest, ReportScope, SendMessageRequest, TransitionRequest};
use civic_types::models::{ConversationKey, Message, Notification, Report};

use crate::config::ClientConfig;

/// REST client for the portal API.
pub struct HttpApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    read_retries: u32,
    retry_backoff: Duration,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_url.clone(),
            token: config.token.clone(),
            read_retries: config.read_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// GET with bounded retry on transport failures.
    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        with_retries(self.read_retries, self.retry_backoff, || async move {
            let resp = execute(self.request(Method::GET, path)).await?;
            resp.json::<T>().await.map_err(ClientError::transport)
        })
        .await
    }

    /// Single attempt; the caller decides what to do with a failure.
    async fn mutate<B: Serialize>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response> {
        let mut rb = self.request(method, path);
        if let Some(body) = body {
            rb = rb.json(body);
        }
        execute(rb).await
    }
}

async fn execute(rb: RequestBuilder) -> Result<Response> {
    let resp = rb.send().await.map_err(ClientError::transport)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, body))
}

/// 4xx means the server looked at the request and refused it; anything else
/// is a transport problem.
fn classify(status: StatusCode, body: String) -> ClientError {
    if status.is_client_error() {
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("rejected").to_string()
        } else {
            body
        };
        ClientError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        ClientError::transport(format!("server returned {}", status))
    }
}

pub(crate) async fn with_retries<T, F, Fut>(retries: u32, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(ClientError::Transport(e)) if attempt < retries => {
                attempt += 1;
                warn!("Read failed ({}), retry {}/{}", e, attempt, retries);
                tokio::time::sleep(backoff * attempt).await;
            }
            other => return other,
        }
    }
}

fn conversation_path(key: ConversationKey) -> String {
    format!("/reports/{}/conversations/{}/messages", key.report_id, key.mode.as_path())
}

impl PortalApi for HttpApi {
    async fn fetch_history(&self, conversation: ConversationKey) -> Result<Vec<Message>> {
        let messages: Vec<Message> = self.read(&conversation_path(conversation)).await?;
        debug!("Fetched {} messages for {}", messages.len(), conversation);
        Ok(messages)
    }

    async fn send_message(&self, conversation: ConversationKey, req: SendMessageRequest) -> Result<Message> {
        let resp = self
            .mutate(Method::POST, &conversation_path(conversation), Some(&req))
            .await?;
        resp.json().await.map_err(ClientError::transport)
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.read("/notifications").await
    }

    async fn delete_notification(&self, id: u64) -> Result<()> {
        self.mutate::<()>(Method::DELETE, &format!("/notifications/{}", id), None)
            .await?;
        Ok(())
    }

    async fn mark_notification_read(&self, id: u64) -> Result<()> {
        self.mutate::<()>(Method::POST, &format!("/notifications/{}/read", id), None)
            .await?;
        Ok(())
    }

    async fn fetch_reports(&self, scope: &ReportScope) -> Result<Vec<Report>> {
        self.read(&format!("/reports?scope={}", scope.as_query())).await
    }

    async fn fetch_report(&self, report_id: Uuid) -> Result<Report> {
        self.read(&format!("/reports/{}", report_id)).await
    }

    async fn submit_transition(&self, report_id: Uuid, req: TransitionRequest) -> Result<Report> {
        let resp = self
            .mutate(Method::POST, &format!("/reports/{}/status", report_id), Some(&req))
            .await?;
        resp.json().await.map_err(ClientError::transport)
    }

    async fn submit_assignment(&self, report_id: Uuid, req: AssignRequest) -> Result<Report> {
        let resp = self
            .mutate(Method::POST, &format!("/reports/{}/assignment", report_id), Some(&req))
            .await?;
        resp.json().await.map_err(ClientError::transport)
    }
}
