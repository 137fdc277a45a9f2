//! HTTP client for the ticket API

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::time::Duration;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::models::{Catalogs, Ticket};
use crate::wire::{self, WireTicket};

/// Remote ticket operations.
///
/// Implementations hold no state between calls. Every call may fail and no
/// call is retried.
#[async_trait]
pub trait TicketApi: Send + Sync {
    /// Create a ticket, returning the backend's copy of it
    async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError>;

    /// Fetch every ticket, in the order the backend returns them
    async fn get_all_tickets(&self) -> Result<Vec<Ticket>, ServiceError>;

    async fn get_ticket_by_id(&self, id: Uuid) -> Result<Ticket, ServiceError>;

    /// Replace a ticket wholesale
    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError>;

    async fn delete_ticket(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// [`TicketApi`] over REST at `<base_url>/api/Ticket`
#[derive(Clone)]
pub struct TicketService {
    client: Client,
    endpoint: String,
    catalogs: Catalogs,
}

impl TicketService {
    pub fn new(api: &ApiConfig, catalogs: Catalogs) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(api.timeout_secs))
            .danger_accept_invalid_certs(api.accept_invalid_certs)
            .build()
            .map_err(ServiceError::Network)?;

        Ok(Self {
            client,
            endpoint: api.endpoint(),
            catalogs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn item_url(&self, id: Uuid) -> String {
        format!("{}/{}", self.endpoint, id)
    }

    /// Send a request and map non-success statuses to errors
    async fn send(&self, request: RequestBuilder, id: Option<Uuid>) -> Result<Response, ServiceError> {
        let response = request.send().await.map_err(ServiceError::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND
            && let Some(id) = id
        {
            return Err(ServiceError::NotFound { id });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Server {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a single-ticket body. An empty body echoes `sent` back.
    async fn read_ticket(&self, response: Response, sent: Option<&Ticket>) -> Result<Ticket, ServiceError> {
        let bytes = response.bytes().await.map_err(ServiceError::Network)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return sent
                .cloned()
                .ok_or_else(|| ServiceError::Decode("empty response body".to_string()));
        }

        let wire: WireTicket =
            serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))?;
        wire::decode(wire, &self.catalogs)
    }

    async fn create(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
        let body = wire::encode(ticket, &self.catalogs)?;
        tracing::debug!(id = %ticket.id, "POST {}", self.endpoint);
        let response = self
            .send(self.client.post(&self.endpoint).json(&body), None)
            .await?;
        self.read_ticket(response, Some(ticket)).await
    }

    async fn get_all(&self) -> Result<Vec<Ticket>, ServiceError> {
        tracing::debug!("GET {}", self.endpoint);
        let response = self.send(self.client.get(&self.endpoint), None).await?;
        let wire: Vec<WireTicket> = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        wire.into_iter()
            .map(|t| wire::decode(t, &self.catalogs))
            .collect()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Ticket, ServiceError> {
        let url = self.item_url(id);
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url), Some(id)).await?;
        self.read_ticket(response, None).await
    }

    async fn update(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
        let body = wire::encode(ticket, &self.catalogs)?;
        tracing::debug!(id = %ticket.id, "PUT {}", self.endpoint);
        let response = self
            .send(self.client.put(&self.endpoint).json(&body), Some(ticket.id))
            .await?;
        self.read_ticket(response, Some(ticket)).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let url = self.item_url(id);
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(&url), Some(id)).await?;
        Ok(())
    }
}

/// Log a failed call and hand the error back to the caller
fn handle_error(operation: &'static str, error: ServiceError) -> ServiceError {
    match &error {
        ServiceError::Network(e) => {
            tracing::error!(operation, error = %e, "Ticket API unreachable");
        }
        ServiceError::Server { status, body } => {
            tracing::error!(operation, status, body = %body, "Ticket API returned an error");
        }
        other => {
            tracing::error!(operation, error = %other, "Ticket API call failed");
        }
    }
    error
}

#[async_trait]
impl TicketApi for TicketService {
    async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
        self.create(ticket)
            .await
            .map_err(|e| handle_error("create", e))
    }

    async fn get_all_tickets(&self) -> Result<Vec<Ticket>, ServiceError> {
        self.get_all().await.map_err(|e| handle_error("get_all", e))
    }

    async fn get_ticket_by_id(&self, id: Uuid) -> Result<Ticket, ServiceError> {
        self.get_by_id(id)
            .await
            .map_err(|e| handle_error("get_by_id", e))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
        self.update(ticket)
            .await
            .map_err(|e| handle_error("update", e))
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<(), ServiceError> {
        self.delete(id).await.map_err(|e| handle_error("delete", e))
    }
}
