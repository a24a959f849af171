use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ApiConfig, Credentials};
use crate::error::OrderError;
use crate::model::CustomerRecord;
use crate::payload::DocumentPayload;

const CUSTOMERS_PATH: &str = "/api/v1/getAllCustomers";
const CREATE_DOCUMENT_PATH: &str = "/api/v1.1/createDocument";

/// Body of a customer directory search.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerQuery {
    #[serde(rename = "PageSize")]
    pub page_size: u32,
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
    #[serde(rename = "Search")]
    pub search: String,
    #[serde(rename = "PortfolioID")]
    pub portfolio_id: u32,
    #[serde(rename = "orderby")]
    pub order_by: OrderBy,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub asc: String,
}

impl CustomerQuery {
    /// First page, sorted by name ascending.
    pub fn new(search: &str, page_size: u32) -> Self {
        CustomerQuery {
            page_size,
            page_number: 1,
            search: search.to_string(),
            portfolio_id: 0,
            order_by: OrderBy {
                column: "Name".to_string(),
                asc: "asc".to_string(),
            },
        }
    }
}

/// Envelope shared by the service's endpoints.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(rename = "Success", default)]
    success: bool,
    #[serde(rename = "ErrorMessage")]
    error_message: Option<String>,
    #[serde(rename = "ReturnValue")]
    return_value: Option<T>,
}

impl<T> ApiResponse<T> {
    fn failure_reason(&self) -> String {
        self.error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("service reported failure")
            .to_string()
    }
}

/// What the service returned for a created document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentReceipt {
    pub data: Option<Value>,
}

/// The two calls the order flow makes against the invoicing service.
pub trait InvoicingApi {
    fn find_customers(&self, query: &CustomerQuery) -> Result<Vec<CustomerRecord>, OrderError>;
    fn create_document(&self, payload: &DocumentPayload) -> Result<DocumentReceipt, OrderError>;
}

pub struct HttpInvoicingClient {
    client: Client,
    base_url: String,
    authorization: String,
}

impl HttpInvoicingClient {
    pub fn new(api: &ApiConfig, credentials: &Credentials) -> Result<Self, OrderError> {
        let mut builder = Client::builder();
        if let Some(secs) = api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| OrderError::Config(format!("HTTP client: {}", e)))?;

        Ok(HttpInvoicingClient {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            authorization: authorization_header(credentials),
        })
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.authorization)
            .json(body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "invoicing service returned an error status");
            return Err(format!("HTTP {}", status));
        }
        response.json().map_err(|e| format!("unreadable response: {}", e))
    }
}

impl InvoicingApi for HttpInvoicingClient {
    fn find_customers(&self, query: &CustomerQuery) -> Result<Vec<CustomerRecord>, OrderError> {
        let response: ApiResponse<Vec<CustomerRecord>> = self
            .post(CUSTOMERS_PATH, query)
            .map_err(OrderError::CustomerLookup)?;
        if !response.success {
            return Err(OrderError::CustomerLookup(response.failure_reason()));
        }
        Ok(response.return_value.unwrap_or_default())
    }

    fn create_document(&self, payload: &DocumentPayload) -> Result<DocumentReceipt, OrderError> {
        let response: ApiResponse<Value> = self
            .post(CREATE_DOCUMENT_PATH, payload)
            .map_err(OrderError::Submission)?;
        if !response.success {
            return Err(OrderError::Submission(response.failure_reason()));
        }
        Ok(DocumentReceipt {
            data: response.return_value,
        })
    }
}

/// The service expects the credentials as a JSON object in the
/// Authorization header.
fn authorization_header(credentials: &Credentials) -> String {
    serde_json::json!({
        "secret": credentials.secret,
        "userkey": credentials.userkey,
    })
    .to_string()
}
