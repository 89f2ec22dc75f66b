use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::Service,
    error::ErrorBody,
    protocol::routes::{API_KEY_HEADER, HEALTH},
};
use tracing::{debug, warn};

use crate::{
    config::ServiceEndpoints,
    credential::Credential,
    error::{RequestOutcome, ServiceError},
};

const JSON: &str = "application/json";

/// How a call identifies itself. Authenticated calls cannot be built
/// without a live credential.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    Anonymous,
    ApiKey(&'a Credential),
}

/// A single request to one of the backend services.
#[derive(Debug, Clone)]
pub struct ServiceCall {
    service: Service,
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    failure_label: &'static str,
}

impl ServiceCall {
    pub fn new(
        service: Service,
        method: Method,
        path: impl Into<String>,
        failure_label: &'static str,
    ) -> Self {
        Self {
            service,
            method,
            path: path.into(),
            body: None,
            failure_label,
        }
    }

    pub fn get(service: Service, path: impl Into<String>, failure_label: &'static str) -> Self {
        Self::new(service, Method::GET, path, failure_label)
    }

    pub fn post(service: Service, path: impl Into<String>, failure_label: &'static str) -> Self {
        Self::new(service, Method::POST, path, failure_label)
    }

    pub fn put(service: Service, path: impl Into<String>, failure_label: &'static str) -> Self {
        Self::new(service, Method::PUT, path, failure_label)
    }

    pub fn delete(service: Service, path: impl Into<String>, failure_label: &'static str) -> Self {
        Self::new(service, Method::DELETE, path, failure_label)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> RequestOutcome<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ServiceError::Decode(format!("failed to encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// A 2xx response.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub body: Vec<u8>,
}

impl ServiceResponse {
    pub fn json<T: DeserializeOwned>(&self) -> RequestOutcome<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ServiceError::Decode(format!("unexpected response body: {e}")))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct ServiceGateway {
    http: Client,
    endpoints: ServiceEndpoints,
}

impl ServiceGateway {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self::with_client(Client::new(), endpoints)
    }

    pub fn with_client(http: Client, endpoints: ServiceEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub async fn call_anonymous(&self, call: ServiceCall) -> RequestOutcome<ServiceResponse> {
        self.call(call, Auth::Anonymous).await
    }

    pub async fn call_authenticated(
        &self,
        credential: &Credential,
        call: ServiceCall,
    ) -> RequestOutcome<ServiceResponse> {
        self.call(call, Auth::ApiKey(credential)).await
    }

    /// One round trip: no retry, no timeout. Non-2xx answers become
    /// [`ServiceError::Service`] when the body is a JSON object and
    /// [`ServiceError::ServiceUnparseable`] otherwise.
    pub async fn call(&self, call: ServiceCall, auth: Auth<'_>) -> RequestOutcome<ServiceResponse> {
        let ServiceCall {
            service,
            method,
            path,
            body,
            failure_label,
        } = call;

        let url = self
            .endpoints
            .resolve(service, &path)
            .map_err(|e| ServiceError::Transport(format!("invalid {service} service url: {e}")))?;

        debug!(%service, %method, %path, authenticated = matches!(auth, Auth::ApiKey(_)), "issuing service call");

        let mut request = self.http.request(method.clone(), url).header(ACCEPT, JSON);
        if let Auth::ApiKey(credential) = auth {
            request = request.header(API_KEY_HEADER, credential.expose());
        }
        if let Some(body) = &body {
            request = request.header(CONTENT_TYPE, JSON).json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%service, %method, %path, error = %e, "service call failed before a response");
            ServiceError::Transport(e.to_string())
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if status.is_success() {
            return Ok(ServiceResponse {
                body: bytes.to_vec(),
            });
        }

        let err = failure_from(status, &bytes, failure_label);
        warn!(%service, %method, %path, status = status.as_u16(), error = %err, "service call rejected");
        Err(err)
    }

    /// Plain-text banner served at `/api` by each service.
    pub async fn health(&self, service: Service) -> RequestOutcome<String> {
        let response = self
            .call_anonymous(ServiceCall::get(service, HEALTH, "Health check failed"))
            .await?;
        Ok(response.text())
    }
}

fn failure_from(status: StatusCode, body: &[u8], label: &'static str) -> ServiceError {
    match ErrorBody::parse(body) {
        Some(ErrorBody {
            error: Some(message),
        }) if !message.trim().is_empty() => ServiceError::Service {
            status: status.as_u16(),
            message,
        },
        Some(_) => ServiceError::Service {
            status: status.as_u16(),
            message: label.to_string(),
        },
        None => ServiceError::ServiceUnparseable {
            label,
            status: status.as_u16(),
            status_text: status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string()),
        },
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
