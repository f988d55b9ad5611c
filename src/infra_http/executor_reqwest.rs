use crate::domain_port::{
    GraphqlExecutor, GraphqlResponse, HttpExecutor, HttpRequest, HttpResponse, Method,
    REQUIRES_AUTH_HEADER, TransportError,
};
use serde_json::{Value, json};
use std::time::Duration;

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(transport_error)
}

/// Non-JSON bodies come back as a JSON string; empty bodies as null.
async fn read_body(response: reqwest::Response) -> Result<Value, TransportError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestExecutor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait::async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, self.url(&request.url));
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case(REQUIRES_AUTH_HEADER) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = read_body(response).await?;
        tracing::trace!("{} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse::new(status, body))
    }
}

pub struct ReqwestGraphqlExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl ReqwestGraphqlExecutor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl GraphqlExecutor for ReqwestGraphqlExecutor {
    async fn mutate(
        &self,
        document: &str,
        variables: Value,
        bearer: Option<&str>,
    ) -> Result<GraphqlResponse, TransportError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": document, "variables": variables }));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = read_body(response).await?;
        serde_json::from_value(body).map_err(|e| {
            TransportError::Network(format!("malformed GraphQL response ({}): {}", status, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base_url() {
        let executor = ReqwestExecutor::new("http://api.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(executor.url("/auth/login"), "http://api.local/auth/login");
        assert_eq!(executor.url("users"), "http://api.local/users");
        assert_eq!(executor.url("https://other/x"), "https://other/x");
    }
}
