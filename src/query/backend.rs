//! Client for the backend that answers paid questions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Errors reaching the query backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Backend returned HTTP {0}")]
	Status(u16),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Backend unreachable: {0}")]
	Unreachable(String),
}

/// Body of a query submission.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
	pub question: &'a str,
}

/// Backend reply. `answer` is set on success, `message` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub answer: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl QueryResponse {
	pub const SUCCESS: &'static str = "success";

	pub fn success(answer: &str) -> Self {
		Self {
			status: Self::SUCCESS.to_string(),
			answer: Some(answer.to_string()),
			message: None,
		}
	}

	pub fn error(message: &str) -> Self {
		Self {
			status: "error".to_string(),
			answer: None,
			message: Some(message.to_string()),
		}
	}

	/// The answer on success, the backend's message otherwise.
	pub fn into_answer(self) -> Result<String, String> {
		if self.status == Self::SUCCESS {
			Ok(self.answer.unwrap_or_default())
		} else {
			Err(self
				.message
				.unwrap_or_else(|| format!("backend returned status {}", self.status)))
		}
	}
}

/// Endpoint that accepts a question once payment is confirmed.
#[async_trait]
pub trait QueryBackend: Send + Sync {
	async fn submit_query(&self, question: &str) -> Result<QueryResponse, BackendError>;
}

/// [`QueryBackend`] over HTTP: `POST {"question": ...}` to a fixed endpoint.
#[derive(Clone)]
pub struct HttpQueryBackend {
	http_client: Client,
	endpoint: String,
}

impl HttpQueryBackend {
	pub fn new(endpoint: String) -> Result<Self, BackendError> {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(120))
			.build()?;

		Ok(Self {
			http_client,
			endpoint,
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait]
impl QueryBackend for HttpQueryBackend {
	async fn submit_query(&self, question: &str) -> Result<QueryResponse, BackendError> {
		info!("Submitting question to {}", self.endpoint);
		let response = self
			.http_client
			.post(&self.endpoint)
			.json(&QueryRequest { question })
			.send()
			.await?;

		let status = response.status();
		let body = response.bytes().await?;
		debug!("Backend replied with HTTP {} ({} bytes)", status, body.len());

		// Error replies usually still carry a status/message body; prefer it over the HTTP code.
		match serde_json::from_slice::<QueryResponse>(&body) {
			Ok(reply) => Ok(reply),
			Err(_) if !status.is_success() => Err(BackendError::Status(status.as_u16())),
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn test_parse_replies() {
		let ok: QueryResponse =
			serde_json::from_str(r#"{"status": "success", "answer": "42"}"#).unwrap();
		assert_eq!(ok.into_answer(), Ok("42".to_string()));

		let rejected: QueryResponse =
			serde_json::from_str(r#"{"status": "error", "message": "quota exceeded"}"#).unwrap();
		assert_eq!(rejected.into_answer(), Err("quota exceeded".to_string()));

		let bare: QueryResponse = serde_json::from_str(r#"{"status": "failed"}"#).unwrap();
		assert_eq!(
			bare.into_answer(),
			Err("backend returned status failed".to_string())
		);
	}

	#[test]
	fn test_request_body() {
		let body = serde_json::to_value(QueryRequest {
			question: "What is the meaning of life?",
		})
		.unwrap();
		assert_eq!(
			body,
			serde_json::json!({ "question": "What is the meaning of life?" })
		);
	}

	async fn backend_replying(template: ResponseTemplate) -> (MockServer, HttpQueryBackend) {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/submit-query"))
			.respond_with(template)
			.mount(&server)
			.await;
		let backend = HttpQueryBackend::new(format!("{}/submit-query", server.uri())).unwrap();
		(server, backend)
	}

	#[tokio::test]
	async fn test_submit_query_posts_question() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/submit-query"))
			.and(body_json(json!({ "question": "Why is the sky blue?" })))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(json!({ "status": "success", "answer": "Rayleigh scattering" })),
			)
			.expect(1)
			.mount(&server)
			.await;
		let backend = HttpQueryBackend::new(format!("{}/submit-query", server.uri())).unwrap();

		let reply = backend.submit_query("Why is the sky blue?").await.unwrap();
		assert_eq!(reply.into_answer(), Ok("Rayleigh scattering".to_string()));
	}

	#[tokio::test]
	async fn test_error_status_with_body_is_a_reply() {
		let (_server, backend) = backend_replying(
			ResponseTemplate::new(400)
				.set_body_json(json!({ "status": "error", "message": "quota exceeded" })),
		)
		.await;

		let reply = backend.submit_query("anything").await.unwrap();
		assert_eq!(reply.into_answer(), Err("quota exceeded".to_string()));
	}

	#[tokio::test]
	async fn test_error_status_without_body() {
		let (_server, backend) =
			backend_replying(ResponseTemplate::new(500).set_body_string("oops")).await;

		let err = backend.submit_query("anything").await.unwrap_err();
		assert!(matches!(err, BackendError::Status(500)));
	}

	#[tokio::test]
	async fn test_success_status_with_bad_json() {
		let (_server, backend) =
			backend_replying(ResponseTemplate::new(200).set_body_string("not json")).await;

		let err = backend.submit_query("anything").await.unwrap_err();
		assert!(matches!(err, BackendError::Json(_)));
	}

	#[test]
	fn test_backend_keeps_endpoint() {
		let backend = HttpQueryBackend::new("http://localhost:8000/submit-query".to_string()).unwrap();
		assert_eq!(backend.endpoint(), "http://localhost:8000/submit-query");
	}
}
