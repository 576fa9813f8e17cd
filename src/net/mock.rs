//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use super::transport::HttpTransport;
use super::types::{ApiRequest, ApiResponse};
use crate::error::ApiError;

type Responder = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Replies from a FIFO script first, then from the optional responder.
/// Every request is recorded, bearer included.
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn scripted(responses: Vec<Result<ApiResponse, ApiError>>) -> Self {
        Self { script: Mutex::new(responses.into()), responder: None, requests: Mutex::new(Vec::new()) }
    }

    pub(crate) fn routed(
        responder: impl Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self { script: Mutex::new(VecDeque::new()), responder: Some(Box::new(responder)), requests: Mutex::new(Vec::new()) }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count_path(&self, path: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.path == path).count()
    }
}

pub(crate) fn ok(body: Value) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse::new(200, body))
}

pub(crate) fn status(status: u16, body: Value) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse::new(status, body))
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        // Suspend once so concurrent callers interleave.
        tokio::task::yield_now().await;

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.responder {
            Some(responder) => responder(request),
            None => panic!("unexpected request: {} {}", request.method.as_str(), request.path),
        }
    }
}
