//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::client::AptlyClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

pub(crate) const BASE_URL: &str = "http://test";

/// Records every request and answers with queued responses, in order.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    responses: Arc<Mutex<VecDeque<HttpResponse>>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Transport(format!("no mock response for {}", request.url)))
    }
}

/// A client whose next reply is `status` with `body`.
pub(crate) fn client_replying(status: u16, body: &str) -> (AptlyClient, RecordingTransport) {
    let transport = RecordingTransport::new();
    transport.push(HttpResponse::new(status, body));
    let client = AptlyClient::with_transport(BASE_URL, transport.clone()).unwrap();
    (client, transport)
}

/// A client that must not send anything.
pub(crate) fn offline_client() -> (AptlyClient, RecordingTransport) {
    let transport = RecordingTransport::new();
    let client = AptlyClient::with_transport(BASE_URL, transport.clone()).unwrap();
    (client, transport)
}
