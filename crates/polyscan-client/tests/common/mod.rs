//! Scripted transport shared by the retrieval tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use polyscan_client::{
    ApiClient, ApiRequest, ApiResponse, ClientSettings, ManualClock, Transport, TransportError,
};
use polyscan_core::models::BoundaryPoint;
use serde_json::Value;

pub const BASE_URL: &str = "https://api.test/v1";

type Scripted = Result<ApiResponse, TransportError>;

/// Replays canned responses in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: Value) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(ApiResponse::new(status, body.to_string())));
        self
    }

    pub fn reply_text(&self, status: u16, body: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

pub fn settings() -> ClientSettings {
    ClientSettings { base_url: BASE_URL.to_string(), ..ClientSettings::default() }
}

pub fn client_with(
    transport: &Arc<ScriptedTransport>,
    settings: ClientSettings,
) -> (Arc<ManualClock>, ApiClient) {
    let clock = Arc::new(ManualClock::new());
    let client = ApiClient::new(transport.clone(), clock.clone(), settings);
    (clock, client)
}

pub fn client(transport: &Arc<ScriptedTransport>) -> (Arc<ManualClock>, ApiClient) {
    client_with(transport, settings())
}

pub fn square() -> Vec<BoundaryPoint> {
    vec![
        BoundaryPoint::new(40.0, -75.0),
        BoundaryPoint::new(40.0, -74.9),
        BoundaryPoint::new(40.1, -74.9),
        BoundaryPoint::new(40.1, -75.0),
        BoundaryPoint::new(40.0, -75.0),
    ]
}
