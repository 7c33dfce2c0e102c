use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::*;

use crate::gateway::{GatewayClient, GatewayError, GatewayRequest, GatewayResponse};

/// An in-process card gateway.
///
/// Approves everything by default, issuing tokens `tok_1`, `tok_2`, ... in call order. Responses can be scripted ahead
/// of time, and every call can be slowed down to widen race windows.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>>,
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a response for the next unscripted call.
    pub fn push_response(&self, response: Result<GatewayResponse, GatewayError>) {
        self.script.lock().expect("gateway script poisoned").push_back(response);
    }

    pub fn decline_next<S: Into<String>>(&self, reason: S) {
        self.push_response(Ok(GatewayResponse::declined(reason)));
    }

    pub fn fail_next(&self, error: GatewayError) {
        self.push_response(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().expect("gateway requests poisoned").clone()
    }

    /// The tokens sent to the gateway, in order.
    pub fn tokens_sent(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.token).collect()
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn execute(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("💳️ Fake gateway call #{n}: {} of {} with token '{}'", request.operation_type, request.amount, request.token);
        self.requests.lock().expect("gateway requests poisoned").push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().expect("gateway script poisoned").pop_front();
        scripted.unwrap_or_else(|| Ok(GatewayResponse::approved(format!("tok_{n}"), format!("ref_{n}"))))
    }
}
