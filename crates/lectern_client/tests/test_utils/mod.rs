//! Shared test doubles for client tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lectern_client::{ApiClient, ApiRequest, ApiResponse, ClientConfig, Credential, Transport};
use lectern_error::{HttpError, LecternResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const BASE: &str = "https://school.example";
pub const TOKEN: &str = "test-token";

/// One scripted transport outcome.
pub enum Step {
    Respond(ApiResponse),
    Fail(String),
}

/// Transport that replays scripted outcomes and records every request.
///
/// Once the script runs out the last step is repeated.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl Clone for Step {
    fn clone(&self) -> Self {
        match self {
            Step::Respond(response) => Step::Respond(response.clone()),
            Step::Fail(message) => Step::Fail(message.clone()),
        }
    }
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> LecternResult<ApiResponse> {
        self.requests.lock().unwrap().push(request);

        let step = {
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().expect("transport script is empty"),
            }
        };

        match step {
            Step::Respond(response) => Ok(response),
            Step::Fail(message) => Err(HttpError::new(message).into()),
        }
    }
}

/// Response with a JSON body and optional extra headers.
pub fn json(status: u16, body: &str) -> Step {
    Step::Respond(ApiResponse::new(status, HeaderMap::new(), body.as_bytes().to_vec()))
}

pub fn json_with_headers(status: u16, body: &str, headers: &[(&'static str, &str)]) -> Step {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Step::Respond(ApiResponse::new(status, map, body.as_bytes().to_vec()))
}

/// A page of a list with an optional next link.
pub fn page(body: &str, next: Option<&str>) -> Step {
    match next {
        Some(next) => json_with_headers(200, body, &[("link", &format!("<{BASE}{next}>; rel=\"next\""))]),
        None => json(200, body),
    }
}

pub fn fail(message: &str) -> Step {
    Step::Fail(message.to_string())
}

/// Configuration with millisecond backoffs so retry tests stay fast.
pub fn config() -> ClientConfig {
    ClientConfig::new(BASE)
        .with_initial_backoff_ms(1)
        .with_max_backoff_ms(5)
        .with_per_page(None)
}

pub fn client(config: ClientConfig, transport: Arc<ScriptedTransport>) -> ApiClient {
    ApiClient::builder(config)
        .with_credential(Credential::fixed(TOKEN))
        .with_transport(transport)
        .build()
        .unwrap()
}
