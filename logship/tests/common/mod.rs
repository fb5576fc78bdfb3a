use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use logship_core::{HttpSend, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A request seen by [`MockHttpSend`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
struct Route {
    pattern: String,
    responses: VecDeque<(StatusCode, String)>,
}

#[derive(Debug, Default)]
struct State {
    routes: Vec<Route>,
    requests: Vec<Recorded>,
}

/// MockHttpSend answers requests whose uri contains a registered pattern.
///
/// Routes are matched in registration order. Responses registered for the
/// same pattern are returned in turn and the last one repeats. Unmatched
/// requests get a 404.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    state: Arc<Mutex<State>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, status: u16, body: impl Into<String>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let status = StatusCode::from_u16(status).unwrap();
            match state.routes.iter_mut().find(|r| r.pattern == pattern) {
                Some(route) => route.responses.push_back((status, body.into())),
                None => state.routes.push(Route {
                    pattern: pattern.to_string(),
                    responses: VecDeque::from([(status, body.into())]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.uri.contains(pattern))
            .count()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let uri = req.uri().to_string();
        let mut state = self.state.lock().unwrap();
        state.requests.push(Recorded {
            method: req.method().clone(),
            uri: uri.clone(),
            headers: req.headers().clone(),
            body: req.body().clone(),
        });

        let (status, body) = match state.routes.iter_mut().find(|r| uri.contains(&r.pattern)) {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => route.responses[0].clone(),
            None => (StatusCode::NOT_FOUND, String::new()),
        };

        Ok(Response::builder()
            .status(status)
            .body(Bytes::from(body))
            .unwrap())
    }
}

/// STS `AssumeRole` response carrying `access_key_id`.
pub fn assume_role_response(access_key_id: &str) -> String {
    format!(
        r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>{access_key_id}</AccessKeyId>
      <SecretAccessKey>secret-{access_key_id}</SecretAccessKey>
      <SessionToken>token-{access_key_id}</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#
    )
}

/// IMDS / container credential document carrying `access_key_id`.
pub fn container_credentials(access_key_id: &str) -> String {
    format!(
        r#"{{
  "Code": "Success",
  "AccessKeyId": "{access_key_id}",
  "SecretAccessKey": "secret-{access_key_id}",
  "Token": "token-{access_key_id}",
  "Expiration": "2099-01-01T00:00:00Z"
}}"#
    )
}

/// Access key id used to sign a recorded request.
pub fn signing_key(req: &Recorded) -> Option<String> {
    let auth = req.headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (_, rest) = auth.split_once("Credential=")?;
    rest.split('/').next().map(|v| v.to_string())
}
