use logship_core::{Context, OsEnv};
use logship_file_read_tokio::TokioFileRead;
use logship_http_send_reqwest::ReqwestHttpSend;

/// Context wired to the local filesystem, process environment and a
/// default `reqwest` client.
pub fn default_context() -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}
