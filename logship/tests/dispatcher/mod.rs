use crate::common::{signing_key, MockHttpSend};
use crate::create_test_context;
use async_trait::async_trait;
use bytes::Bytes;
use logship::config::{AzureAuthMode, ObjectLock, ServerSideEncryption};
use logship::{
    BackendType, CredentialsOverride, DeliveryError, LogPayload, LogSink, LogStoreConfig,
    RetryPolicy, StorageDispatcher, StorageTarget,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BODY: &str = r#"{"status":200}"#;

fn static_config(backend_type: BackendType) -> LogStoreConfig {
    LogStoreConfig {
        backend_type,
        bucket: "gateway-logs".to_string(),
        region: Some("eu-west-1".to_string()),
        access_key_id: Some("AKIASTATIC".to_string()),
        secret_access_key: Some("static-secret".to_string()),
        ..Default::default()
    }
}

fn payload() -> LogPayload {
    LogPayload::new("30/org-1/log-1.json", BODY)
}

#[tokio::test]
async fn test_s3_static_put() {
    let http = MockHttpSend::new().route("amazonaws.com", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        base_path: Some("gateway".to_string()),
        server_side_encryption: Some(ServerSideEncryption::S3Managed),
        ..static_config(BackendType::S3)
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    let put = &requests[0];
    assert_eq!(put.method, http::Method::PUT);
    assert_eq!(
        put.uri,
        "https://gateway-logs.s3.eu-west-1.amazonaws.com/gateway/30/org-1/log-1.json"
    );
    assert_eq!(signing_key(put).as_deref(), Some("AKIASTATIC"));
    assert!(put.headers["authorization"]
        .to_str()
        .unwrap()
        .contains("/eu-west-1/s3/aws4_request"));
    assert_eq!(put.headers["x-amz-server-side-encryption"], "AES256");
    assert_eq!(put.headers["content-type"], "application/json");
    assert_eq!(put.headers["content-length"], BODY.len().to_string());
    assert!(put.headers.contains_key("x-amz-content-sha256"));
    assert!(!put.headers.contains_key("content-md5"));
    assert_eq!(put.body, BODY);
}

#[tokio::test]
async fn test_temporary_keys_send_session_token() {
    let http = MockHttpSend::new().route("wasabisys.com", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        session_token: Some("config-session".to_string()),
        ..static_config(BackendType::Wasabi)
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();

    let tenant = StorageTarget::new(BackendType::Wasabi, "tenant-logs").with_credentials(
        CredentialsOverride {
            access_key_id: Some("ASIATENANT".to_string()),
            secret_access_key: Some("tenant-secret".to_string()),
            session_token: Some("tenant-session".to_string()),
            ..Default::default()
        },
    );
    dispatcher.put(&tenant, &payload()).await.unwrap();

    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].uri,
        "https://s3.eu-west-1.wasabisys.com/tenant-logs/30/org-1/log-1.json"
    );
    assert_eq!(signing_key(&requests[0]).as_deref(), Some("AKIASTATIC"));
    assert_eq!(requests[0].headers["x-amz-security-token"], "config-session");
    assert!(requests[0].headers["authorization"]
        .to_str()
        .unwrap()
        .contains("x-amz-security-token"));
    assert_eq!(signing_key(&requests[1]).as_deref(), Some("ASIATENANT"));
    assert_eq!(requests[1].headers["x-amz-security-token"], "tenant-session");
}

#[tokio::test]
async fn test_s3_kms_and_object_lock() {
    let http = MockHttpSend::new().route("amazonaws.com", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        server_side_encryption: Some(ServerSideEncryption::Kms {
            key_id: Some("alias/logs".to_string()),
        }),
        object_lock: Some(ObjectLock {
            mode: "COMPLIANCE".to_string(),
            retention_days: 7,
        }),
        ..static_config(BackendType::S3)
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();

    let requests = http.requests();
    let put = &requests[0];
    assert_eq!(put.headers["x-amz-server-side-encryption"], "aws:kms");
    assert_eq!(
        put.headers["x-amz-server-side-encryption-aws-kms-key-id"],
        "alias/logs"
    );
    assert_eq!(put.headers["x-amz-object-lock-mode"], "COMPLIANCE");
    assert!(put.headers.contains_key("x-amz-object-lock-retain-until-date"));
    assert_eq!(
        put.headers["content-md5"],
        logship::hash::base64_encode(&md5_of(BODY))
    );
}

fn md5_of(body: &str) -> Vec<u8> {
    use md5::{Digest, Md5};
    Md5::digest(body.as_bytes()).to_vec()
}

#[tokio::test]
async fn test_s3_compatible_endpoints() {
    let http = MockHttpSend::new()
        .route("storage.googleapis.com", 200, "")
        .route("wasabisys.com", 200, "")
        .route("grid.example.com", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        endpoint: Some("https://grid.example.com:8082".to_string()),
        ..static_config(BackendType::S3)
    };
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    for backend_type in [
        BackendType::Gcs,
        BackendType::Wasabi,
        BackendType::NetApp,
        BackendType::CustomS3,
    ] {
        let target = StorageTarget::new(backend_type, "gateway-logs").with_region("eu-west-1");
        dispatcher.put(&target, &payload()).await.unwrap();
    }

    let uris: Vec<_> = http.requests().into_iter().map(|r| r.uri).collect();
    assert_eq!(
        uris,
        vec![
            "https://storage.googleapis.com/gateway-logs/30/org-1/log-1.json",
            "https://s3.eu-west-1.wasabisys.com/gateway-logs/30/org-1/log-1.json",
            "https://grid.example.com:8082/gateway-logs/30/org-1/log-1.json",
            "https://grid.example.com:8082/gateway-logs/30/org-1/log-1.json",
        ]
    );
    let requests = http.requests();
    let gcs = &requests[0];
    assert!(gcs.headers["authorization"]
        .to_str()
        .unwrap()
        .contains("/auto/s3/aws4_request"));
}

#[tokio::test]
async fn test_custom_endpoint_required() {
    let http = MockHttpSend::new();
    let ctx = create_test_context(&http, &[]);
    let dispatcher = StorageDispatcher::from_config(ctx, static_config(BackendType::NetApp));

    let target = StorageTarget::new(BackendType::NetApp, "gateway-logs");
    let err = dispatcher.put(&target, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Unsupported { .. }), "{err}");
}

#[tokio::test]
async fn test_static_keys_missing() {
    let http = MockHttpSend::new();
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        bucket: "gateway-logs".to_string(),
        ..Default::default()
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    let err = dispatcher.put(&target, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::ChainExhausted { .. }), "{err}");
    assert!(http.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failure_after_retries() {
    let http = MockHttpSend::new().route("amazonaws.com", 503, "SlowDown");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        retry: RetryPolicy::new(3, Duration::from_millis(100)),
        ..static_config(BackendType::S3)
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    let err = dispatcher.put(&target, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Delivery { .. }), "{err}");
    assert!(err.to_string().starts_with("backend=s3: delivery failed"));
    assert_eq!(http.count("amazonaws.com"), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let http = MockHttpSend::new().route("amazonaws.com", 403, "AccessDenied");
    let ctx = create_test_context(&http, &[]);
    let config = static_config(BackendType::S3);
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    let err = dispatcher.put(&target, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Delivery { .. }), "{err}");
    assert_eq!(http.count("amazonaws.com"), 1);
}

#[tokio::test]
async fn test_s3_get_and_presign() {
    let http = MockHttpSend::new().route("amazonaws.com", 200, BODY);
    let ctx = create_test_context(&http, &[]);
    let config = static_config(BackendType::S3);
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    let body = dispatcher.get(&target, "30/org-1/log-1.json").await.unwrap();
    assert_eq!(body, Bytes::from(BODY));
    assert_eq!(http.requests()[0].method, http::Method::GET);

    let url = dispatcher
        .presign_get(&target, "30/org-1/log-1.json", Duration::from_secs(300))
        .await
        .unwrap();
    let object = "https://gateway-logs.s3.eu-west-1.amazonaws.com/30/org-1/log-1.json?";
    assert!(url.starts_with(object));
    assert!(url.contains("X-Amz-Expires=300"));
    assert!(url.contains("X-Amz-Signature="));
    assert!(url.contains("AKIASTATIC"));
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_gcs_workload_identity() {
    let http = MockHttpSend::new()
        .route(
            "computeMetadata",
            200,
            r#"{"access_token":"ya29.vm","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .route("storage.googleapis.com", 200, "");
    let ctx = create_test_context(&http, &[("GCE_METADATA_HOST", "metadata.test")]);
    let config = LogStoreConfig {
        backend_type: BackendType::GcsAssume,
        bucket: "gateway-logs".to_string(),
        ..Default::default()
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();
    dispatcher.put(&target, &payload()).await.unwrap();

    assert_eq!(http.count("computeMetadata"), 1);
    let puts: Vec<_> = http
        .requests()
        .into_iter()
        .filter(|r| r.uri.contains("storage.googleapis.com"))
        .collect();
    assert_eq!(puts.len(), 2);
    assert_eq!(
        puts[0].uri,
        "https://storage.googleapis.com/gateway-logs/30/org-1/log-1.json"
    );
    assert_eq!(puts[0].headers["authorization"], "Bearer ya29.vm");

    let err = dispatcher
        .presign_get(&target, "30/org-1/log-1.json", Duration::from_secs(60))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Unsupported { .. }), "{err}");
}

#[tokio::test]
async fn test_gcs_workload_identity_absent() {
    let http = MockHttpSend::new();
    let ctx = create_test_context(&http, &[]);
    let dispatcher = StorageDispatcher::from_config(ctx, LogStoreConfig::default());

    let target = StorageTarget::new(BackendType::GcsAssume, "gateway-logs");
    let err = dispatcher.put(&target, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::ChainExhausted { .. }), "{err}");
}

#[tokio::test]
async fn test_azure_shared_key() {
    let http = MockHttpSend::new().route("blob.core.windows.net", 201, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        backend_type: BackendType::Azure,
        bucket: "gateway-logs".to_string(),
        azure_account_name: Some("gatewayacct".to_string()),
        azure_account_key: Some("a2V5".to_string()),
        azure_auth_mode: AzureAuthMode::SharedKey,
        ..Default::default()
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();

    let requests = http.requests();
    let put = &requests[0];
    assert_eq!(
        put.uri,
        "https://gatewayacct.blob.core.windows.net/gateway-logs/30/org-1/log-1.json"
    );
    assert!(put.headers["authorization"]
        .to_str()
        .unwrap()
        .starts_with("SharedKey gatewayacct:"));
    assert_eq!(put.headers["x-ms-blob-type"], "BlockBlob");
    assert!(put.headers.contains_key("x-ms-date"));
    assert!(put.headers.contains_key("x-ms-version"));
    assert_eq!(put.body, BODY);
}

#[tokio::test]
async fn test_azure_prefers_entra_token() {
    let http = MockHttpSend::new()
        .route(
            "login.microsoftonline.com",
            200,
            r#"{"access_token":"entra-token","expires_in":3599}"#,
        )
        .route("blob.core.windows.net", 201, "");
    let ctx = create_test_context(
        &http,
        &[
            ("AZURE_TENANT_ID", "tenant-1"),
            ("AZURE_CLIENT_ID", "client-1"),
            ("AZURE_CLIENT_SECRET", "secret-1"),
        ],
    );
    let config = LogStoreConfig {
        backend_type: BackendType::Azure,
        bucket: "gateway-logs".to_string(),
        azure_account_name: Some("gatewayacct".to_string()),
        azure_account_key: Some("a2V5".to_string()),
        ..Default::default()
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher.put(&target, &payload()).await.unwrap();

    let put = http
        .requests()
        .into_iter()
        .find(|r| r.uri.contains("blob.core.windows.net"))
        .unwrap();
    assert_eq!(put.headers["authorization"], "Bearer entra-token");
}

#[derive(Debug, Default, Clone)]
struct RecordingSink {
    writes: Arc<Mutex<Vec<(String, Bytes)>>>,
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn write(&self, path: &str, body: Bytes) -> anyhow::Result<()> {
        self.writes.lock().unwrap().push((path.to_string(), body));
        Ok(())
    }

    async fn read(&self, _: &str) -> anyhow::Result<Bytes> {
        anyhow::bail!("control plane does not serve reads")
    }
}

#[tokio::test]
async fn test_delegated_backends() {
    let http = MockHttpSend::new();
    let ctx = create_test_context(&http, &[]);
    let sink = RecordingSink::default();
    let dispatcher = StorageDispatcher::from_config(ctx, LogStoreConfig::default())
        .with_control_plane(sink.clone());

    let control_plane = StorageTarget::new(BackendType::ControlPlane, "logs");
    dispatcher.put(&control_plane, &payload()).await.unwrap();
    assert_eq!(
        sink.writes.lock().unwrap().clone(),
        vec![("30/org-1/log-1.json".to_string(), Bytes::from(BODY))]
    );

    let err = dispatcher
        .get(&control_plane, "30/org-1/log-1.json")
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Collaborator { .. }), "{err}");

    let document_store = StorageTarget::new(BackendType::DocumentStore, "logs");
    let err = dispatcher.put(&document_store, &payload()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Unsupported { .. }), "{err}");

    dispatcher.put_and_forget(&document_store, &payload()).await;
    dispatcher.put_and_forget(&control_plane, &payload()).await;
    assert_eq!(dispatcher.dropped_writes(), 1);
    assert!(http.requests().is_empty());
}
