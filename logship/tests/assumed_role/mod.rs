use crate::common::{assume_role_response, container_credentials, signing_key, MockHttpSend};
use crate::create_test_context;
use logship::{BackendType, LogPayload, LogStoreConfig, StorageDispatcher};
use pretty_assertions::assert_eq;

const ROLE: &str = "arn:aws:iam::222222222222:role/log-writer";

fn instance_with_role() -> MockHttpSend {
    MockHttpSend::new()
        .route("/latest/api/token", 200, "imds-token")
        .route(
            "/security-credentials/node-role",
            200,
            container_credentials("ASIANODE"),
        )
        .route("/security-credentials/", 200, "node-role")
        .route("log-writer", 200, assume_role_response("ASIAWRITER"))
}

#[tokio::test(start_paused = true)]
async fn test_put_through_assumed_role() {
    let http = instance_with_role()
        .route("gateway-logs.s3", 500, "")
        .route("gateway-logs.s3", 500, "")
        .route("gateway-logs.s3", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        backend_type: BackendType::S3Assume,
        bucket: "gateway-logs".to_string(),
        role_arn: Some(ROLE.to_string()),
        external_id: Some("gateway".to_string()),
        ..Default::default()
    };
    let target = config.target();
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    dispatcher
        .put(&target, &LogPayload::new("30/org-1/log-1.json", "{}"))
        .await
        .expect("put must succeed on the third attempt");

    assert_eq!(http.count("/security-credentials/node-role"), 1);
    assert_eq!(http.count("log-writer"), 1);
    assert_eq!(http.count("gateway-logs.s3"), 3);

    let sts = http
        .requests()
        .into_iter()
        .find(|r| r.uri.contains("log-writer"))
        .unwrap();
    assert_eq!(signing_key(&sts).as_deref(), Some("ASIANODE"));
    assert!(sts.uri.contains("ExternalId=gateway"));

    let puts: Vec<_> = http
        .requests()
        .into_iter()
        .filter(|r| r.uri.contains("gateway-logs.s3"))
        .collect();
    for put in &puts {
        assert_eq!(put.method, http::Method::PUT);
        assert_eq!(
            put.uri,
            "https://gateway-logs.s3.us-east-1.amazonaws.com/30/org-1/log-1.json"
        );
        assert_eq!(signing_key(put).as_deref(), Some("ASIAWRITER"));
        assert_eq!(put.headers["x-amz-security-token"], "token-ASIAWRITER");
        assert_eq!(put.body, "{}");
    }

    // The second write reuses both the instance credentials and the role.
    dispatcher
        .put(&target, &LogPayload::new("30/org-1/log-2.json", "{}"))
        .await
        .unwrap();

    assert_eq!(http.count("/security-credentials/node-role"), 1);
    assert_eq!(http.count("log-writer"), 1);
    assert_eq!(http.count("gateway-logs.s3"), 4);
    assert_eq!(dispatcher.dropped_writes(), 0);
}

#[tokio::test]
async fn test_target_role_override() {
    let http = instance_with_role()
        .route("tenant-role", 200, assume_role_response("ASIATENANT"))
        .route("tenant-logs.s3", 200, "");
    let ctx = create_test_context(&http, &[]);
    let config = LogStoreConfig {
        backend_type: BackendType::S3Assume,
        bucket: "gateway-logs".to_string(),
        role_arn: Some(ROLE.to_string()),
        ..Default::default()
    };
    let dispatcher = StorageDispatcher::from_config(ctx, config);

    let target = logship::StorageTarget::new(BackendType::S3Assume, "tenant-logs")
        .with_region("eu-central-1")
        .with_credentials(logship::CredentialsOverride {
            role_arn: Some("arn:aws:iam::333333333333:role/tenant-role".to_string()),
            ..Default::default()
        });
    dispatcher
        .put(&target, &LogPayload::new("7/org-2/log-1.json", "{}"))
        .await
        .unwrap();

    assert_eq!(http.count("log-writer"), 0);
    let put = http
        .requests()
        .into_iter()
        .find(|r| r.uri.contains("tenant-logs.s3"))
        .unwrap();
    assert_eq!(
        put.uri,
        "https://tenant-logs.s3.eu-central-1.amazonaws.com/7/org-2/log-1.json"
    );
    assert_eq!(signing_key(&put).as_deref(), Some("ASIATENANT"));
}
