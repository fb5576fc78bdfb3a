use crate::common::{
    assume_role_response, container_credentials, signing_key, web_identity_response, MockHttpSend,
};
use crate::create_test_context;
use chrono::TimeDelta;
use logship_aws_v4::constants::*;
use logship_aws_v4::{CredentialResolver, CredentialSource, ResolveRequest};
use logship_core::time::{now, DateTime};
use logship_core::{CacheSelector, MemoryCache, RetryPolicy};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SOURCE_ROLE: &str = "arn:aws:iam::111111111111:role/source-role";
const TARGET_ROLE: &str = "arn:aws:iam::222222222222:role/target-role";

fn sts() -> MockHttpSend {
    MockHttpSend::new()
        .route("source-role", 200, assume_role_response("ASIASOURCE"))
        .route("target-role", 200, assume_role_response("ASIATARGET"))
}

#[tokio::test]
async fn test_explicit_keys_skip_every_other_source() {
    let http = sts();
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ASSUME_ROLE_SOURCE_ARN, SOURCE_ROLE),
            (AWS_ASSUME_ROLE_ACCESS_KEY_ID, "ENVAK"),
            (AWS_ASSUME_ROLE_SECRET_ACCESS_KEY, "ENVSK"),
            (AWS_ACCESS_KEY_ID, "CHAINAK"),
            (AWS_SECRET_ACCESS_KEY, "CHAINSK"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(
            &ctx,
            &ResolveRequest::new().with_keys("EXPLICITAK", "EXPLICITSK"),
        )
        .await
        .expect("explicit keys must resolve");

    assert_eq!(cred.access_key_id, "EXPLICITAK");
    assert_eq!(cred.source, Some(CredentialSource::Explicit));
    assert_eq!(cred.region.as_deref(), Some(DEFAULT_REGION));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_explicit_keys_assume_target_role() {
    let http = sts();
    let ctx = create_test_context(&http, &[(AWS_ASSUME_ROLE_SOURCE_ARN, SOURCE_ROLE)]);

    let req = ResolveRequest::new()
        .with_keys("EXPLICITAK", "EXPLICITSK")
        .with_role_arn(TARGET_ROLE)
        .with_external_id("ext-1");
    let cred = CredentialResolver::default()
        .resolve(&ctx, &req)
        .await
        .expect("role must be assumed");

    assert_eq!(cred.access_key_id, "ASIATARGET");
    assert_eq!(cred.session_token.as_deref(), Some("token-ASIATARGET"));
    assert_eq!(cred.role_arn.as_deref(), Some(TARGET_ROLE));
    assert_eq!(cred.source, Some(CredentialSource::AssumeRole));

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].uri.starts_with("https://sts.amazonaws.com/"));
    assert!(requests[0].uri.contains("Action=AssumeRole"));
    assert!(requests[0].uri.contains("ExternalId=ext-1"));
    assert_eq!(signing_key(&requests[0]).as_deref(), Some("EXPLICITAK"));
    assert_eq!(http.count("source-role"), 0);
}

#[tokio::test]
async fn test_source_role_chains_into_target_role() {
    let http = sts();
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ASSUME_ROLE_SOURCE_ARN, SOURCE_ROLE),
            (AWS_ASSUME_ROLE_ACCESS_KEY_ID, "ENVAK"),
            (AWS_ASSUME_ROLE_SECRET_ACCESS_KEY, "ENVSK"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new().with_role_arn(TARGET_ROLE))
        .await
        .expect("role chain must resolve");
    assert_eq!(cred.access_key_id, "ASIATARGET");

    let requests = http.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].uri.contains("source-role"));
    assert_eq!(signing_key(&requests[0]).as_deref(), Some("ENVAK"));
    assert!(requests[1].uri.contains("target-role"));
    assert_eq!(signing_key(&requests[1]).as_deref(), Some("ASIASOURCE"));
}

#[tokio::test(start_paused = true)]
async fn test_source_role_failure_does_not_fall_back() {
    let http = MockHttpSend::new().route(
        "source-role",
        403,
        "<ErrorResponse><Error><Code>AccessDenied</Code><Message>denied</Message></Error></ErrorResponse>",
    );
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ASSUME_ROLE_SOURCE_ARN, SOURCE_ROLE),
            (AWS_ASSUME_ROLE_ACCESS_KEY_ID, "ENVAK"),
            (AWS_ASSUME_ROLE_SECRET_ACCESS_KEY, "ENVSK"),
            (AWS_ACCESS_KEY_ID, "CHAINAK"),
            (AWS_SECRET_ACCESS_KEY, "CHAINSK"),
        ],
    );

    let resolver =
        CredentialResolver::default().with_retry(RetryPolicy::new(2, Duration::from_millis(10)));
    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new().with_role_arn(TARGET_ROLE))
        .await;

    assert!(cred.is_none());
    assert_eq!(http.count("source-role"), 2);
    assert_eq!(http.count("target-role"), 0);
}

#[tokio::test]
async fn test_env_assume_role_keys_without_source_role() {
    let http = sts();
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ASSUME_ROLE_ACCESS_KEY_ID, "ENVAK"),
            (AWS_ASSUME_ROLE_SECRET_ACCESS_KEY, "ENVSK"),
            (AWS_ACCESS_KEY_ID, "CHAINAK"),
            (AWS_SECRET_ACCESS_KEY, "CHAINSK"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .expect("env keys must resolve");
    assert_eq!(cred.access_key_id, "ENVAK");
    assert_eq!(cred.source, Some(CredentialSource::AssumeRoleEnvironment));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_role_already_satisfied_skips_sts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(
        &path,
        format!(
            "[default]\naws_access_key_id = FILEAK\naws_secret_access_key = FILESK\nrole_arn = {TARGET_ROLE}\n"
        ),
    )
    .unwrap();

    let http = sts();
    let ctx = create_test_context(
        &http,
        &[(AWS_SHARED_CREDENTIALS_FILE, path.to_str().unwrap())],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new().with_role_arn(TARGET_ROLE))
        .await
        .expect("file credential must resolve");

    assert_eq!(cred.access_key_id, "FILEAK");
    assert_eq!(cred.source, Some(CredentialSource::SharedCredentialsFile));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_assumed_role_is_cached_per_role_and_external_id() {
    let http = sts();
    let ctx = create_test_context(&http, &[]);
    let resolver = CredentialResolver::default();
    let req = ResolveRequest::new()
        .with_keys("EXPLICITAK", "EXPLICITSK")
        .with_role_arn(TARGET_ROLE);

    for _ in 0..3 {
        let cred = resolver.resolve(&ctx, &req).await.unwrap();
        assert_eq!(cred.access_key_id, "ASIATARGET");
    }
    assert_eq!(http.count("target-role"), 1);

    let other = req.clone().with_external_id("ext-2");
    resolver.resolve(&ctx, &other).await.unwrap();
    assert_eq!(http.count("target-role"), 2);

    let other_region = req.with_region("eu-west-1");
    resolver.resolve(&ctx, &other_region).await.unwrap();
    assert_eq!(http.count("target-role"), 3);
}

#[tokio::test]
async fn test_assumed_role_cache_expires_after_ttl() {
    let clock = Arc::new(Mutex::new(now()));
    let cache = {
        let clock = clock.clone();
        MemoryCache::new().with_clock(move || *clock.lock().unwrap())
    };
    let resolver = CredentialResolver::new(CacheSelector::new().with_local(cache), true);

    let http = sts();
    let ctx = create_test_context(&http, &[]);
    let req = ResolveRequest::new()
        .with_keys("EXPLICITAK", "EXPLICITSK")
        .with_role_arn(TARGET_ROLE);

    resolver.resolve(&ctx, &req).await.unwrap();
    advance(&clock, 299);
    resolver.resolve(&ctx, &req).await.unwrap();
    assert_eq!(http.count("target-role"), 1);

    advance(&clock, 2);
    resolver.resolve(&ctx, &req).await.unwrap();
    assert_eq!(http.count("target-role"), 2);
}

fn advance(clock: &Mutex<DateTime>, seconds: i64) {
    let mut t = clock.lock().unwrap();
    *t += TimeDelta::seconds(seconds);
}

#[tokio::test]
async fn test_region_fallback() {
    let http = MockHttpSend::new();
    let keys = [
        (AWS_ACCESS_KEY_ID, "CHAINAK"),
        (AWS_SECRET_ACCESS_KEY, "CHAINSK"),
    ];
    let resolver = CredentialResolver::default();

    let ctx = create_test_context(&http, &keys);
    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.region.as_deref(), Some("us-east-1"));

    let ctx = create_test_context(
        &http,
        &[keys[0], keys[1], (AWS_DEFAULT_REGION, "eu-west-1")],
    );
    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.region.as_deref(), Some("eu-west-1"));

    let ctx = create_test_context(
        &http,
        &[
            keys[0],
            keys[1],
            (AWS_REGION, "eu-west-1"),
            (AWS_ASSUME_ROLE_REGION, "ap-south-1"),
        ],
    );
    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.region.as_deref(), Some("ap-south-1"));

    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new().with_region("sa-east-1"))
        .await
        .unwrap();
    assert_eq!(cred.region.as_deref(), Some("sa-east-1"));
}

#[tokio::test]
async fn test_regional_sts_endpoint() {
    let http = sts();
    let ctx = create_test_context(&http, &[(AWS_STS_REGIONAL_ENDPOINTS, "regional")]);

    let req = ResolveRequest::new()
        .with_keys("EXPLICITAK", "EXPLICITSK")
        .with_role_arn(TARGET_ROLE)
        .with_region("eu-west-1");
    let cred = CredentialResolver::default()
        .resolve(&ctx, &req)
        .await
        .unwrap();

    assert_eq!(cred.region.as_deref(), Some("eu-west-1"));
    let requests = http.requests();
    assert!(requests[0]
        .uri
        .starts_with("https://sts.eu-west-1.amazonaws.com/"));
}

#[tokio::test]
async fn test_instance_metadata_is_cached() {
    let http = MockHttpSend::new()
        .route("/latest/api/token", 200, "imds-token")
        .route(
            "/security-credentials/node-role",
            200,
            container_credentials("ASIANODE"),
        )
        .route("/security-credentials/", 200, "node-role")
        .route("target-role", 200, assume_role_response("ASIATARGET"));
    let ctx = create_test_context(&http, &[]);
    let resolver = CredentialResolver::default();

    let cred = resolver
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.access_key_id, "ASIANODE");
    assert_eq!(cred.source, Some(CredentialSource::Imds));

    let req = ResolveRequest::new().with_role_arn(TARGET_ROLE);
    let cred = resolver.resolve(&ctx, &req).await.unwrap();
    assert_eq!(cred.access_key_id, "ASIATARGET");

    assert_eq!(http.count("/security-credentials/node-role"), 1);
    let sts_call = http
        .requests()
        .into_iter()
        .find(|r| r.uri.contains("target-role"))
        .unwrap();
    assert_eq!(signing_key(&sts_call).as_deref(), Some("ASIANODE"));
}

#[tokio::test]
async fn test_web_identity_source() {
    let dir = tempfile::tempdir().unwrap();
    let token = dir.path().join("token");
    std::fs::write(&token, "web-identity-token").unwrap();

    let http = MockHttpSend::new().route(
        "AssumeRoleWithWebIdentity",
        200,
        web_identity_response("ASIAWEB"),
    );
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ROLE_ARN, SOURCE_ROLE),
            (AWS_WEB_IDENTITY_TOKEN_FILE, token.to_str().unwrap()),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ],
    );
    let resolver = CredentialResolver::default();

    for _ in 0..2 {
        let cred = resolver
            .resolve(&ctx, &ResolveRequest::new())
            .await
            .unwrap();
        assert_eq!(cred.access_key_id, "ASIAWEB");
        assert_eq!(cred.source, Some(CredentialSource::WebIdentity));
        assert_eq!(cred.role_arn.as_deref(), Some(SOURCE_ROLE));
    }
    assert_eq!(http.count("AssumeRoleWithWebIdentity"), 1);
    assert!(http.requests()[0]
        .uri
        .contains("WebIdentityToken=web-identity-token"));
}

#[tokio::test(start_paused = true)]
async fn test_web_identity_retries_server_errors() {
    let dir = tempfile::tempdir().unwrap();
    let token = dir.path().join("token");
    std::fs::write(&token, "web-identity-token").unwrap();

    let http = MockHttpSend::new()
        .route("AssumeRoleWithWebIdentity", 500, "")
        .route(
            "AssumeRoleWithWebIdentity",
            200,
            web_identity_response("ASIAWEB"),
        );
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ROLE_ARN, SOURCE_ROLE),
            (AWS_WEB_IDENTITY_TOKEN_FILE, token.to_str().unwrap()),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .expect("second STS attempt must succeed");

    assert_eq!(cred.access_key_id, "ASIAWEB");
    assert_eq!(http.count("AssumeRoleWithWebIdentity"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_web_identity_gives_up_after_max_retries() {
    let dir = tempfile::tempdir().unwrap();
    let token = dir.path().join("token");
    std::fs::write(&token, "web-identity-token").unwrap();

    let http = MockHttpSend::new().route("AssumeRoleWithWebIdentity", 503, "");
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ROLE_ARN, SOURCE_ROLE),
            (AWS_WEB_IDENTITY_TOKEN_FILE, token.to_str().unwrap()),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ],
    );

    let resolver =
        CredentialResolver::default().with_retry(RetryPolicy::new(4, Duration::from_millis(10)));
    let cred = resolver.resolve(&ctx, &ResolveRequest::new()).await;

    assert!(cred.is_none());
    assert_eq!(http.count("AssumeRoleWithWebIdentity"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_instance_metadata_retries_dropped_token_request() {
    let http = MockHttpSend::new()
        .route("/latest/api/token", 500, "")
        .route("/latest/api/token", 200, "imds-token")
        .route(
            "/security-credentials/node-role",
            200,
            container_credentials("ASIANODE"),
        )
        .route("/security-credentials/", 200, "node-role");
    let ctx = create_test_context(&http, &[]);

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .expect("instance metadata must resolve after one retry");

    assert_eq!(cred.access_key_id, "ASIANODE");
    assert_eq!(http.count("/latest/api/token"), 2);
}

#[tokio::test]
async fn test_nothing_resolves() {
    let http = MockHttpSend::new();
    let ctx = create_test_context(&http, &[(AWS_EC2_METADATA_DISABLED, "true")]);

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new().with_role_arn(TARGET_ROLE))
        .await;
    assert!(cred.is_none());
    assert!(http.requests().is_empty());
}
