// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::common::{container_credentials, web_identity_response, MockHttpSend};
use crate::create_test_context;
use logship_aws_v4::constants::*;
use logship_aws_v4::{CredentialResolver, CredentialSource, ResolveRequest};
use pretty_assertions::assert_eq;

const POD_IDENTITY_URI: &str = "http://169.254.170.23/v1/credentials";
const TASK_URI: &str = "/v2/credentials/task-1";

fn instance_metadata(http: MockHttpSend) -> MockHttpSend {
    http.route("/latest/api/token", 200, "imds-token")
        .route(
            "/security-credentials/node-role",
            200,
            container_credentials("ASIANODE"),
        )
        .route("/security-credentials/", 200, "node-role")
}

#[tokio::test]
async fn test_pod_identity_reads_token_file_first() {
    let dir = tempfile::tempdir().unwrap();
    let token = dir.path().join("eks-pod-identity-token");
    std::fs::write(&token, "file-token\n").unwrap();

    let http = MockHttpSend::new().route("169.254.170.23", 200, container_credentials("ASIAPOD"));
    let ctx = create_test_context(
        &http,
        &[
            (AWS_CONTAINER_CREDENTIALS_FULL_URI, POD_IDENTITY_URI),
            (
                AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE,
                token.to_str().unwrap(),
            ),
            (AWS_CONTAINER_AUTHORIZATION_TOKEN, "env-token"),
        ],
    );
    let resolver = CredentialResolver::default();

    for _ in 0..2 {
        let cred = resolver
            .resolve(&ctx, &ResolveRequest::new())
            .await
            .expect("pod identity must resolve");
        assert_eq!(cred.access_key_id, "ASIAPOD");
        assert_eq!(cred.session_token.as_deref(), Some("token-ASIAPOD"));
        assert_eq!(cred.source, Some(CredentialSource::PodIdentity));
    }

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].uri, POD_IDENTITY_URI);
    assert_eq!(requests[0].headers["authorization"], "file-token");
}

#[tokio::test]
async fn test_pod_identity_falls_back_to_env_token() {
    let http = MockHttpSend::new().route("169.254.170.23", 200, container_credentials("ASIAPOD"));
    let ctx = create_test_context(
        &http,
        &[
            (AWS_CONTAINER_CREDENTIALS_FULL_URI, POD_IDENTITY_URI),
            (AWS_CONTAINER_AUTHORIZATION_TOKEN, "env-token"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .expect("pod identity must resolve");
    assert_eq!(cred.access_key_id, "ASIAPOD");

    let requests = http.requests();
    assert_eq!(requests[0].headers["authorization"], "env-token");
}

#[tokio::test]
async fn test_web_identity_wins_over_pod_identity() {
    let dir = tempfile::tempdir().unwrap();
    let token = dir.path().join("token");
    std::fs::write(&token, "web-identity-token").unwrap();

    let http = MockHttpSend::new()
        .route(
            "AssumeRoleWithWebIdentity",
            200,
            web_identity_response("ASIAWEB"),
        )
        .route("169.254.170.23", 200, container_credentials("ASIAPOD"));
    let ctx = create_test_context(
        &http,
        &[
            (AWS_ROLE_ARN, "arn:aws:iam::111111111111:role/irsa"),
            (AWS_WEB_IDENTITY_TOKEN_FILE, token.to_str().unwrap()),
            (AWS_CONTAINER_CREDENTIALS_FULL_URI, POD_IDENTITY_URI),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.source, Some(CredentialSource::WebIdentity));
    assert_eq!(http.count("169.254.170.23"), 0);
}

#[tokio::test]
async fn test_pod_identity_wins_over_ecs_and_instance_metadata() {
    let http = instance_metadata(
        MockHttpSend::new()
            .route("169.254.170.23", 200, container_credentials("ASIAPOD"))
            .route(TASK_URI, 200, container_credentials("ASIATASK")),
    );
    let ctx = create_test_context(
        &http,
        &[
            (AWS_CONTAINER_CREDENTIALS_FULL_URI, POD_IDENTITY_URI),
            (AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, TASK_URI),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .unwrap();
    assert_eq!(cred.access_key_id, "ASIAPOD");
    assert_eq!(http.count(TASK_URI), 0);
    assert_eq!(http.count("/latest/"), 0);
}

#[tokio::test]
async fn test_ecs_joins_relative_uri_and_wins_over_instance_metadata() {
    let http = instance_metadata(MockHttpSend::new().route(
        TASK_URI,
        200,
        container_credentials("ASIATASK"),
    ));
    let ctx = create_test_context(&http, &[(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, TASK_URI)]);
    let resolver = CredentialResolver::default();

    for _ in 0..2 {
        let cred = resolver
            .resolve(&ctx, &ResolveRequest::new())
            .await
            .expect("ecs must resolve");
        assert_eq!(cred.access_key_id, "ASIATASK");
        assert_eq!(cred.source, Some(CredentialSource::Ecs));
        assert_eq!(cred.region.as_deref(), Some(DEFAULT_REGION));
    }

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].uri,
        "http://169.254.170.2/v2/credentials/task-1"
    );
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(http.count("/latest/"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_ecs_retries_server_errors() {
    let http = MockHttpSend::new().route(TASK_URI, 503, "").route(
        TASK_URI,
        200,
        container_credentials("ASIATASK"),
    );
    let ctx = create_test_context(
        &http,
        &[
            (AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, TASK_URI),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await
        .expect("second attempt must succeed");
    assert_eq!(cred.access_key_id, "ASIATASK");
    assert_eq!(http.count(TASK_URI), 2);
}

#[tokio::test]
async fn test_unparsable_container_document_falls_through() {
    let http = MockHttpSend::new().route(TASK_URI, 200, r#"{"Code": "Success"}"#);
    let ctx = create_test_context(
        &http,
        &[
            (AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, TASK_URI),
            (AWS_EC2_METADATA_DISABLED, "true"),
        ],
    );

    let cred = CredentialResolver::default()
        .resolve(&ctx, &ResolveRequest::new())
        .await;
    assert!(cred.is_none());
    assert_eq!(http.count(TASK_URI), 1);
}
