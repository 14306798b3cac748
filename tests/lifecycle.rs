//! Credential lifecycle scenarios against an in-process mock of the administrative API.

use ceph_s3_credentials::{
    CephFactory, DeleteUserRequest, Factory, InitializeRequest, Lifecycle, NewUserRequest,
    UpdateUserRequest, UsernameMetadata,
};
use serde_json::{json, Map, Value};
use test_utils::{closed_endpoint, MockAdmin, Reply};

fn config(endpoint: &str) -> Map<String, Value> {
    let Value::Object(map) = json!({
        "endpoint": endpoint,
        "admin-username": "admin",
        "admin-password": "hunter2",
        "rgw-identity": "testing",
    }) else {
        panic!("expected object");
    };
    map
}

fn new_user(password: &str) -> NewUserRequest {
    NewUserRequest {
        username_config: UsernameMetadata {
            display_name: "token".into(),
            role_name: "readonly".into(),
        },
        password: password.into(),
        ..NewUserRequest::default()
    }
}

fn delete_user(access_key: &str) -> DeleteUserRequest {
    DeleteUserRequest {
        username: access_key.into(),
        ..DeleteUserRequest::default()
    }
}

// Initialize, issue a key, then revoke it.
#[tokio::test]
async fn issue_and_revoke() {
    let mock = MockAdmin::start().await;
    mock.set_create_key(Reply::json(201, &json!([{"access_key": "AK1", "secret_key": "secretXYZ"}])));

    let mut provider = CephFactory.create().expect("should create");
    let resp = provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");
    assert_eq!(resp.config, config(&mock.url()));

    let resp = provider.new_user(new_user("secretXYZ")).await.expect("should issue");
    assert_eq!(resp.username, "AK1");

    let create = mock.requests_to("/api/rgw/user/testing/key");
    assert_eq!(create.len(), 1);
    assert_eq!(create[0].authorization.as_deref(), Some("Bearer T1"));
    assert_eq!(
        create[0].body,
        Some(json!({"access_key": "", "secret_key": "secretXYZ", "key_type": "s3"}))
    );

    provider.delete_user(delete_user("AK1")).await.expect("should revoke");

    let reqs = mock.requests_to("/api/rgw/user/testing/key");
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[1].method, "DELETE");
    assert_eq!(reqs[1].query.as_deref(), Some("access_key=AK1"));
}

// The access key returned belongs to the secret supplied, not to another key on the identity.
#[tokio::test]
async fn issue_picks_matching_key() {
    let mock = MockAdmin::start().await;
    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");

    let first = provider.new_user(new_user("secret-one")).await.expect("should issue");
    let second = provider.new_user(new_user("secret-two")).await.expect("should issue");
    assert_eq!(first.username, "AK1");
    assert_eq!(second.username, "AK2");
}

#[tokio::test]
async fn issue_not_in_response() {
    let mock = MockAdmin::start().await;
    mock.set_create_key(Reply::json(
        201,
        &json!([{"access_key": "AK0", "secret_key": "other"}, {"access_key": "AK9", "secret_key": "another"}]),
    ));

    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");

    let err = provider.new_user(new_user("secretXYZ")).await.expect_err("should fail");
    assert_eq!(err.code(), "not_found_in_response");
    assert_eq!(err.to_json()["error"], "not_found_in_response");
}

// A failed login leaves the provider unusable and makes no further calls.
#[tokio::test]
async fn auth_failure() {
    let mock = MockAdmin::start().await;
    mock.set_token("");

    let mut provider = CephFactory.create().expect("should create");
    let err = provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect_err("should fail");
    assert_eq!(err.code(), "empty_token");

    let err = provider.new_user(new_user("secretXYZ")).await.expect_err("should not be ready");
    assert_eq!(err.code(), "not_ready");
    let err = provider.delete_user(delete_user("AK1")).await.expect_err("should not be ready");
    assert_eq!(err.code(), "not_ready");

    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn unreachable_cluster() {
    let endpoint = closed_endpoint().await;
    let mut provider = CephFactory.create().expect("should create");
    let err = provider
        .initialize(InitializeRequest {
            config: config(&endpoint),
        })
        .await
        .expect_err("should fail");
    assert_eq!(err.code(), "transport_error");
}

#[tokio::test]
async fn invalid_config() {
    let mut provider = CephFactory.create().expect("should create");
    let mut config = config("https://ceph.example.com");
    config.remove("rgw-identity");

    let err = provider.initialize(InitializeRequest { config }).await.expect_err("should fail");
    assert_eq!(err.code(), "missing_config_key");
    assert_eq!(err.to_string(), "missing config key: rgw-identity");
}

// Each operation logs in afresh.
#[tokio::test]
async fn authenticate_per_call() {
    let mock = MockAdmin::start().await;
    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");
    assert_eq!(mock.requests_to("/api/auth").len(), 1);

    let resp = provider.new_user(new_user("secretXYZ")).await.expect("should issue");
    provider.delete_user(delete_user(&resp.username)).await.expect("should revoke");
    assert_eq!(mock.requests_to("/api/auth").len(), 3);
}

// Configuration is copied at initialize; a new initialize replaces it.
#[tokio::test]
async fn reinitialize() {
    let first = MockAdmin::start().await;
    let second = MockAdmin::start().await;

    let mut provider = CephFactory.create().expect("should create");
    let mut map = config(&first.url());
    provider
        .initialize(InitializeRequest { config: map.clone() })
        .await
        .expect("should initialize");

    map.insert("rgw-identity".into(), json!("elsewhere"));
    provider.new_user(new_user("secret-one")).await.expect("should issue");
    assert_eq!(first.requests_to("/api/rgw/user/testing/key").len(), 1);

    map.insert("endpoint".into(), json!(second.url()));
    provider.initialize(InitializeRequest { config: map }).await.expect("should initialize");
    provider.new_user(new_user("secret-two")).await.expect("should issue");
    assert_eq!(second.requests_to("/api/rgw/user/elsewhere/key").len(), 1);
    assert_eq!(first.requests_to("/api/rgw/user/testing/key").len(), 1);
}

#[tokio::test]
async fn verify_identity() {
    let mock = MockAdmin::start().await;
    mock.set_identities(&["admin", "testing"]);

    let mut config = config(&mock.url());
    config.insert("verify-identity".into(), json!(true));

    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest { config: config.clone() })
        .await
        .expect("should initialize");
    assert_eq!(mock.requests_to("/api/rgw/user").len(), 1);

    mock.set_identities(&["admin"]);
    let mut provider = CephFactory.create().expect("should create");
    let err = provider.initialize(InitializeRequest { config }).await.expect_err("should fail");
    assert_eq!(err.code(), "unknown_identity");
    assert_eq!(err.to_string(), "identity testing not found");
}

// Identities are not listed unless asked for.
#[tokio::test]
async fn skip_identity_check() {
    let mock = MockAdmin::start().await;
    mock.set_identities(&[]);

    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");
    assert!(mock.requests_to("/api/rgw/user").is_empty());
}

#[tokio::test]
async fn revoke_failure() {
    let mock = MockAdmin::start().await;
    mock.set_delete_key(Reply::new(404, "NoSuchKey"));

    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");

    let err = provider.delete_user(delete_user("AK1")).await.expect_err("should fail");
    assert_eq!(err.code(), "unexpected_status");
    assert!(err.to_string().contains("404"));

    let err = provider.delete_user(delete_user("")).await.expect_err("should fail");
    assert_eq!(err.code(), "invalid_request");
}

// Updates succeed without touching the cluster.
#[tokio::test]
async fn update_is_noop() {
    let mock = MockAdmin::start().await;
    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");
    let before = mock.requests().len();

    provider
        .update_user(UpdateUserRequest {
            username: "AK1".into(),
            password: Some("rotated".into()),
            expiration: None,
        })
        .await
        .expect("should succeed");
    assert_eq!(mock.requests().len(), before);
}

#[tokio::test]
async fn close() {
    let mock = MockAdmin::start().await;
    let mut provider = CephFactory.create().expect("should create");
    provider
        .initialize(InitializeRequest {
            config: config(&mock.url()),
        })
        .await
        .expect("should initialize");
    assert_eq!(provider.kind(), "Ceph-S3");

    provider.close().expect("should close");
    let err = provider.new_user(new_user("secretXYZ")).await.expect_err("should be closed");
    assert_eq!(err.code(), "closed");
    assert!(provider.secret_values().is_empty());
}
