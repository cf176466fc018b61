//! Scenario: HTTP gateway client wire format
//!
//! GREEN when:
//! - queries POST `{networkCode, query, values}` to `/{service}/{method}` with
//!   the bearer token and return the `results` array;
//! - creates POST `{networkCode, objects}`;
//! - non-2xx answers and `{"error": ...}` bodies surface as `RemoteError::Api`;
//! - a 2xx body without `results` is a decode error.

use gasp_admanager::{
    endpoints, AdManagerService, HttpAdManagerClient, RemoteError, Statement,
};
use gasp_config::load_layered_yaml_from_strings;
use gasp_config::secrets::ResolvedSecrets;
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer) -> HttpAdManagerClient {
    HttpAdManagerClient::new_with_base_url(server.base_url(), "1234".to_string())
        .with_token("test-token".to_string())
}

#[tokio::test]
async fn query_posts_statement_and_returns_results() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/OrderService/getOrdersByStatement")
                .header("authorization", "Bearer test-token")
                .json_body(json!({
                    "networkCode": "1234",
                    "query": "WHERE name IN (:v0)",
                    "values": {"v0": ["O1", "O2"]},
                }));
            then.status(200)
                .json_body(json!({"results": [{"id": 1, "name": "O1"}]}));
        })
        .await;

    let st = Statement::new().and_in("name", vec![json!("O1"), json!("O2")]);
    let out = client(&server).query(endpoints::ORDERS, &st).await.unwrap();

    mock.assert_async().await;
    assert_eq!(out, vec![json!({"id": 1, "name": "O1"})]);
}

#[tokio::test]
async fn create_posts_objects() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/LineItemCreativeAssociationService/createLineItemCreativeAssociations")
                .json_body(json!({
                    "networkCode": "1234",
                    "objects": [{"lineItemId": 10, "creativeId": 20}],
                }));
            then.status(200)
                .json_body(json!({"results": [{"lineItemId": 10, "creativeId": 20}]}));
        })
        .await;

    let out = client(&server)
        .create(
            endpoints::CREATE_ASSOCIATIONS,
            vec![json!({"lineItemId": 10, "creativeId": 20})],
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn http_error_status_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/CompanyService/getCompaniesByStatement");
            then.status(401)
                .json_body(json!({"error": {"code": "AUTHENTICATION_ERROR", "message": "bad token"}}));
        })
        .await;

    let err = client(&server)
        .query(endpoints::COMPANIES, &Statement::new().and_eq("name", json!("Acme")))
        .await
        .unwrap_err();

    match err {
        RemoteError::Api { status, message } => {
            assert_eq!(status, Some(401));
            assert!(message.contains("AUTHENTICATION_ERROR"), "{message}");
            assert!(message.contains("bad token"), "{message}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_body_on_success_status_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/UserService/getUsersByStatement");
            then.status(200)
                .json_body(json!({"error": {"message": "quota exceeded"}}));
        })
        .await;

    let err = client(&server)
        .query(endpoints::USERS, &Statement::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Api { status: None, .. }), "{err:?}");
}

#[tokio::test]
async fn missing_results_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/OrderService/getOrdersByStatement");
            then.status(200).json_body(json!({"totalResultSetSize": 0}));
        })
        .await;

    let err = client(&server)
        .query(endpoints::ORDERS, &Statement::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn from_config_reads_ad_manager_keys() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/gateway/UserService/getUsersByStatement")
                .header("x-application-name", "gasp-test")
                .json_body_partial(r#"{"networkCode": "98765"}"#);
            then.status(200).json_body(json!({"results": []}));
        })
        .await;

    let yaml = format!(
        "ad_manager:\n  base_url: {}/gateway/\n  network_code: 98765\n  application_name: gasp-test\n",
        server.base_url()
    );
    let cfg = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap();
    let secrets = ResolvedSecrets {
        ad_manager_token: None,
        token_env: "GASP_AD_MANAGER_TOKEN".to_string(),
    };

    let client = HttpAdManagerClient::from_config(&cfg, &secrets).unwrap();
    let out = client.query(endpoints::USERS, &Statement::new()).await.unwrap();

    mock.assert_async().await;
    assert!(out.is_empty());
}
