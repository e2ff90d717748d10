#![allow(dead_code)]

use haven_crypto::generate_main_secret;
use haven_records::{RecordApiClient, ServiceConfig, Session};
use wiremock::MockServer;

pub fn test_config(server: &MockServer) -> ServiceConfig {
    ServiceConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        page_size: 50,
    }
}

pub async fn authed_client(server: &MockServer) -> RecordApiClient {
    let client = RecordApiClient::new(test_config(server)).unwrap();
    client.set_session_token("sess-token".into()).await;
    client
}

pub fn test_session() -> Session {
    Session::new("u1", generate_main_secret())
}

pub fn record_json(id: &str, namespace: &str, guard: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "module_namespace": namespace,
        "payload": "",
        "cipher_iv": "",
        "guard": guard,
    })
}
