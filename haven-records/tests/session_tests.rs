mod support;

use haven_crypto::{
    derive_protection_key, generate_main_secret, unwrap_main_secret, wrap_main_secret, KdfParams,
    MainKeyEnvelope, Salt,
};
use haven_records::{change_password, open_session, register_keys, RecordError};
use support::authed_client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn identity_response(encrypted_key: &str, encryption_salt: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "u1",
        "encrypted_key": encrypted_key,
        "encryption_salt": encryption_salt,
    })
}

/// Pulls the last identity patch body the server saw.
async fn last_identity_patch(server: &MockServer) -> serde_json::Value {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|req| serde_json::from_slice::<serde_json::Value>(&req.body).ok())
        .filter(|body| body.get("encrypted_key").is_some())
        .next_back()
        .expect("no identity patch was sent")
}

#[tokio::test]
async fn register_persists_openable_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(identity_response("{}", "")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    let session = register_keys(&api, "u1", "correct horse").await.unwrap();

    // What reached the backend must open back into the session secret.
    let body = last_identity_patch(&server).await;
    let envelope: MainKeyEnvelope =
        serde_json::from_str(body["encrypted_key"].as_str().unwrap()).unwrap();
    let salt = Salt::from_base64(body["encryption_salt"].as_str().unwrap()).unwrap();

    let protection = derive_protection_key("correct horse", &salt, &KdfParams::default()).unwrap();
    let recovered = unwrap_main_secret(&envelope, &protection).unwrap();
    assert_eq!(recovered.as_bytes(), session.main_secret().as_bytes());
}

#[tokio::test]
async fn login_round_trip_recovers_main_secret() {
    let server = MockServer::start().await;
    let salt = Salt::random();
    let secret = generate_main_secret();
    let protection = derive_protection_key("correct horse", &salt, &KdfParams::default()).unwrap();
    let envelope = wrap_main_secret(&secret, &protection).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response(
            &serde_json::to_string(&envelope).unwrap(),
            &salt.to_base64(),
        )))
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    let session = open_session(&api, "u1", "correct horse").await.unwrap();
    assert_eq!(session.main_secret().as_bytes(), secret.as_bytes());
    assert_eq!(session.user_id(), "u1");
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let server = MockServer::start().await;
    let salt = Salt::random();
    let protection = derive_protection_key("correct horse", &salt, &KdfParams::default()).unwrap();
    let envelope = wrap_main_secret(&generate_main_secret(), &protection).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response(
            &serde_json::to_string(&envelope).unwrap(),
            &salt.to_base64(),
        )))
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    let result = open_session(&api, "u1", "battery staple").await;
    assert!(matches!(result, Err(RecordError::Crypto(_))));
}

#[tokio::test]
async fn login_accepts_legacy_double_encoded_envelope() {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let server = MockServer::start().await;
    let salt = Salt::random();
    let secret = generate_main_secret();
    let protection = derive_protection_key("correct horse", &salt, &KdfParams::default()).unwrap();
    let envelope = wrap_main_secret(&secret, &protection).unwrap();

    // Historical clients base64-encoded both fields a second time.
    let legacy = MainKeyEnvelope {
        iv: STANDARD.encode(envelope.iv.as_bytes()),
        data: STANDARD.encode(envelope.data.as_bytes()),
    };

    Mock::given(method("GET"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response(
            &serde_json::to_string(&legacy).unwrap(),
            &salt.to_base64(),
        )))
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    let session = open_session(&api, "u1", "correct horse").await.unwrap();
    assert_eq!(session.main_secret().as_bytes(), secret.as_bytes());
}

#[tokio::test]
async fn password_change_rewraps_without_touching_salt() {
    let server = MockServer::start().await;
    let salt = Salt::random();
    let secret = generate_main_secret();
    let old_protection = derive_protection_key("pw-one", &salt, &KdfParams::default()).unwrap();
    let envelope = wrap_main_secret(&secret, &old_protection).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response(
            &serde_json::to_string(&envelope).unwrap(),
            &salt.to_base64(),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(identity_response("{}", "")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    change_password(&api, "u1", "pw-one", "pw-two").await.unwrap();

    let body = last_identity_patch(&server).await;
    assert_eq!(body["encryption_salt"].as_str().unwrap(), salt.to_base64());

    // The new envelope opens under the new password and yields the
    // same main secret, so stored records stay readable.
    let new_envelope: MainKeyEnvelope =
        serde_json::from_str(body["encrypted_key"].as_str().unwrap()).unwrap();
    let new_protection = derive_protection_key("pw-two", &salt, &KdfParams::default()).unwrap();
    let recovered = unwrap_main_secret(&new_envelope, &new_protection).unwrap();
    assert_eq!(recovered.as_bytes(), secret.as_bytes());
}

#[tokio::test]
async fn password_change_with_wrong_old_password_writes_nothing() {
    let server = MockServer::start().await;
    let salt = Salt::random();
    let protection = derive_protection_key("pw-one", &salt, &KdfParams::default()).unwrap();
    let envelope = wrap_main_secret(&generate_main_secret(), &protection).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response(
            &serde_json::to_string(&envelope).unwrap(),
            &salt.to_base64(),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/collections/identities/records/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_response("{}", "")))
        .expect(0)
        .mount(&server)
        .await;

    let api = authed_client(&server).await;
    let result = change_password(&api, "u1", "wrong-old", "pw-two").await;
    assert!(matches!(result, Err(RecordError::Crypto(_))));
}
