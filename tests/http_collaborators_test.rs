// End-to-end sign-in against local stand-ins for the Google and Firebase endpoints
use actix_web::{web, App, HttpResponse, HttpServer};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use smoking_auth::models::SignInPayload;
use smoking_auth::session::{SessionManager, SessionState};
use smoking_auth::settings::SignInSettings;
use smoking_auth::utils::crypto::pkce_challenge;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

const API_KEY: &str = "test-api-key";
const AUTH_CODE: &str = "4/auth-code-1";

#[derive(Default)]
struct FakeEndpoints {
    expected_nonce: Mutex<Option<String>>,
    expected_challenge: Mutex<Option<String>>,
    reject_idp: AtomicBool,
    refreshes: AtomicUsize,
    revocations: AtomicUsize,
}

fn fake_id_token(claims: &Value) -> String {
    let encode = |value: &Value| {
        general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    };
    format!(
        "{}.{}.signature",
        encode(&json!({"alg": "RS256", "typ": "JWT"})),
        encode(claims)
    )
}

async fn google_token(
    fake: web::Data<FakeEndpoints>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    let verifier = form.get("code_verifier").cloned().unwrap_or_default();
    let expected = fake.expected_challenge.lock().unwrap().clone();
    if form.get("code").map(String::as_str) != Some(AUTH_CODE)
        || expected.as_deref() != Some(pkce_challenge(&verifier).as_str())
    {
        return HttpResponse::BadRequest()
            .json(json!({"error": "invalid_grant", "error_description": "Bad Request"}));
    }

    let nonce = fake.expected_nonce.lock().unwrap().clone();
    let id_token = fake_id_token(&json!({
        "sub": "google-sub-1",
        "email": "fake@example.com",
        "name": "Fake User",
        "picture": "https://example.com/fake.png",
        "nonce": nonce,
        "exp": 4_102_444_800_i64,
    }));
    HttpResponse::Ok().json(json!({
        "access_token": "ya29.fake",
        "id_token": id_token,
        "scope": "openid email profile",
        "token_type": "Bearer",
        "expires_in": 3599,
    }))
}

async fn google_revoke(fake: web::Data<FakeEndpoints>) -> HttpResponse {
    fake.revocations.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok().finish()
}

async fn firebase_sign_in(
    fake: web::Data<FakeEndpoints>,
    query: web::Query<HashMap<String, String>>,
    body: web::Json<Value>,
) -> HttpResponse {
    let post_body = body["postBody"].as_str().unwrap_or_default();
    if query.get("key").map(String::as_str) != Some(API_KEY)
        || !post_body.contains("providerId=google.com")
        || fake.reject_idp.load(Ordering::SeqCst)
    {
        return HttpResponse::BadRequest()
            .json(json!({"error": {"code": 400, "message": "INVALID_IDP_RESPONSE"}}));
    }

    HttpResponse::Ok().json(json!({
        "localId": "fb-uid-1",
        "displayName": "Fake User",
        "photoUrl": "https://example.com/fake.png",
        "idToken": "fb-id-1",
        "refreshToken": "fb-refresh-1",
        "expiresIn": "3600",
    }))
}

async fn firebase_refresh(
    fake: web::Data<FakeEndpoints>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    if form.get("refresh_token").map(String::as_str) != Some("fb-refresh-1") {
        return HttpResponse::BadRequest()
            .json(json!({"error": {"code": 400, "message": "INVALID_REFRESH_TOKEN"}}));
    }
    let refreshes = fake.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
    HttpResponse::Ok().json(json!({
        "id_token": format!("fb-id-{}", refreshes + 1),
        "refresh_token": "fb-refresh-1",
        "expires_in": "3600",
    }))
}

/// Start the stand-in endpoints and return settings pointing at them
fn start_fake(fake: web::Data<FakeEndpoints>) -> SignInSettings {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(fake.clone())
            .route("/token", web::post().to(google_token))
            .route("/revoke", web::post().to(google_revoke))
            .route("/v1/accounts:signInWithIdp", web::post().to(firebase_sign_in))
            .route("/st/v1/token", web::post().to(firebase_refresh))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let base = format!("http://{}", server.addrs()[0]);
    actix_web::rt::spawn(server.run());

    let mut settings = SignInSettings::default();
    settings.provider.token_endpoint = format!("{base}/token");
    settings.provider.revocation_endpoint = Some(format!("{base}/revoke"));
    settings.provider.client_id = Some("test-client.apps.googleusercontent.com".to_string());
    settings.provider.client_id_env = None;
    settings.provider.client_secret = Some("test-secret".to_string());
    settings.provider.client_secret_env = None;
    settings.backend.identity_toolkit_url = format!("{base}/v1");
    settings.backend.secure_token_url = format!("{base}/st/v1");
    settings.backend.api_key = Some(API_KEY.to_string());
    settings.backend.api_key_env = None;
    settings
}

/// Begin a sign-in and have the fake provider expect its nonce and PKCE challenge
async fn begin(manager: &SessionManager, fake: &FakeEndpoints) -> SignInPayload {
    let intent = manager
        .begin_sign_in(&CancellationToken::new())
        .await
        .unwrap()
        .expect("sign-in intent");
    let query: HashMap<String, String> = url::Url::parse(&intent.url)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect();
    *fake.expected_nonce.lock().unwrap() = Some(query["nonce"].clone());
    *fake.expected_challenge.lock().unwrap() = Some(query["code_challenge"].clone());

    SignInPayload::new(format!(
        "state={}&code={}&scope=openid",
        intent.state,
        urlencoding::encode(AUTH_CODE)
    ))
}

#[actix_web::test]
async fn test_full_sign_in_cycle() {
    let fake = web::Data::new(FakeEndpoints::default());
    let settings = start_fake(fake.clone());
    let manager = SessionManager::from_settings(&settings).unwrap();
    let cancel = CancellationToken::new();

    let payload = begin(&manager, &fake).await;
    let result = manager.complete_sign_in(&payload, &cancel).await.unwrap();

    let user = result.data().expect("signed-in user");
    assert_eq!(user.user_id, "fb-uid-1");
    assert_eq!(user.username.as_deref(), Some("Fake User"));
    assert_eq!(user.token.current(), "fb-id-2");
    assert_eq!(manager.state(), SessionState::SignedIn { user_id: "fb-uid-1".to_string() });

    // The state of a completed flow cannot be replayed
    let replay = manager.complete_sign_in(&payload, &cancel).await.unwrap();
    assert_eq!(replay.error_message(), Some("Unknown or already used sign-in state"));
    assert!(manager.state().is_signed_in());

    let ambient = manager.get_signed_in_user().expect("ambient user");
    assert_eq!(ambient.user_id, "fb-uid-1");
    assert_eq!(ambient.token.resolved().await.as_deref(), Some("fb-id-3"));

    let report = manager.sign_out(&cancel).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(fake.revocations.load(Ordering::SeqCst), 1);
    assert!(manager.get_signed_in_user().is_none());
    assert_eq!(manager.state(), SessionState::SignedOut);
}

#[actix_web::test]
async fn test_backend_rejection_is_reported() {
    let fake = web::Data::new(FakeEndpoints::default());
    fake.reject_idp.store(true, Ordering::SeqCst);
    let settings = start_fake(fake.clone());
    let manager = SessionManager::from_settings(&settings).unwrap();

    let payload = begin(&manager, &fake).await;
    let result = manager
        .complete_sign_in(&payload, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.error_message(), Some("INVALID_IDP_RESPONSE"));
    assert_eq!(manager.state(), SessionState::SignedOut);
    assert!(manager.get_signed_in_user().is_none());
}

#[actix_web::test]
async fn test_wrong_pkce_verifier_fails_at_provider() {
    let fake = web::Data::new(FakeEndpoints::default());
    let settings = start_fake(fake.clone());
    let manager = SessionManager::from_settings(&settings).unwrap();

    let payload = begin(&manager, &fake).await;
    *fake.expected_challenge.lock().unwrap() = Some("not-the-challenge".to_string());
    let result = manager
        .complete_sign_in(&payload, &CancellationToken::new())
        .await
        .unwrap();

    let message = result.error_message().unwrap();
    assert!(message.starts_with("Token exchange failed with status 400"));
    assert!(message.contains("invalid_grant"));
}
