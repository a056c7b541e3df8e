//! Shared helpers for API tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServiceResponse;
use actix_web::{App, test, web};
use dept_portal_lib::config::{SESSION_TOKEN_HEADER, SessionSettings};
use dept_portal_lib::identity::AccountDirectory;
use dept_portal_lib::middleware::RequestLogger;
use dept_portal_lib::services::SessionRegistry;
use dept_portal_lib::store::{AccountStore, InMemoryProfileStore, ProfileStore};
use serde_json::{Value, json};

pub const PASSWORD: &str = "pw123456";

/// Registry over a fresh directory and in-memory store.
pub fn create_registry() -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(
        Arc::new(AccountDirectory::new()),
        Arc::new(InMemoryProfileStore::new()) as Arc<dyn ProfileStore>,
        test_settings(),
        Duration::from_secs(600),
    ))
}

/// Registry over the given stores, as a server process would build it.
pub fn create_registry_with(
    accounts: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileStore>,
) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(
        Arc::new(AccountDirectory::with_store(accounts)),
        profiles,
        test_settings(),
        Duration::from_secs(600),
    ))
}

fn test_settings() -> SessionSettings {
    SessionSettings {
        fetch_retries: 0,
        fetch_backoff: Duration::from_millis(1),
    }
}

/// Create a test portal app.
pub async fn create_test_app(
    registry: &Arc<SessionRegistry>,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::from(Arc::clone(registry)))
            .service(web::scope("/api/v1").configure(dept_portal_lib::api::configure)),
    )
    .await
}

async fn send<S>(app: &S, req: test::TestRequest) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON response body")
    };
    (status, value)
}

pub async fn get<S>(app: &S, path: &str, token: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::get().uri(path);
    if let Some(token) = token {
        req = req.insert_header((SESSION_TOKEN_HEADER, token));
    }
    send(app, req).await
}

pub async fn post<S>(app: &S, path: &str, token: Option<&str>, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post().uri(path).set_json(body);
    if let Some(token) = token {
        req = req.insert_header((SESSION_TOKEN_HEADER, token));
    }
    send(app, req).await
}

pub async fn delete<S>(app: &S, path: &str, token: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::delete()
        .uri(path)
        .insert_header((SESSION_TOKEN_HEADER, token));
    send(app, req).await
}

/// Open a client session and return its token.
pub async fn open_session<S>(app: &S) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, body) = post(app, "/api/v1/session", None, json!({})).await;
    assert_eq!(status, 201, "open session: {body:?}");
    body["session_token"]
        .as_str()
        .expect("session_token")
        .to_string()
}

/// Register an account directly in the shared directory.
pub async fn register(registry: &SessionRegistry, email: &str) {
    registry
        .directory()
        .register(email, &secrecy::SecretString::from(PASSWORD.to_string()))
        .await
        .expect("register account");
}

/// Sign up an administrator on a fresh session and return its token.
pub async fn sign_up_admin<S>(app: &S, email: &str) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let token = open_session(app).await;
    let (status, body) = post(
        app,
        "/api/v1/session/signup",
        Some(&token),
        json!({ "email": email, "password": PASSWORD, "role": "admin" }),
    )
    .await;
    assert_eq!(status, 201, "admin sign-up: {body:?}");
    token
}

/// Create an account through the administrator route.
pub async fn create_account<S>(app: &S, admin_token: &str, email: &str, role: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    post(
        app,
        "/api/v1/accounts",
        Some(admin_token),
        json!({ "email": email, "password": PASSWORD, "role": role }),
    )
    .await
}

pub async fn login<S>(app: &S, token: &str, email: &str, expected_role: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    post(
        app,
        "/api/v1/session/login",
        Some(token),
        json!({ "email": email, "password": PASSWORD, "expected_role": expected_role }),
    )
    .await
}
