use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    let req = builder
        .body(match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(res: Response<Body>) -> Value {
    serde_json::from_str(&body_text(res).await).unwrap()
}

pub fn location(res: &Response<Body>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn form_encode(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).unwrap()
}

/// A fresh app on an in-memory store plus optional API token or admin cookie.
pub struct TestClient {
    pub app: Router,
    pub state: AppState,
    token: Option<String>,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new() -> Self {
        let state = AppState::fake();
        Self {
            app: build_app(state.clone()),
            state,
            token: None,
            cookie: None,
        }
    }

    pub async fn post_json(&self, uri: &str, payload: &Value) -> Response<Body> {
        self.request(Method::POST, uri, Some(payload)).await
    }

    pub async fn request(&self, method: Method, uri: &str, payload: Option<&Value>) -> Response<Body> {
        let body = payload.map(Value::to_string);
        let auth = self.token.as_ref().map(|t| format!("Bearer {t}"));
        let mut headers = vec![("content-type", "application/json")];
        if let Some(a) = auth.as_deref() {
            headers.push(("authorization", a));
        }
        send(&self.app, method, uri, body.as_deref(), &headers).await
    }

    /// Obtains an API token through the token endpoint.
    pub async fn login_api(mut self, email: &str, password: &str) -> Self {
        let payload = serde_json::json!({ "email": email, "password": password });
        let res = self.post_json("/api/user/token", &payload).await;
        assert!(res.status().is_success(), "token request failed: {}", res.status());
        let body = body_json(res).await;
        self.token = Some(body["token"].as_str().unwrap().to_string());
        self
    }

    pub async fn get_page(&self, uri: &str) -> Response<Body> {
        let cookie = self.cookie.as_deref().unwrap_or_default();
        let headers: Vec<(&str, &str)> = if cookie.is_empty() {
            vec![]
        } else {
            vec![("cookie", cookie)]
        };
        send(&self.app, Method::GET, uri, None, &headers).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = form_encode(fields);
        let mut headers = vec![("content-type", "application/x-www-form-urlencoded")];
        if let Some(c) = self.cookie.as_deref() {
            headers.push(("cookie", c));
        }
        send(&self.app, Method::POST, uri, Some(&body), &headers).await
    }

    /// Logs into the admin site and keeps the session cookie.
    pub async fn login_admin(mut self, email: &str, password: &str) -> Self {
        let res = self
            .post_form("/admin/login", &[("email", email), ("password", password)])
            .await;
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("admin login should set a cookie");
        let pair = set_cookie.split(';').next().unwrap().to_string();
        self.cookie = Some(pair);
        self
    }
}
