use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use url::Url;

use payrelay_core::{Classifier, PaymentSignals};
use payrelay_line::LineClient;
use payrelay_util::{AppConfig, RelayMode};

use crate::{diag, telemetry, webhook};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    line: LineClient,
    classifier: Arc<Classifier>,
    mode: RelayMode,
    channel_secret: Option<Arc<[u8]>>,
    access_token: Option<Arc<str>>,
    form_base_url: Url,
    form_user_param: Arc<str>,
    message_template: Arc<str>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, line: LineClient, config: &AppConfig) -> Self {
        let signals = PaymentSignals::new(
            config.payment_keywords.clone(),
            config.success_keywords.clone(),
            config.postback_marker.clone(),
        );
        Self {
            metrics,
            line,
            classifier: Arc::new(Classifier::new(signals)),
            mode: config.mode,
            channel_secret: config
                .channel_secret
                .as_ref()
                .map(|secret| Arc::from(secret.clone().into_bytes().into_boxed_slice())),
            access_token: config
                .channel_access_token
                .as_deref()
                .map(Arc::from),
            form_base_url: config.form_base_url.clone(),
            form_user_param: Arc::from(config.form_user_param.as_str()),
            message_template: Arc::from(config.message_template.as_str()),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn line(&self) -> &LineClient {
        &self.line
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    pub fn channel_secret(&self) -> Option<Arc<[u8]>> {
        self.channel_secret.clone()
    }

    pub fn access_token(&self) -> Option<Arc<str>> {
        self.access_token.clone()
    }

    /// Builds the personalized form URL and the rendered notification text
    /// for one recipient.
    pub fn notification_for(&self, user_id: &str) -> (Url, String) {
        let url = payrelay_core::form_url(&self.form_base_url, &self.form_user_param, user_id);
        let text = payrelay_core::render_message(&self.message_template, &url);
        (url, text)
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/webhook/line-myshop", post(webhook::handle))
        .route("/diag/test-send", get(diag::test_send))
        .route("/diag/verify-token", get(diag::verify_token))
        .with_state(state)
}

async fn root() -> &'static str {
    "LINE My Shop webhook relay is running"
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn setup_state() -> AppState {
        test_support::state_with(RelayMode::Lenient, None, None, "https://api.line.me/")
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn root_reports_liveness_banner() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response.into_body().collect().await.expect("body");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("running"));
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[test]
    fn notification_embeds_form_url() {
        let state = setup_state();
        let (url, text) = state.notification_for("U1");
        assert_eq!(url.as_str(), "https://form.example/x?lineUserId=U1");
        assert!(text.contains(url.as_str()));
    }
}
