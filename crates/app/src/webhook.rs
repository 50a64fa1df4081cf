use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{error, info, warn};

use payrelay_core::Classification;
use payrelay_util::RelayMode;

use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::signature;

const HEADER_SIGNATURE: &str = "x-line-signature";

/// Webhook ingress for LINE My Shop payment notifications.
///
/// Verification runs over the raw body bytes before anything is parsed. The
/// classification outcome maps to a response immediately; delivery of the
/// follow-up message happens on a spawned task after the response is built,
/// so the sender never waits on (or observes) the downstream push.
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProblemResponse> {
    let start = Instant::now();
    let result = process(&state, &headers, &body);
    histogram!("webhook_ack_latency_seconds").record(start.elapsed().as_secs_f64());
    result
}

fn process(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, ProblemResponse> {
    if state.mode().is_strict() {
        verify_signature(state, headers, body)?;
    }

    let envelope: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            counter!("webhook_ingress_total", "outcome" => "malformed").increment(1);
            if state.mode().is_strict() {
                return Err(ProblemResponse::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_json",
                    format!("failed to parse payload: {err}"),
                ));
            }
            warn!(stage = "ingress", error = %err, "acknowledging unparseable payload");
            return Ok(ok_response());
        }
    };

    let classification = state.classifier().classify(&envelope);
    counter!("webhook_ingress_total", "outcome" => classification.metric_label()).increment(1);

    match classification {
        Classification::Payment { user_id } => {
            dispatch(state, user_id);
            Ok(ok_response())
        }
        Classification::NotAPayment => {
            info!(stage = "classify", "event is not a payment completion, ignoring");
            Ok(ok_response())
        }
        Classification::NoEvent => {
            warn!(stage = "classify", "envelope contains no event");
            acknowledge_or_reject(
                state.mode(),
                "no_event",
                "envelope contains no extractable event",
            )
        }
        Classification::NoUserId => {
            warn!(stage = "classify", "payment event carries no user id, nothing to send");
            acknowledge_or_reject(
                state.mode(),
                "missing_user_id",
                "payment event carries no user identifier",
            )
        }
    }
}

fn verify_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), ProblemResponse> {
    let secret = state.channel_secret().ok_or_else(|| {
        error!(stage = "ingress", "strict mode without a channel secret");
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "missing_channel_secret",
            "signature verification is required but no channel secret is configured",
        )
    })?;

    let claimed = headers
        .get(HEADER_SIGNATURE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            counter!("webhook_invalid_signature_total").increment(1);
            ProblemResponse::new(
                StatusCode::UNAUTHORIZED,
                "missing_signature",
                format!("missing header {HEADER_SIGNATURE}"),
            )
        })?;

    signature::verify(&secret, body, claimed).map_err(|err| {
        counter!("webhook_invalid_signature_total").increment(1);
        warn!(stage = "ingress", error = %err, "rejecting request with bad signature");
        ProblemResponse::new(StatusCode::UNAUTHORIZED, "invalid_signature", err.to_string())
    })
}

/// Fire-and-forget delivery of the form link.
///
/// The push runs on its own task; failures are logged and counted but never
/// reach the webhook sender, whose response has already been decided.
fn dispatch(state: &AppState, user_id: String) {
    let (url, text) = state.notification_for(&user_id);
    info!(stage = "dispatch", user_id = %user_id, url = %url, "payment confirmed, sending form link");

    let Some(token) = state.access_token() else {
        warn!(
            stage = "dispatch",
            user_id = %user_id,
            "channel access token not configured, delivery skipped"
        );
        counter!("line_push_total", "result" => "skipped").increment(1);
        return;
    };

    let line = state.line().clone();
    tokio::spawn(async move {
        match line.push_message(&token, &user_id, &text).await {
            Ok(()) => {
                info!(stage = "dispatch", user_id = %user_id, "form link delivered");
                counter!("line_push_total", "result" => "ok").increment(1);
            }
            Err(err) => {
                error!(stage = "dispatch", user_id = %user_id, error = %err, "delivery failed");
                counter!("line_push_total", "result" => "error").increment(1);
            }
        }
    });
}

fn acknowledge_or_reject(
    mode: RelayMode,
    problem_type: &'static str,
    detail: &'static str,
) -> Result<Response, ProblemResponse> {
    if mode.is_strict() {
        Err(ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            problem_type,
            detail,
        ))
    } else {
        Ok(ok_response())
    }
}

fn ok_response() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "text/plain")
        .body("OK".into())
        .unwrap()
}
