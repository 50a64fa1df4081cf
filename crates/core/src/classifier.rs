use serde_json::Value;

use crate::types::{Classification, PaymentSignals};

/// Deterministic classifier deciding whether an inbound webhook envelope
/// denotes a completed payment.
///
/// LINE My Shop has shipped payment notifications in several shapes over
/// time, so classification is a deliberately liberal OR over an ordered set
/// of heuristics. The first match wins; an event matching none of them is a
/// no-op, not an error.
pub struct Classifier {
    signals: PaymentSignals,
}

impl Classifier {
    pub fn new(signals: PaymentSignals) -> Self {
        Self { signals }
    }

    /// Classifies a parsed envelope. Pure and stateless.
    ///
    /// Only the first event of a batch is ever examined; at most one
    /// notification may result from one inbound request.
    pub fn classify(&self, envelope: &Value) -> Classification {
        let Some(event) = select_event(envelope) else {
            return Classification::NoEvent;
        };

        if !self.is_payment(event, envelope) {
            return Classification::NotAPayment;
        }

        match extract_user_id(event, envelope) {
            Some(user_id) => Classification::Payment { user_id },
            None => Classification::NoUserId,
        }
    }

    fn is_payment(&self, event: &Value, envelope: &Value) -> bool {
        things_payment_succeeded(event)
            || self.message_mentions_paid(event)
            || self.postback_marks_paid(event)
            || unconditional_payment_type(event)
            || flat_payment_confirmed(event, envelope)
    }

    fn message_mentions_paid(&self, event: &Value) -> bool {
        if event_type(event) != Some("message") {
            return false;
        }
        let Some(text) = event
            .get("message")
            .and_then(|message| message.get("text"))
            .and_then(Value::as_str)
        else {
            return false;
        };
        contains_any(text, &self.signals.payment_words)
            && contains_any(text, &self.signals.success_words)
    }

    fn postback_marks_paid(&self, event: &Value) -> bool {
        if event_type(event) != Some("postback") {
            return false;
        }
        event
            .get("postback")
            .and_then(|postback| postback.get("data"))
            .and_then(Value::as_str)
            .is_some_and(|data| data.contains(&self.signals.postback_marker))
    }
}

/// Picks the candidate event from an envelope.
///
/// A non-empty `events` array contributes its first element; an envelope
/// with an empty `events` array is an empty batch and yields no candidate;
/// anything else falls back to the envelope itself, which covers the flat
/// `{userId, status}` shape.
fn select_event(envelope: &Value) -> Option<&Value> {
    let object = envelope.as_object()?;
    match object.get("events") {
        Some(Value::Array(events)) if events.is_empty() => None,
        Some(Value::Array(events)) => events.first(),
        _ => Some(envelope),
    }
}

/// Resolves the recipient: `event.source.userId`, then `event.userId`, then
/// the envelope's top-level `userId`. The value is opaque; no format checks.
fn extract_user_id(event: &Value, envelope: &Value) -> Option<String> {
    event
        .get("source")
        .and_then(|source| source.get("userId"))
        .and_then(Value::as_str)
        .or_else(|| event.get("userId").and_then(Value::as_str))
        .or_else(|| envelope.get("userId").and_then(Value::as_str))
        .map(str::to_string)
}

fn event_type(event: &Value) -> Option<&str> {
    event.get("type").and_then(Value::as_str)
}

fn things_payment_succeeded(event: &Value) -> bool {
    if event_type(event) != Some("things") {
        return false;
    }
    let Some(things) = event.get("things") else {
        return false;
    };
    things.get("type").and_then(Value::as_str) == Some("payment")
        && things.get("result").and_then(Value::as_str) == Some("success")
}

fn unconditional_payment_type(event: &Value) -> bool {
    matches!(
        event_type(event),
        Some("webhook") | Some("order.paid") | Some("purchase_completed")
    )
}

fn flat_payment_confirmed(event: &Value, envelope: &Value) -> bool {
    event.get("status").and_then(Value::as_str) == Some("payment_confirmed")
        && extract_user_id(event, envelope).is_some()
}

fn contains_any(text: &str, words: &[String]) -> bool {
    words.iter().any(|word| text.contains(word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::new(PaymentSignals::default())
    }

    fn payment(classification: Classification) -> String {
        match classification {
            Classification::Payment { user_id } => user_id,
            other => panic!("expected payment, got {other:?}"),
        }
    }

    #[test]
    fn things_payment_success_matches() {
        let envelope = json!({
            "events": [{
                "type": "things",
                "things": {"type": "payment", "result": "success"},
                "source": {"userId": "U1"}
            }]
        });
        assert_eq!(payment(classifier().classify(&envelope)), "U1");
    }

    #[test]
    fn things_payment_failure_is_not_a_payment() {
        let envelope = json!({
            "events": [{
                "type": "things",
                "things": {"type": "payment", "result": "failure"},
                "source": {"userId": "U1"}
            }]
        });
        assert_eq!(classifier().classify(&envelope), Classification::NotAPayment);
    }

    #[test]
    fn message_with_payment_and_success_words_matches() {
        let envelope = json!({
            "events": [{
                "type": "message",
                "message": {"text": "ชำระเงินของคุณสำเร็จแล้ว"},
                "source": {"userId": "U2"}
            }]
        });
        assert_eq!(payment(classifier().classify(&envelope)), "U2");
    }

    #[test]
    fn message_missing_success_word_is_not_a_payment() {
        let envelope = json!({
            "events": [{
                "type": "message",
                "message": {"text": "รอการชำระเงิน"},
                "source": {"userId": "U2"}
            }]
        });
        assert_eq!(classifier().classify(&envelope), Classification::NotAPayment);
    }

    #[test]
    fn postback_with_marker_matches() {
        let envelope = json!({
            "events": [{
                "type": "postback",
                "postback": {"data": "action=payment_success&order=42"},
                "source": {"userId": "U3"}
            }]
        });
        assert_eq!(payment(classifier().classify(&envelope)), "U3");
    }

    #[test]
    fn bare_payment_types_match_unconditionally() {
        for event_type in ["webhook", "order.paid", "purchase_completed"] {
            let envelope = json!({
                "events": [{"type": event_type, "userId": "U4"}]
            });
            assert_eq!(payment(classifier().classify(&envelope)), "U4");
        }
    }

    #[test]
    fn flat_confirmed_shape_matches() {
        let envelope = json!({"userId": "U5", "status": "payment_confirmed"});
        assert_eq!(payment(classifier().classify(&envelope)), "U5");
    }

    #[test]
    fn flat_confirmed_shape_without_user_is_not_a_payment() {
        let envelope = json!({"status": "payment_confirmed"});
        assert_eq!(classifier().classify(&envelope), Classification::NotAPayment);
    }

    #[test]
    fn empty_event_batch_yields_no_event() {
        let envelope = json!({"events": []});
        assert_eq!(classifier().classify(&envelope), Classification::NoEvent);
    }

    #[test]
    fn non_object_envelope_yields_no_event() {
        assert_eq!(classifier().classify(&json!(null)), Classification::NoEvent);
        assert_eq!(classifier().classify(&json!([1, 2])), Classification::NoEvent);
    }

    #[test]
    fn payment_without_any_user_id_yields_no_user_id() {
        let envelope = json!({"events": [{"type": "webhook"}]});
        assert_eq!(classifier().classify(&envelope), Classification::NoUserId);
    }

    #[test]
    fn only_first_event_of_a_batch_is_examined() {
        let envelope = json!({
            "events": [
                {"type": "follow", "source": {"userId": "U-first"}},
                {"type": "webhook", "source": {"userId": "U-second"}}
            ]
        });
        assert_eq!(classifier().classify(&envelope), Classification::NotAPayment);
    }

    #[test]
    fn user_id_precedence_prefers_event_source() {
        let envelope = json!({
            "userId": "U-top",
            "events": [{
                "type": "webhook",
                "userId": "U-event",
                "source": {"userId": "U-source"}
            }]
        });
        assert_eq!(payment(classifier().classify(&envelope)), "U-source");
    }

    #[test]
    fn user_id_falls_back_to_envelope_top_level() {
        let envelope = json!({
            "userId": "U-top",
            "events": [{"type": "order.paid"}]
        });
        assert_eq!(payment(classifier().classify(&envelope)), "U-top");
    }

    #[test]
    fn classification_is_idempotent() {
        let envelope = json!({
            "events": [{
                "type": "things",
                "things": {"type": "payment", "result": "success"},
                "source": {"userId": "U1"}
            }]
        });
        let classifier = classifier();
        assert_eq!(
            classifier.classify(&envelope),
            classifier.classify(&envelope)
        );
    }
}
