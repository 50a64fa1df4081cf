/// Result of classifying one inbound webhook envelope.
///
/// Classification is pure: the same envelope always yields the same value.
/// Whether a `Payment` actually turns into a delivered message is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The envelope carried an empty event batch or was not a JSON object.
    NoEvent,
    /// The candidate event matched none of the payment heuristics.
    NotAPayment,
    /// A payment signal matched but no user identifier could be resolved.
    NoUserId,
    /// A completed payment attributable to `user_id`.
    Payment { user_id: String },
}

impl Classification {
    /// Returns the canonical name used for logging/metrics labels.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NoEvent => "no_event",
            Self::NotAPayment => "not_a_payment",
            Self::NoUserId => "no_user_id",
            Self::Payment { .. } => "payment",
        }
    }
}

/// Locale-specific keyword configuration for the text-based heuristics.
///
/// The upstream platform does not document a stable event shape for
/// completed payments, so the message and postback heuristics match on
/// operator-configured substrings instead of hardcoded literals.
#[derive(Debug, Clone)]
pub struct PaymentSignals {
    /// Substrings naming a payment ("ชำระเงิน", "payment", ...).
    pub payment_words: Vec<String>,
    /// Substrings naming success ("สำเร็จ", "success", ...).
    pub success_words: Vec<String>,
    /// Marker expected inside `postback.data` for a paid postback.
    pub postback_marker: String,
}

impl PaymentSignals {
    pub fn new(
        payment_words: Vec<String>,
        success_words: Vec<String>,
        postback_marker: String,
    ) -> Self {
        Self {
            payment_words,
            success_words,
            postback_marker,
        }
    }
}

impl Default for PaymentSignals {
    fn default() -> Self {
        Self {
            payment_words: vec!["ชำระเงิน".to_string(), "payment".to_string()],
            success_words: vec![
                "สำเร็จ".to_string(),
                "เรียบร้อย".to_string(),
                "success".to_string(),
            ],
            postback_marker: "payment_success".to_string(),
        }
    }
}
