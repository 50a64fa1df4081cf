pub mod classifier;
pub mod notify;
pub mod types;

pub use classifier::Classifier;
pub use notify::{form_url, render_message};
pub use types::{Classification, PaymentSignals};
