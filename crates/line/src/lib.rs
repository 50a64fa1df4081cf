pub mod push;

pub use push::{BotInfo, LineClient, LineError};
