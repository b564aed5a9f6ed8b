pub mod payload;
pub mod receive;
pub mod server;

pub use payload::WebhookPayload;
pub use receive::receive;
pub use server::{start_webhook_server, WebhookServerConfig, WebhookState};
