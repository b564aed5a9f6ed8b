pub mod dispatcher;
pub mod event;
pub mod messenger;
pub mod render;

pub use dispatcher::{DeliveryOutcome, Dispatcher};
pub use event::{EventKind, NotificationEvent};
pub use messenger::{DiscordMessenger, Messenger};
pub use render::{render, RenderedMessage};
