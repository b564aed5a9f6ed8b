pub mod admin_gate;
pub mod link_manager;

pub use admin_gate::{create_shared_admin_gate, AdminGate, SharedAdminGate};
pub use link_manager::{create_shared_link_manager, LinkManager, SharedLinkManager};
