pub mod account;
pub mod admin;
pub mod general;

pub use account::{link_account, status, unlink_account};
pub use admin::{
    check_discord_id, force_link, force_link_member, health, reset_commands, sync, unlink_member,
    unlink_user, users,
};
pub use general::{help, ping};
