use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::managers::SharedLinkManager;
use crate::seerr::SeerrClient;

/// Authorization check for mutating admin commands.
///
/// The invoking Discord account must be linked to a Seerr account that
/// currently holds admin privilege. Privilege is re-verified against the
/// Seerr API on every call rather than cached, since it can be revoked
/// upstream at any time.
pub struct AdminGate {
    links: SharedLinkManager,
    seerr: Arc<SeerrClient>,
}

impl AdminGate {
    pub fn new(links: SharedLinkManager, seerr: Arc<SeerrClient>) -> Self {
        Self { links, seerr }
    }

    pub async fn verify_admin(&self, discord_id: &str) -> Result<bool> {
        let Some(link) = self.links.find_by_discord_id(discord_id).await else {
            debug!("Admin check: Discord ID {} has no link", discord_id);
            return Ok(false);
        };

        let Some(user) = self.seerr.get_user(link.seerr_user_id).await? else {
            debug!(
                "Admin check: linked Seerr user {} no longer exists",
                link.seerr_user_id
            );
            return Ok(false);
        };

        Ok(user.is_admin())
    }
}

/// Shared admin gate type
pub type SharedAdminGate = Arc<AdminGate>;

pub fn create_shared_admin_gate(
    links: SharedLinkManager,
    seerr: Arc<SeerrClient>,
) -> SharedAdminGate {
    Arc::new(AdminGate::new(links, seerr))
}
