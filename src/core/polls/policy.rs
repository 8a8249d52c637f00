// Policy checks used by the poll router.

use super::guild_config::GuildPolicy;
use super::platform::PollPlatform;
use super::poll_models::{ChannelInfo, ChannelPermission};

/// Whether a member holding `actor_roles` may keep their poll.
pub fn is_immune(actor_roles: &[u64], policy: &GuildPolicy) -> bool {
    actor_roles
        .iter()
        .any(|role| policy.excluded_roles.contains(role))
}

/// Whether the bot can currently delete messages in `channel`.
///
/// Always asks the platform; a failed lookup means no.
pub async fn can_act_in<P>(platform: &P, channel: &ChannelInfo) -> bool
where
    P: PollPlatform + ?Sized,
{
    match platform.permissions_in(channel).await {
        Ok(held) => held.contains(&ChannelPermission::ManageMessages),
        Err(e) => {
            tracing::debug!(channel_id = channel.id, "Permission lookup failed: {}", e);
            false
        }
    }
}
