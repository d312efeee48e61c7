//! Shared blur-sampling groups.
//!
//! Backdrop layers with the same group name sample the content behind them
//! together. A [`BlendGroup`] is shared through `Arc`; compositors only keep a
//! `Weak` to it, and when the last strong holder drops it a
//! [`BusEvent::BlendGroupReleased`] is published so members can move to a
//! private identity.

use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use crate::events::{self, BusEvent};

#[derive(Debug)]
pub struct BlendGroup {
    token: Uuid,
}

impl BlendGroup {
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self { token: Uuid::now_v7() }) }

    /// The group shared by every backdrop in the process. Never released.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BlendGroup>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(Self::new))
    }

    #[must_use]
    pub const fn token(&self) -> Uuid { self.token }

    /// Group name handed to the backdrop layer.
    #[must_use]
    pub fn group_name(&self) -> String { self.token.to_string() }
}

impl Drop for BlendGroup {
    fn drop(&mut self) {
        tracing::debug!(token = %self.token, "compositor: blend group released");
        events::bus().publish(BusEvent::BlendGroupReleased(self.token));
    }
}

/// A fresh per-instance group name, used when no group is set.
#[must_use]
pub fn private_group_name() -> String { Uuid::now_v7().to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_have_distinct_tokens() {
        let a = BlendGroup::new();
        let b = BlendGroup::new();
        assert_ne!(a.token(), b.token());
        assert_eq!(a.group_name(), a.token().to_string());
    }

    #[test]
    fn test_global_group_is_shared() {
        assert_eq!(BlendGroup::global().token(), BlendGroup::global().token());
    }

    #[test]
    fn test_release_is_published_on_last_drop() {
        let mut subscription = events::bus().subscribe();
        let group = BlendGroup::new();
        let token = group.token();
        let second_holder = Arc::clone(&group);

        drop(group);
        drop(second_holder);

        let mut released = false;
        while let Ok(event) = subscription.receiver.try_recv() {
            if event == BusEvent::BlendGroupReleased(token) {
                released = true;
            }
        }
        events::bus().unsubscribe(subscription.id);
        assert!(released);
    }

    #[test]
    fn test_private_names_are_unique() {
        assert_ne!(private_group_name(), private_group_name());
    }
}
