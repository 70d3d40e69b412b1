//! Transient Entity Lifetimes
//!
//! Time-to-live expiry without duplicate destroy commands. The owner issues
//! the network-wide destroy; a non-owner that observes the same elapsed
//! condition only hides its local presentation and waits for the owner's
//! destroy to arrive.

use crate::game::state::Authority;

/// Creation timestamp plus fixed time-to-live.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lifetime {
    /// Time the entity was created.
    pub spawned_at: f32,
    /// Seconds until expiry.
    pub ttl: f32,
}

impl Lifetime {
    /// Start a lifetime now.
    pub fn new(now: f32, ttl: f32) -> Self {
        Self {
            spawned_at: now,
            ttl,
        }
    }

    /// Whether the time-to-live has elapsed.
    #[inline]
    pub fn expired(&self, now: f32) -> bool {
        now >= self.spawned_at + self.ttl
    }
}

/// What a peer should do about an expired entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryAction {
    /// Still alive; nothing to do.
    Keep,
    /// Owner side: remove the entity for every peer.
    DestroyNetworkWide,
    /// Non-owner side: disable local visuals/colliders only; the owner's
    /// destroy will remove the object later.
    HideLocal,
}

/// Poll one entity's lifetime.
pub fn poll_expiry(lifetime: &Lifetime, authority: Authority, now: f32) -> ExpiryAction {
    if !lifetime.expired(now) {
        return ExpiryAction::Keep;
    }
    if authority.is_owner() {
        ExpiryAction::DestroyNetworkWide
    } else {
        ExpiryAction::HideLocal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_expiry_boundary() {
        let lifetime = Lifetime::new(2.0, 10.0);
        assert!(!lifetime.expired(2.0));
        assert!(!lifetime.expired(11.999));
        assert!(lifetime.expired(12.0));
        assert!(lifetime.expired(50.0));
    }

    #[test]
    fn test_owner_destroys_network_wide() {
        let lifetime = Lifetime::new(0.0, 10.0);
        assert_eq!(
            poll_expiry(&lifetime, Authority::Local, 5.0),
            ExpiryAction::Keep
        );
        assert_eq!(
            poll_expiry(&lifetime, Authority::Local, 10.0),
            ExpiryAction::DestroyNetworkWide
        );
    }

    #[test]
    fn test_non_owner_only_hides() {
        let lifetime = Lifetime::new(0.0, 10.0);
        assert_eq!(
            poll_expiry(&lifetime, Authority::Remote, 10.0),
            ExpiryAction::HideLocal
        );
    }
}
