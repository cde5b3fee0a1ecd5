/// Organizational rank model
///
/// Four fixed tiers, lower level = higher authority. Who may approve whom is
/// an explicit table, not level arithmetic: delegation narrows by tier, so a
/// coordinator approves managers and agents while a manager approves agents
/// only. Levels outside 1..=4 have no tier and no authority.
use crate::error::{IdentityError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Level 1 (ADM)
    Administrator,
    /// Level 2 (Coordenador)
    Coordinator,
    /// Level 3 (Gerente)
    Manager,
    /// Level 4 (ACS)
    CommunityAgent,
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Administrator,
        Tier::Coordinator,
        Tier::Manager,
        Tier::CommunityAgent,
    ];

    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            1 => Some(Tier::Administrator),
            2 => Some(Tier::Coordinator),
            3 => Some(Tier::Manager),
            4 => Some(Tier::CommunityAgent),
            _ => None,
        }
    }

    pub fn level(self) -> i32 {
        match self {
            Tier::Administrator => 1,
            Tier::Coordinator => 2,
            Tier::Manager => 3,
            Tier::CommunityAgent => 4,
        }
    }

    /// Permission table for approving or rejecting a registration
    pub fn can_authorize(self, target: Tier) -> bool {
        match self {
            Tier::Administrator => true,
            Tier::Coordinator => matches!(target, Tier::Manager | Tier::CommunityAgent),
            Tier::Manager => matches!(target, Tier::CommunityAgent),
            Tier::CommunityAgent => false,
        }
    }

    /// Whether any tier at all may be authorized by this one
    pub fn has_authorizing_power(self) -> bool {
        Tier::ALL.iter().any(|&target| self.can_authorize(target))
    }

    /// Hard-coded policy: the top tier is never created through public registration
    pub fn may_self_register(self) -> bool {
        self != Tier::Administrator
    }

    /// Rank gate: true when this tier is `min` or above
    pub fn at_least(self, min: Tier) -> bool {
        self.level() <= min.level()
    }
}

/// Level-based entry point. Unknown levels never authorize and are never authorized.
pub fn can_authorize(acting_level: i32, target_level: i32) -> bool {
    match (Tier::from_level(acting_level), Tier::from_level(target_level)) {
        (Some(acting), Some(target)) => acting.can_authorize(target),
        _ => false,
    }
}

/// The acting account, passed explicitly into every privileged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub account_id: Uuid,
    pub tier: Tier,
}

impl Actor {
    pub fn new(account_id: Uuid, tier: Tier) -> Self {
        Self { account_id, tier }
    }

    /// Build from verified access-token claims. Unauthorized or out-of-hierarchy
    /// holders cannot act.
    pub fn from_claims(claims: &super::tokens::Claims) -> Result<Self> {
        if !claims.is_authorized {
            return Err(IdentityError::Forbidden(
                "account is not authorized".to_string(),
            ));
        }
        let tier = Tier::from_level(claims.level).ok_or_else(|| {
            IdentityError::Forbidden(format!("rank level {} has no authority", claims.level))
        })?;
        let account_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| IdentityError::InvalidToken)?;

        Ok(Self { account_id, tier })
    }

    pub fn can_authorize(&self, target: Tier) -> bool {
        self.tier.can_authorize(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_table() {
        assert!(can_authorize(2, 3));
        assert!(can_authorize(2, 4));
        assert!(!can_authorize(3, 3));
        assert!(!can_authorize(4, 4));
        assert!(can_authorize(3, 4));
        assert!(!can_authorize(3, 2));
        assert!(!can_authorize(2, 2));
        assert!(!can_authorize(2, 1));
        for target in 1..=4 {
            assert!(can_authorize(1, target));
            assert!(!can_authorize(4, target));
        }
    }

    #[test]
    fn test_unknown_levels_have_no_authority() {
        assert!(!can_authorize(0, 4));
        assert!(!can_authorize(5, 4));
        assert!(!can_authorize(1, 5));
        assert!(!can_authorize(-1, 4));
    }

    #[test]
    fn test_level_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_level(tier.level()), Some(tier));
        }
    }

    #[test]
    fn test_only_top_tier_blocked_from_registration() {
        assert!(!Tier::Administrator.may_self_register());
        assert!(Tier::Coordinator.may_self_register());
        assert!(Tier::Manager.may_self_register());
        assert!(Tier::CommunityAgent.may_self_register());
    }

    #[test]
    fn test_at_least() {
        assert!(Tier::Administrator.at_least(Tier::Coordinator));
        assert!(Tier::Coordinator.at_least(Tier::Coordinator));
        assert!(!Tier::Manager.at_least(Tier::Coordinator));
    }

    #[test]
    fn test_authorizing_power() {
        assert!(Tier::Manager.has_authorizing_power());
        assert!(!Tier::CommunityAgent.has_authorizing_power());
    }
}
