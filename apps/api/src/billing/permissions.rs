//! Feature gates per subscription level.

use crate::billing::subscription::SubscriptionLevel;

/// Maximum number of resumes per level. `None` means unlimited.
pub fn max_resumes(level: SubscriptionLevel) -> Option<usize> {
    match level {
        SubscriptionLevel::Free => Some(1),
        SubscriptionLevel::Premium => Some(3),
        SubscriptionLevel::PremiumPlus => None,
    }
}

pub fn can_create_resume(level: SubscriptionLevel, current_resume_count: usize) -> bool {
    max_resumes(level).map_or(true, |max| current_resume_count < max)
}

pub fn can_use_ai_tools(level: SubscriptionLevel) -> bool {
    level != SubscriptionLevel::Free
}

pub fn can_use_customization(level: SubscriptionLevel) -> bool {
    level == SubscriptionLevel::PremiumPlus
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionLevel::*;

    #[test]
    fn test_free_tier_caps_at_one_resume() {
        assert!(can_create_resume(Free, 0));
        assert!(!can_create_resume(Free, 1));
        assert!(!can_create_resume(Free, 5));
    }

    #[test]
    fn test_premium_tier_caps_at_three_resumes() {
        assert!(can_create_resume(Premium, 2));
        assert!(!can_create_resume(Premium, 3));
    }

    #[test]
    fn test_premium_plus_is_unlimited() {
        assert!(can_create_resume(PremiumPlus, 0));
        assert!(can_create_resume(PremiumPlus, 1000));
    }

    #[test]
    fn test_ai_tools_require_a_paid_tier() {
        assert!(!can_use_ai_tools(Free));
        assert!(can_use_ai_tools(Premium));
        assert!(can_use_ai_tools(PremiumPlus));
    }

    #[test]
    fn test_customization_requires_premium_plus() {
        assert!(!can_use_customization(Free));
        assert!(!can_use_customization(Premium));
        assert!(can_use_customization(PremiumPlus));
    }
}
