//! Subscription level resolution from the mirrored Stripe state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use crate::errors::AppError;
use crate::models::subscription::UserSubscriptionRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    Free,
    Premium,
    PremiumPlus,
}

/// Looks up the user's subscription row and resolves the level.
pub async fn get_user_subscription_level(
    pool: &PgPool,
    premium_price_id: &str,
    premium_plus_price_id: &str,
    user_id: &str,
) -> Result<SubscriptionLevel, AppError> {
    let row: Option<UserSubscriptionRow> =
        sqlx::query_as("SELECT * FROM user_subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(level_for(
        row.as_ref(),
        premium_price_id,
        premium_plus_price_id,
        Utc::now(),
    ))
}

/// No row or an expired period means the free tier; otherwise the level is
/// mapped from the subscribed price id. An unrecognized price id degrades to
/// free rather than granting anything.
pub fn level_for(
    row: Option<&UserSubscriptionRow>,
    premium_price_id: &str,
    premium_plus_price_id: &str,
    now: DateTime<Utc>,
) -> SubscriptionLevel {
    let Some(row) = row else {
        return SubscriptionLevel::Free;
    };
    if row.stripe_current_period_end < now {
        return SubscriptionLevel::Free;
    }
    if row.stripe_price_id == premium_price_id {
        SubscriptionLevel::Premium
    } else if row.stripe_price_id == premium_plus_price_id {
        SubscriptionLevel::PremiumPlus
    } else {
        warn!(
            "Unrecognized Stripe price id '{}' for user {}",
            row.stripe_price_id, row.user_id
        );
        SubscriptionLevel::Free
    }
}
