// Subscription tiers and the Stripe integration: level resolution,
// permission predicates, checkout/portal session creation, and the webhook
// that mirrors subscription state into the database.

pub mod handlers;
pub mod permissions;
pub mod stripe;
pub mod subscription;
