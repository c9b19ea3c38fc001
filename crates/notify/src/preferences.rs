//! Per-user notification preference storage.
//!
//! Exactly one row per user, created lazily with all-default flags the
//! first time anything needs it.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{DigestFrequency, NotificationPreference};

/// Fetch a user's preference row, creating it with defaults when absent.
pub async fn get_or_create(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<NotificationPreference, AppError> {
    let prefs: NotificationPreference = sqlx::query_as(
        r#"
        INSERT INTO notification_preferences (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(prefs)
}

/// Partial preference update; omitted fields keep their current value.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdatePreferences {
    pub email_balance_change: Option<bool>,
    pub email_new_transaction: Option<bool>,
    pub email_large_transaction: Option<bool>,
    pub email_alert_triggered: Option<bool>,
    pub email_system: Option<bool>,

    pub inapp_balance_change: Option<bool>,
    pub inapp_new_transaction: Option<bool>,
    pub inapp_large_transaction: Option<bool>,
    pub inapp_alert_triggered: Option<bool>,
    pub inapp_system: Option<bool>,

    pub large_transaction_threshold: Option<Decimal>,
    pub digest_frequency: Option<DigestFrequency>,
}

/// Apply a partial update to a user's preferences.
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    params: &UpdatePreferences,
) -> Result<NotificationPreference, AppError> {
    let current = get_or_create(pool, user_id).await?;

    let prefs: NotificationPreference = sqlx::query_as(
        r#"
        UPDATE notification_preferences SET
            email_balance_change = $1,
            email_new_transaction = $2,
            email_large_transaction = $3,
            email_alert_triggered = $4,
            email_system = $5,
            inapp_balance_change = $6,
            inapp_new_transaction = $7,
            inapp_large_transaction = $8,
            inapp_alert_triggered = $9,
            inapp_system = $10,
            large_transaction_threshold = $11,
            digest_frequency = $12,
            updated_at = NOW()
        WHERE user_id = $13
        RETURNING *
        "#,
    )
    .bind(
        params
            .email_balance_change
            .unwrap_or(current.email_balance_change),
    )
    .bind(
        params
            .email_new_transaction
            .unwrap_or(current.email_new_transaction),
    )
    .bind(
        params
            .email_large_transaction
            .unwrap_or(current.email_large_transaction),
    )
    .bind(
        params
            .email_alert_triggered
            .unwrap_or(current.email_alert_triggered),
    )
    .bind(params.email_system.unwrap_or(current.email_system))
    .bind(
        params
            .inapp_balance_change
            .unwrap_or(current.inapp_balance_change),
    )
    .bind(
        params
            .inapp_new_transaction
            .unwrap_or(current.inapp_new_transaction),
    )
    .bind(
        params
            .inapp_large_transaction
            .unwrap_or(current.inapp_large_transaction),
    )
    .bind(
        params
            .inapp_alert_triggered
            .unwrap_or(current.inapp_alert_triggered),
    )
    .bind(params.inapp_system.unwrap_or(current.inapp_system))
    .bind(
        params
            .large_transaction_threshold
            .unwrap_or(current.large_transaction_threshold),
    )
    .bind(params.digest_frequency.unwrap_or(current.digest_frequency))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = %user_id, "Notification preferences updated");

    Ok(prefs)
}
