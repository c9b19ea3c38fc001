//! Alert rules — user-owned per-address conditions evaluated during
//! dispatch.
//!
//! An alert links a user to one address with a type (`balance`,
//! `transaction`, `large_transaction`) and an optional decimal threshold.
//! Matching rules fire an `alert_triggered` notification and stamp
//! `last_triggered_at`.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ethwatch_common::error::AppError;
use ethwatch_common::types::{Alert, AlertType};

/// Service layer for alert rule CRUD and matching.
pub struct AlertService;

/// Parameters for creating a new alert rule.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateAlertParams {
    pub address_id: Uuid,
    pub alert_type: AlertType,
    pub threshold: Option<Decimal>,
}

impl AlertService {
    /// Create a new alert rule for a user.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        params: &CreateAlertParams,
    ) -> Result<Alert, AppError> {
        let alert: Alert = sqlx::query_as(
            r#"
            INSERT INTO alerts (id, user_id, address_id, alert_type, threshold, active)
            VALUES ($1, $2, $3, $4, $5, true)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(params.address_id)
        .bind(params.alert_type)
        .bind(params.threshold)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            alert_id = %alert.id,
            user_id = %user_id,
            alert_type = %params.alert_type,
            "Alert created"
        );

        Ok(alert)
    }

    /// List all alerts for a user, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Alert>, AppError> {
        let alerts: Vec<Alert> =
            sqlx::query_as("SELECT * FROM alerts WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(pool)
                .await?;

        Ok(alerts)
    }

    /// Delete an alert. Returns true if a row owned by the user was deleted.
    pub async fn delete(pool: &PgPool, alert_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1 AND user_id = $2")
            .bind(alert_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(alert_id = %alert_id, "Alert deleted");
        }

        Ok(deleted)
    }

    /// Find a user's active alert rules of one type for an address.
    pub async fn find_active(
        pool: &PgPool,
        user_id: Uuid,
        address_id: Uuid,
        alert_type: AlertType,
    ) -> Result<Vec<Alert>, AppError> {
        let alerts: Vec<Alert> = sqlx::query_as(
            r#"
            SELECT * FROM alerts
            WHERE user_id = $1 AND address_id = $2 AND alert_type = $3 AND active = true
            "#,
        )
        .bind(user_id)
        .bind(address_id)
        .bind(alert_type)
        .fetch_all(pool)
        .await?;

        Ok(alerts)
    }

    /// Stamp the rule as having fired just now.
    pub async fn mark_triggered(pool: &PgPool, alert_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE alerts SET last_triggered_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(alert_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Whether a `balance` rule matches a balance movement of the given
    /// absolute magnitude. A rule without a threshold matches any change.
    pub fn matches_balance_change(alert: &Alert, change_abs: Decimal) -> bool {
        match alert.threshold {
            Some(threshold) => change_abs >= threshold,
            None => true,
        }
    }

    /// Whether a `transaction` / `large_transaction` rule matches a
    /// transaction of the given value. A `large_transaction` rule without a
    /// threshold never matches; a plain `transaction` rule always does.
    pub fn matches_transaction(alert: &Alert, value: Decimal) -> bool {
        match alert.alert_type {
            AlertType::Transaction => true,
            AlertType::LargeTransaction => {
                alert.threshold.map(|t| value >= t).unwrap_or(false)
            }
            AlertType::Balance => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn alert(alert_type: AlertType, threshold: Option<Decimal>) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            alert_type,
            threshold,
            active: true,
            created_at: Utc::now(),
            last_triggered_at: None,
        }
    }

    #[test]
    fn test_balance_rule_without_threshold_matches_any_change() {
        let a = alert(AlertType::Balance, None);
        assert!(AlertService::matches_balance_change(&a, dec!(0.0001)));
    }

    #[test]
    fn test_balance_rule_threshold_gates() {
        let a = alert(AlertType::Balance, Some(dec!(1)));
        assert!(!AlertService::matches_balance_change(&a, dec!(0.5)));
        assert!(AlertService::matches_balance_change(&a, dec!(1)));
        assert!(AlertService::matches_balance_change(&a, dec!(2.5)));
    }

    #[test]
    fn test_transaction_rule_always_matches() {
        let a = alert(AlertType::Transaction, None);
        assert!(AlertService::matches_transaction(&a, dec!(0)));
    }

    #[test]
    fn test_large_transaction_rule_requires_threshold() {
        let without = alert(AlertType::LargeTransaction, None);
        assert!(!AlertService::matches_transaction(&without, dec!(1000)));

        let with = alert(AlertType::LargeTransaction, Some(dec!(100)));
        assert!(!AlertService::matches_transaction(&with, dec!(99.9)));
        assert!(AlertService::matches_transaction(&with, dec!(100)));
    }

    #[test]
    fn test_balance_rule_never_matches_transactions() {
        let a = alert(AlertType::Balance, Some(dec!(1)));
        assert!(!AlertService::matches_transaction(&a, dec!(50)));
    }
}
