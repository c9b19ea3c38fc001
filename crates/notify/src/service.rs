//! Notification dispatch service.
//!
//! Given a domain event (balance changed, new transaction), resolves the set
//! of interested users via their watchlists, creates one notification row
//! per user per direction, and attempts email delivery gated on the user's
//! preferences. Email failures are logged and reported as a boolean — the
//! in-app row always survives.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ethwatch_common::address;
use ethwatch_common::error::AppError;
use ethwatch_common::types::{
    Alert, DigestFrequency, EthereumAddress, Notification, NotificationType, Priority,
    Transaction, User,
};

use crate::alerts::AlertService;
use crate::mailer::{Mailer, OutgoingEmail};
use crate::preferences;

/// Fallback sender when `EMAIL_FROM` is not configured.
const DEFAULT_FROM: &str = "EthWatch <noreply@ethwatch.dev>";

/// A notification about to be created.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub address_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub alert_id: Option<Uuid>,
    /// Skip the email attempt entirely (in-app only).
    pub suppress_email: bool,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
        priority: Priority,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            notification_type,
            priority,
            address_id: None,
            transaction_id: None,
            alert_id: None,
            suppress_email: false,
        }
    }
}

/// Dispatch fan-out for domain events.
#[derive(Clone)]
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    email_from: Option<String>,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, email_from: Option<String>) -> Self {
        Self { mailer, email_from }
    }

    /// Insert a notification row, then attempt email delivery unless
    /// suppressed. The row persists regardless of the email outcome.
    pub async fn create_notification(
        &self,
        pool: &PgPool,
        new: NewNotification,
    ) -> Result<Notification, AppError> {
        let mut notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications
                (id, user_id, title, message, notification_type, priority,
                 address_id, transaction_id, alert_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.notification_type)
        .bind(new.priority)
        .bind(new.address_id)
        .bind(new.transaction_id)
        .bind(new.alert_id)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            notification_id = %notification.id,
            user_id = %new.user_id,
            notification_type = %new.notification_type,
            "Notification created"
        );

        if !new.suppress_email && self.send_email(pool, &notification).await? {
            notification.email_sent = true;
        }

        Ok(notification)
    }

    /// Attempt email delivery for a notification.
    ///
    /// Returns Ok(false) without sending when the user has disabled email
    /// for this type, set their digest frequency to `never`, the message was
    /// already sent, or the transport is not configured. Transport failures
    /// are logged and reported as Ok(false) — never an error.
    pub async fn send_email(
        &self,
        pool: &PgPool,
        notification: &Notification,
    ) -> Result<bool, AppError> {
        if notification.email_sent || !self.mailer.enabled() {
            return Ok(false);
        }

        let prefs = preferences::get_or_create(pool, notification.user_id).await?;
        if !prefs.email_enabled(notification.notification_type)
            || prefs.digest_frequency == DigestFrequency::Never
        {
            return Ok(false);
        }

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(notification.user_id)
            .fetch_one(pool)
            .await?;

        let email = OutgoingEmail {
            from: self
                .email_from
                .clone()
                .unwrap_or_else(|| DEFAULT_FROM.to_string()),
            to: user.email,
            subject: format!("[EthWatch] {}", notification.title),
            text: notification.message.clone(),
            html: render_email_html(notification),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                sqlx::query("UPDATE notifications SET email_sent = true WHERE id = $1")
                    .bind(notification.id)
                    .execute(pool)
                    .await?;

                tracing::info!(notification_id = %notification.id, "Notification email sent");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(
                    notification_id = %notification.id,
                    error = %e,
                    "Failed to send notification email"
                );
                Ok(false)
            }
        }
    }

    /// Fan out a balance change to every user watching the address.
    pub async fn balance_changed(
        &self,
        pool: &PgPool,
        address: &EthereumAddress,
        old_balance: Decimal,
        new_balance: Decimal,
    ) -> Result<(), AppError> {
        let change = new_balance - old_balance;
        let direction = if change > Decimal::ZERO {
            "increased"
        } else {
            "decreased"
        };

        let watchers = Self::watchers_of(pool, address.id).await?;

        for user in &watchers {
            let title = format!("Balance {}: {}", direction, address.display_label());
            let message = format!(
                "Address balance {} by {:.6} ETH (from {:.6} to {:.6} ETH)",
                direction,
                change.abs(),
                old_balance,
                new_balance
            );

            let mut new = NewNotification::new(
                user.id,
                title,
                message,
                NotificationType::BalanceChange,
                Priority::Medium,
            );
            new.address_id = Some(address.id);
            self.create_notification(pool, new).await?;

            self.fire_balance_alerts(pool, user, address, change.abs())
                .await?;
        }

        tracing::info!(
            address = %address.address,
            watchers = watchers.len(),
            change = %change,
            "Balance change dispatched"
        );

        Ok(())
    }

    /// Fan out a newly ingested transaction.
    ///
    /// Users watching the sender get an outgoing notification; users
    /// watching the receiver get an incoming one. A user watching both
    /// addresses receives two distinct notifications, one per direction.
    pub async fn new_transaction(&self, pool: &PgPool, tx: &Transaction) -> Result<(), AppError> {
        let from = Self::address_by_id(pool, tx.from_address_id).await?;
        let to = Self::address_by_id(pool, tx.to_address_id).await?;

        let from_watchers = Self::watchers_of(pool, from.id).await?;
        for user in &from_watchers {
            let title = format!("Outgoing Transaction: {}", from.display_label());
            let message = format!(
                "Sent {:.6} ETH to {}",
                tx.value,
                address::short(&to.address)
            );

            let mut new = NewNotification::new(
                user.id,
                title,
                message,
                NotificationType::NewTransaction,
                Priority::Low,
            );
            new.address_id = Some(from.id);
            new.transaction_id = Some(tx.id);
            self.create_notification(pool, new).await?;
        }

        let to_watchers = Self::watchers_of(pool, to.id).await?;
        for user in &to_watchers {
            let title = format!("Incoming Transaction: {}", to.display_label());
            let message = format!(
                "Received {:.6} ETH from {}",
                tx.value,
                address::short(&from.address)
            );

            let mut new = NewNotification::new(
                user.id,
                title,
                message,
                NotificationType::NewTransaction,
                Priority::Low,
            );
            new.address_id = Some(to.id);
            new.transaction_id = Some(tx.id);
            self.create_notification(pool, new).await?;
        }

        // Large-transaction and alert-rule evaluation runs once per distinct
        // user; a watcher of both sides is associated with the side seen
        // first.
        let mut seen: Vec<Uuid> = Vec::new();
        for (user, watched) in from_watchers
            .iter()
            .map(|u| (u, &from))
            .chain(to_watchers.iter().map(|u| (u, &to)))
        {
            if seen.contains(&user.id) {
                continue;
            }
            seen.push(user.id);

            self.maybe_large_transaction(pool, user, watched, tx).await?;
            self.fire_transaction_alerts(pool, user, watched, tx).await?;
        }

        Ok(())
    }

    /// Count of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Mark one notification as read. Returns true if an unread row owned by
    /// the user was updated.
    pub async fn mark_read(
        pool: &PgPool,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = true, read_at = $1
            WHERE id = $2 AND user_id = $3 AND is_read = false
            "#,
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread notification for a user as read.
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = true, read_at = $1
            WHERE user_id = $2 AND is_read = false
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Distinct users who have the address in any of their watchlists.
    async fn watchers_of(pool: &PgPool, address_id: Uuid) -> Result<Vec<User>, AppError> {
        let users: Vec<User> = sqlx::query_as(
            r#"
            SELECT DISTINCT u.*
            FROM users u
            JOIN watchlists w ON w.user_id = u.id
            JOIN watchlist_entries we ON we.watchlist_id = w.id
            WHERE we.address_id = $1
            "#,
        )
        .bind(address_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    async fn address_by_id(pool: &PgPool, id: Uuid) -> Result<EthereumAddress, AppError> {
        let addr: EthereumAddress = sqlx::query_as("SELECT * FROM ethereum_addresses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Address {} not found", id)))?;

        Ok(addr)
    }

    /// Create a `large_transaction` notification when the value clears the
    /// user's configured threshold. This is the user-configurable preference
    /// threshold, independent of the fixed balance-change minimum.
    async fn maybe_large_transaction(
        &self,
        pool: &PgPool,
        user: &User,
        watched: &EthereumAddress,
        tx: &Transaction,
    ) -> Result<(), AppError> {
        let prefs = preferences::get_or_create(pool, user.id).await?;
        if tx.value < prefs.large_transaction_threshold {
            return Ok(());
        }

        let mut new = NewNotification::new(
            user.id,
            format!("Large Transaction: {}", watched.display_label()),
            format!(
                "Transaction of {:.6} ETH involving {}",
                tx.value,
                address::short(&watched.address)
            ),
            NotificationType::LargeTransaction,
            Priority::High,
        );
        new.address_id = Some(watched.id);
        new.transaction_id = Some(tx.id);
        self.create_notification(pool, new).await?;

        Ok(())
    }

    async fn fire_balance_alerts(
        &self,
        pool: &PgPool,
        user: &User,
        address: &EthereumAddress,
        change_abs: Decimal,
    ) -> Result<(), AppError> {
        let rules =
            AlertService::find_active(pool, user.id, address.id, ethwatch_common::types::AlertType::Balance)
                .await?;

        for rule in &rules {
            if AlertService::matches_balance_change(rule, change_abs) {
                self.fire_alert(pool, user, address, rule, None).await?;
            }
        }

        Ok(())
    }

    async fn fire_transaction_alerts(
        &self,
        pool: &PgPool,
        user: &User,
        address: &EthereumAddress,
        tx: &Transaction,
    ) -> Result<(), AppError> {
        use ethwatch_common::types::AlertType;

        for alert_type in [AlertType::Transaction, AlertType::LargeTransaction] {
            let rules = AlertService::find_active(pool, user.id, address.id, alert_type).await?;
            for rule in &rules {
                if AlertService::matches_transaction(rule, tx.value) {
                    self.fire_alert(pool, user, address, rule, Some(tx.id)).await?;
                }
            }
        }

        Ok(())
    }

    async fn fire_alert(
        &self,
        pool: &PgPool,
        user: &User,
        address: &EthereumAddress,
        alert: &Alert,
        transaction_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let mut new = NewNotification::new(
            user.id,
            format!("Alert triggered: {}", address.display_label()),
            format!(
                "Your {} alert for {} fired",
                alert.alert_type,
                address::short(&address.address)
            ),
            NotificationType::AlertTriggered,
            Priority::High,
        );
        new.address_id = Some(address.id);
        new.transaction_id = transaction_id;
        new.alert_id = Some(alert.id);
        self.create_notification(pool, new).await?;

        AlertService::mark_triggered(pool, alert.id).await?;

        Ok(())
    }
}

/// Minimal HTML rendition of a notification for the email body.
fn render_email_html(notification: &Notification) -> String {
    format!(
        "<h2>{}</h2><p>{}</p><p style=\"color:#888\">EthWatch — Ethereum address tracking</p>",
        notification.title, notification.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_render_email_html_contains_title_and_message() {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Balance increased: 0xde0b2956...".to_string(),
            message: "Address balance increased by 1.250000 ETH".to_string(),
            notification_type: NotificationType::BalanceChange,
            priority: Priority::Medium,
            address_id: None,
            transaction_id: None,
            alert_id: None,
            is_read: false,
            read_at: None,
            email_sent: false,
            created_at: Utc::now(),
        };
        let html = render_email_html(&n);
        assert!(html.contains("Balance increased"));
        assert!(html.contains("1.250000 ETH"));
    }

    #[test]
    fn test_decimal_precision_in_messages() {
        // The message format pins six fractional digits, as the original
        // notification copy does.
        let value = dec!(1.5);
        assert_eq!(format!("{:.6}", value), "1.500000");
        let tiny = dec!(0.000001);
        assert_eq!(format!("{:.6}", tiny), "0.000001");
    }
}
