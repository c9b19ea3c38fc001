use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of in-app notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BalanceChange,
    NewTransaction,
    LargeTransaction,
    AlertTriggered,
    System,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::BalanceChange => write!(f, "balance_change"),
            NotificationType::NewTransaction => write!(f, "new_transaction"),
            NotificationType::LargeTransaction => write!(f, "large_transaction"),
            NotificationType::AlertTriggered => write!(f, "alert_triggered"),
            NotificationType::System => write!(f, "system"),
        }
    }
}

/// Notification priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Kinds of user-configured alert rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Balance,
    Transaction,
    LargeTransaction,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Balance => write!(f, "balance"),
            AlertType::Transaction => write!(f, "transaction"),
            AlertType::LargeTransaction => write!(f, "large_transaction"),
        }
    }
}

/// How often email digests are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    Instant,
    Hourly,
    Daily,
    Weekly,
    Never,
}

impl std::fmt::Display for DigestFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestFrequency::Instant => write!(f, "instant"),
            DigestFrequency::Hourly => write!(f, "hourly"),
            DigestFrequency::Daily => write!(f, "daily"),
            DigestFrequency::Weekly => write!(f, "weekly"),
            DigestFrequency::Never => write!(f, "never"),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A user-owned named group of tracked addresses.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A tracked Ethereum address.
///
/// The `address` column is the canonical identity: `0x` + 40 hex characters,
/// stored lowercase, globally unique. Rows are created on first reference —
/// either by a user adding the address or by transaction sync discovering a
/// counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EthereumAddress {
    pub id: Uuid,
    pub address: String,
    pub label: String,
    pub balance: Decimal,
    pub is_contract: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EthereumAddress {
    /// Human-readable name for notification titles: the label when set,
    /// otherwise a shortened form of the hex address.
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            crate::address::short(&self.address)
        } else {
            self.label.clone()
        }
    }
}

/// Membership of an address in a watchlist.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub watchlist_id: Uuid,
    pub address_id: Uuid,
    pub notes: String,
    pub added_at: DateTime<Utc>,
}

/// An on-chain transaction between two tracked addresses.
///
/// Immutable once created; the unique `hash` is the idempotence key that
/// guards ingestion against reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub hash: String,
    pub from_address_id: Uuid,
    pub to_address_id: Uuid,
    pub value: Decimal,
    pub gas_price: i64,
    pub gas_used: i64,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub status: bool,
}

/// A user-owned alert rule for one address.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub alert_type: AlertType,
    pub threshold: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

/// An in-app notification delivered to one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub address_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub alert_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user notification preferences, one row per user, created lazily on
/// first access.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationPreference {
    pub id: Uuid,
    pub user_id: Uuid,

    pub email_balance_change: bool,
    pub email_new_transaction: bool,
    pub email_large_transaction: bool,
    pub email_alert_triggered: bool,
    pub email_system: bool,

    pub inapp_balance_change: bool,
    pub inapp_new_transaction: bool,
    pub inapp_large_transaction: bool,
    pub inapp_alert_triggered: bool,
    pub inapp_system: bool,

    pub large_transaction_threshold: Decimal,
    pub digest_frequency: DigestFrequency,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Whether email delivery is enabled for the given notification type.
    ///
    /// A fixed mapping rather than a dynamic field lookup, so every
    /// notification type has an explicit preference flag.
    pub fn email_enabled(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::BalanceChange => self.email_balance_change,
            NotificationType::NewTransaction => self.email_new_transaction,
            NotificationType::LargeTransaction => self.email_large_transaction,
            NotificationType::AlertTriggered => self.email_alert_triggered,
            NotificationType::System => self.email_system,
        }
    }

    /// Whether in-app display is enabled for the given notification type.
    pub fn inapp_enabled(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::BalanceChange => self.inapp_balance_change,
            NotificationType::NewTransaction => self.inapp_new_transaction,
            NotificationType::LargeTransaction => self.inapp_large_transaction,
            NotificationType::AlertTriggered => self.inapp_alert_triggered,
            NotificationType::System => self.inapp_system,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prefs() -> NotificationPreference {
        NotificationPreference {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email_balance_change: true,
            email_new_transaction: false,
            email_large_transaction: true,
            email_alert_triggered: true,
            email_system: true,
            inapp_balance_change: true,
            inapp_new_transaction: true,
            inapp_large_transaction: false,
            inapp_alert_triggered: true,
            inapp_system: true,
            large_transaction_threshold: dec!(10),
            digest_frequency: DigestFrequency::Instant,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_email_flag_mapping() {
        let p = prefs();
        assert!(p.email_enabled(NotificationType::BalanceChange));
        assert!(!p.email_enabled(NotificationType::NewTransaction));
        assert!(p.email_enabled(NotificationType::LargeTransaction));
    }

    #[test]
    fn test_inapp_flag_mapping() {
        let p = prefs();
        assert!(p.inapp_enabled(NotificationType::NewTransaction));
        assert!(!p.inapp_enabled(NotificationType::LargeTransaction));
    }

    #[test]
    fn test_notification_type_display_matches_serde() {
        let json = serde_json::to_string(&NotificationType::LargeTransaction).unwrap();
        assert_eq!(json, "\"large_transaction\"");
        assert_eq!(
            NotificationType::LargeTransaction.to_string(),
            "large_transaction"
        );
    }

    #[test]
    fn test_display_label_falls_back_to_short_address() {
        let addr = EthereumAddress {
            id: Uuid::new_v4(),
            address: "0xabcdef0123456789abcdef0123456789abcdef01".to_string(),
            label: String::new(),
            balance: Decimal::ZERO,
            is_contract: false,
            last_synced_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(addr.display_label(), "0xabcdef01...");

        let labeled = EthereumAddress {
            label: "Cold wallet".to_string(),
            ..addr
        };
        assert_eq!(labeled.display_label(), "Cold wallet");
    }
}
