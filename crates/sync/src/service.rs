//! Balance and transaction sync.
//!
//! Brings the local record of an address up to date with the explorer and
//! hands meaningful changes to the notification dispatcher. All operations
//! are single-pass and idempotent: transactions are keyed by hash, balance
//! updates are last-write-wins.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use ethwatch_common::address;
use ethwatch_common::error::AppError;
use ethwatch_common::types::{EthereumAddress, Transaction};
use ethwatch_notify::NotificationService;

use crate::etherscan::{EtherscanClient, TxRecord};
use crate::units::wei_to_eth;

/// Minimum absolute balance movement (in ETH) that triggers a
/// `balance_changed` dispatch. Changes at or below this are persisted
/// silently. Independent of the per-user large-transaction threshold in
/// notification preferences.
pub const MIN_BALANCE_CHANGE: Decimal = dec!(0.001);

/// Service layer for on-demand address synchronization.
pub struct SyncService;

impl SyncService {
    /// Whether a balance movement is large enough to notify about.
    pub fn is_significant_change(old_balance: Decimal, new_balance: Decimal) -> bool {
        (new_balance - old_balance).abs() > MIN_BALANCE_CHANGE
    }

    /// Look up an address row by its canonical (lowercase) form.
    pub async fn find_by_address(
        pool: &PgPool,
        canonical: &str,
    ) -> Result<Option<EthereumAddress>, AppError> {
        let addr: Option<EthereumAddress> =
            sqlx::query_as("SELECT * FROM ethereum_addresses WHERE address = $1")
                .bind(canonical)
                .fetch_optional(pool)
                .await?;

        Ok(addr)
    }

    /// Fetch or create the row for an address, normalizing the input.
    /// Addresses come into existence on first reference — a user adding one,
    /// or sync discovering a counterparty.
    pub async fn get_or_create_address(
        pool: &PgPool,
        raw: &str,
    ) -> Result<EthereumAddress, AppError> {
        let canonical = address::normalize(raw)?;

        let addr: EthereumAddress = sqlx::query_as(
            r#"
            INSERT INTO ethereum_addresses (id, address)
            VALUES ($1, $2)
            ON CONFLICT (address) DO UPDATE SET address = EXCLUDED.address
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&canonical)
        .fetch_one(pool)
        .await?;

        Ok(addr)
    }

    /// Refresh an address's balance from the explorer.
    ///
    /// Persists the new balance and sync timestamp; dispatches
    /// `balance_changed` when the movement exceeds [`MIN_BALANCE_CHANGE`].
    /// Provider failures propagate to the caller and are not retried.
    pub async fn refresh_balance(
        pool: &PgPool,
        client: &EtherscanClient,
        notifier: &NotificationService,
        address: &EthereumAddress,
    ) -> Result<EthereumAddress, AppError> {
        let wei = client.fetch_balance(&address.address).await?;
        Self::apply_balance(pool, notifier, address, &wei).await
    }

    /// Persist a freshly fetched wei balance and dispatch on significant
    /// change. Split from [`refresh_balance`] so the update path can be
    /// exercised without a live provider.
    pub async fn apply_balance(
        pool: &PgPool,
        notifier: &NotificationService,
        address: &EthereumAddress,
        wei: &str,
    ) -> Result<EthereumAddress, AppError> {
        let old_balance = address.balance;
        let new_balance = wei_to_eth(wei)?;

        let updated: EthereumAddress = sqlx::query_as(
            r#"
            UPDATE ethereum_addresses
            SET balance = $1, last_synced_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(new_balance)
        .bind(Utc::now())
        .bind(address.id)
        .fetch_one(pool)
        .await?;

        tracing::debug!(
            address = %updated.address,
            old_balance = %old_balance,
            new_balance = %new_balance,
            "Balance refreshed"
        );

        if Self::is_significant_change(old_balance, new_balance) {
            notifier
                .balance_changed(pool, &updated, old_balance, new_balance)
                .await?;
        }

        Ok(updated)
    }

    /// Number of transactions known locally for an address, in either
    /// direction. The caller seeds history only when this is zero.
    pub async fn transaction_count(pool: &PgPool, address_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM transactions WHERE from_address_id = $1 OR to_address_id = $1",
        )
        .bind(address_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Fetch the explorer's transaction list for an address and ingest it.
    pub async fn sync_transactions(
        pool: &PgPool,
        client: &EtherscanClient,
        notifier: &NotificationService,
        address: &EthereumAddress,
    ) -> Result<u32, AppError> {
        let records = client.fetch_transactions(&address.address).await?;
        let inserted = Self::ingest_transactions(pool, notifier, &records).await?;

        tracing::info!(
            address = %address.address,
            fetched = records.len(),
            inserted,
            "Transaction history synced"
        );

        Ok(inserted)
    }

    /// Ingest explorer transaction records.
    ///
    /// Records whose hash is already known are skipped — this is the
    /// idempotence guarantee, and it also collapses duplicate hashes within
    /// a single payload. Counterparty addresses are created on demand.
    /// Every row actually inserted dispatches a `new_transaction` event.
    pub async fn ingest_transactions(
        pool: &PgPool,
        notifier: &NotificationService,
        records: &[TxRecord],
    ) -> Result<u32, AppError> {
        let mut inserted = 0u32;

        for record in records {
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM transactions WHERE hash = $1")
                    .bind(&record.hash)
                    .fetch_optional(pool)
                    .await?;
            if exists.is_some() {
                continue;
            }

            // Contract-creation records have no `to` address; they cannot be
            // represented as an address pair and are skipped. Only validation
            // failures skip — a database error must abort the run, or the
            // zero-transactions seeding gate would never refetch the rows.
            let from = match Self::get_or_create_address(pool, &record.from).await {
                Ok(addr) => addr,
                Err(AppError::Validation(_)) => {
                    tracing::debug!(hash = %record.hash, "Skipping record with unusable sender");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let to = match Self::get_or_create_address(pool, &record.to).await {
                Ok(addr) => addr,
                Err(AppError::Validation(_)) => {
                    tracing::debug!(hash = %record.hash, "Skipping record with unusable recipient");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let tx = Self::insert_transaction(pool, record, from.id, to.id).await?;

            // A concurrent request may have inserted the same hash between
            // the existence check and our insert; ON CONFLICT covers that.
            let Some(tx) = tx else { continue };

            notifier.new_transaction(pool, &tx).await?;
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn insert_transaction(
        pool: &PgPool,
        record: &TxRecord,
        from_id: Uuid,
        to_id: Uuid,
    ) -> Result<Option<Transaction>, AppError> {
        let value = wei_to_eth(&record.value)?;
        let gas_price = parse_int(&record.gas_price, "gasPrice")?;
        let gas_used = parse_int(&record.gas_used, "gasUsed")?;
        let block_number = parse_int(&record.block_number, "blockNumber")?;

        let unix_ts = parse_int(&record.time_stamp, "timeStamp")?;
        let block_timestamp = Utc
            .timestamp_opt(unix_ts, 0)
            .single()
            .ok_or_else(|| {
                AppError::Provider(format!("Invalid timestamp from provider: {}", unix_ts))
            })?;

        let tx: Option<Transaction> = sqlx::query_as(
            r#"
            INSERT INTO transactions
                (id, hash, from_address_id, to_address_id, value,
                 gas_price, gas_used, block_number, block_timestamp, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (hash) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.hash)
        .bind(from_id)
        .bind(to_id)
        .bind(value)
        .bind(gas_price)
        .bind(gas_used)
        .bind(block_number)
        .bind(block_timestamp)
        .bind(record.succeeded())
        .fetch_optional(pool)
        .await?;

        Ok(tx)
    }
}

fn parse_int(raw: &str, field: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| {
        AppError::Provider(format!("Invalid {} from provider: {:?}", field, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_at_threshold_is_not_significant() {
        assert!(!SyncService::is_significant_change(dec!(1), dec!(1.001)));
        assert!(!SyncService::is_significant_change(dec!(1.001), dec!(1)));
    }

    #[test]
    fn test_change_above_threshold_is_significant() {
        assert!(SyncService::is_significant_change(dec!(1), dec!(1.0011)));
        assert!(SyncService::is_significant_change(dec!(5), dec!(2)));
    }

    #[test]
    fn test_direction_does_not_matter() {
        assert!(SyncService::is_significant_change(dec!(10), dec!(9.5)));
        assert!(SyncService::is_significant_change(dec!(9.5), dec!(10)));
    }

    #[test]
    fn test_no_change_is_not_significant() {
        assert!(!SyncService::is_significant_change(dec!(3.5), dec!(3.5)));
    }

    #[test]
    fn test_parse_int_rejects_garbage() {
        assert!(parse_int("21000", "gasUsed").is_ok());
        assert!(parse_int("", "gasUsed").is_err());
        assert!(parse_int("0x5208", "gasUsed").is_err());
    }
}
