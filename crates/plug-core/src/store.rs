//! SQLite persistence
//!
//! All reads and writes against `customers`, `plug_status` and `payments`.

use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{CoreError, Result};
use crate::model::{PlugLock, Subscriber};

/// A gateway payment about to be credited to a subscriber
#[derive(Clone, Debug)]
pub struct NewPayment<'a> {
    pub payment_id: &'a str,
    pub phone: &'a str,
    pub plan: &'a str,
    pub amount: i64,
}

/// Outcome of crediting a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentApplication {
    /// Subscription extended to the new expiry date
    Applied { expiry_date: NaiveDate },

    /// This payment id was credited before; nothing changed
    AlreadyApplied,
}

/// Handle to the application database
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url` and run migrations
    pub async fn connect(url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        // One long-lived connection, otherwise each connection sees its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn subscriber(&self, phone: &str) -> Result<Option<Subscriber>> {
        let ret = sqlx::query_as::<_, Subscriber>(
            "SELECT phone, expiry_date, daily_usage, last_used_date FROM customers WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ret)
    }

    pub async fn plug_lock(&self) -> Result<PlugLock> {
        sqlx::query_as::<_, PlugLock>("SELECT last_activation_time FROM plug_status WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::CorruptState("plug_status row is missing".into()))
    }

    /// Start a fresh daily counter for `phone`
    pub async fn reset_daily_usage(&self, phone: &str, today: NaiveDate) -> Result<()> {
        sqlx::query("UPDATE customers SET daily_usage = 0, last_used_date = ? WHERE phone = ?")
            .bind(today)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count one activation for `phone` and stamp the plug lock, in one transaction
    pub async fn commit_activation(
        &self,
        phone: &str,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE plug_status SET last_activation_time = ? WHERE id = 1")
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query(
            r#"
            UPDATE customers
            SET daily_usage = CASE WHEN last_used_date = ? THEN daily_usage + 1 ELSE 1 END,
                last_used_date = ?
            WHERE phone = ?
            "#,
        )
        .bind(today)
        .bind(today)
        .bind(phone)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            return Err(CoreError::CorruptState(format!(
                "subscriber {phone} vanished during activation"
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Extend `phone`'s subscription by `days`, creating the subscriber if needed
    ///
    /// The extension starts from the stored expiry date when there is one, even
    /// if it already lies in the past, otherwise from `now`'s date.
    pub async fn extend_subscription(
        &self,
        phone: &str,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<NaiveDate> {
        let mut tx = self.pool.begin().await?;
        let expiry = Self::extend_in(&mut tx, phone, days, now).await?;
        tx.commit().await?;
        Ok(expiry)
    }

    /// Record a gateway payment and extend the subscription it pays for
    ///
    /// A payment id is only ever credited once.
    pub async fn apply_payment(
        &self,
        payment: &NewPayment<'_>,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<PaymentApplication> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"
            INSERT OR IGNORE INTO payments (payment_id, phone, plan, amount, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.payment_id)
        .bind(payment.phone)
        .bind(payment.plan)
        .bind(payment.amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            return Ok(PaymentApplication::AlreadyApplied);
        }

        let expiry_date = Self::extend_in(&mut tx, payment.phone, days, now).await?;
        tx.commit().await?;

        Ok(PaymentApplication::Applied { expiry_date })
    }

    pub async fn payment_exists(&self, payment_id: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payment_id FROM payments WHERE payment_id = ?")
                .bind(payment_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn extend_in(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        phone: &str,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<NaiveDate> {
        let current: Option<(NaiveDate,)> =
            sqlx::query_as("SELECT expiry_date FROM customers WHERE phone = ?")
                .bind(phone)
                .fetch_optional(&mut **tx)
                .await?;

        let base = current.map_or_else(|| now.date(), |(expiry,)| expiry);
        let new_expiry = base
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| CoreError::CorruptState(format!("expiry overflow for {phone}")))?;

        sqlx::query(
            r#"
            INSERT INTO customers (phone, expiry_date) VALUES (?, ?)
            ON CONFLICT(phone) DO UPDATE SET expiry_date = excluded.expiry_date
            "#,
        )
        .bind(phone)
        .bind(new_expiry)
        .execute(&mut **tx)
        .await?;

        Ok(new_expiry)
    }
}
