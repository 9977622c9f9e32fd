//! PostgreSQL record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{BookSnapshot, LineItem, Order, OrderStatus, UserInformation};
use sqlx::{
    PgExecutor, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    LineItemId, OrderId, Result, StoreError,
    store::{RecordStore, UnitOfWork, validate_unit_of_work},
};

/// PostgreSQL-backed record store implementation.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e| StoreError::CorruptRecord(format!("{e}")))?;
        let user_information: UserInformation =
            serde_json::from_value(row.try_get("user_information")?)?;

        Ok(Order::from_parts(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            status,
            user_information,
            row.try_get("total_price")?,
            row.try_get::<DateTime<Utc>, _>("created_at")?,
            row.try_get::<DateTime<Utc>, _>("updated_at")?,
        ))
    }

    fn row_to_line_item(row: PgRow) -> Result<LineItem> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity).map_err(|_| {
            StoreError::CorruptRecord(format!("negative line item quantity: {quantity}"))
        })?;
        let book: BookSnapshot = serde_json::from_value(row.try_get("book")?)?;

        Ok(LineItem::from_parts(
            LineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            row.try_get("isbn")?,
            quantity,
            book,
        ))
    }
}

async fn upsert_order<'e, E: PgExecutor<'e>>(executor: E, order: &Order) -> Result<()> {
    let user_information = serde_json::to_value(order.user_information())?;

    sqlx::query(
        r#"
        INSERT INTO orders (id, status, user_information, total_price, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            user_information = EXCLUDED.user_information,
            total_price = EXCLUDED.total_price,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(order.status().as_str())
    .bind(user_information)
    .bind(order.total_price())
    .bind(order.created_at())
    .bind(order.updated_at())
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_line_item<'e, E: PgExecutor<'e>>(executor: E, item: &LineItem) -> Result<()> {
    let book = serde_json::to_value(item.book())?;
    let quantity = i32::try_from(item.quantity()).map_err(|_| {
        StoreError::InvalidUnitOfWork(format!("quantity {} out of range", item.quantity()))
    })?;

    sqlx::query(
        r#"
        INSERT INTO line_items (id, order_id, isbn, quantity, book)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(item.id().as_uuid())
    .bind(item.order_id().as_uuid())
    .bind(item.isbn())
    .bind(quantity)
    .bind(book)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn save_order(&self, order: &Order) -> Result<()> {
        upsert_order(&self.pool, order).await
    }

    async fn transition_order(&self, order: &Order, expected: OrderStatus) -> Result<bool> {
        let user_information = serde_json::to_value(order.user_information())?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                user_information = $3,
                total_price = $4,
                updated_at = $5
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(user_information)
        .bind(order.total_price())
        .bind(order.updated_at())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, status, user_information, total_price, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn save_line_item(&self, item: &LineItem) -> Result<()> {
        insert_line_item(&self.pool, item).await
    }

    async fn find_line_items(&self, order_id: OrderId) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, isbn, quantity, book
            FROM line_items
            WHERE order_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<()> {
        validate_unit_of_work(&unit)?;

        // Start a transaction; dropping it without commit rolls back
        let mut tx = self.pool.begin().await?;

        // Orders first so the line item foreign keys resolve
        for order in unit.orders() {
            upsert_order(&mut *tx, order).await?;
        }
        for item in unit.line_items() {
            insert_line_item(&mut *tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
