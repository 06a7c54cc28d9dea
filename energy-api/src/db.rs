use crate::directory::Directory;
use crate::errors::{Error, Result};
use crate::metrics::DB_FAILURES_TOTAL;
use crate::model::{Building, Reading, StoredReading, User};
use crate::store::ReadingStore;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info, warn};

const MAX_INSERT_ATTEMPTS: u32 = 5;

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, reading: &Reading) -> Result<StoredReading> {
        let stored = sqlx::query_as::<_, StoredReading>(
            r#"
            INSERT INTO readings (building_id, sensor_id, ts, value)
            VALUES ($1, $2, $3, $4)
            RETURNING id, building_id, sensor_id, ts AS timestamp, value
            "#,
        )
        .bind(reading.building_id)
        .bind(&reading.sensor_id)
        .bind(reading.timestamp)
        .bind(reading.value)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn append(&self, reading: Reading) -> Result<StoredReading> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.insert(&reading).await {
                Ok(stored) => return Ok(stored),
                Err(Error::Database(db_err)) => {
                    DB_FAILURES_TOTAL.inc();
                    if attempts >= MAX_INSERT_ATTEMPTS || !is_transient_error(&db_err) {
                        error!(
                            "Database insert failed permanently after {} attempts: {}",
                            attempts, db_err
                        );
                        return Err(Error::Database(db_err));
                    }

                    let wait_ms = 100 * 2_u64.pow(attempts - 1).min(32);
                    warn!(
                        "Database insert failed (attempt {}/{}), retrying in {}ms: {}",
                        attempts, MAX_INSERT_ATTEMPTS, wait_ms, db_err
                    );
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
                Err(e) => {
                    error!("Database insert failed with non-database error: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn query_recent(
        &self,
        building_id: i64,
        since: NaiveDateTime,
    ) -> Result<Vec<StoredReading>> {
        let readings = sqlx::query_as::<_, StoredReading>(
            r#"
            SELECT id, building_id, sensor_id, ts AS timestamp, value
            FROM readings
            WHERE building_id = $1 AND ts >= $2
            ORDER BY ts DESC, id DESC
            "#,
        )
        .bind(building_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            role: row.role.parse()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, role FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_building(&self, id: i64) -> Result<Option<Building>> {
        let building = sqlx::query_as::<_, Building>(
            "SELECT id, name, owner_id, address FROM buildings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(building)
    }

    async fn list_buildings(&self) -> Result<Vec<Building>> {
        let buildings = sqlx::query_as::<_, Building>(
            "SELECT id, name, owner_id, address FROM buildings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(buildings)
    }

    async fn buildings_owned_by(&self, owner_id: i64) -> Result<Vec<Building>> {
        let buildings = sqlx::query_as::<_, Building>(
            "SELECT id, name, owner_id, address FROM buildings WHERE owner_id = $1 ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(buildings)
    }
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code == "08000" || // connection_exception
            code == "08003" || // connection_does_not_exist
            code == "08006" || // connection_failure
            code == "57P03" || // cannot_connect_now
            code == "53300" // too_many_connections
        }),
        _ => false,
    }
}
