use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use shared::{AvailabilityRecord, BlockEvent, CalendarConnection};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::store::{AvailabilityStore, ConnectionStore, NewBlockedNight, PropertyStore};

pub type DbPool = Pool<AsyncPgConnection>;

fn rustls_config() -> rustls::ClientConfig {
    let roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned();
    rustls::ClientConfig::builder()
        .with_root_certificates(rustls::RootCertStore::from_iter(roots))
        .with_no_client_auth()
}

/// Open a Postgres connection over rustls and hand it to diesel-async.
/// The socket is driven by its own task for the connection's lifetime.
async fn connect_tls(url: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(rustls_config());
    let (client, socket) = tokio_postgres::connect(&url, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = socket.await {
            tracing::error!("Postgres TLS connection closed with error: {}", e);
        }
    });

    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = if config.tls {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup =
            Box::new(|url| Box::pin(connect_tls(url.to_string())));
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            config.database_url.clone(),
            manager_config,
        )
    } else {
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url.clone())
    };

    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .context("Failed to create database pool")?;

    Ok(pool)
}

// Calendar connection database operations
pub mod connections {
    use super::*;
    use crate::json_text::JsonText;
    use crate::models::{ConnectionChanges, ConnectionRow, NewConnection};
    use shared::SyncStatus;

    pub async fn list_all(
        conn: &mut AsyncPgConnection,
    ) -> anyhow::Result<Vec<CalendarConnection>> {
        use crate::schema::calendar_connections::dsl::*;

        let rows = calendar_connections
            .order_by(created_at.asc())
            .select(ConnectionRow::as_select())
            .load(conn)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Connections attached to a property; unattached ones have nothing to
    /// reconcile against.
    pub async fn list_attached(
        conn: &mut AsyncPgConnection,
    ) -> anyhow::Result<Vec<CalendarConnection>> {
        use crate::schema::calendar_connections::dsl::*;

        let rows = calendar_connections
            .filter(property_id.is_not_null())
            .order_by(created_at.asc())
            .select(ConnectionRow::as_select())
            .load(conn)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_for_property(
        conn: &mut AsyncPgConnection,
        property: Uuid,
    ) -> anyhow::Result<Vec<CalendarConnection>> {
        use crate::schema::calendar_connections::dsl::*;

        let rows = calendar_connections
            .filter(property_id.eq(property))
            .order_by(created_at.asc())
            .select(ConnectionRow::as_select())
            .load(conn)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_id(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
    ) -> anyhow::Result<Option<CalendarConnection>> {
        use crate::schema::calendar_connections::dsl::*;

        let row = calendar_connections
            .filter(id.eq(connection_id))
            .select(ConnectionRow::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(row.map(Into::into))
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        property: Option<Uuid>,
        url_val: &str,
        label_val: &str,
    ) -> anyhow::Result<CalendarConnection> {
        use crate::schema::calendar_connections::dsl::*;

        let new_connection = NewConnection {
            property_id: property,
            url: url_val.trim().to_string(),
            label: label_val.trim().to_string(),
            sync_status: SyncStatus::Unsynced.as_str().to_string(),
            blocked_dates: JsonText::default(),
        };

        let row = diesel::insert_into(calendar_connections)
            .values(&new_connection)
            .returning(ConnectionRow::as_returning())
            .get_result(conn)
            .await?;

        Ok(row.into())
    }

    /// Apply host edits. A new feed URL means previous sync results no
    /// longer describe it, so the status goes back to unsynced.
    pub async fn update(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
        property: Option<Uuid>,
        url_val: Option<&str>,
        label_val: Option<&str>,
    ) -> anyhow::Result<Option<CalendarConnection>> {
        use crate::schema::calendar_connections::dsl::*;

        let Some(existing) = get_by_id(conn, connection_id).await? else {
            return Ok(None);
        };

        let new_url = url_val.map(|u| u.trim().to_string());
        let url_changed = new_url.as_deref().is_some_and(|u| u != existing.url);

        let changes = ConnectionChanges {
            property_id: property,
            url: new_url,
            label: label_val.map(|l| l.trim().to_string()),
            sync_status: url_changed.then(|| SyncStatus::Unsynced.as_str().to_string()),
            updated_at: Some(Utc::now()),
        };

        let row = diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set(&changes)
            .returning(ConnectionRow::as_returning())
            .get_result(conn)
            .await?;

        Ok(Some(row.into()))
    }

    pub async fn mark_connected(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
        events: &[BlockEvent],
        synced_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::calendar_connections::dsl::*;

        diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set((
                sync_status.eq(SyncStatus::Connected.as_str()),
                last_sync_at.eq(Some(synced_at)),
                last_error.eq(None::<String>),
                blocked_dates.eq(JsonText(events.to_vec())),
                updated_at.eq(synced_at),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn mark_error(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::calendar_connections::dsl::*;

        diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set((
                sync_status.eq(SyncStatus::Error.as_str()),
                last_error.eq(Some(error)),
                updated_at.eq(failed_at),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }
}

// Availability database operations
pub mod availability {
    use super::*;
    use crate::models::{AvailabilityRow, NewAvailability};

    pub async fn find(
        conn: &mut AsyncPgConnection,
        property: Uuid,
        night: NaiveDate,
    ) -> anyhow::Result<Option<AvailabilityRecord>> {
        use crate::schema::availability::dsl::*;

        let row = availability
            .filter(property_id.eq(property))
            .filter(date.eq(night))
            .select(AvailabilityRow::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(row.map(Into::into))
    }

    pub async fn block_existing(
        conn: &mut AsyncPgConnection,
        record_id: Uuid,
        note_val: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::availability::dsl::*;

        diesel::update(availability.filter(id.eq(record_id)))
            .set((
                is_available.eq(false),
                is_gap_night.eq(false),
                note.eq(Some(note_val)),
                updated_at.eq(at),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn insert_blocked(
        conn: &mut AsyncPgConnection,
        night: NewBlockedNight,
    ) -> anyhow::Result<()> {
        use crate::schema::availability::dsl::*;

        let row = NewAvailability {
            property_id: night.property_id,
            date: night.date,
            is_available: false,
            is_gap_night: false,
            nightly_rate: night.nightly_rate,
            gap_night_discount: 0,
            note: Some(night.note),
            updated_at: night.updated_at,
        };

        diesel::insert_into(availability)
            .values(&row)
            .execute(conn)
            .await?;

        Ok(())
    }
}

// Property database operations (read-only)
pub mod properties {
    use super::*;

    pub async fn base_rates(
        conn: &mut AsyncPgConnection,
        property_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, i32>> {
        use crate::schema::properties::dsl::*;

        if property_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i32)> = properties
            .filter(id.eq_any(property_ids))
            .select((id, base_nightly_rate))
            .load(conn)
            .await?;

        Ok(rows.into_iter().collect())
    }
}

/// Postgres-backed storage for the sync engine
#[derive(Clone)]
pub struct PgSyncStore {
    pool: DbPool,
}

impl PgSyncStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn conn(
        &self,
    ) -> anyhow::Result<diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>> {
        self.pool.get().await.context("Failed to get DB connection")
    }
}

#[async_trait]
impl ConnectionStore for PgSyncStore {
    async fn list_attached(&self) -> anyhow::Result<Vec<CalendarConnection>> {
        let mut conn = self.conn().await?;
        connections::list_attached(&mut conn).await
    }

    async fn list_for_property(&self, property_id: Uuid) -> anyhow::Result<Vec<CalendarConnection>> {
        let mut conn = self.conn().await?;
        connections::list_for_property(&mut conn, property_id).await
    }

    async fn get_connection(&self, connection_id: Uuid) -> anyhow::Result<Option<CalendarConnection>> {
        let mut conn = self.conn().await?;
        connections::get_by_id(&mut conn, connection_id).await
    }

    async fn record_sync_success(
        &self,
        connection_id: Uuid,
        events: &[BlockEvent],
        synced_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        connections::mark_connected(&mut conn, connection_id, events, synced_at).await
    }

    async fn record_sync_failure(
        &self,
        connection_id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        connections::mark_error(&mut conn, connection_id, error, failed_at).await
    }
}

#[async_trait]
impl AvailabilityStore for PgSyncStore {
    async fn find_availability(
        &self,
        property_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Option<AvailabilityRecord>> {
        let mut conn = self.conn().await?;
        availability::find(&mut conn, property_id, date).await
    }

    async fn block_existing(
        &self,
        record_id: Uuid,
        note: &str,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        availability::block_existing(&mut conn, record_id, note, updated_at).await
    }

    async fn insert_blocked(&self, night: NewBlockedNight) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        availability::insert_blocked(&mut conn, night).await
    }
}

#[async_trait]
impl PropertyStore for PgSyncStore {
    async fn base_rates(&self, property_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, i32>> {
        let mut conn = self.conn().await?;
        properties::base_rates(&mut conn, property_ids).await
    }
}
