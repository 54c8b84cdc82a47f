use calendar_sync::db::DbPool;
use calendar_sync::PgSyncEngine;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub engine: PgSyncEngine,
}
