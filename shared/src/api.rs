use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{BlockEvent, CalendarConnection, SyncStatus};

// ============================================================================
// Calendar Connection API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateConnectionRequest {
    pub property_id: Option<Uuid>,

    #[validate(length(min = 1, max = 2048), custom = "validate_feed_url")]
    pub url: String,

    #[validate(length(min = 1, max = 100))]
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateConnectionRequest {
    pub property_id: Option<Uuid>,

    #[validate(length(min = 1, max = 2048), custom = "validate_feed_url")]
    pub url: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub label: Option<String>,
}

/// Feed URLs must be http(s) or webcal; anything else is never fetchable.
fn validate_feed_url(url: &str) -> Result<(), ValidationError> {
    let lower = url.trim().to_ascii_lowercase();
    let allowed = ["http://", "https://", "webcal://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len());

    if allowed {
        Ok(())
    } else {
        Err(ValidationError::new("feed_url_scheme"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub url: String,
    pub label: String,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub blocked_dates: Vec<BlockEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CalendarConnection> for ConnectionResponse {
    fn from(connection: CalendarConnection) -> Self {
        ConnectionResponse {
            id: connection.id,
            property_id: connection.property_id,
            url: connection.url,
            label: connection.label,
            sync_status: connection.sync_status,
            last_sync_at: connection.last_sync_at,
            last_error: connection.last_error,
            blocked_dates: connection.blocked_dates,
            created_at: connection.created_at,
            updated_at: connection.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListConnectionsResponse {
    pub connections: Vec<ConnectionResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListConnectionsQuery {
    pub property_id: Option<Uuid>,
}

// ============================================================================
// Sync API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub connections: Vec<ConnectionSyncStatus>,
    pub connected: usize,
    pub errored: usize,
    pub unsynced: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionSyncStatus {
    pub connection_id: Uuid,
    pub property_id: Option<Uuid>,
    pub label: String,
    pub status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<&CalendarConnection> for ConnectionSyncStatus {
    fn from(connection: &CalendarConnection) -> Self {
        ConnectionSyncStatus {
            connection_id: connection.id,
            property_id: connection.property_id,
            label: connection.label.clone(),
            status: connection.sync_status,
            last_sync_at: connection.last_sync_at,
            error: connection.last_error.clone(),
        }
    }
}

impl SyncStatusResponse {
    pub fn from_connections(connections: &[CalendarConnection]) -> Self {
        let count = |status: SyncStatus| {
            connections
                .iter()
                .filter(|c| c.sync_status == status)
                .count()
        };

        SyncStatusResponse {
            connected: count(SyncStatus::Connected),
            errored: count(SyncStatus::Error),
            unsynced: count(SyncStatus::Unsynced),
            connections: connections.iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(url: &str, label: &str) -> CreateConnectionRequest {
        CreateConnectionRequest {
            property_id: None,
            url: url.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_accepts_http_and_webcal_urls() {
        assert!(create_request("https://www.airbnb.com/calendar/ical/1.ics", "Airbnb")
            .validate()
            .is_ok());
        assert!(create_request("webcal://admin.booking.com/hotel/ical.ics", "Booking.com")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(create_request("ftp://example.com/feed.ics", "Stayz")
            .validate()
            .is_err());
        assert!(create_request("https://", "Stayz").validate().is_err());
    }

    #[test]
    fn test_rejects_empty_label() {
        assert!(create_request("https://example.com/feed.ics", "")
            .validate()
            .is_err());
    }

    #[test]
    fn test_update_allows_partial_fields() {
        let request = UpdateConnectionRequest {
            property_id: None,
            url: None,
            label: Some("VRBO".to_string()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_status_response_counts_by_status() {
        let base = CalendarConnection {
            id: Uuid::new_v4(),
            property_id: None,
            url: "https://example.com/a.ics".to_string(),
            label: "A".to_string(),
            sync_status: SyncStatus::Connected,
            last_sync_at: None,
            last_error: None,
            blocked_dates: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let errored = CalendarConnection {
            id: Uuid::new_v4(),
            sync_status: SyncStatus::Error,
            last_error: Some("request timed out".to_string()),
            ..base.clone()
        };

        let response = SyncStatusResponse::from_connections(&[base, errored]);
        assert_eq!(response.connected, 1);
        assert_eq!(response.errored, 1);
        assert_eq!(response.unsynced, 0);
        assert_eq!(response.connections[1].error.as_deref(), Some("request timed out"));
    }
}
