//! JSON wire shape of a ticket
//!
//! Outbound `status`/`priority` are the ordinal position of the member in its
//! catalog. Inbound they may be an ordinal or a member name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{CatalogMember, Catalogs, EnumCatalog, RecurrencePattern, Ticket};

/// Enum value as exchanged with the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOrdinal {
    Index(i64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTicket {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: WireOrdinal,
    pub priority: WireOrdinal,
    #[serde(with = "timestamp")]
    pub created_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_date: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub is_notification_enabled: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_to_complete_in_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time_to_complete_in_hours: Option<f64>,
}

/// Translate a ticket into its wire form
pub fn encode(ticket: &Ticket, catalogs: &Catalogs) -> Result<WireTicket, ServiceError> {
    Ok(WireTicket {
        id: ticket.id,
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        status: encode_member(&catalogs.status, ticket.status, "status")?,
        priority: encode_member(&catalogs.priority, ticket.priority, "priority")?,
        created_date: ticket.created_date,
        updated_date: ticket.updated_date,
        is_recurring: ticket.is_recurring,
        is_notification_enabled: ticket.is_notification_enabled,
        completed_at: ticket.completed_at,
        due_date: ticket.due_date,
        assigned_to_user_id: ticket.assigned_to_user_id,
        created_by_user_id: ticket.created_by_user_id,
        recurrence_pattern: ticket.recurrence_pattern,
        reminder_date: ticket.reminder_date,
        estimated_time_to_complete_in_hours: ticket.estimated_time_to_complete_in_hours,
        actual_time_to_complete_in_hours: ticket.actual_time_to_complete_in_hours,
    })
}

/// Translate a wire ticket back into the model
pub fn decode(wire: WireTicket, catalogs: &Catalogs) -> Result<Ticket, ServiceError> {
    Ok(Ticket {
        id: wire.id,
        title: wire.title,
        description: wire.description,
        status: decode_member(&catalogs.status, &wire.status, "status")?,
        priority: decode_member(&catalogs.priority, &wire.priority, "priority")?,
        created_date: wire.created_date,
        updated_date: wire.updated_date,
        is_recurring: wire.is_recurring,
        is_notification_enabled: wire.is_notification_enabled,
        completed_at: wire.completed_at,
        due_date: wire.due_date,
        assigned_to_user_id: wire.assigned_to_user_id,
        created_by_user_id: wire.created_by_user_id,
        recurrence_pattern: wire.recurrence_pattern,
        reminder_date: wire.reminder_date,
        estimated_time_to_complete_in_hours: wire.estimated_time_to_complete_in_hours,
        actual_time_to_complete_in_hours: wire.actual_time_to_complete_in_hours,
    })
}

fn encode_member<T: CatalogMember>(
    catalog: &EnumCatalog<T>,
    member: T,
    field: &str,
) -> Result<WireOrdinal, ServiceError> {
    let ordinal = catalog.ordinal_of(member).ok_or_else(|| {
        ServiceError::Encode(format!("{field} '{}' is not a declared member", member.name()))
    })?;
    // Catalogs are tiny; an ordinal always fits.
    Ok(WireOrdinal::Index(ordinal as i64))
}

fn decode_member<T: CatalogMember>(
    catalog: &EnumCatalog<T>,
    value: &WireOrdinal,
    field: &str,
) -> Result<T, ServiceError> {
    let member = match value {
        WireOrdinal::Index(i) => usize::try_from(*i).ok().and_then(|i| catalog.member_at(i)),
        WireOrdinal::Name(name) => catalog.by_name(name),
    };
    member.ok_or_else(|| ServiceError::Decode(format!("{field} {value:?} is out of range")))
}

/// Format a timestamp the way a browser ISO string looks (`2024-05-01T10:00:00.000Z`)
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp.
///
/// Offset-less date-times and bare dates are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::super::parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketPriority, TicketStatus};
    use serde_json::json;

    #[test]
    fn encodes_enums_as_ordinals() {
        let catalogs = Catalogs::default();
        let mut ticket = Ticket::new("Fix bug", "crash on save");
        ticket.status = TicketStatus::Resolved;
        ticket.priority = TicketPriority::High;

        let value = serde_json::to_value(encode(&ticket, &catalogs).unwrap()).unwrap();
        assert_eq!(value["status"], json!(3));
        assert_eq!(value["priority"], json!(2));
        assert_eq!(value["title"], json!("Fix bug"));
        assert!(value.get("dueDate").is_none());
        assert!(value["createdDate"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn every_status_ordinal_decodes_to_itself() {
        let catalogs = Catalogs::default();
        for i in 0..catalogs.status.len() {
            let decoded =
                decode_member(&catalogs.status, &WireOrdinal::Index(i as i64), "status").unwrap();
            let WireOrdinal::Index(back) = encode_member(&catalogs.status, decoded, "status").unwrap()
            else {
                panic!("expected ordinal");
            };
            assert_eq!(back, i as i64);
        }
    }

    #[test]
    fn rejects_out_of_range_ordinals() {
        let catalogs = Catalogs::default();
        let err = decode_member(&catalogs.priority, &WireOrdinal::Index(4), "priority").unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
        let err = decode_member(&catalogs.status, &WireOrdinal::Index(-1), "status").unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[test]
    fn decodes_backend_ticket() {
        let catalogs = Catalogs::default();
        let wire: WireTicket = serde_json::from_value(json!({
            "id": "0b7c5a9e-2f7e-4a8b-9a57-5d1c6f4f2a10",
            "title": "Printer jammed",
            "description": "Floor 3",
            "status": 1,
            "priority": "critical",
            "createdDate": "2024-05-01T10:00:00",
            "updatedDate": "2024-05-02T08:30:00.123Z",
            "isRecurring": false,
            "isNotificationEnabled": true,
            "dueDate": null,
            "assignedToUserId": null,
            "estimatedTimeToCompleteInHours": 1.5
        }))
        .unwrap();

        let ticket = decode(wire, &catalogs).unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.priority, TicketPriority::Critical);
        assert_eq!(format_timestamp(&ticket.created_date), "2024-05-01T10:00:00.000Z");
        assert!(ticket.due_date.is_none());
        assert_eq!(ticket.estimated_time_to_complete_in_hours, Some(1.5));
        assert!(ticket.is_notification_enabled);
    }

    #[test]
    fn parses_form_style_timestamps() {
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("2024-05-01T09:15").is_some());
        assert_eq!(
            parse_timestamp("2024-05-01T12:00:00+02:00").map(|t| format_timestamp(&t)),
            Some("2024-05-01T10:00:00.000Z".to_string())
        );
        assert!(parse_timestamp("yesterday").is_none());
    }
}
