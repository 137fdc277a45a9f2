//! Ticket data model and the enum catalogs used to put it on the wire
//!
//! Enum members are never looked up through ambient tables: the ordered member
//! lists live in [`Catalogs`], which is handed to whoever encodes or displays them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    New,
    InProgress,
    OnHold,
    Resolved,
    Closed,
}

/// Priority level for tickets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketPriority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// How often a recurring ticket repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A member of a closed enumeration that can be listed in an [`EnumCatalog`]
pub trait CatalogMember: Copy + Eq + 'static {
    fn name(self) -> &'static str;
}

impl CatalogMember for TicketStatus {
    fn name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "InProgress",
            Self::OnHold => "OnHold",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }
}

impl CatalogMember for TicketPriority {
    fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl CatalogMember for RecurrencePattern {
    fn name(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }
}

pub const STATUS_MEMBERS: &[TicketStatus] = &[
    TicketStatus::New,
    TicketStatus::InProgress,
    TicketStatus::OnHold,
    TicketStatus::Resolved,
    TicketStatus::Closed,
];

pub const PRIORITY_MEMBERS: &[TicketPriority] = &[
    TicketPriority::Low,
    TicketPriority::Medium,
    TicketPriority::High,
    TicketPriority::Critical,
];

pub const RECURRENCE_MEMBERS: &[RecurrencePattern] = &[
    RecurrencePattern::Daily,
    RecurrencePattern::Weekly,
    RecurrencePattern::Monthly,
    RecurrencePattern::Yearly,
];

/// Immutable, ordered list of the members of one enumeration.
///
/// The position of a member in this list is its wire ordinal.
#[derive(Debug, Clone, Copy)]
pub struct EnumCatalog<T: 'static> {
    members: &'static [T],
}

impl<T: CatalogMember> EnumCatalog<T> {
    pub const fn new(members: &'static [T]) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &'static [T] {
        self.members
    }

    /// Ordinal position of a member, `None` if the catalog does not declare it
    pub fn ordinal_of(&self, member: T) -> Option<usize> {
        self.members.iter().position(|m| *m == member)
    }

    /// Member at an ordinal position
    pub fn member_at(&self, ordinal: usize) -> Option<T> {
        self.members.get(ordinal).copied()
    }

    /// Look up a member by name (ASCII case-insensitive)
    pub fn by_name(&self, name: &str) -> Option<T> {
        let name = name.trim();
        self.members
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|m| m.name())
    }
}

/// The catalogs shared by the wire codec and the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct Catalogs {
    pub status: EnumCatalog<TicketStatus>,
    pub priority: EnumCatalog<TicketPriority>,
    pub recurrence: EnumCatalog<RecurrencePattern>,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self {
            status: EnumCatalog::new(STATUS_MEMBERS),
            priority: EnumCatalog::new(PRIORITY_MEMBERS),
            recurrence: EnumCatalog::new(RECURRENCE_MEMBERS),
        }
    }
}

/// A ticket record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub is_recurring: bool,
    pub is_notification_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_to_complete_in_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time_to_complete_in_hours: Option<f64>,
}

impl Ticket {
    /// A new ticket with a fresh id and default status/priority
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: TicketStatus::default(),
            priority: TicketPriority::default(),
            created_date: now,
            updated_date: now,
            is_recurring: false,
            is_notification_enabled: false,
            completed_at: None,
            due_date: None,
            assigned_to_user_id: None,
            created_by_user_id: None,
            recurrence_pattern: None,
            reminder_date: None,
            estimated_time_to_complete_in_hours: None,
            actual_time_to_complete_in_hours: None,
        }
    }

    /// Refresh `updated_date` before an update; never earlier than `created_date`
    pub fn touch(&mut self) {
        self.updated_date = Utc::now().max(self.created_date);
    }
}
