//! Edit session: the one ticket currently being edited
//!
//! The session works on its own copy, so the list keeps showing the stored
//! ticket until the edit is saved.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{RecurrencePattern, Ticket, TicketPriority, TicketStatus};

/// Editable ticket fields. `id` is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketField {
    Title,
    Description,
    Status,
    Priority,
    IsRecurring,
    IsNotificationEnabled,
    CompletedAt,
    DueDate,
    AssignedToUserId,
    CreatedByUserId,
    RecurrencePattern,
    ReminderDate,
    EstimatedHours,
    ActualHours,
}

impl TicketField {
    pub const ALL: [TicketField; 14] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::IsRecurring,
        Self::IsNotificationEnabled,
        Self::CompletedAt,
        Self::DueDate,
        Self::AssignedToUserId,
        Self::CreatedByUserId,
        Self::RecurrencePattern,
        Self::ReminderDate,
        Self::EstimatedHours,
        Self::ActualHours,
    ];

    /// Field name as it appears in the JSON record
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::IsRecurring => "isRecurring",
            Self::IsNotificationEnabled => "isNotificationEnabled",
            Self::CompletedAt => "completedAt",
            Self::DueDate => "dueDate",
            Self::AssignedToUserId => "assignedToUserId",
            Self::CreatedByUserId => "createdByUserId",
            Self::RecurrencePattern => "recurrencePattern",
            Self::ReminderDate => "reminderDate",
            Self::EstimatedHours => "estimatedTimeToCompleteInHours",
            Self::ActualHours => "actualTimeToCompleteInHours",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// A typed mutation of one ticket field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Title(String),
    Description(String),
    Status(TicketStatus),
    Priority(TicketPriority),
    IsRecurring(bool),
    IsNotificationEnabled(bool),
    CompletedAt(Option<DateTime<Utc>>),
    DueDate(Option<DateTime<Utc>>),
    AssignedToUserId(Option<Uuid>),
    CreatedByUserId(Option<Uuid>),
    RecurrencePattern(Option<RecurrencePattern>),
    ReminderDate(Option<DateTime<Utc>>),
    EstimatedHours(Option<f64>),
    ActualHours(Option<f64>),
}

impl FieldChange {
    pub fn field(&self) -> TicketField {
        match self {
            Self::Title(_) => TicketField::Title,
            Self::Description(_) => TicketField::Description,
            Self::Status(_) => TicketField::Status,
            Self::Priority(_) => TicketField::Priority,
            Self::IsRecurring(_) => TicketField::IsRecurring,
            Self::IsNotificationEnabled(_) => TicketField::IsNotificationEnabled,
            Self::CompletedAt(_) => TicketField::CompletedAt,
            Self::DueDate(_) => TicketField::DueDate,
            Self::AssignedToUserId(_) => TicketField::AssignedToUserId,
            Self::CreatedByUserId(_) => TicketField::CreatedByUserId,
            Self::RecurrencePattern(_) => TicketField::RecurrencePattern,
            Self::ReminderDate(_) => TicketField::ReminderDate,
            Self::EstimatedHours(_) => TicketField::EstimatedHours,
            Self::ActualHours(_) => TicketField::ActualHours,
        }
    }

    /// Write this one field; every other field is left as it was
    pub fn apply(self, ticket: &mut Ticket) {
        match self {
            Self::Title(v) => ticket.title = v,
            Self::Description(v) => ticket.description = v,
            Self::Status(v) => ticket.status = v,
            Self::Priority(v) => ticket.priority = v,
            Self::IsRecurring(v) => ticket.is_recurring = v,
            Self::IsNotificationEnabled(v) => ticket.is_notification_enabled = v,
            Self::CompletedAt(v) => ticket.completed_at = v,
            Self::DueDate(v) => ticket.due_date = v,
            Self::AssignedToUserId(v) => ticket.assigned_to_user_id = v,
            Self::CreatedByUserId(v) => ticket.created_by_user_id = v,
            Self::RecurrencePattern(v) => ticket.recurrence_pattern = v,
            Self::ReminderDate(v) => ticket.reminder_date = v,
            Self::EstimatedHours(v) => ticket.estimated_time_to_complete_in_hours = v,
            Self::ActualHours(v) => ticket.actual_time_to_complete_in_hours = v,
        }
    }
}

/// Local working copy of the ticket being edited
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    ticket: Ticket,
}

impl EditSession {
    pub fn begin(ticket: &Ticket) -> Self {
        Self {
            ticket: ticket.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.ticket.id
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn change_field(&mut self, change: FieldChange) {
        tracing::debug!(id = %self.ticket.id, field = change.field().name(), "Field changed");
        change.apply(&mut self.ticket);
    }

    /// The record to send on save, with `updated_date` refreshed
    pub fn prepare_save(&self) -> Ticket {
        let mut ticket = self.ticket.clone();
        ticket.touch();
        ticket
    }
}
