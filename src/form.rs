//! Form schemas for creating and editing tickets
//!
//! Each field descriptor carries an explicit [`FieldKind`] tag. Raw input is
//! parsed by dispatching on that tag, then bound to a typed [`FieldChange`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{Catalogs, CatalogMember, Ticket, TicketPriority};
use crate::session::{FieldChange, TicketField};
use crate::wire::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInput {
    Plain,
    Number,
}

/// How a field is presented and what raw input it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text(TextInput),
    TextArea,
    Select { options: Vec<&'static str> },
    Checkbox,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: TicketField,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Raw input after kind-specific parsing
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Option<f64>),
    Choice(Option<&'static str>),
    Flag(bool),
    Date(Option<DateTime<Utc>>),
}

impl FieldDescriptor {
    fn new(field: TicketField, label: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            label,
            kind,
            required: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Parse raw input according to this field's kind
    pub fn parse(&self, raw: &str) -> Result<FieldValue, ValidationError> {
        let name = self.field.name();
        let trimmed = raw.trim();
        if self.required && trimmed.is_empty() {
            return Err(ValidationError::Required { field: name });
        }

        match &self.kind {
            FieldKind::Text(TextInput::Plain) | FieldKind::TextArea => {
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldKind::Text(TextInput::Number) => {
                if trimmed.is_empty() {
                    return Ok(FieldValue::Number(None));
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() && n >= 0.0 => Ok(FieldValue::Number(Some(n))),
                    _ => Err(ValidationError::Invalid {
                        field: name,
                        value: raw.to_string(),
                        reason: "expected a non-negative number",
                    }),
                }
            }
            FieldKind::Select { options } => {
                if trimmed.is_empty() {
                    return Ok(FieldValue::Choice(None));
                }
                options
                    .iter()
                    .copied()
                    .find(|o| o.eq_ignore_ascii_case(trimmed))
                    .map(|o| FieldValue::Choice(Some(o)))
                    .ok_or_else(|| ValidationError::UnknownOption {
                        field: name,
                        value: raw.to_string(),
                    })
            }
            FieldKind::Checkbox => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(FieldValue::Flag(true)),
                "false" | "no" | "off" | "0" | "" => Ok(FieldValue::Flag(false)),
                _ => Err(ValidationError::Invalid {
                    field: name,
                    value: raw.to_string(),
                    reason: "expected true or false",
                }),
            },
            FieldKind::Date => {
                if trimmed.is_empty() {
                    return Ok(FieldValue::Date(None));
                }
                parse_timestamp(trimmed)
                    .map(|d| FieldValue::Date(Some(d)))
                    .ok_or_else(|| ValidationError::Invalid {
                        field: name,
                        value: raw.to_string(),
                        reason: "expected an ISO-8601 date",
                    })
            }
        }
    }

    /// Parse raw input and bind it to this descriptor's field
    pub fn to_change(&self, raw: &str, catalogs: &Catalogs) -> Result<FieldChange, ValidationError> {
        bind(self.field, self.parse(raw)?, catalogs)
    }
}

/// Turn a parsed value into a change of `field`
pub fn bind(
    field: TicketField,
    value: FieldValue,
    catalogs: &Catalogs,
) -> Result<FieldChange, ValidationError> {
    let name = field.name();
    let wrong_kind = |expected| ValidationError::WrongKind {
        field: name,
        expected,
    };
    let unknown = |value: &str| ValidationError::UnknownOption {
        field: name,
        value: value.to_string(),
    };

    match (field, value) {
        (TicketField::Title, FieldValue::Text(v)) => Ok(FieldChange::Title(v)),
        (TicketField::Description, FieldValue::Text(v)) => Ok(FieldChange::Description(v)),
        (TicketField::Status, FieldValue::Choice(Some(v))) => catalogs
            .status
            .by_name(v)
            .map(FieldChange::Status)
            .ok_or_else(|| unknown(v)),
        (TicketField::Priority, FieldValue::Choice(Some(v))) => catalogs
            .priority
            .by_name(v)
            .map(FieldChange::Priority)
            .ok_or_else(|| unknown(v)),
        (TicketField::Status | TicketField::Priority, FieldValue::Choice(None)) => {
            Err(ValidationError::Required { field: name })
        }
        (TicketField::RecurrencePattern, FieldValue::Choice(v)) => match v {
            None => Ok(FieldChange::RecurrencePattern(None)),
            Some(v) => catalogs
                .recurrence
                .by_name(v)
                .map(|p| FieldChange::RecurrencePattern(Some(p)))
                .ok_or_else(|| unknown(v)),
        },
        (TicketField::IsRecurring, FieldValue::Flag(v)) => Ok(FieldChange::IsRecurring(v)),
        (TicketField::IsNotificationEnabled, FieldValue::Flag(v)) => {
            Ok(FieldChange::IsNotificationEnabled(v))
        }
        (TicketField::CompletedAt, FieldValue::Date(v)) => Ok(FieldChange::CompletedAt(v)),
        (TicketField::DueDate, FieldValue::Date(v)) => Ok(FieldChange::DueDate(v)),
        (TicketField::ReminderDate, FieldValue::Date(v)) => Ok(FieldChange::ReminderDate(v)),
        (TicketField::AssignedToUserId, FieldValue::Text(v)) => {
            parse_user_id(name, &v).map(FieldChange::AssignedToUserId)
        }
        (TicketField::CreatedByUserId, FieldValue::Text(v)) => {
            parse_user_id(name, &v).map(FieldChange::CreatedByUserId)
        }
        (TicketField::EstimatedHours, FieldValue::Number(v)) => Ok(FieldChange::EstimatedHours(v)),
        (TicketField::ActualHours, FieldValue::Number(v)) => Ok(FieldChange::ActualHours(v)),
        (_, FieldValue::Text(_)) => Err(wrong_kind("text")),
        (_, FieldValue::Number(_)) => Err(wrong_kind("numeric")),
        (_, FieldValue::Choice(_)) => Err(wrong_kind("select")),
        (_, FieldValue::Flag(_)) => Err(wrong_kind("checkbox")),
        (_, FieldValue::Date(_)) => Err(wrong_kind("date")),
    }
}

fn parse_user_id(field: &'static str, raw: &str) -> Result<Option<Uuid>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| ValidationError::Invalid {
            field,
            value: raw.to_string(),
            reason: "expected a UUID",
        })
}

fn options<T: CatalogMember>(members: impl Iterator<Item = T>) -> Vec<&'static str> {
    members.map(|m| m.name()).collect()
}

/// Every editable field, in display order
pub fn edit_form_schema(catalogs: &Catalogs) -> Vec<FieldDescriptor> {
    use TicketField as F;
    vec![
        FieldDescriptor::new(F::Title, "Title", FieldKind::Text(TextInput::Plain)).required(),
        FieldDescriptor::new(F::Description, "Description", FieldKind::TextArea).required(),
        FieldDescriptor::new(
            F::Status,
            "Status",
            FieldKind::Select {
                options: options(catalogs.status.members().iter().copied()),
            },
        )
        .required(),
        FieldDescriptor::new(
            F::Priority,
            "Priority",
            FieldKind::Select {
                options: options(catalogs.priority.members().iter().copied()),
            },
        )
        .required(),
        FieldDescriptor::new(F::IsRecurring, "Is Recurring", FieldKind::Checkbox),
        FieldDescriptor::new(F::IsNotificationEnabled, "Notification Enabled", FieldKind::Checkbox),
        FieldDescriptor::new(F::CompletedAt, "Completed At", FieldKind::Date),
        FieldDescriptor::new(F::DueDate, "Due Date", FieldKind::Date),
        FieldDescriptor::new(
            F::AssignedToUserId,
            "Assigned To User ID",
            FieldKind::Text(TextInput::Plain),
        ),
        FieldDescriptor::new(
            F::CreatedByUserId,
            "Created By User ID",
            FieldKind::Text(TextInput::Plain),
        ),
        FieldDescriptor::new(
            F::RecurrencePattern,
            "Recurrence Pattern",
            FieldKind::Select {
                options: options(catalogs.recurrence.members().iter().copied()),
            },
        ),
        FieldDescriptor::new(F::ReminderDate, "Reminder Date", FieldKind::Date),
        FieldDescriptor::new(
            F::EstimatedHours,
            "Estimated Time To Complete (Hours)",
            FieldKind::Text(TextInput::Number),
        ),
        FieldDescriptor::new(
            F::ActualHours,
            "Actual Time To Complete (Hours)",
            FieldKind::Text(TextInput::Number),
        ),
    ]
}

/// Fields offered when creating a ticket
pub fn create_form_schema(catalogs: &Catalogs) -> Vec<FieldDescriptor> {
    use TicketField as F;
    vec![
        FieldDescriptor::new(F::Title, "Title", FieldKind::Text(TextInput::Plain)).required(),
        FieldDescriptor::new(F::Description, "Description", FieldKind::TextArea).required(),
        FieldDescriptor::new(
            F::Priority,
            "Priority",
            FieldKind::Select {
                options: options(catalogs.priority.members().iter().copied()),
            },
        )
        .required(),
        FieldDescriptor::new(F::IsRecurring, "Is Recurring", FieldKind::Checkbox),
        FieldDescriptor::new(F::IsNotificationEnabled, "Enable Notifications", FieldKind::Checkbox),
        FieldDescriptor::new(F::DueDate, "Due Date", FieldKind::Date),
    ]
}

/// Parse `name=value` style input against a schema
pub fn parse_change(
    schema: &[FieldDescriptor],
    name: &str,
    raw: &str,
    catalogs: &Catalogs,
) -> Result<FieldChange, ValidationError> {
    let field = TicketField::from_name(name)
        .ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
    let descriptor = schema
        .iter()
        .find(|d| d.field == field)
        .ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
    descriptor.to_change(raw, catalogs)
}

/// Values of the ticket creation form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateForm {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub is_recurring: bool,
    pub is_notification_enabled: bool,
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change to one of the creation form's fields
    pub fn change(&mut self, change: FieldChange) -> Result<(), ValidationError> {
        match change {
            FieldChange::Title(v) => self.title = v,
            FieldChange::Description(v) => self.description = v,
            FieldChange::Priority(v) => self.priority = v,
            FieldChange::IsRecurring(v) => self.is_recurring = v,
            FieldChange::IsNotificationEnabled(v) => self.is_notification_enabled = v,
            FieldChange::DueDate(v) => self.due_date = v,
            other => {
                return Err(ValidationError::UnknownField(other.field().name().to_string()));
            }
        }
        Ok(())
    }

    /// Set a field from raw input
    pub fn set(&mut self, name: &str, raw: &str, catalogs: &Catalogs) -> Result<(), ValidationError> {
        let change = parse_change(&create_form_schema(catalogs), name, raw, catalogs)?;
        self.change(change)
    }

    /// Validate and build a new ticket with a fresh id
    pub fn submit(&self) -> Result<Ticket, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required { field: "title" });
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "description",
            });
        }

        let mut ticket = Ticket::new(self.title.clone(), self.description.clone());
        ticket.priority = self.priority;
        ticket.is_recurring = self.is_recurring;
        ticket.is_notification_enabled = self.is_notification_enabled;
        ticket.due_date = self.due_date;
        Ok(ticket)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
