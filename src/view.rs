//! Plain-text rendering of the ticket board

use std::fmt::Write;

use crate::form::{FieldDescriptor, FieldKind, TextInput, edit_form_schema};
use crate::models::{CatalogMember, Catalogs, Ticket};
use crate::reconciler::{BoardSnapshot, LoadPhase};
use crate::session::TicketField;
use crate::wire::format_timestamp;

/// Render the list with its loading/error state.
///
/// The ticket under edit is shown with its working copy and marked `*`.
pub fn render_board(snapshot: &BoardSnapshot) -> String {
    let mut out = String::new();

    if snapshot.phase == LoadPhase::Loading {
        out.push_str("Loading...\n");
        return out;
    }

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "error: {error}");
    }

    if snapshot.tickets.is_empty() {
        out.push_str("No tickets.\n");
        return out;
    }

    for stored in &snapshot.tickets {
        let (marker, ticket) = match &snapshot.editing {
            Some(edit) if edit.id == stored.id => ('*', edit),
            _ => (' ', stored),
        };
        let _ = writeln!(
            out,
            "{marker} {}  {:<10} {:<8} {}",
            ticket.id,
            ticket.status.name(),
            ticket.priority.name(),
            ticket.title
        );
    }

    out
}

/// Render one ticket grouped into detail sections; absent values are skipped
pub fn render_details(ticket: &Ticket) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ticket.title);
    let _ = writeln!(out, "{}", "=".repeat(ticket.title.chars().count().max(3)));
    let _ = writeln!(out, "id: {}", ticket.id);

    section(&mut out, "Description");
    let _ = writeln!(out, "  {}", ticket.description.replace('\n', "\n  "));

    section(&mut out, "Details");
    let _ = writeln!(out, "  Status: {}", ticket.status.name());
    let _ = writeln!(out, "  Priority: {}", ticket.priority.name());

    section(&mut out, "Dates");
    let _ = writeln!(out, "  Created: {}", format_timestamp(&ticket.created_date));
    let _ = writeln!(out, "  Updated: {}", format_timestamp(&ticket.updated_date));
    for (label, value) in [
        ("Due Date", ticket.due_date),
        ("Completed At", ticket.completed_at),
        ("Reminder Date", ticket.reminder_date),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label}: {}", format_timestamp(&value));
        }
    }

    if ticket.assigned_to_user_id.is_some() || ticket.created_by_user_id.is_some() {
        section(&mut out, "User Information");
        if let Some(user) = ticket.assigned_to_user_id {
            let _ = writeln!(out, "  Assigned To: {user}");
        }
        if let Some(user) = ticket.created_by_user_id {
            let _ = writeln!(out, "  Created By: {user}");
        }
    }

    let mut extra = Vec::new();
    if ticket.is_recurring {
        extra.push("Is Recurring: Yes".to_string());
    }
    if ticket.is_notification_enabled {
        extra.push("Notification Enabled: Yes".to_string());
    }
    if let Some(pattern) = ticket.recurrence_pattern {
        extra.push(format!("Recurrence Pattern: {}", pattern.name()));
    }
    if let Some(hours) = ticket.estimated_time_to_complete_in_hours {
        extra.push(format!("Estimated Time To Complete (Hours): {hours}"));
    }
    if let Some(hours) = ticket.actual_time_to_complete_in_hours {
        extra.push(format!("Actual Time To Complete (Hours): {hours}"));
    }
    if !extra.is_empty() {
        section(&mut out, "Additional Info");
        for line in extra {
            let _ = writeln!(out, "  {line}");
        }
    }

    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}");
}

/// Render the edit form for a ticket: one line per field with its current
/// value, and the allowed options for selects
pub fn render_edit_form(ticket: &Ticket, catalogs: &Catalogs) -> String {
    let mut out = String::new();
    for descriptor in edit_form_schema(catalogs) {
        let value = current_value(ticket, descriptor.field);
        let _ = writeln!(
            out,
            "{:<32} {:<8} {}",
            descriptor.field.name(),
            kind_tag(&descriptor),
            value
        );
        if let FieldKind::Select { options } = &descriptor.kind {
            let _ = writeln!(out, "{:<32} {:<8} one of: {}", "", "", options.join(", "));
        }
    }
    out
}

fn kind_tag(descriptor: &FieldDescriptor) -> &'static str {
    match descriptor.kind {
        FieldKind::Text(TextInput::Plain) => "text",
        FieldKind::Text(TextInput::Number) => "number",
        FieldKind::TextArea => "textarea",
        FieldKind::Select { .. } => "select",
        FieldKind::Checkbox => "checkbox",
        FieldKind::Date => "date",
    }
}

fn current_value(ticket: &Ticket, field: TicketField) -> String {
    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map(|d| format_timestamp(&d)).unwrap_or_default()
    };
    let num = |n: Option<f64>| n.map(|n| n.to_string()).unwrap_or_default();
    let user = |u: Option<uuid::Uuid>| u.map(|u| u.to_string()).unwrap_or_default();

    match field {
        TicketField::Title => ticket.title.clone(),
        TicketField::Description => ticket.description.clone(),
        TicketField::Status => ticket.status.name().to_string(),
        TicketField::Priority => ticket.priority.name().to_string(),
        TicketField::IsRecurring => ticket.is_recurring.to_string(),
        TicketField::IsNotificationEnabled => ticket.is_notification_enabled.to_string(),
        TicketField::CompletedAt => date(ticket.completed_at),
        TicketField::DueDate => date(ticket.due_date),
        TicketField::AssignedToUserId => user(ticket.assigned_to_user_id),
        TicketField::CreatedByUserId => user(ticket.created_by_user_id),
        TicketField::RecurrencePattern => ticket
            .recurrence_pattern
            .map(|p| p.name().to_string())
            .unwrap_or_default(),
        TicketField::ReminderDate => date(ticket.reminder_date),
        TicketField::EstimatedHours => num(ticket.estimated_time_to_complete_in_hours),
        TicketField::ActualHours => num(ticket.actual_time_to_complete_in_hours),
    }
}
