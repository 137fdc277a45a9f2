//! ticket-desk - ticket management client
//!
//! Talks to a ticket REST backend, keeps a local list in step with it, and
//! edits one ticket at a time through an edit session.

pub mod config;
pub mod error;
pub mod form;
pub mod models;
pub mod reconciler;
pub mod service;
pub mod session;
pub mod view;
pub mod wire;

pub use error::{ReconcileError, ServiceError, ValidationError};
pub use models::{Catalogs, Ticket, TicketPriority, TicketStatus};
pub use reconciler::{BoardSnapshot, LoadPhase, Reconciler};
pub use service::{TicketApi, TicketService};
