//! Local ticket list kept in step with the backend
//!
//! The reconciler owns the list snapshot and the single edit-session slot.
//! Each user action calls the API first and only touches local state once the
//! call has succeeded. After every complete mutation a [`BoardSnapshot`] is
//! published, so observers never see a half-applied list.

use tokio::sync::watch;
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::form::{CreateForm, edit_form_schema, parse_change};
use crate::models::{Catalogs, Ticket};
use crate::service::TicketApi;
use crate::session::{EditSession, FieldChange};

const FETCH_FAILED: &str = "Failed to fetch tickets. Please try again later.";
const CREATE_FAILED: &str = "Failed to create ticket. Please try again.";
const UPDATE_FAILED: &str = "Failed to update ticket. Please try again later.";
const DELETE_FAILED: &str = "Failed to delete ticket. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Ready,
}

/// What a view renders: the list, the load phase, the latest error and the
/// working copy of the ticket under edit
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub phase: LoadPhase,
    pub tickets: Vec<Ticket>,
    pub error: Option<String>,
    pub editing: Option<Ticket>,
}

pub struct Reconciler<A> {
    api: A,
    catalogs: Catalogs,
    phase: LoadPhase,
    tickets: Vec<Ticket>,
    error: Option<String>,
    session: Option<EditSession>,
    publisher: watch::Sender<BoardSnapshot>,
}

impl<A: TicketApi> Reconciler<A> {
    /// A reconciler that has not fetched yet
    pub fn new(api: A, catalogs: Catalogs) -> Self {
        let (publisher, _) = watch::channel(BoardSnapshot {
            phase: LoadPhase::Loading,
            tickets: Vec::new(),
            error: None,
            editing: None,
        });

        Self {
            api,
            catalogs,
            phase: LoadPhase::Loading,
            tickets: Vec::new(),
            error: None,
            session: None,
            publisher,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn get(&self, id: Uuid) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    /// Most recent error message, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            phase: self.phase,
            tickets: self.tickets.clone(),
            error: self.error.clone(),
            editing: self.session.as_ref().map(|s| s.ticket().clone()),
        }
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.publisher.subscribe()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }

    fn fail(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.publish();
    }

    /// Fetch every ticket and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept and the error is recorded.
    pub async fn load(&mut self) -> Result<(), ReconcileError> {
        self.phase = LoadPhase::Loading;
        self.publish();

        let result = self.api.get_all_tickets().await;
        self.phase = LoadPhase::Ready;

        match result {
            Ok(fetched) => {
                let mut tickets: Vec<Ticket> = Vec::with_capacity(fetched.len());
                for ticket in fetched {
                    if tickets.iter().any(|t| t.id == ticket.id) {
                        tracing::warn!(id = %ticket.id, "Duplicate ticket id in fetch, keeping the first");
                        continue;
                    }
                    tickets.push(ticket);
                }
                tracing::info!(count = tickets.len(), "Tickets loaded");

                self.tickets = tickets;
                self.error = None;
                self.publish();
                Ok(())
            }
            Err(e) => {
                self.fail(FETCH_FAILED);
                Err(e.into())
            }
        }
    }

    /// Create a ticket on the backend and append the backend's copy
    pub async fn create(&mut self, ticket: Ticket) -> Result<Ticket, ReconcileError> {
        match self.api.create_ticket(&ticket).await {
            Ok(created) => {
                tracing::info!(id = %created.id, "Ticket created");
                match self.tickets.iter_mut().find(|t| t.id == created.id) {
                    Some(existing) => *existing = created.clone(),
                    None => self.tickets.push(created.clone()),
                }
                self.publish();
                Ok(created)
            }
            Err(e) => {
                self.fail(CREATE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Submit the creation form; the form is reset only on success
    pub async fn submit_form(&mut self, form: &mut CreateForm) -> Result<Ticket, ReconcileError> {
        let ticket = form.submit()?;
        let created = self.create(ticket).await?;
        form.reset();
        Ok(created)
    }

    /// Delete a ticket on the backend, then drop it from the snapshot
    pub async fn delete(&mut self, id: Uuid) -> Result<(), ReconcileError> {
        match self.api.delete_ticket(id).await {
            Ok(()) => {
                self.tickets.retain(|t| t.id != id);
                if self.session.as_ref().is_some_and(|s| s.id() == id) {
                    self.session = None;
                }
                tracing::info!(id = %id, "Ticket deleted");
                self.publish();
                Ok(())
            }
            Err(e) => {
                self.fail(DELETE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Open the edit session for a ticket in the list.
    ///
    /// Refused while another session is open.
    pub fn begin_edit(&mut self, id: Uuid) -> Result<&EditSession, ReconcileError> {
        if let Some(session) = &self.session {
            return Err(ReconcileError::SessionBusy {
                editing: session.id(),
            });
        }

        let ticket = self
            .tickets
            .iter()
            .find(|t| t.id == id)
            .ok_or(ReconcileError::UnknownTicket { id })?;
        let session = EditSession::begin(ticket);
        tracing::debug!(id = %id, "Edit started");

        let session = self.session.insert(session);
        let session: &EditSession = session;
        self.publisher.send_replace(BoardSnapshot {
            phase: self.phase,
            tickets: self.tickets.clone(),
            error: self.error.clone(),
            editing: Some(session.ticket().clone()),
        });
        Ok(session)
    }

    pub fn change_field(&mut self, change: FieldChange) -> Result<(), ReconcileError> {
        let session = self.session.as_mut().ok_or(ReconcileError::NoSession)?;
        session.change_field(change);
        self.publish();
        Ok(())
    }

    /// Change a field of the session copy from raw input
    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), ReconcileError> {
        if self.session.is_none() {
            return Err(ReconcileError::NoSession);
        }
        let schema = edit_form_schema(&self.catalogs);
        let change = parse_change(&schema, name, raw, &self.catalogs)?;
        self.change_field(change)
    }

    /// Send the session copy as a full replacement.
    ///
    /// On success the matching list entry is replaced and the session closes.
    /// On failure the list and the session are left as they were.
    pub async fn save(&mut self) -> Result<Ticket, ReconcileError> {
        let outgoing = self
            .session
            .as_ref()
            .ok_or(ReconcileError::NoSession)?
            .prepare_save();

        match self.api.update_ticket(&outgoing).await {
            Ok(updated) => {
                match self.tickets.iter_mut().find(|t| t.id == updated.id) {
                    Some(entry) => {
                        *entry = updated.clone();
                        tracing::info!(id = %updated.id, "Ticket updated");
                    }
                    None => {
                        tracing::warn!(id = %updated.id, "Updated ticket is not in the list, ignoring");
                    }
                }
                self.session = None;
                self.publish();
                Ok(updated)
            }
            Err(e) => {
                self.fail(UPDATE_FAILED);
                Err(e.into())
            }
        }
    }

    /// Discard the session copy without calling the backend.
    ///
    /// Returns the id of the ticket that was being edited.
    pub fn cancel(&mut self) -> Option<Uuid> {
        let id = self.session.take().map(|s| s.id());
        if id.is_some() {
            self.publish();
        }
        id
    }

    pub fn dismiss_error(&mut self) {
        if self.error.take().is_some() {
            self.publish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, ValidationError};
    use crate::models::{TicketPriority, TicketStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory backend with a failure switch
    #[derive(Default)]
    struct FakeApi {
        store: Mutex<Vec<Ticket>>,
        failing: AtomicBool,
        /// Id the backend assigns to the next created ticket
        next_id: Mutex<Option<Uuid>>,
        /// Id the backend reports back from the next update
        rewrite_update_id: Mutex<Option<Uuid>>,
        updates: Mutex<Vec<Ticket>>,
    }

    impl FakeApi {
        fn with(tickets: Vec<Ticket>) -> Self {
            let api = Self::default();
            *api.store.lock().unwrap() = tickets;
            api
        }

        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), ServiceError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(ServiceError::Server {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TicketApi for FakeApi {
        async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
            self.check()?;
            let mut created = ticket.clone();
            if let Some(id) = self.next_id.lock().unwrap().take() {
                created.id = id;
            }
            self.store.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn get_all_tickets(&self) -> Result<Vec<Ticket>, ServiceError> {
            self.check()?;
            Ok(self.store.lock().unwrap().clone())
        }

        async fn get_ticket_by_id(&self, id: Uuid) -> Result<Ticket, ServiceError> {
            self.check()?;
            self.store
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(ServiceError::NotFound { id })
        }

        async fn update_ticket(&self, ticket: &Ticket) -> Result<Ticket, ServiceError> {
            self.check()?;
            self.updates.lock().unwrap().push(ticket.clone());
            let mut store = self.store.lock().unwrap();
            let entry = store
                .iter_mut()
                .find(|t| t.id == ticket.id)
                .ok_or(ServiceError::NotFound { id: ticket.id })?;
            *entry = ticket.clone();
            let mut returned = ticket.clone();
            if let Some(id) = self.rewrite_update_id.lock().unwrap().take() {
                returned.id = id;
            }
            Ok(returned)
        }

        async fn delete_ticket(&self, id: Uuid) -> Result<(), ServiceError> {
            self.check()?;
            let mut store = self.store.lock().unwrap();
            let before = store.len();
            store.retain(|t| t.id != id);
            if store.len() == before {
                return Err(ServiceError::NotFound { id });
            }
            Ok(())
        }
    }

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn ticket(n: u128, title: &str) -> Ticket {
        let mut t = Ticket::new(title, "description");
        t.id = id(n);
        t
    }

    async fn loaded(tickets: Vec<Ticket>) -> Reconciler<FakeApi> {
        let mut board = Reconciler::new(FakeApi::with(tickets), Catalogs::default());
        board.load().await.unwrap();
        board
    }

    #[tokio::test]
    async fn starts_loading_then_ready_on_empty_fetch() {
        let mut board = Reconciler::new(FakeApi::default(), Catalogs::default());
        assert_eq!(board.phase(), LoadPhase::Loading);

        board.load().await.unwrap();
        assert_eq!(board.phase(), LoadPhase::Ready);
        assert!(board.tickets().is_empty());
        assert!(board.error().is_none());
    }

    #[tokio::test]
    async fn failed_refetch_keeps_stale_list() {
        let mut board = loaded(vec![ticket(1, "a"), ticket(2, "b")]).await;
        board.api().fail(true);

        let err = board.load().await.unwrap_err();
        assert!(matches!(err, ReconcileError::Service(ServiceError::Server { status: 500, .. })));
        assert_eq!(board.phase(), LoadPhase::Ready);
        assert_eq!(board.tickets().len(), 2);
        assert_eq!(board.error(), Some(FETCH_FAILED));

        board.api().fail(false);
        board.load().await.unwrap();
        assert!(board.error().is_none());
    }

    #[tokio::test]
    async fn fetch_drops_duplicate_ids() {
        let board = loaded(vec![ticket(1, "first"), ticket(1, "second")]).await;
        assert_eq!(board.tickets().len(), 1);
        assert_eq!(board.tickets()[0].title, "first");
    }

    #[tokio::test]
    async fn create_appends_backend_copy() {
        let mut board = loaded(vec![ticket(9, "existing")]).await;
        *board.api().next_id.lock().unwrap() = Some(id(1));

        let mut draft = Ticket::new("Fix bug", "it breaks");
        draft.priority = TicketPriority::Low;
        let created = board.create(draft).await.unwrap();

        assert_eq!(created.id, id(1));
        let ids: Vec<Uuid> = board.tickets().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id(9), id(1)]);
        assert_eq!(board.get(id(1)).unwrap().title, "Fix bug");
        assert_eq!(board.get(id(1)).unwrap().status, TicketStatus::New);
    }

    #[tokio::test]
    async fn failed_create_leaves_list_and_form() {
        let mut board = loaded(vec![]).await;
        board.api().fail(true);

        let mut form = CreateForm::new();
        form.title = "Fix bug".to_string();
        form.description = "details".to_string();
        assert!(board.submit_form(&mut form).await.is_err());
        assert!(board.tickets().is_empty());
        assert_eq!(form.title, "Fix bug");
        assert_eq!(board.error(), Some(CREATE_FAILED));

        board.api().fail(false);
        board.submit_form(&mut form).await.unwrap();
        assert_eq!(board.tickets().len(), 1);
        assert_eq!(form, CreateForm::default());
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_backend() {
        let mut board = loaded(vec![]).await;
        let mut form = CreateForm::new();
        let err = board.submit_form(&mut form).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Validation(ValidationError::Required { field: "title" })
        ));
        assert!(board.api().store.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_stay_unique_across_mutations() {
        let mut board = loaded(vec![]).await;
        let mut created = Vec::new();
        for n in 1..=3 {
            *board.api().next_id.lock().unwrap() = Some(id(n));
            created.push(board.create(Ticket::new(format!("t{n}"), "d")).await.unwrap().id);
        }
        // Backend hands back an id we already hold.
        *board.api().next_id.lock().unwrap() = Some(id(2));
        board.create(Ticket::new("again", "d")).await.unwrap();
        board.delete(id(1)).await.unwrap();

        let ids: Vec<Uuid> = board.tickets().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id(2), id(3)]);
        assert!(ids.iter().all(|i| created.contains(i)));
        assert_eq!(board.get(id(2)).unwrap().title, "again");
    }

    #[tokio::test]
    async fn edit_save_replaces_entry() {
        let mut original = ticket(1, "Fix bug");
        original.due_date = Some(original.created_date);
        let mut board = loaded(vec![original.clone(), ticket(2, "other")]).await;

        board.begin_edit(id(1)).unwrap();
        board.set_field("title", "Fix bug urgently").unwrap();
        board.set_field("dueDate", "").unwrap();
        // The list is untouched until save.
        assert_eq!(board.get(id(1)).unwrap().title, "Fix bug");

        let saved = board.save().await.unwrap();
        assert!(board.session().is_none());

        let sent = board.api().updates.lock().unwrap()[0].clone();
        assert_eq!(sent.id, id(1));
        assert_eq!(sent.title, "Fix bug urgently");
        assert!(sent.updated_date >= sent.created_date);
        assert!(sent.updated_date >= original.updated_date);

        let entry = board.get(id(1)).unwrap();
        assert_eq!(entry, &saved);
        assert_eq!(entry.title, "Fix bug urgently");
        assert!(entry.due_date.is_none());
        assert_eq!(board.get(id(2)).unwrap().title, "other");
    }

    #[tokio::test]
    async fn failed_save_keeps_list_and_session() {
        let mut board = loaded(vec![ticket(1, "Fix bug")]).await;
        let before = board.tickets().to_vec();

        board.begin_edit(id(1)).unwrap();
        board
            .change_field(FieldChange::Status(TicketStatus::Closed))
            .unwrap();
        board.api().fail(true);

        assert!(board.save().await.is_err());
        assert_eq!(board.tickets(), before.as_slice());
        assert_eq!(board.error(), Some(UPDATE_FAILED));
        let session = board.session().unwrap();
        assert_eq!(session.ticket().status, TicketStatus::Closed);

        board.api().fail(false);
        board.save().await.unwrap();
        assert_eq!(board.get(id(1)).unwrap().status, TicketStatus::Closed);
    }

    #[tokio::test]
    async fn update_for_unknown_id_is_ignored() {
        let mut board = loaded(vec![ticket(1, "a")]).await;
        let before = board.tickets().to_vec();
        *board.api().rewrite_update_id.lock().unwrap() = Some(id(77));

        board.begin_edit(id(1)).unwrap();
        board.set_field("title", "changed").unwrap();
        board.save().await.unwrap();

        assert_eq!(board.tickets(), before.as_slice());
        assert!(board.session().is_none());
    }

    #[tokio::test]
    async fn only_one_session_at_a_time() {
        let mut board = loaded(vec![ticket(1, "a"), ticket(2, "b")]).await;
        board.begin_edit(id(1)).unwrap();

        let err = board.begin_edit(id(2)).unwrap_err();
        assert!(matches!(err, ReconcileError::SessionBusy { editing } if editing == id(1)));
        assert_eq!(board.session().unwrap().id(), id(1));

        assert_eq!(board.cancel(), Some(id(1)));
        board.begin_edit(id(2)).unwrap();
    }

    #[tokio::test]
    async fn begin_edit_requires_listed_ticket() {
        let mut board = loaded(vec![]).await;
        assert!(matches!(
            board.begin_edit(id(5)).unwrap_err(),
            ReconcileError::UnknownTicket { .. }
        ));
        assert!(matches!(
            board.set_field("title", "x").unwrap_err(),
            ReconcileError::NoSession
        ));
        assert!(matches!(board.save().await.unwrap_err(), ReconcileError::NoSession));
    }

    #[tokio::test]
    async fn cancel_discards_edits_without_backend_call() {
        let mut board = loaded(vec![ticket(1, "a")]).await;
        board.begin_edit(id(1)).unwrap();
        board.set_field("title", "changed").unwrap();

        assert_eq!(board.cancel(), Some(id(1)));
        assert_eq!(board.get(id(1)).unwrap().title, "a");
        assert!(board.api().updates.lock().unwrap().is_empty());
        assert_eq!(board.cancel(), None);
    }

    #[tokio::test]
    async fn delete_removes_only_matching_entry() {
        let mut board = loaded(vec![ticket(1, "a"), ticket(2, "b")]).await;
        board.delete(id(1)).await.unwrap();

        let ids: Vec<Uuid> = board.tickets().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id(2)]);
    }

    #[tokio::test]
    async fn delete_of_missing_ticket_surfaces_error() {
        let mut board = loaded(vec![ticket(1, "a")]).await;
        let err = board.delete(id(42)).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Service(ServiceError::NotFound { .. })
        ));
        assert_eq!(board.tickets().len(), 1);
        assert_eq!(board.error(), Some(DELETE_FAILED));

        board.dismiss_error();
        assert!(board.error().is_none());
    }

    #[tokio::test]
    async fn deleting_edited_ticket_closes_session() {
        let mut board = loaded(vec![ticket(1, "a")]).await;
        board.begin_edit(id(1)).unwrap();
        board.delete(id(1)).await.unwrap();
        assert!(board.session().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_complete_snapshots() {
        let mut board = Reconciler::new(FakeApi::with(vec![ticket(1, "a")]), Catalogs::default());
        let mut rx = board.subscribe();
        assert_eq!(rx.borrow().phase, LoadPhase::Loading);

        board.load().await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.phase, LoadPhase::Ready);
        assert_eq!(snapshot.tickets.len(), 1);

        board.begin_edit(id(1)).unwrap();
        assert_eq!(rx.borrow_and_update().editing.as_ref().map(|t| t.id), Some(id(1)));

        board.cancel();
        assert!(rx.borrow_and_update().editing.is_none());
    }
}
