//! Conversation state for one assistant session
//!
//! Each submission appends the user's message plus one pending assistant
//! message and hands out a [`Ticket`]. Pipeline updates are applied against
//! that ticket; once a newer submission exists, updates for older tickets are
//! dropped, so a superseded run can never overwrite the current one.

use anyhow::{bail, Result};

use crate::mode::MatchMode;
use crate::pipeline::{MatchOutcome, MatchingStatus, PipelineEvent};
use crate::state::ChatMessage;

pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error while searching. Please try again.";

/// Identifies one submission within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: Ticket,
    /// Index of the placeholder assistant message
    index: usize,
    /// Mode the run was submitted in
    mode: MatchMode,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    mode: MatchMode,
    status: MatchingStatus,
    pending: Option<Pending>,
    next_ticket: u64,
}

impl ChatSession {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) -> MatchMode {
        self.mode = self.mode.toggle();
        self.mode
    }

    pub fn status(&self) -> MatchingStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.pending.map(|p| p.ticket)
    }

    /// Mode of the run in flight, or the selected mode when idle.
    pub fn active_mode(&self) -> MatchMode {
        self.pending.map(|p| p.mode).unwrap_or(self.mode)
    }

    /// Record a new user request and open a pending reply for it.
    ///
    /// A run still in flight is superseded: its placeholder is closed with the
    /// error message and its ticket stops being accepted.
    pub fn submit(&mut self, query: &str, image: Option<String>) -> Result<Ticket> {
        let query = query.trim();
        if query.is_empty() && image.is_none() {
            bail!("Nothing to send");
        }

        if let Some(previous) = self.pending {
            tracing::info!(ticket = previous.ticket.0, "Superseding in-flight match");
            self.close_with_error(previous);
        }

        self.messages.push(ChatMessage::user(query, image));
        self.messages.push(ChatMessage::pending());

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(Pending {
            ticket,
            index: self.messages.len() - 1,
            mode: self.mode,
        });
        self.status = MatchingStatus::Idle;

        Ok(ticket)
    }

    fn accept(&self, ticket: Ticket) -> Option<Pending> {
        self.pending.filter(|p| p.ticket == ticket)
    }

    /// Apply an intermediate update. Returns false if the ticket is stale.
    pub fn apply(&mut self, ticket: Ticket, event: PipelineEvent) -> bool {
        let Some(pending) = self.accept(ticket) else {
            return false;
        };

        match event {
            PipelineEvent::Status(status) => self.status = status,
            PipelineEvent::ProductsFound(products) => {
                self.messages[pending.index].products = products;
            }
        }
        true
    }

    /// Fill the pending reply with the final outcome.
    pub fn complete(&mut self, ticket: Ticket, outcome: MatchOutcome) -> bool {
        let Some(pending) = self.accept(ticket) else {
            return false;
        };

        let message = &mut self.messages[pending.index];
        message.content = outcome.response;
        message.products = outcome.products;
        message.loading = false;

        self.finish();
        true
    }

    /// Replace the pending reply with the generic error message.
    pub fn fail(&mut self, ticket: Ticket, error: &anyhow::Error) -> bool {
        let Some(pending) = self.accept(ticket) else {
            return false;
        };

        tracing::warn!(ticket = ticket.0, "Match failed: {:#}", error);
        self.close_with_error(pending);
        true
    }

    fn close_with_error(&mut self, pending: Pending) {
        let message = &mut self.messages[pending.index];
        message.content = ERROR_MESSAGE.to_string();
        message.products.clear();
        message.loading = false;
        self.finish();
    }

    fn finish(&mut self) {
        self.pending = None;
        self.status = MatchingStatus::Idle;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.finish();
    }
}
