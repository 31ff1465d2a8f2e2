//! In-memory helpdesk used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::client::HelpdeskApi;
use crate::error::ReportError;
use crate::models::{Audit, AuditEvent, TicketRecord, TicketStatus};

#[derive(Default)]
pub struct FakeHelpdesk {
    searches: HashMap<String, Vec<TicketRecord>>,
    audits: HashMap<u64, Vec<Audit>>,
    users: HashMap<u64, String>,
    audit_delays: HashMap<u64, Duration>,
    search_calls: AtomicUsize,
    audit_calls: AtomicUsize,
    user_calls: AtomicUsize,
}

impl FakeHelpdesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: &str, tickets: Vec<TicketRecord>) -> Self {
        self.searches.insert(term.to_string(), tickets);
        self
    }

    pub fn with_audits(mut self, ticket_id: u64, audits: Vec<Audit>) -> Self {
        self.audits.insert(ticket_id, audits);
        self
    }

    /// Holds back the audit response for `ticket_id` so tests can force completion order.
    pub fn with_audit_delay(mut self, ticket_id: u64, delay: Duration) -> Self {
        self.audit_delays.insert(ticket_id, delay);
        self
    }

    pub fn with_user(mut self, user_id: u64, name: &str) -> Self {
        self.users.insert(user_id, name.to_string());
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn audit_calls(&self) -> usize {
        self.audit_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }
}

fn not_found(url: String) -> ReportError {
    ReportError::Api {
        url,
        status: 404,
        body: "not found".to_string(),
    }
}

#[async_trait]
impl HelpdeskApi for FakeHelpdesk {
    async fn search_tickets(&self, term: &str) -> Result<Vec<TicketRecord>, ReportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.searches.get(term).cloned().unwrap_or_default())
    }

    async fn ticket_audits(&self, ticket_id: u64) -> Result<Vec<Audit>, ReportError> {
        self.audit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.audit_delays.get(&ticket_id) {
            tokio::time::sleep(*delay).await;
        }
        self.audits
            .get(&ticket_id)
            .cloned()
            .ok_or_else(|| not_found(format!("tickets/{ticket_id}/audits")))
    }

    async fn user_name(&self, user_id: u64) -> Result<String, ReportError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| not_found(format!("users/{user_id}")))
    }
}

pub fn day(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0).unwrap()
}

pub fn ticket(id: u64, assignee_id: Option<u64>, tags: &[&str]) -> TicketRecord {
    TicketRecord {
        id,
        organization_id: Some(500),
        assignee_id,
        status: TicketStatus::Solved,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: day(1, 0),
    }
}

pub fn solved_at(when: DateTime<Utc>) -> Audit {
    Audit {
        created_at: when,
        events: vec![AuditEvent::Change {
            field_name: "status".to_string(),
            value: serde_json::json!("solved"),
        }],
    }
}

pub fn autoclosed_at(when: DateTime<Utc>) -> Audit {
    Audit {
        created_at: when,
        events: vec![AuditEvent::Notification {
            body: "This request will now be closed.".to_string(),
        }],
    }
}
