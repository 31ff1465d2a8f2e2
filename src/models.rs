use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Open,
    Pending,
    Hold,
    Solved,
    Closed,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl TicketStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TicketStatus::Solved | TicketStatus::Closed)
    }
}

/// A ticket as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRecord {
    pub id: u64,
    pub organization_id: Option<u64>,
    pub assignee_id: Option<u64>,
    pub status: TicketStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<AuditEvent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    Change {
        #[serde(default)]
        field_name: String,
        #[serde(default)]
        value: serde_json::Value,
    },
    Notification {
        #[serde(default)]
        body: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLine {
    Software,
    Cloud,
}

/// Where a ticket's authoritative solved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub solved_at: DateTime<Utc>,
    pub autoclosed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTicket {
    pub ticket_id: u64,
    pub elapsed: Duration,
}

/// A ticket that passed screening and has a resolved timestamp, ready to be credited.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub assignee_id: u64,
    pub line: ProductLine,
    pub autoclosed: bool,
    pub ticket: ResolvedTicket,
}

#[derive(Debug, Clone)]
pub struct EngineerSummary {
    pub engineer_id: u64,
    pub name: String,
    pub software_count: usize,
    pub cloud_count: usize,
    pub autoclosed_count: usize,
    pub tickets: Vec<ResolvedTicket>,
}

impl EngineerSummary {
    pub fn new(engineer_id: u64, name: String) -> Self {
        Self {
            engineer_id,
            name,
            software_count: 0,
            cloud_count: 0,
            autoclosed_count: 0,
            tickets: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.software_count + self.cloud_count
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub tickets: usize,
    pub software: usize,
    pub cloud: usize,
    pub autoclosed: usize,
}

/// Counters for tickets that never reached the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub seen: usize,
    pub no_organization: usize,
    pub no_assignee: usize,
    pub not_finished: usize,
    pub unresolved: usize,
}

impl RunStats {
    pub fn skipped(&self) -> usize {
        self.no_organization + self.no_assignee + self.not_finished + self.unresolved
    }
}
