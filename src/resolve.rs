use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    Audit, AuditEvent, Outcome, ProductLine, Resolution, ResolvedTicket, TicketRecord,
    TicketStatus,
};

/// Text the helpdesk puts in the notification it sends when it autocloses a ticket.
pub const AUTOCLOSE_PHRASE: &str = "This request will now be closed";
pub const DEFAULT_CLOUD_TAG: &str = "deploy_dremio_cloud";

/// How to choose between several solved candidates in one audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionRule {
    /// Latest audit timestamp wins.
    #[default]
    Chronological,
    /// Last candidate met while walking the audits in the order the API returned them.
    ScanOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NoOrganization,
    NoAssignee,
    NotFinished(TicketStatus),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::NoOrganization => write!(f, "no organization"),
            Skip::NoAssignee => write!(f, "no assignee"),
            Skip::NotFinished(status) => write!(f, "status {status:?} is not solved or closed"),
        }
    }
}

/// A ticket that survived screening and still needs its audit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ticket_id: u64,
    pub assignee_id: u64,
    pub created_at: DateTime<Utc>,
    pub line: ProductLine,
}

pub fn screen(ticket: &TicketRecord, cloud_tag: &str) -> Result<Candidate, Skip> {
    if ticket.organization_id.is_none() {
        return Err(Skip::NoOrganization);
    }
    let assignee_id = ticket.assignee_id.ok_or(Skip::NoAssignee)?;
    if !ticket.status.is_finished() {
        return Err(Skip::NotFinished(ticket.status));
    }

    Ok(Candidate {
        ticket_id: ticket.id,
        assignee_id,
        created_at: ticket.created_at,
        line: classify(&ticket.tags, cloud_tag),
    })
}

pub fn classify(tags: &[String], cloud_tag: &str) -> ProductLine {
    if tags.iter().any(|tag| tag == cloud_tag) {
        ProductLine::Cloud
    } else {
        ProductLine::Software
    }
}

/// Finds the authoritative solved timestamp in a ticket's audit history.
///
/// Every `status -> solved` change and every autoclose notification is a
/// candidate; the audit's timestamp is what gets recorded. Audits are not
/// guaranteed to arrive in chronological order, so the whole history is
/// searched. The autoclosed flag is set if any autoclose notification is seen,
/// whichever candidate ends up winning.
pub fn resolve(audits: &[Audit], rule: ResolutionRule) -> Option<Resolution> {
    let mut solved_at: Option<DateTime<Utc>> = None;
    let mut autoclosed = false;

    for audit in audits {
        for event in &audit.events {
            let is_candidate = match event {
                AuditEvent::Change { field_name, value } => {
                    field_name == "status" && value.as_str() == Some("solved")
                }
                AuditEvent::Notification { body } => {
                    let hit = body.contains(AUTOCLOSE_PHRASE);
                    autoclosed |= hit;
                    hit
                }
                AuditEvent::Other => false,
            };
            if !is_candidate {
                continue;
            }

            solved_at = match (rule, solved_at) {
                (ResolutionRule::Chronological, Some(current)) if current > audit.created_at => {
                    Some(current)
                }
                _ => Some(audit.created_at),
            };
        }
    }

    solved_at.map(|solved_at| Resolution {
        solved_at,
        autoclosed,
    })
}

/// Elapsed time from creation to resolution, never negative.
pub fn elapsed(created_at: DateTime<Utc>, solved_at: DateTime<Utc>) -> Duration {
    (solved_at - created_at).max(Duration::zero())
}

impl Candidate {
    pub fn into_outcome(self, resolution: Resolution) -> Outcome {
        if resolution.solved_at < self.created_at {
            tracing::warn!(
                ticket_id = self.ticket_id,
                created_at = %self.created_at,
                solved_at = %resolution.solved_at,
                "solved before created, counting as zero elapsed"
            );
        }
        Outcome {
            assignee_id: self.assignee_id,
            line: self.line,
            autoclosed: resolution.autoclosed,
            ticket: ResolvedTicket {
                ticket_id: self.ticket_id,
                elapsed: elapsed(self.created_at, resolution.solved_at),
            },
        }
    }
}
