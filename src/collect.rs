use anyhow::Context;
use futures::stream::{self, StreamExt};

use crate::aggregate::Aggregator;
use crate::client::HelpdeskApi;
use crate::config::CollectOptions;
use crate::models::{EngineerSummary, RunStats, TicketRecord};
use crate::range::DateRange;
use crate::resolve::{self, Candidate, Skip};

#[derive(Debug)]
pub struct Collection {
    pub summaries: Vec<EngineerSummary>,
    pub stats: RunStats,
}

fn screen_all(
    tickets: Vec<TicketRecord>,
    cloud_tag: &str,
    stats: &mut RunStats,
) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(tickets.len());
    for ticket in &tickets {
        match resolve::screen(ticket, cloud_tag) {
            Ok(candidate) => candidates.push(candidate),
            Err(skip) => {
                match skip {
                    Skip::NoOrganization => stats.no_organization += 1,
                    Skip::NoAssignee => stats.no_assignee += 1,
                    Skip::NotFinished(_) => stats.not_finished += 1,
                }
                tracing::info!(ticket_id = ticket.id, reason = %skip, "skipping ticket");
            }
        }
    }
    candidates
}

/// Walks every slice of `range`, resolves the qualifying tickets and credits them
/// to their assignees. Audit histories are fetched with at most
/// `options.concurrency` requests in flight; crediting stays on this task.
pub async fn collect(
    api: &dyn HelpdeskApi,
    range: &DateRange,
    options: &CollectOptions,
) -> anyhow::Result<Collection> {
    let mut aggregator = Aggregator::new();
    let mut stats = RunStats::default();

    for slice in range.slices(options.width) {
        let term = slice.query();
        tracing::info!(query = %term, "searching tickets");

        let tickets = api
            .search_tickets(&term)
            .await
            .with_context(|| format!("searching for tickets with {term:?}"))?;
        stats.seen += tickets.len();

        let candidates = screen_all(tickets, &options.cloud_tag, &mut stats);
        let mut fetched = stream::iter(candidates)
            .map(|candidate| async move {
                let audits = api.ticket_audits(candidate.ticket_id).await;
                (candidate, audits)
            })
            .buffer_unordered(options.concurrency.max(1));

        while let Some((candidate, audits)) = fetched.next().await {
            let ticket_id = candidate.ticket_id;
            let audits = audits
                .with_context(|| format!("fetching audits for ticket {ticket_id}"))?;

            let Some(resolution) = resolve::resolve(&audits, options.rule) else {
                stats.unresolved += 1;
                tracing::info!(ticket_id, "skipping ticket: no solved event in audit history");
                continue;
            };

            tracing::debug!(
                ticket_id,
                solved_at = %resolution.solved_at,
                autoclosed = resolution.autoclosed,
                "ticket resolved"
            );
            aggregator
                .record(api, candidate.into_outcome(resolution))
                .await
                .with_context(|| format!("crediting ticket {ticket_id}"))?;
        }
    }

    tracing::info!(
        seen = stats.seen,
        skipped = stats.skipped(),
        engineers = aggregator.len(),
        name_lookups = aggregator.name_lookups(),
        "collection finished"
    );

    Ok(Collection {
        summaries: aggregator.into_summaries(),
        stats,
    })
}
