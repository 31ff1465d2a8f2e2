use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::client::HelpdeskApi;
use crate::error::ReportError;
use crate::models::{EngineerSummary, Outcome, ProductLine};

/// Display names already fetched during this run, keyed by user id.
#[derive(Debug, Default)]
pub struct NameCache {
    names: HashMap<u64, String>,
}

impl NameCache {
    pub async fn lookup(
        &mut self,
        api: &dyn HelpdeskApi,
        user_id: u64,
    ) -> Result<String, ReportError> {
        if let Some(name) = self.names.get(&user_id) {
            return Ok(name.clone());
        }
        let name = api.user_name(user_id).await?;
        tracing::debug!(user_id, name = %name, "fetched assignee name");
        self.names.insert(user_id, name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    summaries: HashMap<u64, EngineerSummary>,
    names: NameCache,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits one resolved ticket to its assignee, creating the summary on first sight.
    pub async fn record(
        &mut self,
        api: &dyn HelpdeskApi,
        outcome: Outcome,
    ) -> Result<(), ReportError> {
        let summary = match self.summaries.entry(outcome.assignee_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let name = self.names.lookup(api, outcome.assignee_id).await?;
                entry.insert(EngineerSummary::new(outcome.assignee_id, name))
            }
        };

        match outcome.line {
            ProductLine::Software => summary.software_count += 1,
            ProductLine::Cloud => summary.cloud_count += 1,
        }
        if outcome.autoclosed {
            summary.autoclosed_count += 1;
        }
        summary.tickets.push(outcome.ticket);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn name_lookups(&self) -> usize {
        self.names.len()
    }

    pub fn into_summaries(self) -> Vec<EngineerSummary> {
        self.summaries.into_values().collect()
    }
}
