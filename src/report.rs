use std::fmt::Write;

use chrono::Duration;

use crate::models::{EngineerSummary, ResolvedTicket, RunStats, Totals};
use crate::range::DateRange;

/// Integer percentage of `part` in `total`; zero when either is zero.
pub fn pct(part: usize, total: usize) -> usize {
    if part == 0 || total == 0 {
        0
    } else {
        part * 100 / total
    }
}

/// Element at `n / 2` of the elapsed times sorted ascending.
pub fn median(tickets: &[ResolvedTicket]) -> Option<Duration> {
    let mut elapsed: Vec<Duration> = tickets.iter().map(|t| t.elapsed).collect();
    elapsed.sort();
    elapsed.get(elapsed.len() / 2).copied()
}

/// Arithmetic mean in whole milliseconds, truncated.
pub fn mean(tickets: &[ResolvedTicket]) -> Option<Duration> {
    if tickets.is_empty() {
        return None;
    }
    let sum: i64 = tickets.iter().map(|t| t.elapsed.num_milliseconds()).sum();
    Some(Duration::milliseconds(sum / tickets.len() as i64))
}

/// Renders a duration as days, hours and minutes.
pub fn dhm(elapsed: Duration) -> String {
    if elapsed.num_milliseconds() == 0 {
        return "nothing".to_string();
    }
    let seconds = elapsed.num_seconds();
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    format!("{days} days, {hours} hours {minutes} min")
}

pub fn sort_alphabetical(summaries: &mut [EngineerSummary]) {
    summaries.sort_by_cached_key(|s| s.name.to_lowercase());
}

pub fn sort_by_volume(summaries: &mut [EngineerSummary]) {
    summaries.sort_by(|a, b| b.total().cmp(&a.total()));
}

pub fn totals(summaries: &[EngineerSummary]) -> Totals {
    summaries.iter().fold(Totals::default(), |acc, s| Totals {
        tickets: acc.tickets + s.total(),
        software: acc.software + s.software_count,
        cloud: acc.cloud + s.cloud_count,
        autoclosed: acc.autoclosed + s.autoclosed_count,
    })
}

fn write_table(output: &mut String, title: &str, summaries: &[EngineerSummary]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "{title}");
    let _ = writeln!(
        output,
        "{:<30} {:>7} {:>9} {:>7} {:>7} {:>10} {:>12} {:>26} {:>26}",
        "name",
        "total",
        "software",
        "cloud",
        "%cloud",
        "autoclosed",
        "%autoclosed",
        "medianttr",
        "meanttr"
    );

    for summary in summaries {
        let total = summary.total();
        let ttr = median(&summary.tickets).zip(mean(&summary.tickets));
        let (median_ttr, mean_ttr) = match ttr {
            Some((median, mean)) => (dhm(median), dhm(mean)),
            None => ("no tickets".to_string(), "no tickets".to_string()),
        };
        let _ = writeln!(
            output,
            "{:<30} {:>7} {:>9} {:>7} {:>6}% {:>10} {:>11}% {:>26} {:>26}",
            summary.name,
            total,
            summary.software_count,
            summary.cloud_count,
            pct(summary.cloud_count, total),
            summary.autoclosed_count,
            pct(summary.autoclosed_count, total),
            median_ttr,
            mean_ttr
        );
    }
}

fn write_ticket_dump(output: &mut String, summaries: &[EngineerSummary]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "Tickets per engineer");
    for summary in summaries {
        let _ = writeln!(output, "{} ({})", summary.name, summary.engineer_id);
        let mut tickets = summary.tickets.clone();
        tickets.sort_by_key(|t| t.elapsed);
        for ticket in &tickets {
            let elapsed = dhm(ticket.elapsed);
            let _ = writeln!(output, "    {:>10}  {elapsed}", ticket.ticket_id);
        }
    }
}

pub fn build_report(
    range: &DateRange,
    mut summaries: Vec<EngineerSummary>,
    stats: &RunStats,
    ticket_dump: bool,
) -> String {
    let mut output = String::new();
    let window = format!("{} - {}", range.start, range.end);

    if summaries.is_empty() {
        let _ = writeln!(output, "No resolved tickets found for {window}.");
    } else {
        sort_alphabetical(&mut summaries);
        write_table(&mut output, &format!("Sort by name: {window}"), &summaries);

        sort_by_volume(&mut summaries);
        let _ = writeln!(output);
        write_table(
            &mut output,
            &format!("Sort by total ticket count: {window}"),
            &summaries,
        );
    }

    let totals = totals(&summaries);
    let _ = writeln!(output);
    let _ = writeln!(output, "Total Tickets: {}", totals.tickets);
    let _ = writeln!(output, "Total Software Tickets: {}", totals.software);
    let _ = writeln!(output, "Total Cloud Tickets: {}", totals.cloud);
    let _ = writeln!(output, "Total Autoclosed Tickets: {}", totals.autoclosed);
    let _ = writeln!(
        output,
        "Tickets seen: {}, skipped: {} (no org {}, no assignee {}, not solved {}, unresolved {})",
        stats.seen,
        stats.skipped(),
        stats.no_organization,
        stats.no_assignee,
        stats.not_finished,
        stats.unresolved
    );

    if ticket_dump && !summaries.is_empty() {
        sort_alphabetical(&mut summaries);
        write_ticket_dump(&mut output, &summaries);
    }

    output
}
