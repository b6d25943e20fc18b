//! Console rendering of workflow outcomes.
//!
//! The format is fixed: a marker line per item, then either a success line
//! or `❌` with the reason. Query successes list the top hits by kind and a
//! label cut to [`LABEL_CHARS`] characters.

use std::io::{self, Write};

use crate::utils::display_label;

use super::{IngestOutcome, QueryOutcome};

/// Hits shown per query, further capped by the query's own limit.
pub const DISPLAY_HITS: usize = 2;

/// Maximum label length before truncation with `...`.
pub const LABEL_CHARS: usize = 60;

pub fn render_ingest(outcomes: &[IngestOutcome], out: &mut impl Write) -> io::Result<()> {
    let total = outcomes.len();
    for (index, outcome) in outcomes.iter().enumerate() {
        render_ingest_item(index + 1, total, outcome, out)?;
    }
    Ok(())
}

/// One episode's lines; `position` starts at 1.
pub fn render_ingest_item(
    position: usize,
    total: usize,
    outcome: &IngestOutcome,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "\n📝 Adding episode {position}/{total}: {}", outcome.name)?;
    match &outcome.result {
        Ok(()) => writeln!(out, "   ✅ Successfully indexed"),
        Err(e) => writeln!(out, "   ❌ Error: {}", e.reason()),
    }
}

pub fn render_query(outcomes: &[QueryOutcome], out: &mut impl Write) -> io::Result<()> {
    for outcome in outcomes {
        render_query_item(outcome, out)?;
    }
    Ok(())
}

pub fn render_query_item(outcome: &QueryOutcome, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "\n💭 Query: {}", outcome.query)?;
    match &outcome.result {
        Ok(hits) => {
            writeln!(out, "   Found {} results", hits.len())?;
            let shown = DISPLAY_HITS.min(outcome.limit);
            for (j, hit) in hits.iter().take(shown).enumerate() {
                writeln!(
                    out,
                    "   {}. {}: {}",
                    j + 1,
                    hit.kind(),
                    display_label(hit.label(), LABEL_CHARS)
                )?;
            }
            Ok(())
        }
        Err(e) => writeln!(out, "   ❌ Search error: {}", e.reason()),
    }
}
