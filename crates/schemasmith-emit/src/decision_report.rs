//! Decision report for review (decisions.json + decisions.md)

use std::fmt::Write as _;

use schemasmith_core::{DecisionCounts, DecisionSet, Rationale};

/// JSON report file name
pub const DECISIONS_JSON: &str = "decisions.json";

/// Markdown report file name
pub const DECISIONS_MARKDOWN: &str = "decisions.md";

/// Render the review-friendly markdown report
pub fn render_markdown(decisions: &DecisionSet) -> String {
    let summary = decisions.summary();
    let mut md = String::new();

    md.push_str("# Tightening Decisions\n\n");
    let _ = writeln!(md, "**Mode:** {}\n", decisions.mode);

    md.push_str("## Summary\n\n");
    summary_line(&mut md, "Columns", "NOT NULL", summary.columns);
    summary_line(&mut md, "Indexes", "UNIQUE", summary.indexes);
    summary_line(&mut md, "Relationships", "created", summary.relationships);
    md.push('\n');

    if !decisions.columns.is_empty() {
        md.push_str("## Columns\n\n| Attribute | Verdict | Rationale |\n|---|---|---|\n");
        for decision in decisions.columns.values() {
            let verdict = if decision.enforces_not_null() { "NOT NULL" } else { "NULL" };
            let _ = writeln!(md, "| {} | {} | {} |", cell(&decision.attribute), verdict, codes(&decision.rationale));
        }
        md.push('\n');
    }

    if !decisions.indexes.is_empty() {
        md.push_str("## Indexes\n\n| Index | Verdict | Rationale |\n|---|---|---|\n");
        for decision in decisions.indexes.values() {
            let verdict = if decision.enforces_unique() { "UNIQUE" } else { "not unique" };
            let _ = writeln!(md, "| {} | {} | {} |", cell(&decision.index), verdict, codes(&decision.rationale));
        }
        md.push('\n');
    }

    if !decisions.relationships.is_empty() {
        md.push_str("## Relationships\n\n| Attribute | Target | Verdict | Rationale |\n|---|---|---|---|\n");
        for decision in decisions.relationships.values() {
            let verdict = if decision.creates() { "create" } else { "do not create" };
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                cell(&decision.attribute),
                cell(&decision.target),
                verdict,
                codes(&decision.rationale)
            );
        }
        md.push('\n');
    }

    md
}

fn summary_line(md: &mut String, kind: &str, enforced: &str, counts: DecisionCounts) {
    let _ = writeln!(md, "- {}: {} {}, {} relaxed", kind, counts.enforced, enforced, counts.relaxed);
}

/// Identifier as a table cell; `|` would end the cell
fn cell(value: &impl std::fmt::Display) -> String {
    value.to_string().replace('|', "\\|")
}

fn codes(rationale: &[Rationale]) -> String {
    rationale.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
