//! Human-readable summary renderer for change sets.

use similar::{ChangeTag, TextDiff};

use crate::diff::model::{ChangeKind, ChangeRecord, ChangeSet};

/// Maximum unified-diff lines rendered per artifact
const MAX_DIFF_LINES: usize = 200;

/// Render a Markdown summary of a [`ChangeSet`].
///
/// Intended for review output before or after a publish. Modified artifacts
/// whose old and new contents are both valid UTF-8 get a unified line diff;
/// binary artifacts only report their byte span. The summary is informational
/// and never feeds back into change detection.
pub fn render_human_summary(changes: &ChangeSet) -> String {
    let mut out = String::new();

    out.push_str("## Artifact Changes\n\n");

    if changes.is_empty() {
        out.push_str("_No changes._\n");
        return out;
    }

    let counts = changes.counts();
    out.push_str(&format!(
        "**Added**: {}  \n**Removed**: {}  \n**Modified**: {}\n\n",
        counts.added, counts.removed, counts.modified
    ));

    for record in changes {
        out.push_str(&record_line(record));
        out.push('\n');
    }

    let text_diffs: Vec<(&ChangeRecord, String)> = changes
        .iter()
        .filter(|r| r.kind == ChangeKind::Modified)
        .filter_map(|r| unified_text_diff(r).map(|d| (r, d)))
        .collect();

    if !text_diffs.is_empty() {
        out.push_str("\n### Content\n");
        for (record, diff) in text_diffs {
            out.push_str(&format!("\n`{}`\n\n```diff\n{}```\n", record.name, diff));
        }
    }

    out
}

fn record_line(record: &ChangeRecord) -> String {
    match record.kind {
        ChangeKind::Added => format!(
            "- `{}` added ({} bytes)",
            record.name,
            record.new_len().unwrap_or_default()
        ),
        ChangeKind::Removed => format!(
            "- `{}` removed ({} bytes)",
            record.name,
            record.old_len().unwrap_or_default()
        ),
        ChangeKind::Modified => match record.byte_span() {
            Some(span) => format!(
                "- `{}` modified ({} -> {} bytes, {} replaced by {} at offset {})",
                record.name,
                span.old_len,
                span.new_len,
                span.removed_len(),
                span.inserted_len(),
                span.common_prefix
            ),
            None => format!("- `{}` modified", record.name),
        },
    }
}

fn unified_text_diff(record: &ChangeRecord) -> Option<String> {
    let old = std::str::from_utf8(record.old_content.as_deref()?).ok()?;
    let new = std::str::from_utf8(record.new_content.as_deref()?).ok()?;

    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    let mut lines = 0usize;

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                if lines == MAX_DIFF_LINES {
                    out.push_str("... (truncated)\n");
                    return Some(out);
                }
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                out.push(sign);
                out.push_str(change.value());
                if change.missing_newline() {
                    out.push('\n');
                }
                lines += 1;
            }
        }
    }

    Some(out)
}
