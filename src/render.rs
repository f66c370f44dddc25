use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::lookup::LookupResult;
use crate::query::Query;

const SEPARATOR: &str = "; ";
const LABEL_DIVIDER: &str = "  -  ";
const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub label: String,
    pub tooltip: String,
}

/// Formats history entries for the list widget. Pure: same input, same output.
#[derive(Debug, Clone, Copy)]
pub struct EntryRenderer {
    preview_width: usize,
}

impl EntryRenderer {
    pub fn new(preview_width: usize) -> Self {
        EntryRenderer { preview_width }
    }

    pub fn render(&self, query: &Query, cached: Option<&LookupResult>) -> RenderedEntry {
        let explanations = cached.map(LookupResult::primary_explanations).unwrap_or(&[]);

        if explanations.is_empty() {
            return RenderedEntry {
                label: query.to_string(),
                tooltip: query.to_string(),
            };
        }

        let preview = truncate_to_width(&explanations.join(SEPARATOR), self.preview_width);
        let label = format!("{}{}{}", query, LABEL_DIVIDER, preview);

        let mut tooltip = query.to_string();
        for explanation in explanations {
            tooltip.push('\n');
            tooltip.push_str(explanation);
        }

        RenderedEntry { label, tooltip }
    }
}

/// Cuts `text` to at most `max` display columns, ellipsis included.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }

    let budget = max.saturating_sub(ELLIPSIS.width().unwrap_or(1));
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push(ELLIPSIS);
    out
}
