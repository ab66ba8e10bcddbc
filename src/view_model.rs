use std::fmt;

use feruca::Collator;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::history::HistoryRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderMode {
    #[default]
    NewestFirst,
    OldestFirst,
    QuestionAsc,
    QuestionDesc,
}

impl OrderMode {
    pub const ALL: [OrderMode; 4] = [
        OrderMode::NewestFirst,
        OrderMode::OldestFirst,
        OrderMode::QuestionAsc,
        OrderMode::QuestionDesc,
    ];
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderMode::NewestFirst => "Newest first",
            OrderMode::OldestFirst => "Oldest first",
            OrderMode::QuestionAsc => "Question (A-Z)",
            OrderMode::QuestionDesc => "Question (Z-A)",
        };
        f.write_str(label)
    }
}

pub fn recompute(records: &[HistoryRecord], mode: OrderMode) -> Vec<&HistoryRecord> {
    let mut view: Vec<&HistoryRecord> = records.iter().collect();
    match mode {
        OrderMode::NewestFirst => view.sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        OrderMode::OldestFirst => view.sort_unstable_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        OrderMode::QuestionAsc | OrderMode::QuestionDesc => {
            // Unicode Collation Algorithm, CLDR root order.
            let mut collator = Collator::default();
            view.sort_unstable_by(|a, b| collator.collate(a.question.as_str(), b.question.as_str()));
            if mode == OrderMode::QuestionDesc {
                view.reverse();
            }
        }
    }
    view
}

/// Shortens `text` to at most `width` display columns, ending with an ellipsis when cut.
pub fn preview(text: &str, width: usize) -> String {
    let text = text.trim();
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }

    let budget = width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
