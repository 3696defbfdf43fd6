use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    /// Clamps to `text` and snaps both ends back onto char boundaries.
    pub fn clamp_to(self, text: &str) -> Self {
        Self::new(
            floor_char_boundary(text, self.start),
            floor_char_boundary(text, self.end),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub end: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(start: usize, end: usize, insert: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: insert.into(),
        }
    }

    pub fn insert_at(pos: usize, insert: impl Into<String>) -> Self {
        Self::new(pos, pos, insert)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub changes: Vec<TextChange>,
    pub selection_after: Option<Selection>,
}

impl Transaction {
    pub fn single(change: TextChange, selection_after: Option<Selection>) -> Self {
        Self {
            changes: vec![change],
            selection_after,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub text_changed: bool,
    pub selection_changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("change {start}..{end} is outside a document of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("change {next_start}..{next_end} overlaps {first_start}..{first_end}")]
    OverlappingChanges {
        first_start: usize,
        first_end: usize,
        next_start: usize,
        next_end: usize,
    },
}

/// Text and selection held by a mounted markdown widget. Selection offsets are
/// byte offsets into `text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSnapshot {
    pub text: String,
    pub selection: Selection,
}

impl EditorSnapshot {
    pub fn new(text: String) -> Self {
        let len = text.len();
        Self {
            text,
            selection: Selection::cursor(len),
        }
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp_to(&self.text);
    }

    pub fn replace_from_input(&mut self, new_text: String, selection: Selection) -> ApplyOutcome {
        let next_selection = selection.clamp_to(&new_text);
        let text_changed = self.text != new_text;
        let selection_changed = self.selection != next_selection;

        self.text = new_text;
        self.selection = next_selection;

        ApplyOutcome {
            text_changed,
            selection_changed,
        }
    }

    pub fn apply_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<ApplyOutcome, CoreError> {
        let normalized = normalize_changes(&transaction.changes, &self.text)?;
        let next_text = apply_changes_to_text(&self.text, &normalized);

        let next_selection = transaction
            .selection_after
            .unwrap_or_else(|| {
                Selection::new(
                    map_position_through_changes(self.selection.start, &normalized),
                    map_position_through_changes(self.selection.end, &normalized),
                )
            })
            .clamp_to(&next_text);

        let text_changed = self.text != next_text;
        let selection_changed = self.selection != next_selection;

        self.text = next_text;
        self.selection = next_selection;

        Ok(ApplyOutcome {
            text_changed,
            selection_changed,
        })
    }

    fn selected(&self) -> &str {
        let selection = self.selection.clamp_to(&self.text);
        &self.text[selection.start..selection.end]
    }
}

fn normalize_changes(changes: &[TextChange], text: &str) -> Result<Vec<TextChange>, CoreError> {
    let len = text.len();
    let mut sorted = changes.to_vec();
    sorted.sort_by_key(|change| (change.start, change.end));

    for change in &sorted {
        if change.start > change.end
            || change.end > len
            || !text.is_char_boundary(change.start)
            || !text.is_char_boundary(change.end)
        {
            return Err(CoreError::InvalidRange {
                start: change.start,
                end: change.end,
                len,
            });
        }
    }

    for pair in sorted.windows(2) {
        let (first, next) = (&pair[0], &pair[1]);
        if next.start < first.end {
            return Err(CoreError::OverlappingChanges {
                first_start: first.start,
                first_end: first.end,
                next_start: next.start,
                next_end: next.end,
            });
        }
    }

    Ok(sorted)
}

fn apply_changes_to_text(text: &str, changes: &[TextChange]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for change in changes {
        out.push_str(&text[cursor..change.start]);
        out.push_str(&change.insert);
        cursor = change.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn map_position_through_changes(pos: usize, changes: &[TextChange]) -> usize {
    let mut shift: isize = 0;
    for change in changes {
        if pos < change.start {
            break;
        }
        if pos <= change.end {
            return (change.start as isize + shift) as usize + change.insert.len();
        }
        shift += change.insert.len() as isize - (change.end - change.start) as isize;
    }
    (pos as isize + shift).max(0) as usize
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    Quote,
}

impl BlockType {
    fn prefix(self) -> String {
        match self {
            BlockType::Paragraph => String::new(),
            BlockType::Heading(level) => format!("{} ", "#".repeat(level.clamp(1, 6) as usize)),
            BlockType::Quote => "> ".to_string(),
        }
    }
}

/// Editing affordances offered by the widget's toolbar and key bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkdownCommand {
    Wrap { open: &'static str, close: &'static str },
    SetBlockType(BlockType),
    InsertLink { url: String },
    InsertImage { url: String },
    InsertTable,
    InsertFrontmatter,
    Indent,
    Outdent,
    ContinueBlock,
}

impl MarkdownCommand {
    pub const BOLD: Self = Self::Wrap { open: "**", close: "**" };
    pub const ITALIC: Self = Self::Wrap { open: "*", close: "*" };
    pub const UNDERLINE: Self = Self::Wrap { open: "<u>", close: "</u>" };
}

const TABLE_TEMPLATE: &str = "| Column 1 | Column 2 |\n| --- | --- |\n|  |  |\n";
const FRONTMATTER_TEMPLATE: &str = "---\ntitle: \n---\n";

/// Applies `command` to `snapshot`; returns whether text or selection changed.
pub fn apply_markdown_command(
    snapshot: &mut EditorSnapshot,
    command: &MarkdownCommand,
) -> Result<bool, CoreError> {
    let Some(transaction) = build_markdown_transaction(snapshot, command) else {
        return Ok(false);
    };
    let outcome = snapshot.apply_transaction(transaction)?;
    Ok(outcome.text_changed || outcome.selection_changed)
}

fn build_markdown_transaction(
    snapshot: &EditorSnapshot,
    command: &MarkdownCommand,
) -> Option<Transaction> {
    match command {
        MarkdownCommand::Wrap { open, close } => Some(wrap_transaction(snapshot, open, close)),
        MarkdownCommand::SetBlockType(block) => Some(block_type_transaction(snapshot, *block)),
        MarkdownCommand::InsertLink { url } => Some(link_transaction(snapshot, url)),
        MarkdownCommand::InsertImage { url } => Some(image_transaction(snapshot, url)),
        MarkdownCommand::InsertTable => Some(table_transaction(snapshot)),
        MarkdownCommand::InsertFrontmatter => frontmatter_transaction(snapshot),
        MarkdownCommand::Indent => indent_or_outdent_transaction(snapshot, false),
        MarkdownCommand::Outdent => indent_or_outdent_transaction(snapshot, true),
        MarkdownCommand::ContinueBlock => continue_markdown_block_transaction(snapshot),
    }
}

fn wrap_transaction(snapshot: &EditorSnapshot, open: &str, close: &str) -> Transaction {
    let selection = snapshot.selection.clamp_to(&snapshot.text);
    let insert = format!("{open}{}{close}", snapshot.selected());
    let selection_after = if selection.is_cursor() {
        Selection::cursor(selection.start + open.len())
    } else {
        Selection::cursor(selection.end + open.len() + close.len())
    };
    Transaction::single(
        TextChange::new(selection.start, selection.end, insert),
        Some(selection_after),
    )
}

fn block_type_transaction(snapshot: &EditorSnapshot, block: BlockType) -> Transaction {
    static RE_BLOCK_PREFIX: OnceLock<Regex> = OnceLock::new();
    let re_prefix =
        RE_BLOCK_PREFIX.get_or_init(|| Regex::new(r"^(?:#{1,6}[^\S\n]+|>[^\S\n]?)").unwrap());

    let text = &snapshot.text;
    let selection = snapshot.selection.clamp_to(text);
    let ls = line_start(text, selection.start);
    let le = line_end(text, selection.start);
    let existing = re_prefix
        .find(&text[ls..le])
        .map(|m| m.end())
        .unwrap_or(0);
    let prefix = block.prefix();

    let cursor = selection.start.max(ls + existing) - existing + prefix.len();
    Transaction::single(
        TextChange::new(ls, ls + existing, prefix),
        Some(Selection::cursor(cursor)),
    )
}

fn link_transaction(snapshot: &EditorSnapshot, url: &str) -> Transaction {
    let selection = snapshot.selection.clamp_to(&snapshot.text);
    let label = snapshot.selected();
    let insert = format!("[{label}]({url})");
    let selection_after = if label.is_empty() {
        Selection::cursor(selection.start + 1)
    } else {
        Selection::cursor(selection.start + insert.len())
    };
    Transaction::single(
        TextChange::new(selection.start, selection.end, insert),
        Some(selection_after),
    )
}

fn image_transaction(snapshot: &EditorSnapshot, url: &str) -> Transaction {
    let selection = snapshot.selection.clamp_to(&snapshot.text);
    let insert = format!("![{}]({url})", snapshot.selected());
    let end = selection.start + insert.len();
    Transaction::single(
        TextChange::new(selection.start, selection.end, insert),
        Some(Selection::cursor(end)),
    )
}

/// Inserts a table on its own lines after the line holding the caret.
fn table_transaction(snapshot: &EditorSnapshot) -> Transaction {
    let text = &snapshot.text;
    let selection = snapshot.selection.clamp_to(text);
    let le = line_end(text, selection.end);
    let mut insert = String::new();
    if le > 0 {
        insert.push_str("\n\n");
    }
    let first_cell = le + insert.len() + 2;
    insert.push_str(TABLE_TEMPLATE);
    Transaction::single(
        TextChange::insert_at(le, insert),
        Some(Selection::cursor(first_cell)),
    )
}

fn frontmatter_transaction(snapshot: &EditorSnapshot) -> Option<Transaction> {
    if snapshot.text.starts_with("---\n") {
        return None;
    }
    let cursor = "---\ntitle: ".len();
    Some(Transaction::single(
        TextChange::insert_at(0, FRONTMATTER_TEMPLATE),
        Some(Selection::cursor(cursor)),
    ))
}

fn indent_or_outdent_transaction(
    snapshot: &EditorSnapshot,
    outdent: bool,
) -> Option<Transaction> {
    let text = &snapshot.text;
    let selection = snapshot.selection.clamp_to(text);

    if selection.is_cursor() {
        if !outdent {
            return Some(Transaction::single(
                TextChange::insert_at(selection.start, "    "),
                Some(Selection::cursor(selection.start + 4)),
            ));
        }

        let ls = line_start(text, selection.start);
        let remove = leading_indent(&text[ls..line_end(text, selection.start)]);
        if remove == 0 {
            return None;
        }
        let new_cursor = selection.start.saturating_sub(remove).max(ls);
        return Some(Transaction::single(
            TextChange::new(ls, ls + remove, ""),
            Some(Selection::cursor(new_cursor)),
        ));
    }

    let block_start = line_start(text, selection.start);
    let block_end = line_end(text, selection.end);
    let transformed = text[block_start..block_end]
        .split('\n')
        .map(|line| {
            if outdent {
                line[leading_indent(line)..].to_string()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let selection_after = Selection::new(block_start, block_start + transformed.len());
    Some(Transaction::single(
        TextChange::new(block_start, block_end, transformed),
        Some(selection_after),
    ))
}

fn leading_indent(line: &str) -> usize {
    if line.starts_with('\t') {
        1
    } else {
        line.bytes().take_while(|b| *b == b' ').take(4).count()
    }
}

fn continue_markdown_block_transaction(snapshot: &EditorSnapshot) -> Option<Transaction> {
    let text = &snapshot.text;
    let selection = snapshot.selection.clamp_to(text);
    if !selection.is_cursor() {
        return None;
    }

    static RE_TASK: OnceLock<Regex> = OnceLock::new();
    static RE_UL: OnceLock<Regex> = OnceLock::new();
    static RE_OL: OnceLock<Regex> = OnceLock::new();
    static RE_QUOTE: OnceLock<Regex> = OnceLock::new();

    let re_task =
        RE_TASK.get_or_init(|| Regex::new(r"^(\s*[-*+]\s+)\[(?: |x|X)\]\s+(.*)$").unwrap());
    let re_ul = RE_UL.get_or_init(|| Regex::new(r"^(\s*[-*+]\s+)(.*)$").unwrap());
    let re_ol = RE_OL.get_or_init(|| Regex::new(r"^(\s*)(\d+)\.\s+(.*)$").unwrap());
    let re_quote = RE_QUOTE.get_or_init(|| Regex::new(r"^(\s*>\s+)(.*)$").unwrap());

    let ls = line_start(text, selection.start);
    let line = &text[ls..line_end(text, selection.start)];

    // An empty list item or quote line ends the block instead of continuing it.
    let continuation = if let Some(cap) = re_task.captures(line) {
        (!cap[2].trim().is_empty()).then(|| format!("\n{}[ ] ", &cap[1]))
    } else if let Some(cap) = re_ol.captures(line) {
        let next = cap[2].parse::<u64>().unwrap_or(1) + 1;
        (!cap[3].trim().is_empty()).then(|| format!("\n{}{next}. ", &cap[1]))
    } else if let Some(cap) = re_ul.captures(line) {
        (!cap[2].trim().is_empty()).then(|| format!("\n{}", &cap[1]))
    } else if let Some(cap) = re_quote.captures(line) {
        (!cap[2].trim().is_empty()).then(|| format!("\n{}", &cap[1]))
    } else {
        return None;
    };
    let insert = continuation.unwrap_or_else(|| "\n".to_string());

    let next_cursor = selection.start + insert.len();
    Some(Transaction::single(
        TextChange::insert_at(selection.start, insert),
        Some(Selection::cursor(next_cursor)),
    ))
}

fn line_start(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[..clamped].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn line_end(text: &str, pos: usize) -> usize {
    let clamped = pos.min(text.len());
    text[clamped..]
        .find('\n')
        .map(|i| clamped + i)
        .unwrap_or(text.len())
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Converts a DOM selection offset (UTF-16 code units) into a byte offset.
pub fn utf16_to_byte_idx(s: &str, pos_utf16: u32) -> usize {
    let mut acc: u32 = 0;
    for (i, ch) in s.char_indices() {
        if acc >= pos_utf16 {
            return i;
        }
        acc += ch.len_utf16() as u32;
    }
    s.len()
}

pub fn byte_idx_to_utf16(s: &str, byte_idx: usize) -> u32 {
    s[..floor_char_boundary(s, byte_idx)].encode_utf16().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(text: &str, selection: Selection) -> EditorSnapshot {
        let mut snapshot = EditorSnapshot::new(text.to_string());
        snapshot.set_selection(selection);
        snapshot
    }

    #[test]
    fn applies_multi_change_transaction() {
        let mut snapshot = snapshot_with("hello world", Selection::cursor(0));
        let transaction = Transaction {
            changes: vec![TextChange::insert_at(0, ">>"), TextChange::insert_at(11, "<<")],
            selection_after: Some(Selection::cursor(13)),
        };

        let outcome = snapshot.apply_transaction(transaction).unwrap();
        assert!(outcome.text_changed);
        assert_eq!(snapshot.text, ">>hello world<<");
        assert_eq!(snapshot.selection, Selection::cursor(13));
    }

    #[test]
    fn maps_selection_through_earlier_changes() {
        let mut snapshot = snapshot_with("abc def", Selection::cursor(5));
        let transaction = Transaction {
            changes: vec![TextChange::new(0, 3, "x")],
            selection_after: None,
        };
        snapshot.apply_transaction(transaction).unwrap();
        assert_eq!(snapshot.text, "x def");
        assert_eq!(snapshot.selection, Selection::cursor(3));
    }

    #[test]
    fn rejects_overlapping_changes() {
        let mut snapshot = EditorSnapshot::new("abcdef".to_string());
        let transaction = Transaction {
            changes: vec![TextChange::new(1, 4, "x"), TextChange::new(3, 5, "y")],
            selection_after: None,
        };
        assert!(matches!(
            snapshot.apply_transaction(transaction),
            Err(CoreError::OverlappingChanges { .. })
        ));
    }

    #[test]
    fn rejects_ranges_inside_a_character() {
        let mut snapshot = EditorSnapshot::new("é".to_string());
        let transaction = Transaction::single(TextChange::insert_at(1, "x"), None);
        assert!(matches!(
            snapshot.apply_transaction(transaction),
            Err(CoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bolds_selection() {
        let mut snapshot = snapshot_with("quill", Selection::new(0, 5));
        assert!(apply_markdown_command(&mut snapshot, &MarkdownCommand::BOLD).unwrap());
        assert_eq!(snapshot.text, "**quill**");
        assert_eq!(snapshot.selection, Selection::cursor(9));
    }

    #[test]
    fn underline_at_cursor_places_caret_inside() {
        let mut snapshot = snapshot_with("", Selection::cursor(0));
        apply_markdown_command(&mut snapshot, &MarkdownCommand::UNDERLINE).unwrap();
        assert_eq!(snapshot.text, "<u></u>");
        assert_eq!(snapshot.selection, Selection::cursor(3));
    }

    #[test]
    fn block_type_replaces_existing_prefix() {
        let mut snapshot = snapshot_with("# Title\nbody", Selection::cursor(4));
        apply_markdown_command(&mut snapshot, &MarkdownCommand::SetBlockType(BlockType::Heading(2)))
            .unwrap();
        assert_eq!(snapshot.text, "## Title\nbody");
        assert_eq!(snapshot.selection, Selection::cursor(5));

        apply_markdown_command(&mut snapshot, &MarkdownCommand::SetBlockType(BlockType::Quote))
            .unwrap();
        assert_eq!(snapshot.text, "> Title\nbody");

        apply_markdown_command(&mut snapshot, &MarkdownCommand::SetBlockType(BlockType::Paragraph))
            .unwrap();
        assert_eq!(snapshot.text, "Title\nbody");
    }

    #[test]
    fn link_wraps_selected_label() {
        let mut snapshot = snapshot_with("see docs", Selection::new(4, 8));
        let command = MarkdownCommand::InsertLink {
            url: "https://example.com".to_string(),
        };
        apply_markdown_command(&mut snapshot, &command).unwrap();
        assert_eq!(snapshot.text, "see [docs](https://example.com)");
    }

    #[test]
    fn image_inserts_at_cursor() {
        let mut snapshot = snapshot_with("", Selection::cursor(0));
        let command = MarkdownCommand::InsertImage {
            url: "https://picsum.photos/200/300".to_string(),
        };
        apply_markdown_command(&mut snapshot, &command).unwrap();
        assert_eq!(snapshot.text, "![](https://picsum.photos/200/300)");
    }

    #[test]
    fn table_goes_below_current_line() {
        let mut snapshot = snapshot_with("intro", Selection::cursor(2));
        apply_markdown_command(&mut snapshot, &MarkdownCommand::InsertTable).unwrap();
        assert_eq!(snapshot.text, format!("intro\n\n{TABLE_TEMPLATE}"));
        assert_eq!(&snapshot.text[snapshot.selection.start..][..8], "Column 1");
    }

    #[test]
    fn table_in_empty_document_has_no_leading_blank_line() {
        let mut snapshot = EditorSnapshot::new(String::new());
        apply_markdown_command(&mut snapshot, &MarkdownCommand::InsertTable).unwrap();
        assert_eq!(snapshot.text, TABLE_TEMPLATE);
    }

    #[test]
    fn frontmatter_is_inserted_once() {
        let mut snapshot = snapshot_with("# Note", Selection::cursor(6));
        let command = MarkdownCommand::InsertFrontmatter;
        assert!(apply_markdown_command(&mut snapshot, &command).unwrap());
        assert_eq!(snapshot.text, "---\ntitle: \n---\n# Note");
        assert!(!apply_markdown_command(&mut snapshot, &command).unwrap());
    }

    #[test]
    fn continues_unordered_list() {
        let mut snapshot = EditorSnapshot::new("- item".to_string());
        assert!(apply_markdown_command(&mut snapshot, &MarkdownCommand::ContinueBlock).unwrap());
        assert_eq!(snapshot.text, "- item\n- ");
    }

    #[test]
    fn continues_ordered_list_with_next_number() {
        let mut snapshot = EditorSnapshot::new("1. one".to_string());
        apply_markdown_command(&mut snapshot, &MarkdownCommand::ContinueBlock).unwrap();
        assert_eq!(snapshot.text, "1. one\n2. ");
    }

    #[test]
    fn empty_list_item_ends_the_list() {
        let mut snapshot = EditorSnapshot::new("- ".to_string());
        apply_markdown_command(&mut snapshot, &MarkdownCommand::ContinueBlock).unwrap();
        assert_eq!(snapshot.text, "- \n");
    }

    #[test]
    fn indents_and_outdents_block() {
        let mut snapshot = snapshot_with("a\nb", Selection::new(0, 3));
        apply_markdown_command(&mut snapshot, &MarkdownCommand::Indent).unwrap();
        assert_eq!(snapshot.text, "    a\n    b");

        snapshot.set_selection(Selection::new(0, snapshot.text.len()));
        apply_markdown_command(&mut snapshot, &MarkdownCommand::Outdent).unwrap();
        assert_eq!(snapshot.text, "a\nb");
    }

    #[test]
    fn converts_between_utf16_and_bytes() {
        let text = "aé😀b";
        assert_eq!(utf16_to_byte_idx(text, 0), 0);
        assert_eq!(utf16_to_byte_idx(text, 2), 3);
        assert_eq!(utf16_to_byte_idx(text, 4), 7);
        assert_eq!(utf16_to_byte_idx(text, 99), text.len());
        assert_eq!(byte_idx_to_utf16(text, 7), 4);
        assert_eq!(byte_idx_to_utf16(text, text.len()), 5);
    }
}
