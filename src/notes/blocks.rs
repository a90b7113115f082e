use serde_json::{json, Value};

/// Maximum characters in one rich-text segment.
pub const MAX_TEXT_LEN: usize = 2000;

/// A note-store block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    BulletedItem(String),
    Paragraph(String),
    Divider,
}

impl Block {
    /// Notion block object. Text longer than `MAX_TEXT_LEN` is split across
    /// several rich-text segments of the same block.
    pub fn to_notion(&self) -> Value {
        match self {
            Block::Heading { level, text } => {
                let kind = format!("heading_{}", (*level).clamp(1, 3));
                json!({
                    "object": "block",
                    "type": kind,
                    kind.as_str(): { "rich_text": rich_text(text) }
                })
            }
            Block::BulletedItem(text) => json!({
                "object": "block",
                "type": "bulleted_list_item",
                "bulleted_list_item": { "rich_text": rich_text(text) }
            }),
            Block::Paragraph(text) => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(text) }
            }),
            Block::Divider => json!({
                "object": "block",
                "type": "divider",
                "divider": {}
            }),
        }
    }
}

fn rich_text(text: &str) -> Vec<Value> {
    chunk_text(text, MAX_TEXT_LEN)
        .into_iter()
        .map(|chunk| json!({ "type": "text", "text": { "content": chunk } }))
        .collect()
}

/// Split `text` into pieces of at most `max` characters.
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Parse summary markdown into blocks.
///
/// Three line shapes are recognised: a line wholly wrapped in `**`
/// (optionally after a bullet marker) is a heading, a line starting with `*`
/// is a bulleted item, anything else is a paragraph. Blank lines are dropped.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for line in markdown.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(text) = heading_text(line) {
            blocks.push(Block::Heading {
                level: 3,
                text: text.to_string(),
            });
        } else if line.starts_with('*') {
            let text = bullet_text(line);
            if !text.is_empty() {
                blocks.push(Block::BulletedItem(text.to_string()));
            }
        } else {
            blocks.push(Block::Paragraph(line.to_string()));
        }
    }
    blocks
}

/// Strip the bullet marker only. A run of asterisks counts as the marker
/// when whitespace follows it; a line opening with inline bold keeps its
/// text intact.
fn bullet_text(line: &str) -> &str {
    let rest = line.trim_start_matches('*');
    if rest.trim().is_empty() {
        return "";
    }
    if rest.starts_with(char::is_whitespace) {
        return rest.trim();
    }
    if line.starts_with("**") {
        return line;
    }
    rest.trim()
}

fn heading_text(line: &str) -> Option<&str> {
    let unbulleted = line
        .strip_prefix("* ")
        .or_else(|| line.strip_prefix("- "))
        .map(str::trim_start)
        .unwrap_or(line);
    let inner = unbulleted.strip_prefix("**")?.strip_suffix("**")?.trim();
    if inner.is_empty() || inner.contains("**") {
        return None;
    }
    Some(inner)
}

/// Blocks appended for one PR: title heading, summary, divider.
pub fn summary_section(title: &str, summary_markdown: &str) -> Vec<Block> {
    let mut blocks = vec![Block::Heading {
        level: 2,
        text: title.to_string(),
    }];
    blocks.extend(markdown_to_blocks(summary_markdown));
    blocks.push(Block::Divider);
    blocks
}
