use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Summarizer-ready document for one merged PR.
#[derive(Debug, Clone, Serialize)]
pub struct LlmPayload {
    pub linked_issues: Vec<IssueEntry>,
    pub metadata: PayloadMetadata,
    pub files: Vec<FileEntry>,
    pub comments: Vec<CommentEntry>,
    /// Present only when at least one comment refers to diff context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_hunks: Option<DiffHunkTable>,
    /// Raw unified diff, only when the changed-file list is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueEntry {
    pub number: u64,
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadMetadata {
    pub title: String,
    pub body: Option<String>,
    pub created_at: String,
    /// RFC 3339 merge timestamp.
    pub merged_at: String,
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEntry {
    pub path: String,
    pub body: String,
    /// Key into the payload's `diff_hunks`; never the raw context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hunk_ref: Option<String>,
}

/// Unique diff contexts keyed by `hunk_N`, numbered in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffHunkTable {
    entries: Vec<(String, String)>,
    by_text: HashMap<String, usize>,
}

impl DiffHunkTable {
    /// Identifier for `text`, assigning the next `hunk_N` if unseen.
    pub fn intern(&mut self, text: &str) -> String {
        if let Some(&index) = self.by_text.get(text) {
            return self.entries[index].0.clone();
        }
        let id = format!("hunk_{}", self.entries.len() + 1);
        self.by_text.insert(text.to_string(), self.entries.len());
        self.entries.push((id.clone(), text.to_string()));
        id
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DiffHunkTable {
    /// A JSON object in assignment order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, text) in &self.entries {
            map.serialize_entry(id, text)?;
        }
        map.end()
    }
}
