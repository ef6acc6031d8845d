//! The in-memory conversation sent to the model on every turn.
//!
//! Messages are append-only. File contents are injected as system messages
//! headed by a per-file marker, and each normalized path is injected at most
//! once; later writes are appended under a separate "updated" header.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::file_ops::read_text_file;
use crate::paths::absolutize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub fn file_marker(path: &Path) -> String {
    format!("Content of file '{}'", path.display())
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    in_context: HashSet<PathBuf>,
    context_order: Vec<PathBuf>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::new(Role::System, system_prompt)],
            in_context: HashSet::new(),
            context_order: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn files_in_context(&self) -> &[PathBuf] {
        &self.context_order
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.in_context.contains(path)
    }

    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    /// Load `path` into the conversation unless it is already there.
    ///
    /// The file is always read, so a missing file fails even when an older
    /// copy is in context. Returns `true` when a new message was appended.
    pub fn add_file_context(&mut self, path: &Path) -> Result<bool> {
        let path = absolutize(path)?;
        let content = read_text_file(&path)?;
        if self.contains_file(&path) {
            debug!(path = %path.display(), "file already in context");
            return Ok(false);
        }
        self.inject(path, &content);
        Ok(true)
    }

    /// Record a completed write so later turns see the new contents.
    pub fn record_file_write(&mut self, path: &Path, content: &str) {
        self.append_turn(
            Role::Assistant,
            format!("✓ Created/updated file at '{}'", path.display()),
        );
        if self.contains_file(path) {
            self.append_turn(
                Role::System,
                format!("Updated content of file '{}':\n\n{}", path.display(), content),
            );
        } else {
            self.inject(path.to_path_buf(), content);
        }
    }

    fn inject(&mut self, path: PathBuf, content: &str) {
        debug!(path = %path.display(), bytes = content.len(), "injecting file into context");
        self.append_turn(
            Role::System,
            format!("{}:\n\n{}", file_marker(&path), content),
        );
        self.in_context.insert(path.clone());
        self.context_order.push(path);
    }
}
