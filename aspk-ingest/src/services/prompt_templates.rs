//! Versioned conversation templates for the captioning service
//!
//! Each use case has one JSONL file under the prompts directory, one
//! `{"role": ..., "content": ...}` message per line. The last message is the
//! one that receives the record's fields through `{name}` placeholders
//! (`{{` and `}}` are literal braces).

use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Template use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Caption from species + observation description
    InitialCaption,
    /// Caption from Watkins structured metadata
    WatkinsCaption,
    /// Polish pass over an existing caption
    Recaption,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [
        PromptKind::InitialCaption,
        PromptKind::WatkinsCaption,
        PromptKind::Recaption,
    ];

    /// File stem under the prompts directory
    pub fn file_stem(self) -> &'static str {
        match self {
            PromptKind::InitialCaption => "new_inaturalist_captions",
            PromptKind::WatkinsCaption => "watkins_captions",
            PromptKind::Recaption => "watkins_pass_2",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    templates: HashMap<PromptKind, Vec<ChatMessage>>,
}

impl PromptLibrary {
    /// Load every template present in `dir`; absent files are skipped
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();

        for kind in PromptKind::ALL {
            let path = dir.join(format!("{}.jsonl", kind.file_stem()));
            if !path.is_file() {
                debug!(path = %path.display(), "Prompt template not present");
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            templates.insert(kind, parse_jsonl(kind.file_stem(), &content)?);
        }

        info!(
            dir = %dir.display(),
            templates = templates.len(),
            "Loaded prompt templates"
        );
        Ok(Self { templates })
    }

    /// Build a library from in-memory templates
    pub fn from_templates(templates: impl IntoIterator<Item = (PromptKind, Vec<ChatMessage>)>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    pub fn has(&self, kind: PromptKind) -> bool {
        self.templates.contains_key(&kind)
    }

    /// Fail unless the `kind` template was loaded
    pub fn require(&self, kind: PromptKind) -> Result<(), TemplateError> {
        if self.has(kind) {
            Ok(())
        } else {
            Err(TemplateError::NotFound {
                name: kind.file_stem().to_string(),
            })
        }
    }

    /// Conversation for `kind` with `fields` filled into the last message
    pub fn conversation(
        &self,
        kind: PromptKind,
        fields: &[(&str, &str)],
    ) -> Result<Vec<ChatMessage>, TemplateError> {
        let mut messages = self
            .templates
            .get(&kind)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                name: kind.file_stem().to_string(),
            })?;

        let last = messages.last_mut().ok_or_else(|| TemplateError::Empty {
            name: kind.file_stem().to_string(),
        })?;
        last.content = fill(&last.content, fields)?;

        Ok(messages)
    }
}

fn parse_jsonl(name: &str, content: &str) -> Result<Vec<ChatMessage>, TemplateError> {
    let mut messages = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let message: ChatMessage =
            serde_json::from_str(line).map_err(|e| TemplateError::Parse {
                name: name.to_string(),
                line: index + 1,
                message: e.to_string(),
            })?;
        messages.push(message);
    }

    if messages.is_empty() {
        return Err(TemplateError::Empty {
            name: name.to_string(),
        });
    }
    Ok(messages)
}

/// Replace `{name}` placeholders with their values
///
/// An unterminated `{` is kept literally.
pub fn fill(template: &str, fields: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        match tail.find('}') {
            Some(end) => {
                let name = &tail[1..end];
                let value = fields
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| TemplateError::MissingField(name.to_string()))?;
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
