//! UI-agnostic chat state types
//!
//! Shared between the terminal UI and the one-shot CLI; nothing here depends
//! on a rendering framework. Messages are transient and never persisted.

use serde::{Deserialize, Serialize};

use crate::product::Product;

/// A message in the assistant conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Display path of an image attached by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Products recommended alongside an assistant reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    /// True while the assistant is still working on this message
    #[serde(default)]
    pub loading: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChatRole {
    #[default]
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image,
            ..Default::default()
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Placeholder reply shown while a matching run is in flight
    pub fn pending() -> Self {
        Self {
            role: ChatRole::Assistant,
            loading: true,
            ..Default::default()
        }
    }
}
