//! 消息规范化：将与厂商无关的请求整理为统一的对话序列。
//!
//! Message normalizer (vendor-neutral half).
//!
//! Produces the system prompt and the ordered turn list every driver starts
//! from. Drivers then render those turns into their own wire format via
//! [`crate::drivers::ProviderDriver::to_vendor_messages`].

use std::collections::{HashMap, VecDeque};

use crate::structured::with_structured_output;
use crate::types::{Message, ProviderRequest};

/// Sent when a vendor requires at least one user turn and none exists.
pub const SENTINEL_USER_TURN: &str = "Hello";

/// How a driver accepts the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptMode {
    /// Vendor has a first-class system field or role.
    Native,
    /// Vendor lacks a system role; the prompt becomes the first user turn.
    FirstUserTurn,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConversation {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

/// Normalize a request into a system prompt and an ordered turn list.
///
/// Structured-output instructions are appended to the system prompt here,
/// before the system prompt is (possibly) moved into the first user turn.
pub fn normalize(request: &ProviderRequest, mode: SystemPromptMode) -> NormalizedConversation {
    let base_prompt = request
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut system = match &request.response_format {
        Some(format) => Some(with_structured_output(base_prompt, format)),
        None => base_prompt.map(str::to_string),
    };

    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(context) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
        messages.push(Message::user(context));
    }
    messages.extend(request.messages.iter().cloned());

    if mode == SystemPromptMode::FirstUserTurn {
        if let Some(prompt) = system.take() {
            messages.insert(0, Message::user(prompt));
        }
        if messages.is_empty() {
            messages.push(Message::user(SENTINEL_USER_TURN));
        }
    }

    NormalizedConversation { system, messages }
}

/// Request-scoped generator of tool-use correlation ids.
///
/// Ids are unique within one request: a per-request random tag plus a
/// monotonic counter. Invocation ids are queued per function name so that a
/// later result turn for the same function reuses the matching id.
#[derive(Debug)]
pub struct CallIdGenerator {
    prefix: String,
    tag: String,
    counter: u64,
    pending: HashMap<String, VecDeque<String>>,
}

impl CallIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        Self {
            prefix: prefix.into(),
            tag: tag[..8].to_string(),
            counter: 0,
            pending: HashMap::new(),
        }
    }

    /// A fresh id, never handed out before by this generator.
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}_{}_{}", self.prefix, self.tag, self.counter)
    }

    /// Id for a historical invocation of `name`; remembered for its result.
    pub fn invocation_id(&mut self, name: &str) -> String {
        let id = self.next_id();
        self.pending
            .entry(name.to_string())
            .or_default()
            .push_back(id.clone());
        id
    }

    /// Id for a historical result of `name`, pairing with the oldest
    /// unmatched invocation when there is one.
    pub fn result_id(&mut self, name: &str) -> String {
        match self.pending.get_mut(name).and_then(VecDeque::pop_front) {
            Some(id) => id,
            None => self.next_id(),
        }
    }
}
