//! Chat prompt construction.
//!
//! Two prompt shapes are used by the responder:
//!
//! - [`build_prompt`]: a fixed system instruction plus one user message that
//!   embeds the query and the retrieved context lines.
//! - [`history_prompt`]: no context; the user's prior turns followed by the
//!   new message.

use serde::{Deserialize, Serialize};

/// Role of a chat message, serialized in the OpenAI wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One earlier exchange in a conversation: what the user said and what the
/// assistant answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

pub const SYSTEM_INSTRUCTION: &str = "I am going to ask you a question, which I would like you to answer \
based only on the provided context, and not any other information. \
If there is not enough information in the context to answer the question, \
say \"I am not sure\", then try to make a guess. \
Break your answer up into nicely readable paragraphs.";

/// Render context lines as a bracketed, quoted list: `["a", "b"]`.
///
/// The model receives the retrieved lines verbatim in this list form rather
/// than joined prose.
pub fn render_context(context: &[String]) -> String {
    let quoted: Vec<String> = context
        .iter()
        .map(|c| serde_json::to_string(c).unwrap_or_else(|_| format!("\"{}\"", c)))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Build the two-message retrieval prompt for `query`.
pub fn build_prompt(query: &str, context: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(format!(
            "The question is {}. Here is all the context you have:{}",
            query,
            render_context(context)
        )),
    ]
}

/// Build a context-free prompt from the user side of `prior` plus `message`.
///
/// Assistant replies are not replayed to the model.
pub fn history_prompt(message: &str, prior: &[Turn]) -> Vec<ChatMessage> {
    prior
        .iter()
        .map(|turn| ChatMessage::user(turn.user.clone()))
        .chain(std::iter::once(ChatMessage::user(message)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_shape() {
        let msgs = build_prompt(
            "What is the capital of France?",
            &["Paris is the capital of France".to_string()],
        );
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert!(msgs[0].content.contains("I am not sure"));
        assert_eq!(msgs[1].role, Role::User);
        assert_eq!(
            msgs[1].content,
            "The question is What is the capital of France?. \
             Here is all the context you have:[\"Paris is the capital of France\"]"
        );
    }

    #[test]
    fn test_render_context_escapes_quotes() {
        let rendered = render_context(&["say \"hi\"".to_string(), "b".to_string()]);
        assert_eq!(rendered, r#"["say \"hi\"", "b"]"#);
        assert_eq!(render_context(&[]), "[]");
    }

    #[test]
    fn test_history_prompt_keeps_user_turns_only() {
        let prior = vec![
            Turn {
                user: "hi".to_string(),
                assistant: "hello!".to_string(),
            },
            Turn {
                user: "how are you".to_string(),
                assistant: "fine".to_string(),
            },
        ];
        let msgs = history_prompt("bye", &prior);
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "how are you", "bye"]);
        assert!(msgs.iter().all(|m| m.role == Role::User));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
