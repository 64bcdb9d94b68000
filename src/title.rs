use chat_provider::{ChatProvider, ChatRequest, Message, Role};
use conversation_store::ConversationId;

/// Maximum title length in characters before the ellipsis is applied.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title used when a conversation has no user message to derive one from.
pub const PLACEHOLDER_TITLE: &str = "New conversation";

const TITLE_INSTRUCTION: &str = "Generate a concise title of a few words for a conversation \
that begins with the message below. Reply with only the title, without quotes or any other text.";

/// Truncates to [`TITLE_MAX_CHARS`] characters, appending an ellipsis when
/// anything was cut.
#[must_use]
pub fn truncate_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Synchronous fallback title: the first user message, truncated.
#[must_use]
pub fn heuristic_title(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.trim())
        .filter(|content| !content.is_empty())
        .map(truncate_title)
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string())
}

/// Normalizes a model-generated title: trims, strips one layer of surrounding
/// quotes, truncates. Returns `None` when nothing usable remains.
#[must_use]
pub fn clean_model_title(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    for quote in ['"', '\'', '“', '”'] {
        value = value.trim_matches(quote);
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    Some(truncate_title(value))
}

/// A pending model-assisted title upgrade for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRequest {
    pub conversation_id: ConversationId,
    pub model: String,
    pub first_prompt: String,
}

/// Requests a model-generated title for the conversation's first prompt.
///
/// Any failure resolves to `None`: the heuristic title already persisted
/// stays authoritative, nothing is retried, and no error reaches the user.
pub async fn request_title(
    provider: &dyn ChatProvider,
    request: &TitleRequest,
    credential: Option<&str>,
) -> Option<String> {
    let chat = ChatRequest {
        prompt: format!("{TITLE_INSTRUCTION}\n\n{}", request.first_prompt),
        model: request.model.clone(),
        context: Vec::new(),
    };

    match provider.chat(chat, credential).await {
        Ok(reply) => clean_model_title(&reply.response),
        Err(error) => {
            tracing::debug!(%error, conversation = %request.conversation_id, "title upgrade failed, keeping heuristic");
            None
        }
    }
}
