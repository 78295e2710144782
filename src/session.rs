//! Stateful conversation handle.

use crate::{
    chat::{ChatMessage, ChatProvider},
    error::LLMError,
};

/// A running conversation with one provider.
///
/// Each [`Session::send`] replays the turns so far, so the model sees the
/// whole exchange. History is append-only and only grows by complete turns:
/// a failed send leaves it untouched. There is no size bound.
pub struct Session {
    provider: Box<dyn ChatProvider>,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(provider: Box<dyn ChatProvider>) -> Self {
        Self {
            provider,
            history: Vec::new(),
        }
    }

    /// Sends one user message and waits for the model's raw reply text.
    ///
    /// The text is returned as-is; decoding it is the caller's job.
    pub async fn send(&mut self, message: &str) -> Result<String, LLMError> {
        let user = ChatMessage::user().content(message).build();

        let mut context = Vec::with_capacity(self.history.len() + 1);
        context.extend_from_slice(&self.history);
        context.push(user.clone());

        log::debug!("sending turn {} ({} bytes)", self.turns() + 1, message.len());
        let response = self.provider.chat(&context).await?;
        let text = response
            .text()
            .ok_or_else(|| LLMError::ProviderError("no text in model response".to_string()))?;

        if let Some(usage) = response.usage() {
            log::debug!(
                "turn used {} prompt + {} completion tokens",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        self.history.push(user);
        self.history
            .push(ChatMessage::assistant().content(text.clone()).build());
        Ok(text)
    }

    /// Number of completed turns.
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }
}
