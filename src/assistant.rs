/// Shown when the endpoint answers without any reply text.
pub const NO_RESPONSE: &str = "No response received.";
/// Shown in place of a reply when the request fails for any reason.
pub const ERROR_REPLY: &str = "An error occurred. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("a prompt is already waiting for a reply")]
    Busy,
    #[error("prompt is empty")]
    EmptyPrompt,
}

/// The single assistant request the prompt modal can have at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AssistantState {
    #[default]
    Idle,
    Pending,
    Completed(String),
    Failed,
}

impl AssistantState {
    /// Moves to `Pending`. The caller issues the request only on `Ok`.
    pub fn submit(&mut self, prompt: &str) -> Result<(), AssistantError> {
        if self.is_pending() {
            return Err(AssistantError::Busy);
        }
        if prompt.trim().is_empty() {
            return Err(AssistantError::EmptyPrompt);
        }
        *self = AssistantState::Pending;
        Ok(())
    }

    /// Records the outcome of the in-flight request. Outcomes arriving in any
    /// state other than `Pending` are dropped.
    pub fn resolve(&mut self, outcome: Result<Option<String>, String>) {
        if !self.is_pending() {
            return;
        }
        *self = match outcome {
            Ok(Some(text)) if !text.is_empty() => AssistantState::Completed(text),
            Ok(_) => AssistantState::Completed(NO_RESPONSE.to_string()),
            Err(_) => AssistantState::Failed,
        };
    }

    pub fn dismiss(&mut self) {
        if self.reply().is_some() {
            *self = AssistantState::Idle;
        }
    }

    /// Takes the displayed reply for appending and returns to `Idle`.
    pub fn accept(&mut self) -> Option<String> {
        let reply = self.reply()?.to_string();
        *self = AssistantState::Idle;
        Some(reply)
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            AssistantState::Completed(text) => Some(text),
            AssistantState::Failed => Some(ERROR_REPLY),
            AssistantState::Idle | AssistantState::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssistantState::Pending)
    }
}
