#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn human(content: &str) -> Self {
        Self {
            role: Role::Human,
            content: content.to_string(),
        }
    }

    #[must_use]
    pub fn ai(content: &str) -> Self {
        Self {
            role: Role::Ai,
            content: content.to_string(),
        }
    }
}

/// Keeps every exchanged message, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ConversationBufferMemory {
    messages: Vec<Message>,
}

impl ConversationBufferMemory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn save_context(&mut self, question: &str, answer: &str) {
        self.messages.push(Message::human(question));
        self.messages.push(Message::ai(answer));
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn buffer_as_str(&self) -> String {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::Human => format!("Human: {}", m.content),
                Role::Ai => format!("AI: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_pairs_in_order() {
        let mut memory = ConversationBufferMemory::new();
        memory.save_context("hi", "hello");
        memory.save_context("how are you?", "fine");

        assert_eq!(
            memory.messages(),
            &[
                Message::human("hi"),
                Message::ai("hello"),
                Message::human("how are you?"),
                Message::ai("fine"),
            ]
        );
        assert_eq!(
            memory.buffer_as_str(),
            "Human: hi\nAI: hello\nHuman: how are you?\nAI: fine"
        );

        memory.clear();
        assert!(memory.is_empty());
    }
}
