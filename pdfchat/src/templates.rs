use html_escape::encode_text;

use crate::memory::Message;

pub const CSS: &str = r#"<style>
.chat-message {
    padding: 1.5rem; border-radius: 0.5rem; margin-bottom: 1rem; display: flex
}
.chat-message.user {
    background-color: #2b313e
}
.chat-message.bot {
    background-color: #475063
}
.chat-message .avatar {
  width: 20%;
}
.chat-message .avatar span {
  font-size: 2.5rem;
}
.chat-message .message {
  width: 80%;
  padding: 0 1.5rem;
  color: #fff;
  white-space: pre-wrap;
}
</style>"#;

pub const BOT_TEMPLATE: &str = r#"<div class="chat-message bot">
    <div class="avatar">
        <span>🤖</span>
    </div>
    <div class="message">{{MSG}}</div>
</div>"#;

pub const USER_TEMPLATE: &str = r#"<div class="chat-message user">
    <div class="avatar">
        <span>🧑</span>
    </div>
    <div class="message">{{MSG}}</div>
</div>"#;

/// Renders the conversation, alternating user and bot bubbles by position.
#[must_use]
pub fn render_history(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let template = if i % 2 == 0 {
                USER_TEMPLATE
            } else {
                BOT_TEMPLATE
            };

            template.replace("{{MSG}}", &encode_text(&message.content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn render_terminal(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let speaker = if i % 2 == 0 { "you" } else { "bot" };

            format!("[{speaker}] {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_user_and_bot() {
        let messages = vec![
            Message::human("q1"),
            Message::ai("a1"),
            Message::human("q2"),
        ];

        let html = render_history(&messages);
        let bubbles = html.matches("chat-message user").count();

        assert_eq!(bubbles, 2);
        assert_eq!(html.matches("chat-message bot").count(), 1);
        assert!(html.find("q1").unwrap() < html.find("a1").unwrap());
        assert!(!html.contains("{{MSG}}"));
    }

    #[test]
    fn escapes_message_content() {
        let html = render_history(&[Message::human("<script>alert(1)</script>")]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn renders_terminal_transcript() {
        let transcript = render_terminal(&[Message::human("hi"), Message::ai("hello")]);

        assert_eq!(transcript, "[you] hi\n[bot] hello");
    }
}
