//! History trimming to fit the conversational engine's token budget
//! (spec §4.9): drop oldest non-system messages first; the system
//! message is never dropped.

use crate::models::{ConversationRole as Role, Message};

pub const DEFAULT_TOKEN_BUDGET: usize = 6000;

fn total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(Message::estimated_tokens).sum()
}

/// Trim `messages` so their combined estimated token count fits
/// `budget`, removing the earliest non-system message repeatedly until
/// it fits or nothing droppable remains.
pub fn trim_to_budget(messages: Vec<Message>, budget: usize) -> Vec<Message> {
    let mut trimmed = messages;
    while total_tokens(&trimmed) > budget {
        match trimmed.iter().position(|m| !matches!(m.role, Role::System)) {
            Some(pos) => {
                trimmed.remove(pos);
            }
            None => break,
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_survives_aggressive_trimming() {
        let mut messages = vec![Message::system("schema context")];
        for i in 0..50 {
            messages.push(Message::user(format!("question {i}: {}", "x".repeat(200))));
        }
        let trimmed = trim_to_budget(messages, 100);
        assert!(matches!(trimmed[0].role, Role::System));
        assert!(total_tokens(&trimmed) <= total_tokens(&[trimmed[0].clone()]) + 100);
    }

    #[test]
    fn drops_oldest_non_system_message_first() {
        let messages = vec![
            Message::system("ctx"),
            Message::user("old question"),
            Message::assistant("old answer"),
            Message::user("new question"),
        ];
        let trimmed = trim_to_budget(messages, 8);
        assert_eq!(trimmed.len(), 2);
        assert!(matches!(trimmed[0].role, Role::System));
        assert_eq!(trimmed[1].content, "new question");
    }

    #[test]
    fn under_budget_history_is_untouched() {
        let messages = vec![Message::system("ctx"), Message::user("hi")];
        let trimmed = trim_to_budget(messages.clone(), 6000);
        assert_eq!(trimmed.len(), messages.len());
    }
}
