use chat_provider::Message;

/// Number of prior messages carried as context with each model request.
pub const CONTEXT_MESSAGES: usize = 3;

/// Derives the sliding context window for the current turn.
///
/// `log` is the session's message log with the just-appended current turn as
/// its final element. Returns the `min(3, prior)` messages immediately
/// preceding the current turn, in original order, excluding it. An empty log,
/// or a log holding only the current turn, yields an empty slice.
#[must_use]
pub fn context_window(log: &[Message]) -> &[Message] {
    let Some(prior) = log.len().checked_sub(1) else {
        return &[];
    };

    let start = prior.saturating_sub(CONTEXT_MESSAGES);
    &log[start..prior]
}

#[cfg(test)]
mod tests {
    use chat_provider::Message;

    use super::{context_window, CONTEXT_MESSAGES};

    fn log_of(len: usize) -> Vec<Message> {
        (0..len).map(|i| Message::user(format!("m{i}"))).collect()
    }

    #[test]
    fn returns_min_three_prior_messages_for_all_log_sizes() {
        for len in 0..10 {
            let log = log_of(len);
            let window = context_window(&log);
            let prior = len.saturating_sub(1);
            assert_eq!(window.len(), prior.min(CONTEXT_MESSAGES), "log length {len}");
        }
    }

    #[test]
    fn excludes_the_current_turn_and_preserves_order() {
        let log = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
            Message::assistant("d"),
            Message::user("current"),
        ];

        let window = context_window(&log);
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "c", "d"]);
    }

    #[test]
    fn first_turn_has_empty_context() {
        let log = vec![Message::user("only")];
        assert!(context_window(&log).is_empty());
        assert!(context_window(&[]).is_empty());
    }
}
