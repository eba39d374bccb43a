//! Refresh failure rule: fires on the transition into an error.

use quotabar_core::ProviderKind;

use super::{Notification, NotificationCategory};

/// Per-provider failure rule state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshFailureNotificationState {
    /// The previous evaluation saw an error.
    pub had_error: bool,
}

/// Evaluates the error left by the latest attempt.
///
/// A persisting error never re-fires; a clean attempt re-arms the rule.
pub fn evaluate(
    provider: ProviderKind,
    previous: Option<&RefreshFailureNotificationState>,
    error: Option<&str>,
    enabled: bool,
) -> (Option<RefreshFailureNotificationState>, Vec<Notification>) {
    if !enabled {
        return (previous.copied(), Vec::new());
    }

    let had_error = previous.is_some_and(|s| s.had_error);
    let fired = match error {
        Some(message) if !had_error => vec![notification(provider, message)],
        _ => Vec::new(),
    };

    let next = RefreshFailureNotificationState {
        had_error: error.is_some(),
    };
    (Some(next), fired)
}

fn notification(provider: ProviderKind, message: &str) -> Notification {
    Notification {
        provider,
        category: NotificationCategory::RefreshFailure,
        title: format!("{} refresh failed", provider.display_name()),
        body: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_transitions_only() {
        let sequence = [None, None, Some("401"), Some("401"), Some("502"), None, Some("timeout")];
        let mut state = None;
        let mut fired_at = Vec::new();

        for (i, error) in sequence.iter().enumerate() {
            let (next, fired) = evaluate(ProviderKind::Claude, state.as_ref(), *error, true);
            state = next;
            if !fired.is_empty() {
                fired_at.push(i);
            }
        }

        assert_eq!(fired_at, vec![2, 6]);
    }

    #[test]
    fn test_body_is_error_message() {
        let (_, fired) = evaluate(ProviderKind::Zai, None, Some("Refresh timed out"), true);
        assert_eq!(fired[0].body, "Refresh timed out");
        assert_eq!(fired[0].category, NotificationCategory::RefreshFailure);
    }

    #[test]
    fn test_disabled_freezes_state() {
        let (next, fired) = evaluate(ProviderKind::Claude, None, Some("boom"), false);
        assert!(fired.is_empty());
        assert!(next.is_none());

        // Re-enabled later, the still-present error counts as a new failure.
        let (next, fired) = evaluate(ProviderKind::Claude, next.as_ref(), Some("boom"), true);
        assert_eq!(fired.len(), 1);
        assert_eq!(next, Some(RefreshFailureNotificationState { had_error: true }));
    }
}
