//! Selection consistency and the two-step delete confirmation.

use std::time::{Duration, Instant};

/// How long an armed delete waits for its confirming second request
pub const CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Resolve which subject should be selected given the currently visible ids.
///
/// Keeps `current` when it is still visible, otherwise falls back to the
/// first visible id, or to nothing when the list is empty.
pub fn reconcile_selection<'a, I>(visible: I, current: Option<&str>) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut first = None;
    for id in visible {
        if Some(id) == current {
            return Some(id.to_string());
        }
        if first.is_none() {
            first = Some(id);
        }
    }
    first.map(str::to_string)
}

/// Result of asking to delete something
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteRequest {
    /// First request; the target is now armed and waits for a second one
    Armed,
    /// Second request for the armed target inside the window; perform the delete
    Confirmed,
}

/// Click-twice-to-delete state machine.
///
/// The first request arms a target. A second request for the same target
/// within [`CONFIRM_WINDOW`] confirms it. A request for another target re-arms
/// on that target, and an armed target silently disarms once the window passes.
#[derive(Debug, Clone)]
pub struct DeleteConfirmation<T> {
    armed: Option<(T, Instant)>,
    window: Duration,
}

impl<T> Default for DeleteConfirmation<T> {
    fn default() -> Self {
        Self {
            armed: None,
            window: CONFIRM_WINDOW,
        }
    }
}

impl<T: PartialEq> DeleteConfirmation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Duration) -> Self {
        Self { armed: None, window }
    }

    pub fn request(&mut self, target: T, now: Instant) -> DeleteRequest {
        let confirmed = self.is_armed(&target, now);
        if confirmed {
            self.armed = None;
            DeleteRequest::Confirmed
        } else {
            self.armed = Some((target, now));
            DeleteRequest::Armed
        }
    }

    pub fn is_armed(&self, target: &T, now: Instant) -> bool {
        matches!(&self.armed, Some((armed, at)) if armed == target && now.duration_since(*at) < self.window)
    }

    pub fn armed(&self, now: Instant) -> Option<&T> {
        match &self.armed {
            Some((armed, at)) if now.duration_since(*at) < self.window => Some(armed),
            _ => None,
        }
    }

    /// Drop an expired arm. Called on every tick so stale highlights disappear.
    pub fn expire(&mut self, now: Instant) {
        if let Some((_, at)) = &self.armed {
            if now.duration_since(*at) >= self.window {
                self.armed = None;
            }
        }
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_keeps_visible_selection() {
        let visible = ["s1", "s2", "s3"];
        assert_eq!(reconcile_selection(visible, Some("s2")), Some("s2".to_string()));
    }

    #[test]
    fn test_reconcile_falls_back_to_first_visible() {
        let visible = ["s3", "s4"];
        assert_eq!(reconcile_selection(visible, Some("s1")), Some("s3".to_string()));
        assert_eq!(reconcile_selection(visible, None), Some("s3".to_string()));
    }

    #[test]
    fn test_reconcile_empty_list_clears_selection() {
        assert_eq!(reconcile_selection(Vec::<&str>::new(), Some("s1")), None);
    }

    #[test]
    fn test_second_request_within_window_confirms() {
        let start = Instant::now();
        let mut confirm = DeleteConfirmation::new();
        assert_eq!(confirm.request("t-1", start), DeleteRequest::Armed);
        assert_eq!(
            confirm.request("t-1", start + Duration::from_millis(500)),
            DeleteRequest::Confirmed
        );
        assert_eq!(confirm.armed(start), None);
    }

    #[test]
    fn test_request_for_other_target_rearms() {
        let start = Instant::now();
        let mut confirm = DeleteConfirmation::new();
        confirm.request("t-1", start);
        assert_eq!(confirm.request("t-2", start), DeleteRequest::Armed);
        assert!(confirm.is_armed(&"t-2", start));
        assert!(!confirm.is_armed(&"t-1", start));
    }

    #[test]
    fn test_arm_expires_after_window() {
        let start = Instant::now();
        let mut confirm = DeleteConfirmation::new();
        confirm.request("t-1", start);
        let later = start + CONFIRM_WINDOW + Duration::from_millis(1);
        assert_eq!(confirm.request("t-1", later), DeleteRequest::Armed);

        confirm.expire(later + CONFIRM_WINDOW);
        assert_eq!(confirm.armed(later), None);
    }
}
