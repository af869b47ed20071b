use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Pending,
    Completed,
    Failed,
}

/// The three disjoint path-membership sets the engine maintains. Every
/// admitted path belongs to exactly one of these at any quiescent moment.
#[derive(Debug, Default)]
pub struct QueueState {
    pub pending: HashSet<String>,
    pub completed: HashSet<String>,
    pub failed: HashSet<String>,
}

impl QueueState {
    pub fn kind_of(&self, path: &str) -> Option<SetKind> {
        if self.pending.contains(path) {
            Some(SetKind::Pending)
        } else if self.completed.contains(path) {
            Some(SetKind::Completed)
        } else if self.failed.contains(path) {
            Some(SetKind::Failed)
        } else {
            None
        }
    }

    fn set_mut(&mut self, kind: SetKind) -> &mut HashSet<String> {
        match kind {
            SetKind::Pending => &mut self.pending,
            SetKind::Completed => &mut self.completed,
            SetKind::Failed => &mut self.failed,
        }
    }

    /// Moves `path` into `target`, removing it from whichever set it
    /// previously belonged to (or inserting fresh if unknown). Returns the
    /// set `path` actually belonged to immediately before this call — observed
    /// and acted on within this single critical section, so callers can
    /// derive count deltas from the real prior membership instead of a value
    /// read under a lock that may since have been released and reacquired.
    /// `None` means `path` was not tracked in any set. A no-op move (already
    /// in `target`) still returns `Some(target)` with no other side effects.
    pub fn move_to(&mut self, path: &str, target: SetKind) -> Option<SetKind> {
        let previous = self.kind_of(path);
        if previous == Some(target) {
            return previous;
        }
        self.pending.remove(path);
        self.completed.remove(path);
        self.failed.remove(path);
        self.set_mut(target).insert(path.to_string());
        previous
    }

    pub fn insert_pending(&mut self, path: &str) {
        self.pending.insert(path.to_string());
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.completed.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_is_exclusive() {
        let mut q = QueueState::default();
        q.insert_pending("a");
        assert_eq!(q.move_to("a", SetKind::Completed), Some(SetKind::Pending));
        assert!(!q.pending.contains("a"));
        assert!(q.completed.contains("a"));
    }

    #[test]
    fn moving_to_same_set_is_a_noop() {
        let mut q = QueueState::default();
        q.insert_pending("a");
        assert_eq!(q.move_to("a", SetKind::Pending), Some(SetKind::Pending));
        assert!(q.pending.contains("a"));
    }

    #[test]
    fn membership_is_exclusive_across_sets() {
        let mut q = QueueState::default();
        q.insert_pending("a");
        q.move_to("a", SetKind::Failed);
        assert_eq!(q.kind_of("a"), Some(SetKind::Failed));
        assert!(!q.pending.contains("a"));
        assert!(!q.completed.contains("a"));
    }

    #[test]
    fn move_to_reports_previous_kind_for_unknown_paths() {
        let mut q = QueueState::default();
        assert_eq!(q.move_to("new", SetKind::Completed), None);
        assert!(q.completed.contains("new"));
    }
}
