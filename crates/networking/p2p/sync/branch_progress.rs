/// Completion status of a single cell in the top two levels of the state trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Unknown,
    Requested,
    Empty,
    AlreadySaved,
    Saved,
}

/// Top-of-trie completion map used for progress estimation and logging. Purely
/// observational: sync correctness never depends on it.
pub struct BranchProgress {
    root: ProgressState,
    children: [ProgressState; 16],
}

impl BranchProgress {
    pub fn new() -> Self {
        Self {
            root: ProgressState::Unknown,
            children: [ProgressState::Unknown; 16],
        }
    }

    pub fn report_synced(&mut self, level: u8, child_idx: i8, state: ProgressState) {
        match level {
            0 => self.root = state,
            1 if (0..16).contains(&child_idx) => self.children[child_idx as usize] = state,
            _ => {}
        }
    }

    /// Percent complete, weighting each completed top-level branch child by 1/16.
    pub fn percent_complete(&self) -> f64 {
        let done = self
            .children
            .iter()
            .filter(|s| matches!(s, ProgressState::Saved | ProgressState::AlreadySaved | ProgressState::Empty))
            .count();
        done as f64 / 16.0 * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for BranchProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn full_branch_is_100_percent() {
        let mut progress = BranchProgress::new();
        for i in 0..16 {
            progress.report_synced(1, i, ProgressState::Saved);
        }
        assert_eq!(progress.percent_complete(), 100.0);
    }

    #[test]
    fn half_branch_is_50_percent() {
        let mut progress = BranchProgress::new();
        for i in 0..8 {
            progress.report_synced(1, i, ProgressState::Saved);
        }
        assert_eq!(progress.percent_complete(), 50.0);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut progress = BranchProgress::new();
        progress.report_synced(1, 20, ProgressState::Saved);
        assert_eq!(progress.percent_complete(), 0.0);
    }
}
