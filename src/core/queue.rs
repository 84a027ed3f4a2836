use crate::models::UserId;

/// Ordered candidate snapshot with a cursor
///
/// The snapshot is taken at build time and never mutated, so it doubles as
/// the original order used by `restart`. The cursor only moves forward
/// except on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQueue {
    snapshot: Vec<UserId>,
    cursor: usize,
}

impl SessionQueue {
    /// Build a queue from ranked ids, closest first
    pub fn build(ranked_ids: Vec<UserId>) -> Self {
        Self {
            snapshot: ranked_ids,
            cursor: 0,
        }
    }

    /// Candidate under the cursor, if any
    pub fn current(&self) -> Option<&UserId> {
        self.snapshot.get(self.cursor)
    }

    /// Pop the candidate under the cursor. `None` means exhausted.
    pub fn advance(&mut self) -> Option<UserId> {
        let id = self.snapshot.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(id)
    }

    /// Rewind to the start of the original snapshot and return its head
    pub fn restart(&mut self) -> Option<&UserId> {
        self.cursor = 0;
        self.current()
    }

    /// Advance past every candidate `skip` rejects and return the new current
    pub fn skip_while<F>(&mut self, mut skip: F) -> Option<&UserId>
    where
        F: FnMut(&UserId) -> bool,
    {
        while self.current().is_some_and(|id| skip(id)) {
            self.cursor += 1;
        }
        self.current()
    }

    /// Candidates not yet popped
    pub fn remaining(&self) -> usize {
        self.snapshot.len().saturating_sub(self.cursor)
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}
