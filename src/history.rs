//! Linear undo/redo history of live-set mutations.

use crate::model::{ContourRegion, Keypoint};

/// What an action was applied to. Targets are stored whole so replaying an
/// action restores the exact same member.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Keypoint(Keypoint),
    Contour(ContourRegion),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Add(Target),
    Remove(Target),
}

impl Action {
    pub fn target(&self) -> &Target {
        match self {
            Action::Add(t) | Action::Remove(t) => t,
        }
    }
}

/// Two LIFO stacks. `push` drops the redo branch; `undo`/`redo` only move
/// entries between the stacks.
#[derive(Debug, Clone)]
pub struct UndoRedoLog<A> {
    undo_stack: Vec<A>,
    redo_stack: Vec<A>,
}

impl<A> Default for UndoRedoLog<A> {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
}

impl<A> UndoRedoLog<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: A) {
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    /// Moves the newest action to the redo stack and returns it, or `None`
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&A> {
        let action = self.undo_stack.pop()?;
        self.redo_stack.push(action);
        self.redo_stack.last()
    }

    pub fn redo(&mut self) -> Option<&A> {
        let action = self.redo_stack.pop()?;
        self.undo_stack.push(action);
        self.undo_stack.last()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_clears_redo_branch() {
        let mut log = UndoRedoLog::new();
        log.push(1);
        log.push(2);
        assert_eq!(log.undo(), Some(&2));
        assert!(log.can_redo());
        log.push(3);
        assert!(!log.can_redo());
        assert_eq!(log.undo_len(), 2);
    }

    #[test]
    fn undo_and_redo_only_move_entries() {
        let mut log = UndoRedoLog::new();
        log.push('a');
        log.push('b');
        assert_eq!(log.undo(), Some(&'b'));
        assert_eq!(log.undo(), Some(&'a'));
        assert_eq!(log.undo(), None);
        assert_eq!(log.redo_len(), 2);
        assert_eq!(log.redo(), Some(&'a'));
        assert_eq!(log.redo(), Some(&'b'));
        assert_eq!(log.redo(), None);
        assert_eq!((log.undo_len(), log.redo_len()), (2, 0));
    }
}
