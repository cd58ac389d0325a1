//! The calling-context stack.
//!
//! Each frame records what the checker is currently inside of and which
//! effect that context permits. Frames are pushed when the traversal
//! enters a method body, a class's initializer scope, or a function
//! literal, and popped on exit. An empty stack means the traversal is at
//! the top level, outside any executable declaration.

use uivet_ast::{ExprId, MethodId};

use crate::lattice::Effect;
use crate::violation::CheckError;

/// One entry of the calling-context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFrame {
    /// Inside the body of a method or constructor, with its resolved
    /// effect.
    Method { method: MethodId, effect: Effect },
    /// Inside a class's field and static initializers.
    Initializer,
    /// Inside the body of a function literal. The permitted effect is not
    /// stored here: it is re-read from the inference state on every
    /// lookup, because a literal can be promoted while its body is still
    /// being traversed.
    Literal { node: ExprId },
}

/// The stack of contexts the traversal is currently inside.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<ContextFrame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: ContextFrame) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. Popping an empty stack means a traversal
    /// bug, not a program error.
    pub fn pop(&mut self) -> Result<ContextFrame, CheckError> {
        self.frames.pop().ok_or(CheckError::EmptyContextStack)
    }

    pub fn top(&self) -> Option<ContextFrame> {
        self.frames.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = ContextStack::new();
        stack.push(ContextFrame::Initializer);
        stack.push(ContextFrame::Method {
            method: MethodId(3),
            effect: Effect::Ui,
        });
        stack.push(ContextFrame::Literal { node: ExprId(7) });
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.top(), Some(ContextFrame::Literal { node: ExprId(7) }));

        assert_eq!(stack.pop(), Ok(ContextFrame::Literal { node: ExprId(7) }));
        assert_eq!(
            stack.pop(),
            Ok(ContextFrame::Method {
                method: MethodId(3),
                effect: Effect::Ui,
            })
        );
        assert_eq!(stack.pop(), Ok(ContextFrame::Initializer));
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_on_empty_is_an_internal_error() {
        let mut stack = ContextStack::new();
        assert_eq!(stack.pop(), Err(CheckError::EmptyContextStack));
    }
}
