//! Interpreter configuration.

use crate::MAX_EVAL_DEPTH;

/// How `class` expressions reach the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassStrategy {
    /// Classes evaluate to class values; applying one builds an object
    #[default]
    Inline,
    /// Programs go through [`desugar_classes`](crate::desugar::desugar_classes) first,
    /// so the evaluator never sees a `class` node
    Desugar,
}

/// How `let` expressions are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetMode {
    /// Evaluate `(let ((x e) ...) body ...)` as `((lambda (x ...) body ...) e ...)`
    #[default]
    Desugar,
    /// Fail with an "unsupported" error
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Maximum nesting of evaluation steps before failing
    pub max_depth: usize,
    pub class_strategy: ClassStrategy,
    pub let_mode: LetMode,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_depth: MAX_EVAL_DEPTH,
            class_strategy: ClassStrategy::default(),
            let_mode: LetMode::default(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_class_strategy(mut self, class_strategy: ClassStrategy) -> Self {
        self.class_strategy = class_strategy;
        self
    }

    pub fn with_let_mode(mut self, let_mode: LetMode) -> Self {
        self.let_mode = let_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_depth, MAX_EVAL_DEPTH);
        assert_eq!(config.class_strategy, ClassStrategy::Inline);
        assert_eq!(config.let_mode, LetMode::Desugar);

        let config = InterpreterConfig::default()
            .with_max_depth(8)
            .with_class_strategy(ClassStrategy::Desugar)
            .with_let_mode(LetMode::Reject);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.class_strategy, ClassStrategy::Desugar);
        assert_eq!(config.let_mode, LetMode::Reject);
    }
}
