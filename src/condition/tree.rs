//! Condition tree and its evaluation.

use crate::matcher::TextMatcher;

/// Searchable text functions of the condition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionFunction {
    SystContains,
    WelcomeContains,
    RegExpInSyst,
    RegExpInWelcome,
}

impl ConditionFunction {
    pub(crate) const ALL: [ConditionFunction; 4] = [
        ConditionFunction::SystContains,
        ConditionFunction::WelcomeContains,
        ConditionFunction::RegExpInSyst,
        ConditionFunction::RegExpInWelcome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConditionFunction::SystContains => "syst_contains",
            ConditionFunction::WelcomeContains => "welcome_contains",
            ConditionFunction::RegExpInSyst => "reg_exp_in_syst",
            ConditionFunction::RegExpInWelcome => "reg_exp_in_welcome",
        }
    }

    pub fn is_regex(self) -> bool {
        matches!(self, ConditionFunction::RegExpInSyst | ConditionFunction::RegExpInWelcome)
    }

    fn searches_syst(self) -> bool {
        matches!(self, ConditionFunction::SystContains | ConditionFunction::RegExpInSyst)
    }
}

/// One node of a compiled condition.
///
/// ```text
/// not (syst_contains("UNIX") or syst_contains("Windows"))
///
///            Not
///             │
///             Or
///           ┌─┴──────────┐
///   Function(Syst "UNIX")  Function(Syst "Windows")
/// ```
#[derive(Debug)]
pub enum Node {
    AlwaysTrue,
    Or(Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Not(Box<Node>),
    /// `matcher` is `None` for an empty search pattern, which always matches.
    Function { function: ConditionFunction, matcher: Option<Box<dyn TextMatcher>> },
}

impl Node {
    /// Evaluate against the welcome banner and the `SYST` reply.
    ///
    /// `Or`/`And` short-circuit: the right operand is not evaluated once the
    /// result is known.
    pub fn evaluate(&self, welcome: &str, syst: &str) -> bool {
        match self {
            Node::AlwaysTrue => true,
            Node::Or(left, right) => left.evaluate(welcome, syst) || right.evaluate(welcome, syst),
            Node::And(left, right) => left.evaluate(welcome, syst) && right.evaluate(welcome, syst),
            Node::Not(operand) => !operand.evaluate(welcome, syst),
            Node::Function { function, matcher } => match matcher {
                None => true,
                Some(matcher) => {
                    let text = if function.searches_syst() { syst } else { welcome };
                    matcher.is_found(text)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counting {
        result: bool,
        calls: Arc<AtomicUsize>,
    }

    impl TextMatcher for Counting {
        fn is_found(&self, _text: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    fn leaf(result: bool, calls: &Arc<AtomicUsize>) -> Box<Node> {
        Box::new(Node::Function {
            function: ConditionFunction::SystContains,
            matcher: Some(Box::new(Counting { result, calls: Arc::clone(calls) })),
        })
    }

    #[test]
    fn or_skips_right_operand_when_left_holds() {
        let right_calls = Arc::new(AtomicUsize::new(0));
        let left_calls = Arc::new(AtomicUsize::new(0));
        let node = Node::Or(leaf(true, &left_calls), leaf(false, &right_calls));
        assert!(node.evaluate("", ""));
        assert_eq!(left_calls.load(Ordering::SeqCst), 1);
        assert_eq!(right_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn and_skips_right_operand_when_left_fails() {
        let right_calls = Arc::new(AtomicUsize::new(0));
        let left_calls = Arc::new(AtomicUsize::new(0));
        let node = Node::And(leaf(false, &left_calls), leaf(true, &right_calls));
        assert!(!node.evaluate("", ""));
        assert_eq!(right_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn function_without_matcher_is_true() {
        let node = Node::Not(Box::new(Node::Function { function: ConditionFunction::RegExpInWelcome, matcher: None }));
        assert!(!node.evaluate("anything", "at all"));
    }
}
