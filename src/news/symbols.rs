//! Keyword-based ticker tagging for headline text.

use crate::models::SymbolRule;
use itertools::Itertools;

/// Maps free text to the ticker symbols it mentions.
#[derive(Debug, Clone)]
pub struct SymbolTagger {
    rules: Vec<SymbolRule>,
}

impl SymbolTagger {
    pub fn new(rules: Vec<SymbolRule>) -> Self {
        Self { rules }
    }

    /// Return the symbols mentioned in `text`, one per matching rule.
    ///
    /// A rule matches when its ticker occurs verbatim (case-sensitive) or when
    /// any of its keywords occurs case-insensitively. The result has no
    /// duplicates; its order follows the rule order but carries no meaning.
    pub fn find_symbols(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| {
                text.contains(rule.symbol.as_str())
                    || rule
                        .keywords
                        .iter()
                        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
            })
            .map(|rule| rule.symbol.clone())
            .unique()
            .collect()
    }
}
