//! Symbol-set diff between the baseline and the LTO build.

use tracing::info;

use super::symbols::{BuildArtifact, SymbolSet};
use crate::deadcode::{ItemKind, SizeAnalysis, UnusedItem};

pub const LTO_TOOL: &str = "lto";

/// Drops removed symbols that were most likely inlined rather than dead.
#[derive(Debug, Clone, Default)]
pub struct InlineHeuristic {
    patterns: Vec<String>,
}

impl InlineHeuristic {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn is_likely_inlined(&self, symbol: &str) -> bool {
        self.patterns.iter().any(|p| symbol.contains(p.as_str()))
    }
}

/// `::` marks a method, `(` a free function.
pub fn classify_symbol(name: &str) -> ItemKind {
    if name.contains("::") {
        ItemKind::Method
    } else if name.contains('(') {
        ItemKind::Function
    } else {
        ItemKind::Symbol
    }
}

/// Removed symbols as items, sorted by name.
pub fn removed_items(baseline: &SymbolSet, candidate: &SymbolSet, heuristic: &InlineHeuristic) -> Vec<UnusedItem> {
    let removed: Vec<&str> = baseline.difference(candidate).collect();
    info!(
        baseline = baseline.len(),
        candidate = candidate.len(),
        removed = removed.len(),
        "compared symbol sets"
    );

    removed
        .into_iter()
        .filter(|name| !heuristic.is_likely_inlined(name))
        .map(|name| {
            let kind = classify_symbol(name);
            UnusedItem::new(
                name,
                kind,
                LTO_TOOL,
                format!("unused {} '{}' [detected by LTO]", kind, name),
            )
        })
        .collect()
}

/// Outcome of comparing two artifacts.
#[derive(Debug, Clone)]
pub struct SymbolDiff {
    pub items: Vec<UnusedItem>,
    pub size: SizeAnalysis,
}

impl SymbolDiff {
    pub fn compute(baseline: &BuildArtifact, candidate: &BuildArtifact, heuristic: &InlineHeuristic) -> Self {
        Self {
            items: removed_items(&baseline.symbols, &candidate.symbols, heuristic),
            size: SizeAnalysis::compute(baseline.text_bytes, candidate.text_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn set(names: &[&str]) -> SymbolSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn artifact(names: &[&str], text_bytes: u64) -> BuildArtifact {
        BuildArtifact {
            binary: PathBuf::from("app"),
            text_bytes,
            symbols: set(names),
        }
    }

    #[test]
    fn test_classify_symbol() {
        assert_eq!(classify_symbol("Widget::draw() const"), ItemKind::Method);
        assert_eq!(classify_symbol("unused_function()"), ItemKind::Function);
        assert_eq!(classify_symbol("vtable"), ItemKind::Symbol);
    }

    #[test]
    fn test_one_removed_function() {
        let baseline = artifact(&["main_loop()", "used()", "unused_function()"], 2143);
        let candidate = artifact(&["main_loop()", "used()"], 2011);
        let diff = SymbolDiff::compute(&baseline, &candidate, &InlineHeuristic::default());

        assert_eq!(diff.items.len(), 1);
        assert_eq!(diff.items[0].name, "unused_function()");
        assert_eq!(diff.items[0].kind, ItemKind::Function);
        assert_eq!(
            diff.items[0].message,
            "unused function 'unused_function()' [detected by LTO]"
        );
        assert!(diff.size.reduction_bytes > 0);
    }

    #[test]
    fn test_heuristic_drops_inlined() {
        let baseline = set(&["do_something()", "Engine::unused_method()", "orphan()"]);
        let candidate = set(&[]);
        let heuristic = InlineHeuristic::new(vec!["do_something".to_string()]);
        let items = removed_items(&baseline, &candidate, &heuristic);

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Engine::unused_method()", "orphan()"]);
        assert_eq!(items[0].kind, ItemKind::Method);
    }

    #[test]
    fn test_added_symbols_are_not_reported() {
        let baseline = set(&["a()"]);
        let candidate = set(&["a()", "b()"]);
        assert!(removed_items(&baseline, &candidate, &InlineHeuristic::default()).is_empty());
    }
}
