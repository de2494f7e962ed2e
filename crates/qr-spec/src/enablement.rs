use std::collections::BTreeMap;

use crate::engine::{FormEngine, Node};
use crate::path::ItemPath;
use crate::value::AnswerValue;

/// Item path → enabled flag, for every collectible item.
pub type EnablementMap = BTreeMap<String, bool>;

/// Evaluates `enableWhen` for every item against the engine's current answers.
///
/// A disabled group disables everything beneath it, and a disabled question
/// counts as unanswered for the conditions that read it. Passes repeat until
/// no further item becomes disabled; an item disabled in one pass stays
/// disabled, so chains of dependent questions settle.
pub fn resolve_enablement(engine: &FormEngine) -> EnablementMap {
    let mut current = EnablementMap::new();
    loop {
        let mut next = EnablementMap::new();
        walk(engine, engine.nodes(), true, &current, &mut next);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn walk(
    engine: &FormEngine,
    nodes: &[Node],
    parent_enabled: bool,
    previous: &EnablementMap,
    map: &mut EnablementMap,
) {
    for node in nodes {
        let path = node.path(engine.leaves());
        let enabled = parent_enabled
            && is_enabled(previous, path)
            && node
                .rule()
                .holds(|question| enabled_answers(engine, previous, question));
        map.insert(path.as_str().to_string(), enabled);
        if let Node::Group { children, .. } = node {
            walk(engine, children, enabled, previous, map);
        }
    }
}

fn enabled_answers<'a>(
    engine: &'a FormEngine,
    enablement: &EnablementMap,
    link_id: &str,
) -> &'a [AnswerValue] {
    match engine.leaf_for_link_id(link_id) {
        Some(leaf) if is_enabled(enablement, leaf.path()) => leaf.effective_answers(),
        _ => &[],
    }
}

/// Items missing from the map count as enabled.
pub fn is_enabled(map: &EnablementMap, path: &ItemPath) -> bool {
    map.get(path.as_str()).copied().unwrap_or(true)
}
