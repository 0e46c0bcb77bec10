//! Graph consistency checks
//!
//! Cross-referential rules over elements and transitions that a JSON Schema
//! cannot express: id uniqueness and multiplexor fan-out. The checks run in a
//! fixed order so the same document always yields the same messages.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::model::{ClockTree, Element, ItemId, Transition, TransitionsSection};

/// Non-greedy: the first `__` separates `input_Id` from `from`.
static TARGET_PATTERN: OnceLock<Regex> = OnceLock::new();

fn target_pattern() -> &'static Regex {
    TARGET_PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)__(.+?)_input$").expect("Failed to compile target pattern regex")
    })
}

/// Outcome of the graph checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphReport {
    pub errors: Vec<String>,
}

impl GraphReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run every graph rule against a parsed document.
pub fn check_graph(document: &Value) -> GraphReport {
    let mut errors = Vec::new();

    let tree = match ClockTree::from_value(document) {
        Ok(tree) => tree,
        Err(_) => {
            errors.push("invalid structure: 'tree.elements' must be an array.".to_string());
            return GraphReport { errors };
        }
    };

    for id in duplicates(tree.elements.iter().map(|e| e.id.as_ref())) {
        errors.push(format!("duplicate element id found: '{}'.", id));
    }

    let transitions = match &tree.transitions {
        TransitionsSection::Missing => {
            errors.push("the 'transitions' section is missing from the JSON.".to_string());
            return GraphReport { errors };
        }
        TransitionsSection::NotArray => {
            errors.push("'tree.transitions' must be an array.".to_string());
            return GraphReport { errors };
        }
        TransitionsSection::Present(transitions) => transitions,
    };

    // Fan-out rules only apply to a graph that has edges.
    if transitions.is_empty() {
        return GraphReport { errors };
    }

    for id in duplicates(transitions.iter().map(|t| t.id.as_ref())) {
        errors.push(format!("duplicate transition id found: '{}'.", id));
    }

    let multiplexors: Vec<&Element<'_>> = tree.multiplexors().collect();

    for transition in transitions {
        for mux in &multiplexors {
            if transition.has_source(mux.id.as_ref()) {
                check_targets(transition, mux, &mut errors);
            }
        }
    }

    for mux in &multiplexors {
        check_fan_out(mux, transitions, &mut errors);
    }

    GraphReport { errors }
}

/// Every id that occurs more than once, each reported once, in order of first repetition.
fn duplicates<'a>(ids: impl Iterator<Item = Option<&'a ItemId>>) -> Vec<&'a ItemId> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut repeated = Vec::new();
    for id in ids.flatten() {
        if !seen.insert(id) && reported.insert(id) {
            repeated.push(id);
        }
    }
    repeated
}

fn check_targets(transition: &Transition<'_>, mux: &Element<'_>, errors: &mut Vec<String>) {
    let transition_id = transition.id_str();
    let mux_id = mux.id_str();

    for (index, target) in transition.targets.iter().enumerate() {
        let Some(target) = target else { continue };

        let Some(captures) = target_pattern().captures(target) else {
            errors.push(format!(
                "transition '{}' targetTaskId index {} does not have the format '<input_Id>__<from>_input'.",
                transition_id, index
            ));
            continue;
        };

        let input_id = &captures[1];
        let from = &captures[2];
        let declared = mux.possible_inputs.iter().flatten().any(|input| {
            input.input_id == Some(input_id) && input.from == Some(from)
        });
        if !declared {
            errors.push(format!(
                "transition '{}' targetTaskId index {} does not match any input_Id/from pair of multiplexor '{}'.",
                transition_id, index, mux_id
            ));
        }
    }
}

/// Outgoing targets of a multiplexor must equal the targets its inputs declare.
fn check_fan_out(mux: &Element<'_>, transitions: &[Transition<'_>], errors: &mut Vec<String>) {
    let Some(inputs) = &mux.possible_inputs else {
        return;
    };
    let mux_id = mux.id_str();

    let expected = ordered_set(inputs.iter().filter_map(|input| input.target_name()));
    let actual = ordered_set(
        transitions
            .iter()
            .filter(|transition| transition.has_source(mux.id.as_ref()))
            .flat_map(|transition| transition.targets.iter().flatten())
            .map(|target| target.to_string()),
    );

    for target in expected.iter().filter(|t| !actual.contains(t)) {
        errors.push(format!(
            "missing outgoing transition: multiplexor '{}' expects a transition to '{}'.",
            mux_id, target
        ));
    }
    for target in actual.iter().filter(|t| !expected.contains(t)) {
        errors.push(format!(
            "unexpected outgoing transition: multiplexor '{}' has a transition to '{}'.",
            mux_id, target
        ));
    }
}

/// De-duplicate while keeping first-seen order.
fn ordered_set(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}
