//! Typed views over a parsed clock tree
//!
//! The graph checker runs on documents that may already have failed schema
//! validation, so these views are lenient: a field that is missing or has the
//! wrong type shows up as `None` instead of aborting construction. Only the
//! two structural facts the checker cannot work without are surfaced as
//! errors or explicit states: the element list and the transitions section.

use std::fmt;

use serde_json::Value;

/// Element `type` that carries routing rules.
pub const MULTIPLEXOR_TYPE: &str = "multiplexor";

/// Identifier of an element or transition as written in the document.
///
/// String ids are kept verbatim; any other JSON value is held as its JSON
/// text. The variant takes part in equality, so `1` and `"1"` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    Text(String),
    Other(String),
}

impl ItemId {
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null => None,
            other => Some(Self::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn id_str(id: Option<&ItemId>) -> &str {
    id.map(ItemId::as_str).unwrap_or_default()
}

/// `tree.elements` is absent or not an array; nothing else can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingElements;

#[derive(Debug, Clone, PartialEq)]
pub struct ClockTree<'a> {
    pub elements: Vec<Element<'a>>,
    pub transitions: TransitionsSection<'a>,
}

/// State of the `tree.transitions` key.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionsSection<'a> {
    /// The key does not exist.
    Missing,
    /// The key exists but does not hold an array.
    NotArray,
    Present(Vec<Transition<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub id: Option<ItemId>,
    pub kind: Option<&'a str>,
    /// `possible_Input`, when present as an array.
    pub possible_inputs: Option<Vec<PossibleInput<'a>>>,
}

impl Element<'_> {
    pub fn is_multiplexor(&self) -> bool {
        self.kind == Some(MULTIPLEXOR_TYPE)
    }

    /// The id as displayed in messages; empty when absent.
    pub fn id_str(&self) -> &str {
        id_str(self.id.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PossibleInput<'a> {
    pub input_id: Option<&'a str>,
    pub from: Option<&'a str>,
}

impl PossibleInput<'_> {
    /// The transition target this input requires: `<input_Id>__<from>_input`.
    pub fn target_name(&self) -> Option<String> {
        Some(format!("{}__{}_input", self.input_id?, self.from?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<'a> {
    pub id: Option<ItemId>,
    pub source_task_id: Option<ItemId>,
    /// `targetTaskId` normalized to a list; non-string entries are `None`.
    pub targets: Vec<Option<&'a str>>,
}

impl<'a> ClockTree<'a> {
    /// Build the view from the document root.
    pub fn from_value(root: &'a Value) -> Result<Self, MissingElements> {
        let tree = root
            .get("tree")
            .and_then(Value::as_object)
            .ok_or(MissingElements)?;

        let elements = tree
            .get("elements")
            .and_then(Value::as_array)
            .ok_or(MissingElements)?
            .iter()
            .map(Element::from_value)
            .collect();

        let transitions = match tree.get("transitions") {
            None => TransitionsSection::Missing,
            Some(Value::Array(items)) => {
                TransitionsSection::Present(items.iter().map(Transition::from_value).collect())
            }
            Some(_) => TransitionsSection::NotArray,
        };

        Ok(Self {
            elements,
            transitions,
        })
    }

    pub fn multiplexors(&self) -> impl Iterator<Item = &Element<'a>> {
        self.elements.iter().filter(|element| element.is_multiplexor())
    }
}

impl<'a> Element<'a> {
    fn from_value(value: &'a Value) -> Self {
        let possible_inputs = value
            .get("possible_Input")
            .and_then(Value::as_array)
            .map(|inputs| inputs.iter().map(PossibleInput::from_value).collect());

        Self {
            id: ItemId::from_value(value.get("id")),
            kind: value.get("type").and_then(Value::as_str),
            possible_inputs,
        }
    }
}

impl<'a> PossibleInput<'a> {
    fn from_value(value: &'a Value) -> Self {
        Self {
            input_id: value.get("input_Id").and_then(Value::as_str),
            from: value.get("from").and_then(Value::as_str),
        }
    }
}

impl<'a> Transition<'a> {
    fn from_value(value: &'a Value) -> Self {
        let targets = match value.get("targetTaskId") {
            Some(Value::Array(items)) => items.iter().map(Value::as_str).collect(),
            Some(single) => vec![single.as_str()],
            None => vec![None],
        };

        Self {
            id: ItemId::from_value(value.get("id")),
            source_task_id: ItemId::from_value(value.get("sourceTaskId")),
            targets,
        }
    }

    pub fn id_str(&self) -> &str {
        id_str(self.id.as_ref())
    }

    pub fn has_source(&self, element_id: Option<&ItemId>) -> bool {
        matches!((&self.source_task_id, element_id), (Some(a), Some(b)) if a == b)
    }
}
