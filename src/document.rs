//! Strict data model of a clock tree document
//!
//! These types mirror the schema and are meant for collaborators that build,
//! edit or re-serialize documents. Validation itself never goes through them:
//! it works on the raw parsed value so that malformed input can still be
//! diagnosed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockTreeDocument {
    pub tree: Tree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tree {
    pub id: String,
    pub schema_version: String,
    pub elements: Vec<Element>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub align: String,
    pub text: String,
}

/// Element kinds accepted by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    FixedSource,
    EditableValue,
    Multiplier,
    Multiplexor,
    DiscreteValuesSource,
    Divider,
    VariableSource,
    DistinctFrequencieOscillator,
    RectangularShape,
    FractionalValue,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitText {
    MHz,
    KHz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub text: UnitText,
    pub factor: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FracDivisor {
    pub base: f64,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleInput {
    pub available: bool,
    pub description: String,
    #[serde(rename = "input_Id")]
    pub input_id: String,
    pub label: String,
    pub from: String,
}

impl PossibleInput {
    /// Transition target a multiplexor must route this input to.
    pub fn target_name(&self) -> String {
        format!("{}__{}_input", self.input_id, self.from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Element {
    pub id: String,
    pub name: String,
    pub position: Point,
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub label: Label,
    pub default: DefaultValue,
    pub size: Size,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "outputTargets",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_targets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(rename = "isTrustZone", default, skip_serializing_if = "Option::is_none")]
    pub is_trust_zone: Option<bool>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "outOfRange", default, skip_serializing_if = "Option::is_none")]
    pub out_of_range: Option<bool>,
    #[serde(rename = "fracDivisor", default, skip_serializing_if = "Option::is_none")]
    pub frac_divisor: Option<FracDivisor>,
    #[serde(
        rename = "multiplicatorFactor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub multiplicator_factor: Option<Vec<Value>>,
    #[serde(
        rename = "possible_Input",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub possible_inputs: Option<Vec<PossibleInput>>,
}

/// `targetTaskId` is either one reference or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetTaskId {
    One(String),
    Many(Vec<String>),
}

impl TargetTaskId {
    pub fn as_slice(&self) -> &[String] {
        match self {
            TargetTaskId::One(target) => std::slice::from_ref(target),
            TargetTaskId::Many(targets) => targets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPointKind {
    Linear,
    Bezier,
    Arc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPoint {
    pub kind: RoutingPointKind,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "pointIndex")]
    pub point_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transition {
    pub id: String,
    #[serde(rename = "sourceTaskId")]
    pub source_task_id: String,
    #[serde(rename = "targetTaskId")]
    pub target_task_id: TargetTaskId,
    #[serde(rename = "isVirtual")]
    pub is_virtual: bool,
    #[serde(
        rename = "transitionRoutingPoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub routing_points: Option<Vec<RoutingPoint>>,
}

impl ClockTreeDocument {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.tree.elements.iter().find(|element| element.id == id)
    }

    /// Add one transition from `multiplexor_id` to every target its inputs
    /// declare that no existing transition already covers.
    ///
    /// Returns the number of targets added. This is the structural fix for
    /// "missing outgoing transition" diagnostics.
    pub fn complete_multiplexor_fan_out(&mut self, multiplexor_id: &str) -> usize {
        let Some(inputs) = self
            .element(multiplexor_id)
            .filter(|element| element.kind == ElementType::Multiplexor)
            .and_then(|element| element.possible_inputs.clone())
        else {
            return 0;
        };

        let existing: Vec<&String> = self
            .tree
            .transitions
            .iter()
            .filter(|transition| transition.source_task_id == multiplexor_id)
            .flat_map(|transition| transition.target_task_id.as_slice())
            .collect();

        let mut missing: Vec<String> = Vec::new();
        for target in inputs.iter().map(PossibleInput::target_name) {
            if !existing.contains(&&target) && !missing.contains(&target) {
                missing.push(target);
            }
        }
        if missing.is_empty() {
            return 0;
        }

        let added = missing.len();
        self.tree.transitions.push(Transition {
            id: format!("{}_fan_out_{}", multiplexor_id, self.tree.transitions.len()),
            source_task_id: multiplexor_id.to_string(),
            target_task_id: TargetTaskId::Many(missing),
            is_virtual: false,
            routing_points: None,
        });
        added
    }
}
