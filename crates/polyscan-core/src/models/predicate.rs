//! Filter expressions sent to the remote collection endpoints.
//!
//! The wire shape is either a leaf `{relation, attribute?, value}` or an
//! and-branch `{connective: "and", propositions: [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::boundary::BoundaryPoint;

/// Leaf relations understood by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Record location falls inside the polygon given as `value`
    GeoPolygon,
    Equals,
    /// Attribute value is one of the values in the `value` array
    In,
    GreaterThanEquals,
    LessThanEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    And,
}

/// Recursive filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Branch {
        connective: Connective,
        propositions: Vec<Predicate>,
    },
    Leaf {
        relation: Relation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        value: Value,
    },
}

impl Predicate {
    /// Records located inside the given boundary
    pub fn within_polygon(points: &[BoundaryPoint]) -> Self {
        Predicate::Leaf {
            relation: Relation::GeoPolygon,
            attribute: None,
            value: serde_json::json!(points),
        }
    }

    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(Relation::Equals, attribute, value)
    }

    pub fn one_of(attribute: impl Into<String>, values: Vec<Value>) -> Self {
        Self::leaf(Relation::In, attribute, Value::Array(values))
    }

    pub fn at_least(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(Relation::GreaterThanEquals, attribute, value)
    }

    pub fn at_most(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(Relation::LessThanEquals, attribute, value)
    }

    fn leaf(relation: Relation, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Leaf {
            relation,
            attribute: Some(attribute.into()),
            value: value.into(),
        }
    }

    /// Conjunction of the given predicates. A single predicate is returned
    /// as-is and nested and-branches are flattened.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut propositions = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Branch { connective: Connective::And, propositions: inner } => {
                    propositions.extend(inner)
                }
                leaf => propositions.push(leaf),
            }
        }

        if propositions.len() == 1 {
            if let Some(only) = propositions.pop() {
                return only;
            }
        }
        Predicate::Branch { connective: Connective::And, propositions }
    }

    /// Whether any leaf of the tree is a spatial filter
    pub fn references_spatial_filter(&self) -> bool {
        match self {
            Predicate::Leaf { relation, .. } => *relation == Relation::GeoPolygon,
            Predicate::Branch { propositions, .. } => {
                propositions.iter().any(Predicate::references_spatial_filter)
            }
        }
    }
}

/// Shorthand attribute constraint used by attribute-filtered retrieval
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeFilter {
    Min(Value),
    Max(Value),
    Between { min: Value, max: Value },
    Exact(Value),
}

impl AttributeFilter {
    /// Interpret a JSON value: objects with `min` and/or `max` become range
    /// constraints, anything else is an exact match.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            match (map.get("min"), map.get("max")) {
                (Some(min), Some(max)) => {
                    return AttributeFilter::Between { min: min.clone(), max: max.clone() }
                }
                (Some(min), None) => return AttributeFilter::Min(min.clone()),
                (None, Some(max)) => return AttributeFilter::Max(max.clone()),
                (None, None) => {}
            }
        }
        AttributeFilter::Exact(value)
    }

    pub fn into_predicates(self, attribute: &str) -> Vec<Predicate> {
        match self {
            AttributeFilter::Min(min) => vec![Predicate::at_least(attribute, min)],
            AttributeFilter::Max(max) => vec![Predicate::at_most(attribute, max)],
            AttributeFilter::Between { min, max } => {
                vec![Predicate::at_least(attribute, min), Predicate::at_most(attribute, max)]
            }
            AttributeFilter::Exact(value) => vec![Predicate::equals(attribute, value)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Vec<BoundaryPoint> {
        vec![
            BoundaryPoint::new(40.0, -75.0),
            BoundaryPoint::new(40.0, -74.9),
            BoundaryPoint::new(40.1, -74.9),
            BoundaryPoint::new(40.0, -75.0),
        ]
    }

    #[test]
    fn test_leaf_wire_shape() {
        let predicate = Predicate::within_polygon(&square()[..1]);
        assert_eq!(
            serde_json::to_value(&predicate).unwrap(),
            json!({"relation": "geo_polygon", "value": [{"lat": 40.0, "lon": -75.0}]})
        );
    }

    #[test]
    fn test_branch_wire_shape() {
        let predicate = Predicate::and([
            Predicate::within_polygon(&square()),
            Predicate::equals("estimated_head_of_family", true),
        ]);
        let value = serde_json::to_value(&predicate).unwrap();
        assert_eq!(value["connective"], "and");
        assert_eq!(value["propositions"][1]["relation"], "equals");
        assert_eq!(value["propositions"][1]["attribute"], "estimated_head_of_family");
        assert_eq!(value["propositions"][1]["value"], true);

        let parsed: Predicate = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, predicate);
    }

    #[test]
    fn test_and_flattens_and_unwraps() {
        let single = Predicate::and([Predicate::equals("a", 1)]);
        assert_eq!(single, Predicate::equals("a", 1));

        let nested = Predicate::and([
            Predicate::and([Predicate::equals("a", 1), Predicate::equals("b", 2)]),
            Predicate::equals("c", 3),
        ]);
        match nested {
            Predicate::Branch { propositions, .. } => assert_eq!(propositions.len(), 3),
            Predicate::Leaf { .. } => panic!("expected a branch"),
        }
    }

    #[test]
    fn test_references_spatial_filter() {
        assert!(Predicate::within_polygon(&square()).references_spatial_filter());
        assert!(!Predicate::one_of("sic_code_ids", vec![json!("581208")])
            .references_spatial_filter());
        let mixed = Predicate::and([
            Predicate::equals("a", 1),
            Predicate::within_polygon(&square()),
        ]);
        assert!(mixed.references_spatial_filter());
    }

    #[test]
    fn test_attribute_filter_shorthand() {
        let min = AttributeFilter::from_value(json!({"min": 100000}));
        assert_eq!(min, AttributeFilter::Min(json!(100000)));

        let both = AttributeFilter::from_value(json!({"min": 1, "max": 5}));
        let predicates = both.into_predicates("family.estimated_income_range");
        assert_eq!(predicates.len(), 2);
        assert_eq!(
            serde_json::to_value(&predicates[1]).unwrap()["relation"],
            "less_than_equals"
        );

        let exact = AttributeFilter::from_value(json!("Y"));
        assert_eq!(exact.into_predicates("homeowner")[0], Predicate::equals("homeowner", "Y"));
    }
}
