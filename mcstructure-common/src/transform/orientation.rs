//! Lookup tables describing which block states encode an orientation and how
//! their values move under a rotation or mirror.

use super::Transform;
use crate::block_storage::{Block, Direction, StateValue};

/// How a state value encodes an orientation.
#[derive(Clone, Debug, PartialEq)]
pub enum OrientationEncoding {
    /// Each listed value stands for a direction. Values not listed are left alone.
    Directions(Vec<(StateValue, Direction)>),
    /// Integer sixteenths of a full turn, 0 facing south and counting clockwise
    /// when seen from above.
    Sixteenths,
    /// A horizontal axis name. The two values swap on quarter turns.
    Axis { x: StateValue, z: StateValue },
}

impl OrientationEncoding {
    /// Directions encoded as consecutive integers starting at 0.
    pub fn int_sequence(order: &[Direction]) -> Self {
        Self::Directions(
            order
                .iter()
                .enumerate()
                .map(|(i, d)| (StateValue::Int(i as i32), *d))
                .collect(),
        )
    }

    pub fn named(names: &[(&str, Direction)]) -> Self {
        Self::Directions(
            names
                .iter()
                .map(|(name, d)| (StateValue::from(*name), *d))
                .collect(),
        )
    }

    fn apply(&self, value: &StateValue, t: Transform) -> Option<StateValue> {
        match self {
            Self::Directions(table) => {
                let (_, d) = table.iter().find(|(v, _)| v == value)?;
                let d = t.map_direction(*d);
                table.iter().find(|(_, o)| *o == d).map(|(v, _)| v.clone())
            }
            Self::Sixteenths => match value {
                StateValue::Int(v) => {
                    let v = v.rem_euclid(16);
                    let out = match t {
                        Transform::Rotate(r) => v + 4 * r.quarter_turns() as i32,
                        // Reflecting X swaps east (12) and west (4)
                        Transform::Mirror(super::MirrorAxis::X) => 16 - v,
                        // Reflecting Z swaps north (8) and south (0)
                        Transform::Mirror(super::MirrorAxis::Z) => 24 - v,
                    };
                    Some(StateValue::Int(out.rem_euclid(16)))
                }
                _ => None,
            },
            Self::Axis { x, z } => {
                let swaps = matches!(t, Transform::Rotate(r) if r.quarter_turns() % 2 == 1);
                if !swaps {
                    None
                } else if value == x {
                    Some(z.clone())
                } else if value == z {
                    Some(x.clone())
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrientationRule {
    pub key: String,
    /// Restricts the rule to these block identifiers. `None` applies it to every block.
    pub identifiers: Option<Vec<String>>,
    pub encoding: OrientationEncoding,
}

impl OrientationRule {
    pub fn new(key: impl Into<String>, encoding: OrientationEncoding) -> Self {
        Self {
            key: key.into(),
            identifiers: None,
            encoding,
        }
    }

    pub fn for_identifiers(mut self, identifiers: &[&str]) -> Self {
        self.identifiers = Some(identifiers.iter().map(|s| (*s).to_owned()).collect());
        self
    }

    fn applies_to(&self, block: &Block) -> bool {
        match self.identifiers {
            Some(ref ids) => ids.iter().any(|id| *id == block.identifier),
            None => true,
        }
    }
}

const DIRECTION: [Direction; 4] = [
    Direction::South,
    Direction::West,
    Direction::North,
    Direction::East,
];

const FACING_DIRECTION: [Direction; 6] = [
    Direction::Down,
    Direction::Up,
    Direction::North,
    Direction::South,
    Direction::West,
    Direction::East,
];

const WEIRDO_DIRECTION: [Direction; 4] = [
    Direction::East,
    Direction::West,
    Direction::South,
    Direction::North,
];

const CARDINAL_NAMES: [(&str, Direction); 4] = [
    ("north", Direction::North),
    ("south", Direction::South),
    ("east", Direction::East),
    ("west", Direction::West),
];

const FACING_NAMES: [(&str, Direction); 6] = [
    ("down", Direction::Down),
    ("up", Direction::Up),
    ("north", Direction::North),
    ("south", Direction::South),
    ("east", Direction::East),
    ("west", Direction::West),
];

/// The set of orientation-bearing states a transform rewrites.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationTable {
    rules: Vec<OrientationRule>,
}

impl Default for OrientationTable {
    fn default() -> Self {
        Self::bedrock()
    }
}

impl OrientationTable {
    /// A table that rewrites nothing.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The orientation states used by bedrock edition blocks.
    pub fn bedrock() -> Self {
        Self::empty()
            .with_rule(OrientationRule::new(
                "direction",
                OrientationEncoding::int_sequence(&DIRECTION),
            ))
            .with_rule(OrientationRule::new(
                "facing_direction",
                OrientationEncoding::int_sequence(&FACING_DIRECTION),
            ))
            .with_rule(OrientationRule::new(
                "weirdo_direction",
                OrientationEncoding::int_sequence(&WEIRDO_DIRECTION),
            ))
            .with_rule(OrientationRule::new(
                "minecraft:cardinal_direction",
                OrientationEncoding::named(&CARDINAL_NAMES),
            ))
            .with_rule(OrientationRule::new(
                "minecraft:facing_direction",
                OrientationEncoding::named(&FACING_NAMES),
            ))
            .with_rule(OrientationRule::new(
                "ground_sign_direction",
                OrientationEncoding::Sixteenths,
            ))
            .with_rule(OrientationRule::new(
                "pillar_axis",
                OrientationEncoding::Axis {
                    x: StateValue::from("x"),
                    z: StateValue::from("z"),
                },
            ))
    }

    pub fn with_rule(mut self, rule: OrientationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[OrientationRule] {
        &self.rules
    }

    /// Returns the variant of `block` with its orientation states moved by `t`,
    /// or `None` if no state changes.
    pub fn transform_block(&self, block: &Block, t: Transform) -> Option<Block> {
        let mut out: Option<Block> = None;
        for rule in self.rules.iter().filter(|r| r.applies_to(block)) {
            let value = match block.states.get(&rule.key) {
                Some(v) => v,
                None => continue,
            };
            if let Some(new_value) = rule.encoding.apply(value, t) {
                if &new_value != value {
                    out.get_or_insert_with(|| block.clone())
                        .states
                        .insert(rule.key.clone(), new_value);
                }
            }
        }
        out
    }
}
