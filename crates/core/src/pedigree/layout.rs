//! Screen geometry for ancestor trees.
//!
//! Every slot gets a box computed from its position alone, whether or not an
//! animal is known there, so a renderer can keep per-slot state across
//! rebuilds. Generations run along the main axis; within a generation each
//! slot is centred on the `2^(L - level)` leaf rows it spans.

use serde::{Deserialize, Serialize};

use crate::types::Position;

use super::tree::{father_of, level_of, mother_of, slot_of, PedigreeTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Root on the left, ancestors to the right.
    #[default]
    LeftToRight,
    /// Root on top, ancestors below.
    TopToBottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
    pub orientation: Orientation,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 160.0,
            node_height: 56.0,
            horizontal_gap: 48.0,
            vertical_gap: 16.0,
            orientation: Orientation::LeftToRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Box of one tree slot, top-left anchored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBox {
    pub position: Position,
    pub level: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub populated: bool,
}

impl NodeBox {
    fn anchor_out(&self, orientation: Orientation) -> Point {
        match orientation {
            Orientation::LeftToRight => Point {
                x: self.x + self.width,
                y: self.y + self.height / 2.0,
            },
            Orientation::TopToBottom => Point {
                x: self.x + self.width / 2.0,
                y: self.y + self.height,
            },
        }
    }

    fn anchor_in(&self, orientation: Orientation) -> Point {
        match orientation {
            Orientation::LeftToRight => Point {
                x: self.x,
                y: self.y + self.height / 2.0,
            },
            Orientation::TopToBottom => Point {
                x: self.x + self.width / 2.0,
                y: self.y,
            },
        }
    }
}

/// Line from an animal to one of its parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Position,
    pub to: Position,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    pub boxes: Vec<NodeBox>,
    pub edges: Vec<Edge>,
    pub width: f64,
    pub height: f64,
}

impl TreeLayout {
    pub fn node_box(&self, position: Position) -> Option<&NodeBox> {
        position.checked_sub(1).and_then(|i| self.boxes.get(i))
    }
}

/// Lay out every slot of `tree`, with edges between populated nodes only.
pub fn layout(tree: &PedigreeTree, config: &LayoutConfig) -> TreeLayout {
    let levels = tree.max_level();
    let leaves = (1usize << levels) as f64;

    let (main_size, main_gap, cross_size, cross_gap) = match config.orientation {
        Orientation::LeftToRight => (
            config.node_width,
            config.horizontal_gap,
            config.node_height,
            config.vertical_gap,
        ),
        Orientation::TopToBottom => (
            config.node_height,
            config.vertical_gap,
            config.node_width,
            config.horizontal_gap,
        ),
    };
    let main_pitch = main_size + main_gap;
    let cross_pitch = cross_size + cross_gap;

    let boxes: Vec<NodeBox> = (1..=tree.len())
        .map(|position| {
            let level = level_of(position);
            let span = (1usize << (levels - level)) as f64;
            let cross_start = slot_of(position) as f64 * span * cross_pitch;
            let cross_center = cross_start + (span * cross_pitch - cross_gap) / 2.0;
            let main = level as f64 * main_pitch;
            let cross = cross_center - cross_size / 2.0;
            let (x, y) = match config.orientation {
                Orientation::LeftToRight => (main, cross),
                Orientation::TopToBottom => (cross, main),
            };
            NodeBox {
                position,
                level,
                x,
                y,
                width: config.node_width,
                height: config.node_height,
                populated: tree.get(position).is_some(),
            }
        })
        .collect();

    let mut edges = Vec::new();
    for node in tree.populated() {
        for parent in [father_of(node.position), mother_of(node.position)] {
            if tree.get(parent).is_none() {
                continue;
            }
            let from = &boxes[node.position - 1];
            let to = &boxes[parent - 1];
            edges.push(Edge {
                from: node.position,
                to: parent,
                start: from.anchor_out(config.orientation),
                end: to.anchor_in(config.orientation),
            });
        }
    }

    let main_extent = (levels + 1) as f64 * main_pitch - main_gap;
    let cross_extent = leaves * cross_pitch - cross_gap;
    let (width, height) = match config.orientation {
        Orientation::LeftToRight => (main_extent, cross_extent),
        Orientation::TopToBottom => (cross_extent, main_extent),
    };

    TreeLayout {
        boxes,
        edges,
        width,
        height,
    }
}
