use crate::field::ScalarField;
use crate::sims::{between, chance, heading, jitter};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};
use vivarium_data::Bounds;

const ROOT_SEGMENTS: usize = 30;
const SEGMENT_LENGTH: f32 = 15.0;

/// Taproot growing down from the surface as a polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub points: Vec<Vec2>,
}

impl Root {
    /// Grows a root of 31 points from `origin`, wandering within half a
    /// radian of straight down.
    pub fn grow(origin: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let mut points = Vec::with_capacity(ROOT_SEGMENTS + 1);
        let mut current = origin;
        let mut angle = FRAC_PI_2;
        points.push(current);
        for _ in 0..ROOT_SEGMENTS {
            angle = (angle + jitter(rng, 0.3)).clamp(FRAC_PI_2 - 0.5, FRAC_PI_2 + 0.5);
            current += heading(angle) * SEGMENT_LENGTH;
            points.push(current);
        }
        Self { points }
    }

    /// Thickness tapering from 15 at the surface to 2 at the tip.
    #[must_use]
    pub fn thickness(&self, index: usize) -> f32 {
        15.0 - 13.0 * index as f32 / self.points.len().max(1) as f32
    }

    /// Closest root point and the distance to it.
    #[must_use]
    pub fn nearest(&self, pos: Vec2) -> Option<(Vec2, f32)> {
        self.points
            .iter()
            .map(|p| (*p, p.distance(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    #[must_use]
    pub fn distance(&self, pos: Vec2) -> f32 {
        self.nearest(pos).map_or(f32::INFINITY, |(_, d)| d)
    }

    #[must_use]
    pub fn middle(&self) -> Vec2 {
        self.points.get(self.points.len() / 2).copied().unwrap_or(Vec2::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypha {
    pub pos: Vec2,
    pub parent: Option<usize>,
}

impl Hypha {
    /// Attachment points sit on the root surface and have no parent.
    #[must_use]
    pub fn on_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Mycorrhizal threads, stored as a parent-indexed tree of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FungalNetwork {
    pub nodes: Vec<Hypha>,
    pub max_nodes: usize,
    frame: u64,
}

impl FungalNetwork {
    /// Attaches on both sides of every other root point from index 5.
    #[must_use]
    pub fn attach(root: &Root, max_nodes: usize) -> Self {
        let mut nodes = Vec::new();
        for (i, p) in root.points.iter().enumerate().skip(5).step_by(2) {
            let offset = root.thickness(i) + 2.0;
            nodes.push(Hypha {
                pos: Vec2::new(p.x - offset, p.y),
                parent: None,
            });
            nodes.push(Hypha {
                pos: Vec2::new(p.x + offset, p.y),
                parent: None,
            });
        }
        Self {
            nodes,
            max_nodes,
            frame: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One growth frame. Returns how many nodes were added.
    pub fn grow(&mut self, root: &Root, moisture: &ScalarField, bounds: Bounds, rng: &mut ChaCha8Rng) -> usize {
        self.frame += 1;
        if self.frame % 3 != 0 || self.nodes.len() >= self.max_nodes || self.nodes.is_empty() {
            return 0;
        }

        let mut grown = 0;
        for _ in 0..8 {
            if grown >= 2 || self.nodes.len() >= self.max_nodes {
                break;
            }
            let count = self.nodes.len();
            let parent_index = if count > 50 && chance(rng, 0.7) {
                // Tips are the newest 30%.
                rng.gen_range((count * 7 / 10)..count)
            } else {
                rng.gen_range(0..count)
            };
            let parent = self.nodes[parent_index];

            let angle = match parent.parent {
                None => {
                    let out = parent.pos - root.middle();
                    out.y.atan2(out.x) + between(rng, -FRAC_PI_3, FRAC_PI_3)
                }
                Some(gp) => {
                    let prev = parent.pos - self.nodes[gp].pos;
                    prev.y.atan2(prev.x) + between(rng, -FRAC_PI_3, FRAC_PI_3)
                }
            };

            let length = (5.0 + root.distance(parent.pos) / 200.0 * 7.0).clamp(5.0, 15.0);
            let tip = parent.pos + heading(angle) * length;

            if root.distance(tip) < 10.0 {
                continue;
            }
            let wet = moisture.sample(tip.x, tip.y);
            if rng.gen::<f32>() > (wet * 0.5 + 0.3).max(0.2) {
                continue;
            }
            if tip.x > 0.0 && tip.x < bounds.width && tip.y > 0.0 && tip.y < bounds.height {
                self.nodes.push(Hypha {
                    pos: tip,
                    parent: Some(parent_index),
                });
                grown += 1;
            }
        }
        grown
    }
}
