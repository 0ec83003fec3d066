use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Share of the shorter surface side used as the ring radius.
const RADIUS_FACTOR: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, to: Point, t: f64) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Ring layout of the mesh. Holds only the geometry inputs, every position is
/// recomputed on demand, and a resize just builds a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    node_count: usize,
    width: f64,
    height: f64,
}

impl Topology {
    pub fn new(node_count: usize, width: f64, height: f64) -> Self {
        Self {
            node_count,
            width,
            height,
        }
    }

    pub fn resized(&self, width: f64, height: f64) -> Self {
        Self::new(self.node_count, width, height)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn radius(&self) -> f64 {
        self.width.min(self.height) * RADIUS_FACTOR
    }

    pub fn position(&self, node: usize) -> Point {
        let angle = (node as f64 / self.node_count as f64) * PI * 2.0;
        let c = self.center();
        let r = self.radius();
        Point::new(c.x + angle.cos() * r, c.y + angle.sin() * r)
    }

    pub fn positions(&self) -> Vec<Point> {
        (0..self.node_count).map(|i| self.position(i)).collect()
    }

    /// Every unordered node pair, `(i, j)` with `i < j`.
    pub fn all_edges(&self) -> Vec<(usize, usize)> {
        let n = self.node_count;
        let mut edges = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                edges.push((i, j));
            }
        }
        edges
    }
}
