//! Radial layout for drawing a compound's interior, plus an explicit cache.
//!
//! The best-connected room sits at the centre. A breadth-first tree from it
//! assigns every other room a wedge proportional to its subtree size, with
//! angles snapped to the eight compass directions. The first entry point
//! found among the hub's children is turned towards the bottom of the canvas.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::debug;

const SNAP_ANGLES: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];
const MARGIN: f64 = 40.0;
const DEFAULT_CAPACITY: usize = 64;

/// Drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn center(&self) -> Point {
        Point {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }

    fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Screen position; `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub type Layout = BTreeMap<String, Point>;

/// Nearest of the eight compass angles, measured around the circle.
fn snap_angle(degrees: f64) -> f64 {
    let degrees = degrees.rem_euclid(360.0);
    let gap = |a: f64| {
        let d = (degrees - a).abs();
        d.min(360.0 - d)
    };
    SNAP_ANGLES
        .iter()
        .copied()
        .min_by(|a, b| gap(*a).total_cmp(&gap(*b)))
        .unwrap_or(0.0)
}

struct Tree {
    children: HashMap<String, Vec<String>>,
}

impl Tree {
    fn kids(&self, node: &str) -> &[String] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn subtree_size(&self, node: &str) -> usize {
        1 + self
            .kids(node)
            .iter()
            .map(|k| self.subtree_size(k))
            .sum::<usize>()
    }
}

fn adjacency(nodes: &BTreeSet<String>, edges: &[(String, String)]) -> HashMap<String, BTreeSet<String>> {
    let mut adj: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (a, b) in edges {
        if a == b || !nodes.contains(a) || !nodes.contains(b) {
            continue;
        }
        adj.entry(a.clone()).or_default().insert(b.clone());
        adj.entry(b.clone()).or_default().insert(a.clone());
    }
    adj
}

fn bfs_tree(root: &str, adj: &HashMap<String, BTreeSet<String>>) -> Tree {
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(root.to_string());
    queue.push_back(root.to_string());

    while let Some(current) = queue.pop_front() {
        if let Some(neighbors) = adj.get(&current) {
            for next in neighbors {
                if seen.insert(next.clone()) {
                    children.entry(current.clone()).or_default().push(next.clone());
                    queue.push_back(next.clone());
                }
            }
        }
    }

    Tree { children }
}

struct Placer<'t> {
    tree: &'t Tree,
    center: Point,
    step: f64,
    positions: Layout,
}

impl Placer<'_> {
    fn place(&mut self, node: &str, angle: f64, radius: f64) {
        let rad = angle.to_radians();
        self.positions.insert(
            node.to_string(),
            Point {
                x: self.center.x + radius * rad.cos(),
                y: self.center.y - radius * rad.sin(),
            },
        );
    }

    fn subtree(&mut self, node: &str, parent_angle: f64, parent_radius: f64) {
        let tree = self.tree;
        let kids = tree.kids(node);
        if kids.is_empty() {
            return;
        }
        let radius = parent_radius + self.step;

        if let [only] = kids {
            let angle = snap_angle(parent_angle);
            self.place(only, angle, radius);
            self.subtree(only, angle, radius);
            return;
        }

        let sizes: Vec<usize> = kids.iter().map(|k| tree.subtree_size(k)).collect();
        let total = sizes.iter().sum::<usize>() as f64;
        let spread = (30.0 * kids.len() as f64).min(90.0);

        let mut current = parent_angle - spread / 2.0;
        for (kid, size) in kids.iter().zip(&sizes) {
            let wedge = spread * *size as f64 / total;
            let angle = snap_angle(current + wedge / 2.0);
            self.place(kid, angle, radius);
            self.subtree(kid, angle, radius);
            current += wedge;
        }
    }
}

/// Lay out `nodes` connected by `edges` (unordered pairs). Edges naming a
/// node outside `nodes` are ignored; unconnected nodes land on the centre.
pub fn compute_radial_layout(
    nodes: &[String],
    edges: &[(String, String)],
    entry_points: &[String],
    canvas: Canvas,
) -> Layout {
    let node_set: BTreeSet<String> = nodes.iter().cloned().collect();
    let center = canvas.center();

    let mut layout = Layout::new();
    if node_set.is_empty() {
        return layout;
    }
    if node_set.len() == 1 {
        layout.extend(node_set.into_iter().map(|n| (n, center)));
        return layout;
    }

    let adj = adjacency(&node_set, edges);
    let degree = |n: &String| adj.get(n).map_or(0, BTreeSet::len);
    // First node wins ties.
    let hub = node_set
        .iter()
        .fold(None::<&String>, |best, n| match best {
            Some(b) if degree(b) >= degree(n) => Some(b),
            _ => Some(n),
        })
        .cloned()
        .unwrap_or_default();

    let tree = bfs_tree(&hub, &adj);
    let mut placer = Placer {
        tree: &tree,
        center,
        step: canvas.short_side() * 0.2,
        positions: Layout::new(),
    };
    placer.positions.insert(hub.clone(), center);

    let hub_children = tree.kids(&hub);
    if !hub_children.is_empty() {
        let sizes: Vec<usize> = hub_children.iter().map(|c| tree.subtree_size(c)).collect();
        let total = sizes.iter().sum::<usize>() as f64;

        let mut base = 0.0;
        if let Some(idx) = entry_points
            .iter()
            .find_map(|e| hub_children.iter().position(|c| c == e))
        {
            let before: usize = sizes[..idx].iter().sum();
            let offset = 360.0 * before as f64 / total + 360.0 * sizes[idx] as f64 / (2.0 * total);
            base = 270.0 - offset.trunc();
        }

        let ring = canvas.short_side() * 0.3;
        let mut current = base;
        for (child, size) in hub_children.iter().zip(&sizes) {
            let wedge = 360.0 * *size as f64 / total;
            let angle = snap_angle(current + wedge / 2.0);
            placer.place(child, angle, ring);
            placer.subtree(child, angle, ring);
            current += wedge;
        }
    }

    layout = placer.positions;
    for n in &node_set {
        layout.entry(n.clone()).or_insert(center);
    }

    normalize(&mut layout, canvas);
    layout
}

/// Stretch positions to fill the canvas inside the margin.
fn normalize(layout: &mut Layout, canvas: Canvas) {
    let xs = layout.values().map(|p| p.x);
    let ys = layout.values().map(|p| p.y);
    let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range_x = if max_x > min_x { max_x - min_x } else { 1.0 };
    let range_y = if max_y > min_y { max_y - min_y } else { 1.0 };

    for p in layout.values_mut() {
        p.x = MARGIN + (p.x - min_x) / range_x * (canvas.width - 2.0 * MARGIN);
        p.y = MARGIN + (p.y - min_y) / range_y * (canvas.height - 2.0 * MARGIN);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LayoutKey {
    nodes: Vec<String>,
    edges: Vec<(String, String)>,
    entry_points: Vec<String>,
    canvas: (u64, u64),
}

impl LayoutKey {
    fn new(nodes: &[String], edges: &[(String, String)], entry_points: &[String], canvas: Canvas) -> Self {
        let nodes: BTreeSet<String> = nodes.iter().cloned().collect();
        let edges: BTreeSet<(String, String)> = edges
            .iter()
            .map(|(a, b)| {
                if a <= b {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                }
            })
            .collect();
        Self {
            nodes: nodes.into_iter().collect(),
            edges: edges.into_iter().collect(),
            entry_points: entry_points.to_vec(),
            canvas: (canvas.width.to_bits(), canvas.height.to_bits()),
        }
    }
}

/// Memoized layouts keyed by node set, edge set, entry points and canvas.
///
/// Owned by the caller and passed in where layouts are needed. When the
/// cache is full it is emptied before the next insert.
#[derive(Debug, Clone)]
pub struct LayoutCache {
    entries: HashMap<LayoutKey, Layout>,
    capacity: usize,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LayoutCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_or_compute(
        &mut self,
        nodes: &[String],
        edges: &[(String, String)],
        entry_points: &[String],
        canvas: Canvas,
    ) -> Layout {
        let key = LayoutKey::new(nodes, edges, entry_points, canvas);
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }

        if self.entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "layout cache full, clearing");
            self.entries.clear();
        }
        let layout = compute_radial_layout(nodes, edges, entry_points, canvas);
        self.entries.insert(key, layout.clone());
        layout
    }

    /// Drop every cached layout that contains `node`.
    pub fn invalidate(&mut self, node: &str) {
        self.entries
            .retain(|key, _| key.nodes.binary_search_by(|n| n.as_str().cmp(node)).is_err());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn edge(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_snap_angle() {
        assert_eq!(snap_angle(10.0), 0.0);
        assert_eq!(snap_angle(350.0), 0.0);
        assert_eq!(snap_angle(100.0), 90.0);
        assert_eq!(snap_angle(-50.0), 315.0);
    }

    #[test]
    fn test_single_node_centered() {
        let layout = compute_radial_layout(&names(&["Hall"]), &[], &[], Canvas::default());
        assert_eq!(layout["Hall"], Point { x: 400.0, y: 300.0 });
        assert!(compute_radial_layout(&[], &[], &[], Canvas::default()).is_empty());
    }

    #[test]
    fn test_hub_centered_entry_at_bottom() {
        let nodes = names(&["Gate", "Hall", "Kitchen", "Library", "Stairs"]);
        let edges = vec![
            edge("Hall", "Gate"),
            edge("Kitchen", "Hall"),
            edge("Hall", "Library"),
            edge("Hall", "Stairs"),
        ];
        let layout = compute_radial_layout(&nodes, &edges, &names(&["Gate"]), Canvas::default());

        let hall = layout["Hall"];
        assert!(close(hall.x, 400.0) && close(hall.y, 300.0));
        let gate = layout["Gate"];
        assert!(close(gate.x, 400.0));
        assert!(close(gate.y, 560.0));
        let library = layout["Library"];
        assert!(close(library.y, 40.0));
    }

    #[test]
    fn test_every_node_inside_margin() {
        let nodes = names(&["A", "B", "C", "D", "E", "F", "Lonely"]);
        let edges = vec![edge("A", "B"), edge("B", "C"), edge("B", "D"), edge("D", "E"), edge("D", "F")];
        let layout = compute_radial_layout(&nodes, &edges, &[], Canvas::default());

        assert_eq!(layout.len(), nodes.len());
        for p in layout.values() {
            assert!(p.x >= MARGIN - 1e-9 && p.x <= 800.0 - MARGIN + 1e-9);
            assert!(p.y >= MARGIN - 1e-9 && p.y <= 600.0 - MARGIN + 1e-9);
        }
    }

    #[test]
    fn test_cache_key_ignores_order() {
        let mut cache = LayoutCache::new(4);
        let first = cache.get_or_compute(
            &names(&["A", "B"]),
            &[edge("A", "B")],
            &[],
            Canvas::default(),
        );
        let second = cache.get_or_compute(
            &names(&["B", "A"]),
            &[edge("B", "A")],
            &[],
            Canvas::default(),
        );
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        cache.get_or_compute(&names(&["A", "B"]), &[edge("A", "B")], &[], Canvas::new(300.0, 300.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_invalidate_and_capacity() {
        let mut cache = LayoutCache::new(2);
        cache.get_or_compute(&names(&["A", "B"]), &[], &[], Canvas::default());
        cache.get_or_compute(&names(&["C"]), &[], &[], Canvas::default());
        assert_eq!(cache.len(), 2);

        cache.invalidate("B");
        assert_eq!(cache.len(), 1);

        cache.get_or_compute(&names(&["D"]), &[], &[], Canvas::default());
        cache.get_or_compute(&names(&["E"]), &[], &[], Canvas::default());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
