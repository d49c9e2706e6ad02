use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::Arc,
};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::{Direction, GraphModel, Node, NodeId};

/// Predicate deciding whether a walk may visit a node.
pub type NodeFilter = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// Visiting order of a walk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Order {
    #[default]
    BreadthFirst,
    DepthFirst,
}

/// Options for [`crate::TraversalEngine::traverse`].
#[derive(Serialize, Deserialize, Clone)]
pub struct TraversalOptions {
    /// Which connections to follow.
    pub direction: Direction,
    /// Breadth-first or depth-first.
    pub order: Order,
    /// Yield the start nodes themselves.
    pub include_self: bool,
    /// Stop expanding past this many hops from the start set.
    pub max_depth: Option<usize>,
    /// Nodes rejected by the filter are neither yielded nor expanded.
    #[serde(skip)]
    pub filter: Option<NodeFilter>,
}

impl fmt::Debug for TraversalOptions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TraversalOptions")
            .field("direction", &self.direction)
            .field("order", &self.order)
            .field("include_self", &self.include_self)
            .field("max_depth", &self.max_depth)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Downstream,
            order: Order::BreadthFirst,
            include_self: true,
            max_depth: None,
            filter: None,
        }
    }
}

impl TraversalOptions {
    pub fn new(
        direction: Direction,
        order: Order,
    ) -> Self {
        Self {
            direction,
            order,
            ..Default::default()
        }
    }

    pub fn include_self(
        mut self,
        include_self: bool,
    ) -> Self {
        self.include_self = include_self;
        self
    }

    pub fn max_depth(
        mut self,
        depth: usize,
    ) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn filter<F>(
        mut self,
        filter: F,
    ) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

/// Lazy walk over the nodes reachable from a start set.
///
/// Every node is yielded at most once. Breadth-first walks expand each
/// frontier node's neighbors in ascending id order; depth-first walks follow
/// the snapshot's connection order. Call [`Walk::restart`] to replay it.
#[derive(Debug, Clone)]
pub struct Walk<'g> {
    graph: &'g GraphModel,
    starts: Vec<NodeIndex>,
    options: TraversalOptions,
    visited: HashSet<NodeIndex>,
    /// FIFO frontier for breadth-first, LIFO stack for depth-first.
    pending: VecDeque<(NodeIndex, usize)>,
}

impl<'g> Walk<'g> {
    pub(crate) fn new(
        graph: &'g GraphModel,
        mut starts: Vec<NodeIndex>,
        options: TraversalOptions,
    ) -> Self {
        starts.sort();
        starts.dedup();
        let mut walk = Self {
            graph,
            starts,
            options,
            visited: HashSet::new(),
            pending: VecDeque::new(),
        };
        walk.restart();
        walk
    }

    /// Rewinds the walk to its start set.
    pub fn restart(&mut self) {
        self.visited.clear();
        self.pending.clear();
        match self.options.order {
            Order::BreadthFirst => {
                for idx in self.starts.iter() {
                    self.visited.insert(*idx);
                    self.pending.push_back((*idx, 0));
                }
            }
            Order::DepthFirst => {
                // Stack top is the back; the smallest start must pop first.
                for idx in self.starts.iter().rev() {
                    self.pending.push_back((*idx, 0));
                }
            }
        }
    }

    fn can_expand(
        &self,
        depth: usize,
    ) -> bool {
        self.options.max_depth.is_none_or(|max| depth < max)
    }

    fn admits(
        &self,
        idx: NodeIndex,
    ) -> bool {
        self.options.filter.as_ref().is_none_or(|f| f(&self.graph.graph()[idx]))
    }

    fn should_yield(
        &self,
        idx: NodeIndex,
    ) -> bool {
        self.options.include_self || self.starts.binary_search(&idx).is_err()
    }

    fn next_breadth_first(&mut self) -> Option<NodeIndex> {
        while let Some((idx, depth)) = self.pending.pop_front() {
            if !self.admits(idx) {
                continue;
            }
            if self.can_expand(depth) {
                for next in self.graph.sorted_neighbors(idx, self.options.direction) {
                    if self.visited.insert(next) {
                        self.pending.push_back((next, depth + 1));
                    }
                }
            }
            if self.should_yield(idx) {
                return Some(idx);
            }
        }
        None
    }

    fn next_depth_first(&mut self) -> Option<NodeIndex> {
        while let Some((idx, depth)) = self.pending.pop_back() {
            if !self.visited.insert(idx) || !self.admits(idx) {
                continue;
            }
            if self.can_expand(depth) {
                let neighbors = self.graph.neighbors(idx, self.options.direction);
                for next in neighbors.into_iter().rev() {
                    if !self.visited.contains(&next) {
                        self.pending.push_back((next, depth + 1));
                    }
                }
            }
            if self.should_yield(idx) {
                return Some(idx);
            }
        }
        None
    }
}

impl<'g> Iterator for Walk<'g> {
    type Item = &'g NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        let idx = match self.options.order {
            Order::BreadthFirst => self.next_breadth_first(),
            Order::DepthFirst => self.next_depth_first(),
        }?;
        Some(graph.id_of(idx))
    }
}
