use super::search::{scaled, shortest_path};
use super::{GraphRouter, RouterOutput, RoutingTree};
use crate::conflicts::{ConflictSet, ReservedNodes};
use crate::error::RoutingError;
use crate::graph::{GridEdge, GridNode, RoutingGraph};
use crate::virtual_terminals::Signals;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::iter;
use stdcell_common::db::indices::NetId;
use stdcell_common::util::config::RoutingConfig;

/// Negotiated congestion router.
///
/// Each net is routed as a tree grown from its first signal towards the
/// nearest remaining one. Nets sharing a node, or using conflicting nodes,
/// are ripped up and rerouted with increasing penalty and history cost.
#[derive(Clone, Debug)]
pub struct PathFinderRouter {
    pub max_iterations: usize,
    pub history_increment: f64,
    pub initial_penalty: f64,
    pub penalty_multiplier: f64,
    pub seed: u64,
}

impl PathFinderRouter {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            history_increment: config.history_increment,
            initial_penalty: config.initial_penalty,
            penalty_multiplier: config.penalty_multiplier,
            seed: config.seed,
        }
    }
}

impl Default for PathFinderRouter {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

/// Adds the missing reverse entries.
fn symmetrize(conflicts: &ConflictSet) -> ConflictSet {
    let mut out = conflicts.clone();
    for (n, hits) in conflicts {
        for m in hits {
            out.entry(*m).or_default().insert(*n);
        }
    }
    out
}

struct Negotiation<'a> {
    graph: &'a RoutingGraph,
    is_virtual: &'a dyn Fn(&GridNode) -> bool,
    conflicts: ConflictSet,
    reserved_by: HashMap<GridNode, NetId>,
    /// Per node, how often each net uses it or a conflicting node.
    pressure: HashMap<GridNode, BTreeMap<NetId, u32>>,
    history: HashMap<GridNode, f64>,
    penalty: f64,
}

impl<'a> Negotiation<'a> {
    fn footprint(&self, n: GridNode) -> impl Iterator<Item = GridNode> + '_ {
        iter::once(n).chain(self.conflicts.get(&n).into_iter().flatten().copied())
    }

    fn occupy(&mut self, net: NetId, tree: &RoutingTree) {
        let touched: Vec<GridNode> = tree
            .nodes()
            .filter(|n| !(self.is_virtual)(n))
            .flat_map(|n| self.footprint(n).collect::<Vec<_>>())
            .collect();
        for n in touched {
            *self.pressure.entry(n).or_default().entry(net).or_default() += 1;
        }
    }

    fn release(&mut self, net: NetId, tree: &RoutingTree) {
        let touched: Vec<GridNode> = tree
            .nodes()
            .filter(|n| !(self.is_virtual)(n))
            .flat_map(|n| self.footprint(n).collect::<Vec<_>>())
            .collect();
        for n in touched {
            let Some(users) = self.pressure.get_mut(&n) else {
                continue;
            };
            if let Some(count) = users.get_mut(&net) {
                *count -= 1;
                if *count == 0 {
                    users.remove(&net);
                }
            }
            if users.is_empty() {
                self.pressure.remove(&n);
            }
        }
    }

    fn other_users(&self, n: GridNode, net: NetId) -> usize {
        self.pressure
            .get(&n)
            .map_or(0, |users| users.keys().filter(|&&u| u != net).count())
    }

    fn node_cost(&self, n: GridNode, net: NetId) -> i64 {
        let history = self.history.get(&n).copied().unwrap_or(0.0);
        scaled(self.penalty * self.other_users(n, net) as f64 + history)
    }

    fn step_cost(&self, net: NetId, targets: &HashSet<GridNode>, v: GridNode, e: &GridEdge) -> Option<i64> {
        if (self.is_virtual)(&v) {
            return targets.contains(&v).then(|| scaled(e.weight));
        }
        if self.reserved_by.get(&v).is_some_and(|&owner| owner != net) {
            return None;
        }
        Some(scaled(e.weight) + self.node_cost(v, net))
    }

    fn route_net(&self, net: NetId, signals: &[GridNode]) -> Option<RoutingTree> {
        let (&first, rest) = signals.split_first()?;
        let mut tree = RoutingTree::new();
        tree.add_node(first);
        let mut remaining: HashSet<GridNode> = rest.iter().copied().collect();

        while !remaining.is_empty() {
            let singleton = tree.node_count() == 1;
            let path = shortest_path(
                self.graph,
                tree.nodes(),
                &remaining,
                |_, v, e| self.step_cost(net, &remaining, v, e),
                |u| singleton || !matches!(u, GridNode::VirtualPin { .. }),
            )?;
            if let Some(end) = path.last() {
                remaining.remove(end);
            }
            tree.add_path(&path, self.graph);
        }
        Some(tree)
    }

    fn conflicted_nets(&self, trees: &BTreeMap<NetId, RoutingTree>) -> Vec<NetId> {
        trees
            .iter()
            .filter(|(net, tree)| {
                tree.real_nodes()
                    .any(|n| self.other_users(n, **net) > 0)
            })
            .map(|(net, _)| *net)
            .collect()
    }

    fn raise_history(&mut self, trees: &BTreeMap<NetId, RoutingTree>, increment: f64) {
        let contested: HashSet<GridNode> = trees
            .values()
            .flat_map(|t| t.real_nodes())
            .filter(|n| self.pressure.get(n).is_some_and(|users| users.len() > 1))
            .collect();
        for n in contested {
            *self.history.entry(n).or_default() += increment;
        }
    }
}

impl GraphRouter for PathFinderRouter {
    fn route(
        &self,
        graph: &RoutingGraph,
        signals: &Signals,
        reserved: &ReservedNodes,
        node_conflict: &ConflictSet,
        is_virtual_node: &dyn Fn(&GridNode) -> bool,
    ) -> Result<RouterOutput, RoutingError> {
        let mut reserved_by = HashMap::new();
        for (&net, nodes) in reserved {
            for &n in nodes {
                if let Some(other) = reserved_by.insert(n, net) {
                    if other != net {
                        return Err(RoutingError::Router(format!(
                            "node {:?} reserved for both {:?} and {:?}",
                            n, other, net
                        )));
                    }
                }
            }
        }

        let mut state = Negotiation {
            graph,
            is_virtual: is_virtual_node,
            conflicts: symmetrize(node_conflict),
            reserved_by,
            pressure: HashMap::new(),
            history: HashMap::new(),
            penalty: self.initial_penalty,
        };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees: BTreeMap<NetId, RoutingTree> = BTreeMap::new();
        let mut unroutable: BTreeSet<NetId> = BTreeSet::new();
        let mut order: Vec<NetId> = signals.keys().copied().collect();

        for iter in 0..self.max_iterations.max(1) {
            for &net in &order {
                if let Some(old) = trees.remove(&net) {
                    state.release(net, &old);
                }
                match state.route_net(net, &signals[&net]) {
                    Some(tree) => {
                        state.occupy(net, &tree);
                        trees.insert(net, tree);
                        unroutable.remove(&net);
                    }
                    None => {
                        unroutable.insert(net);
                    }
                }
            }

            order = state.conflicted_nets(&trees);
            if order.is_empty() {
                log::info!("Negotiation converged after {} iterations", iter + 1);
                break;
            }
            log::debug!(
                "Iteration {}: {} nets in conflict, penalty {:.1}",
                iter,
                order.len(),
                state.penalty
            );
            state.raise_history(&trees, self.history_increment);
            state.penalty *= self.penalty_multiplier;
            order.shuffle(&mut rng);
        }

        for net in &unroutable {
            log::warn!("No path for {:?}", net);
        }

        let mut failed = unroutable;
        let mut owner: HashMap<GridNode, NetId> = HashMap::new();
        for (&net, tree) in &trees {
            let shared = tree.real_nodes().find(|n| owner.contains_key(n));
            if let Some(n) = shared {
                log::warn!("{:?} shares node {:?} with {:?}", net, n, owner[&n]);
                failed.insert(net);
                continue;
            }
            owner.extend(tree.real_nodes().map(|n| (n, net)));
        }
        trees.retain(|net, _| !failed.contains(net));

        let mut spacing_violations = 0;
        for (&net, tree) in &trees {
            for n in tree.real_nodes() {
                spacing_violations += state
                    .conflicts
                    .get(&n)
                    .into_iter()
                    .flatten()
                    .filter(|m| owner.get(*m).is_some_and(|&o| o != net))
                    .count();
            }
        }
        if spacing_violations > 0 {
            log::warn!(
                "{} spacing conflicts remain between routed nets",
                spacing_violations / 2
            );
        }

        Ok(RouterOutput { trees, failed })
    }
}
