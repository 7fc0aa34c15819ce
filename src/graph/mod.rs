mod builder;
mod dinic;

pub use builder::build_graph;
pub use dinic::Dinic;

/// Sentinel for "no edge" in the intrusive adjacency lists.
const NONE: usize = usize::MAX;

/// Half of an undirected edge. Edges `2k` and `2k + 1` are each other's reverse.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub to: usize,
    pub next: usize,
    pub capacity: f64,
}

/// Flow network over an arena of nodes addressed by row-major pixel index.
///
/// Terminal costs are folded into one signed residual per node, so only the difference
/// between the source and sink capacities is kept. The shared part is a constant flow.
#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    terminal: Vec<f64>,
    first: Vec<usize>,
    arcs: Vec<Edge>,
    base_flow: f64,
}

impl FlowNetwork {
    pub fn with_capacity(nodes: usize, arcs: usize) -> Self {
        Self {
            terminal: Vec::with_capacity(nodes),
            first: Vec::with_capacity(nodes),
            arcs: Vec::with_capacity(arcs),
            base_flow: 0.0,
        }
    }

    /// Drop all nodes and edges, keeping the allocations for the next build.
    pub fn clear(&mut self) {
        self.terminal.clear();
        self.first.clear();
        self.arcs.clear();
        self.base_flow = 0.0;
    }

    pub fn reserve(&mut self, nodes: usize, arcs: usize) {
        self.terminal.reserve(nodes);
        self.first.reserve(nodes);
        self.arcs.reserve(arcs);
    }

    pub fn add_node(&mut self) -> usize {
        self.terminal.push(0.0);
        self.first.push(NONE);
        self.terminal.len() - 1
    }

    /// Add source→`node` and `node`→sink capacities. Repeated calls accumulate.
    pub fn add_terminal_weights(&mut self, node: usize, source: f64, sink: f64) {
        let (mut source, mut sink) = (source, sink);
        let residual = self.terminal[node];
        if residual > 0.0 {
            source += residual;
        } else {
            sink -= residual;
        }
        self.base_flow += source.min(sink);
        self.terminal[node] = source - sink;
    }

    /// Add the edge `i` to `j` with capacity `weight` forward and `rev_weight` back.
    pub fn add_edge_pair(&mut self, i: usize, j: usize, weight: f64, rev_weight: f64) {
        debug_assert!(i != j, "self loops are not allowed");
        let k = self.arcs.len();
        self.arcs.push(Edge {
            to: j,
            next: self.first[i],
            capacity: weight,
        });
        self.first[i] = k;
        self.arcs.push(Edge {
            to: i,
            next: self.first[j],
            capacity: rev_weight,
        });
        self.first[j] = k + 1;
    }

    pub fn node_count(&self) -> usize {
        self.terminal.len()
    }

    pub fn edge_pair_count(&self) -> usize {
        self.arcs.len() / 2
    }

    /// Signed terminal residual: positive means connected to the source, negative to the sink.
    pub fn terminal(&self, node: usize) -> f64 {
        self.terminal[node]
    }

    /// Flow already pushed straight through nodes that have both terminal capacities.
    pub fn base_flow(&self) -> f64 {
        self.base_flow
    }

    pub fn arcs(&self) -> &[Edge] {
        &self.arcs
    }

    /// Iterate the arc indices leaving `node`.
    pub fn out_arcs(&self, node: usize) -> OutArcs<'_> {
        OutArcs {
            arcs: &self.arcs,
            current: self.first[node],
        }
    }
}

pub struct OutArcs<'a> {
    arcs: &'a [Edge],
    current: usize,
}

impl Iterator for OutArcs<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current == NONE {
            return None;
        }
        let k = self.current;
        self.current = self.arcs[k].next;
        Some(k)
    }
}

/// Result of a minimum cut.
#[derive(Debug, Clone, PartialEq)]
pub struct MinCut {
    /// Total cut capacity, including the network's base flow.
    pub flow: f64,
    /// Per node: `true` when it ends up on the source side.
    pub source_side: Vec<bool>,
}

impl MinCut {
    pub fn in_source_segment(&self, node: usize) -> bool {
        self.source_side[node]
    }
}

/// Trait for minimum-cut / maximum-flow solvers.
/// Allows swapping the algorithm without touching graph construction.
pub trait MinCutSolver {
    /// Compute a minimum s-t cut of `network`.
    fn min_cut(&mut self, network: &FlowNetwork) -> MinCut;
}
