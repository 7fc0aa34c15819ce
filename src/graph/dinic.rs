use std::collections::VecDeque;

use super::{FlowNetwork, MinCut, MinCutSolver, NONE};

/// Residual capacities at or below this are treated as saturated.
const EPS: f64 = 1e-9;

/// Dinic's max-flow on a residual copy of the network.
///
/// Source and sink become two extra nodes. After the flow is maximal, a node is on the sink
/// side iff it can still reach the sink through unsaturated arcs; every other node, including
/// nodes with no terminal preference at all, is on the source side.
#[derive(Debug, Default)]
pub struct Dinic {
    to: Vec<usize>,
    next: Vec<usize>,
    cap: Vec<f64>,
    head: Vec<usize>,
    level: Vec<i32>,
    iter: Vec<usize>,
}

impl Dinic {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&mut self, network: &FlowNetwork) {
        let n = network.node_count();
        let terminals = (0..n).filter(|&v| network.terminal(v).abs() > EPS).count();
        let arcs = network.arcs().len() + 2 * terminals;

        self.to.clear();
        self.next.clear();
        self.cap.clear();
        self.to.reserve(arcs);
        self.next.reserve(arcs);
        self.cap.reserve(arcs);

        self.head.clear();
        self.head.resize(n + 2, NONE);

        for pair in network.arcs().chunks_exact(2) {
            let from = pair[1].to;
            self.push_pair(from, pair[0].to, pair[0].capacity, pair[1].capacity);
        }

        let (source, sink) = (n, n + 1);
        for v in 0..n {
            let t = network.terminal(v);
            if t > EPS {
                self.push_pair(source, v, t, 0.0);
            } else if t < -EPS {
                self.push_pair(v, sink, -t, 0.0);
            }
        }
    }

    fn push_pair(&mut self, u: usize, v: usize, cap: f64, rev_cap: f64) {
        let k = self.to.len();
        self.to.push(v);
        self.cap.push(cap);
        self.next.push(self.head[u]);
        self.head[u] = k;

        self.to.push(u);
        self.cap.push(rev_cap);
        self.next.push(self.head[v]);
        self.head[v] = k + 1;
    }

    fn build_levels(&mut self, source: usize, sink: usize) -> bool {
        self.level.clear();
        self.level.resize(self.head.len(), -1);
        self.level[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let mut e = self.head[u];
            while e != NONE {
                let v = self.to[e];
                if self.cap[e] > EPS && self.level[v] < 0 {
                    self.level[v] = self.level[u] + 1;
                    queue.push_back(v);
                }
                e = self.next[e];
            }
        }
        self.level[sink] >= 0
    }

    /// Push a blocking flow along the current level graph. Iterative to keep the stack flat on large images.
    fn blocking_flow(&mut self, source: usize, sink: usize) -> f64 {
        self.iter.clear();
        self.iter.extend_from_slice(&self.head);

        let mut total = 0.0;
        let mut path: Vec<usize> = Vec::new();
        let mut u = source;

        loop {
            if u == sink {
                let pushed = path
                    .iter()
                    .map(|&e| self.cap[e])
                    .fold(f64::INFINITY, f64::min);
                let mut first_saturated = path.len();
                for (i, &e) in path.iter().enumerate() {
                    self.cap[e] -= pushed;
                    self.cap[e ^ 1] += pushed;
                    if self.cap[e] <= EPS && first_saturated == path.len() {
                        first_saturated = i;
                    }
                }
                total += pushed;
                path.truncate(first_saturated);
                u = path.last().map_or(source, |&e| self.to[e]);
                continue;
            }

            let mut advanced = false;
            while self.iter[u] != NONE {
                let e = self.iter[u];
                let v = self.to[e];
                if self.cap[e] > EPS && self.level[v] == self.level[u] + 1 {
                    path.push(e);
                    u = v;
                    advanced = true;
                    break;
                }
                self.iter[u] = self.next[e];
            }

            if !advanced {
                // Dead end: retreat and skip the arc that led here.
                self.level[u] = -1;
                match path.pop() {
                    Some(e) => {
                        u = self.to[e ^ 1];
                        self.iter[u] = self.next[e];
                    }
                    None => break,
                }
            }
        }
        total
    }

    /// Nodes that can still reach `sink` in the residual network.
    fn reaches_sink(&self, sink: usize) -> Vec<bool> {
        let mut reach = vec![false; self.head.len()];
        reach[sink] = true;
        let mut queue = VecDeque::new();
        queue.push_back(sink);
        while let Some(v) = queue.pop_front() {
            let mut e = self.head[v];
            while e != NONE {
                let w = self.to[e];
                if !reach[w] && self.cap[e ^ 1] > EPS {
                    reach[w] = true;
                    queue.push_back(w);
                }
                e = self.next[e];
            }
        }
        reach
    }
}

impl MinCutSolver for Dinic {
    fn min_cut(&mut self, network: &FlowNetwork) -> MinCut {
        let _span = tracing::debug_span!("min_cut", nodes = network.node_count()).entered();

        let n = network.node_count();
        let (source, sink) = (n, n + 1);
        self.load(network);

        let mut flow = network.base_flow();
        let mut phases = 0usize;
        while self.build_levels(source, sink) {
            flow += self.blocking_flow(source, sink);
            phases += 1;
        }
        tracing::debug!("max flow {:.3} after {} phases", flow, phases);

        let reach = self.reaches_sink(sink);
        MinCut {
            flow,
            source_side: reach[..n].iter().map(|&r| !r).collect(),
        }
    }
}
