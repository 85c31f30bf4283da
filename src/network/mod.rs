//! Network Builder: thresholds the normalized investment table into a
//! weighted bipartite investor-issuer graph with degree-centrality node
//! importance, a seeded force-directed layout, and a bounded label set.

mod layout;

pub use layout::spring_layout;

use crate::features::{IssuerKey, NormalizedFeatures};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Node size = `centrality ^ SIZE_EXPONENT * NODE_SIZE_SCALE`; the same
/// exponent and scale apply to both partitions so relative importance is
/// comparable within each partition.
const SIZE_EXPONENT: f64 = 1.5;
const NODE_SIZE_SCALE: f64 = 10_000.0;

/// Partition tag for a bipartite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Investor,
    Issuer,
}

/// One node of the bipartite network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    /// Owner CIK for investors, issuer key for issuers.
    pub id: String,
    pub kind: NodeKind,
    /// Degree normalized by `n - 1` over all nodes in the graph.
    pub centrality: f64,
    /// Display size derived from centrality.
    pub size: f64,
    /// Layout position, coordinates in roughly [-1, 1].
    pub position: (f64, f64),
}

/// One investor-issuer edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub investor: String,
    pub issuer: String,
    /// `normalized_value ^ (1 / gravity)`: the layout spring strength.
    /// Larger gravity sharpens the separation between strong and weak
    /// ties.
    pub raw_weight: f64,
    /// `raw_weight ^ gravity`: display width, mapped back toward the
    /// normalized-value scale.
    pub display_width: f64,
}

/// Weighted bipartite investor-issuer graph. An empty graph is a valid,
/// non-error output (nothing exceeded the threshold).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BipartiteNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    /// Issuer key → display label for the `label_count` most central
    /// issuers, in descending centrality order.
    pub labels: Vec<(String, String)>,
}

impl BipartiteNetwork {
    pub fn node(&self, id: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn investor_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Investor)
            .count()
    }

    pub fn issuer_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Issuer)
            .count()
    }
}

/// Knobs for network construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptions {
    /// Strict lower bound on normalized value for an edge to exist; a
    /// triple exactly at the threshold is excluded.
    pub threshold: f64,
    /// Layout spread exponent; lower spreads the graph out, higher
    /// tightens clusters.
    pub gravity: f64,
    /// Cap on displayed issuer labels.
    pub label_count: usize,
    /// Drop nodes (and their edges) whose degree falls below this floor;
    /// 0 disables the trim.
    pub min_degree: usize,
    /// Layout seed.
    pub seed: u64,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        NetworkOptions {
            threshold: 0.5,
            gravity: 0.4,
            label_count: 20,
            min_degree: 0,
            seed: crate::DEFAULT_SEED,
        }
    }
}

/// Build the bipartite network from a normalized feature table.
pub fn build(features: &NormalizedFeatures, opts: &NetworkOptions) -> BipartiteNetwork {
    // Surviving triples, in the feature table's deterministic order.
    let mut survivors: Vec<(&str, &IssuerKey, f64)> = Vec::new();
    for (owner, issuer, value) in features.triples() {
        if value > opts.threshold {
            survivors.push((owner, issuer, value));
        }
    }
    if survivors.is_empty() {
        debug!(threshold = opts.threshold, "no triple exceeds threshold");
        return BipartiteNetwork::default();
    }

    // Intern nodes: investors first, then issuers, each by first
    // appearance. The two id spaces stay disjoint by construction.
    let mut investors: IndexMap<&str, usize> = IndexMap::new();
    let mut issuers: IndexMap<&IssuerKey, usize> = IndexMap::new();
    for &(owner, issuer, _) in &survivors {
        let next = investors.len();
        investors.entry(owner).or_insert(next);
        let next = issuers.len();
        issuers.entry(issuer).or_insert(next);
    }
    let investor_count = investors.len();
    let index_of_issuer = |idx: usize| investor_count + idx;

    let mut edges: Vec<(usize, usize, f64)> = survivors
        .iter()
        .map(|&(owner, issuer, value)| {
            (
                investors[owner],
                index_of_issuer(issuers[issuer]),
                value.powf(1.0 / opts.gravity),
            )
        })
        .collect();

    let mut node_count = investor_count + issuers.len();
    let mut degrees = vec![0usize; node_count];
    for &(a, b, _) in &edges {
        degrees[a] += 1;
        degrees[b] += 1;
    }

    // Node ids, investors then issuers, aligned with the dense index.
    let mut ids: Vec<(String, NodeKind)> = Vec::with_capacity(node_count);
    ids.extend(
        investors
            .keys()
            .map(|o| (o.to_string(), NodeKind::Investor)),
    );
    ids.extend(
        issuers
            .keys()
            .map(|k| (k.as_str().to_string(), NodeKind::Issuer)),
    );

    if opts.min_degree > 0 {
        let keep: Vec<bool> = degrees.iter().map(|&d| d >= opts.min_degree).collect();
        let mut remap = vec![usize::MAX; node_count];
        let mut kept_ids = Vec::new();
        for (idx, id) in ids.into_iter().enumerate() {
            if keep[idx] {
                remap[idx] = kept_ids.len();
                kept_ids.push(id);
            }
        }
        ids = kept_ids;
        edges.retain(|&(a, b, _)| keep[a] && keep[b]);
        for edge in &mut edges {
            edge.0 = remap[edge.0];
            edge.1 = remap[edge.1];
        }
        node_count = ids.len();
        degrees = vec![0; node_count];
        for &(a, b, _) in &edges {
            degrees[a] += 1;
            degrees[b] += 1;
        }
    }

    // Degree centrality over all nodes in the graph.
    let centrality: Vec<f64> = if node_count > 1 {
        degrees
            .iter()
            .map(|&d| d as f64 / (node_count - 1) as f64)
            .collect()
    } else {
        vec![0.0; node_count]
    };

    let positions = layout::spring_layout(node_count, &edges, opts.seed);

    let nodes: Vec<NetworkNode> = ids
        .iter()
        .enumerate()
        .map(|(idx, (id, kind))| NetworkNode {
            id: id.clone(),
            kind: *kind,
            centrality: centrality[idx],
            size: centrality[idx].powf(SIZE_EXPONENT) * NODE_SIZE_SCALE,
            position: positions[idx],
        })
        .collect();

    let network_edges: Vec<NetworkEdge> = edges
        .iter()
        .map(|&(a, b, raw)| NetworkEdge {
            investor: nodes[a].id.clone(),
            issuer: nodes[b].id.clone(),
            raw_weight: raw,
            display_width: raw.powf(opts.gravity),
        })
        .collect();

    // Issuer labels: most central first; an unresolvable key falls back
    // to itself rather than failing the build.
    let mut ranked: Vec<&NetworkNode> = nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Issuer)
        .collect();
    ranked.sort_by(|a, b| b.centrality.partial_cmp(&a.centrality).unwrap_or(std::cmp::Ordering::Equal));
    let labels: Vec<(String, String)> = ranked
        .iter()
        .take(opts.label_count)
        .map(|node| {
            let key = IssuerKey::from_cusip(&node.id);
            let label = features
                .label(&key)
                .map(str::to_string)
                .unwrap_or_else(|| node.id.clone());
            (node.id.clone(), label)
        })
        .collect();

    info!(
        nodes = nodes.len(),
        edges = network_edges.len(),
        labels = labels.len(),
        "bipartite network built"
    );

    BipartiteNetwork {
        nodes,
        edges: network_edges,
        labels,
    }
}
