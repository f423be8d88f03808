//! Net identity: connected components, net-id assignment, merge and split.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::graph::{EdgeId, GraphState, NetId, NetName, VertexId};

const AUTO_NAME_PREFIX: &str = "N$";

/// One connected component, vertices and edges in id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
}

impl Component {
    /// Smallest vertex id; used to break ties deterministically.
    fn anchor(&self) -> VertexId {
        self.vertices[0]
    }
}

/// Row of the UI net list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetSummary {
    pub net: NetId,
    pub name: String,
    pub vertex_count: usize,
    pub edge_count: usize,
}

/// Everything reachable from `start`. Iterative, visits each edge once.
pub fn component_of(state: &GraphState, start: VertexId) -> (HashSet<VertexId>, HashSet<EdgeId>) {
    let mut vertices = HashSet::new();
    let mut edges = HashSet::new();
    if !state.contains_vertex(start) {
        return (vertices, edges);
    }
    let mut stack = vec![start];
    vertices.insert(start);
    while let Some(v) = stack.pop() {
        for edge_id in state.incident_edges(v) {
            if !edges.insert(edge_id) {
                continue;
            }
            if let Some(edge) = state.edge(edge_id) {
                let next = edge.other(v);
                if vertices.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
    (vertices, edges)
}

/// Partition every vertex into components, ordered by smallest vertex id.
pub fn components(state: &GraphState) -> Vec<Component> {
    let mut seen: HashSet<VertexId> = HashSet::new();
    let mut out = Vec::new();
    for id in state.sorted_vertex_ids() {
        if seen.contains(&id) {
            continue;
        }
        let (verts, edges) = component_of(state, id);
        seen.extend(verts.iter().copied());
        let mut vertices: Vec<VertexId> = verts.into_iter().collect();
        vertices.sort_unstable();
        let mut edges: Vec<EdgeId> = edges.into_iter().collect();
        edges.sort_unstable();
        out.push(Component { vertices, edges });
    }
    out
}

fn next_auto_name(state: &mut GraphState) -> String {
    let taken: HashSet<&str> = state.net_names.values().map(|n| n.name.as_str()).collect();
    let mut counter = state.net_counter;
    let name = loop {
        counter += 1;
        let candidate = format!("{AUTO_NAME_PREFIX}{counter}");
        if !taken.contains(candidate.as_str()) {
            break candidate;
        }
    };
    state.net_counter = counter;
    name
}

/// Create a net id with an auto-generated `N$<n>` name.
pub fn mint_net(state: &mut GraphState) -> NetId {
    let name = next_auto_name(state);
    let net = NetId::new();
    state.net_names.insert(
        net,
        NetName {
            name,
            user_assigned: false,
        },
    );
    net
}

/// Bump the auto-name counter past every `N$<n>` name already present.
pub(crate) fn restore_counter(state: &mut GraphState) {
    let highest = state
        .net_names
        .values()
        .filter_map(|n| n.name.strip_prefix(AUTO_NAME_PREFIX)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    state.net_counter = state.net_counter.max(highest);
}

/// Fold `absorb`'s display name into `keep`, preferring a user-assigned name.
fn merge_names(state: &mut GraphState, keep: NetId, absorb: NetId) {
    let Some(absorbed) = state.net_names.remove(&absorb) else {
        return;
    };
    let replace = match state.net_names.get(&keep) {
        None => true,
        Some(kept) => !kept.user_assigned && absorbed.user_assigned,
    };
    if replace {
        state.net_names.insert(keep, absorbed);
    }
}

fn label<'a>(state: &mut GraphState, vertices: impl IntoIterator<Item = &'a VertexId>, net: Option<NetId>) {
    for v in vertices {
        state.set_net(*v, net);
    }
}

/// Merge `absorb` into `keep` across the whole graph.
pub(crate) fn absorb_net(state: &mut GraphState, keep: NetId, absorb: NetId) {
    if keep == absorb {
        return;
    }
    let ids: Vec<VertexId> = state
        .vertices()
        .values()
        .filter(|v| v.net == Some(absorb))
        .map(|v| v.id)
        .collect();
    label(state, &ids, Some(keep));
    merge_names(state, keep, absorb);
}

/// Give `v1` and `v2`'s components one consistent net id.
///
/// When both carry different ids, `v2`'s component is relabelled to `v1`'s.
/// Otherwise an existing id in either component is reused, or a new one is
/// minted. Components without edges are not nets and are left alone.
pub fn unify(state: &mut GraphState, v1: VertexId, v2: VertexId) {
    let n1 = state.vertex(v1).and_then(|v| v.net);
    let n2 = state.vertex(v2).and_then(|v| v.net);

    if let (Some(a), Some(b)) = (n1, n2) {
        if a != b {
            let (verts, _) = component_of(state, v2);
            let mut stale: Vec<NetId> = verts
                .iter()
                .filter_map(|v| state.vertex(*v).and_then(|v| v.net))
                .filter(|n| *n != a)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            stale.sort_unstable();
            label(state, &verts, Some(a));
            // Fragments elsewhere may still carry an absorbed id; they keep its name.
            for other in stale {
                if !state.vertices().values().any(|v| v.net == Some(other)) {
                    merge_names(state, a, other);
                }
            }
            return;
        }
    }

    let (mut verts, edges_1) = component_of(state, v1);
    let (verts_2, edges_2) = component_of(state, v2);
    if edges_1.is_empty() && edges_2.is_empty() {
        return;
    }
    verts.extend(verts_2);
    let mut sorted: Vec<VertexId> = verts.into_iter().collect();
    sorted.sort_unstable();
    let existing = n1
        .or(n2)
        .or_else(|| sorted.iter().find_map(|v| state.vertex(*v).and_then(|v| v.net)));
    let net = match existing {
        Some(net) => net,
        None => mint_net(state),
    };
    let stale: HashSet<NetId> = sorted
        .iter()
        .filter_map(|v| state.vertex(*v).and_then(|v| v.net))
        .filter(|n| *n != net)
        .collect();
    label(state, &sorted, Some(net));
    for other in stale {
        if !state.vertices().values().any(|v| v.net == Some(other)) {
            merge_names(state, net, other);
        }
    }
}

/// Full reconciliation of net ids against the current connectivity.
///
/// A net id shared by several disjoint components stays with the component
/// holding the most vertices (ties: the one with the smallest vertex id);
/// the other fragments get fresh ids. Components without edges lose their id.
/// Returns the number of nets minted.
pub fn discover_nets(state: &mut GraphState) -> usize {
    let comps = components(state);
    let mut claims: BTreeMap<NetId, Vec<usize>> = BTreeMap::new();
    let mut absorbed: Vec<(NetId, NetId)> = Vec::new();

    for (i, comp) in comps.iter().enumerate() {
        if comp.edges.is_empty() {
            label(state, &comp.vertices, None);
            continue;
        }
        let mut counts: BTreeMap<NetId, usize> = BTreeMap::new();
        for v in &comp.vertices {
            if let Some(net) = state.vertex(*v).and_then(|v| v.net) {
                *counts.entry(net).or_default() += 1;
            }
        }
        // Most common id wins; on equal counts the smaller id.
        let best = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(net, _)| *net);
        if let Some(best) = best {
            claims.entry(best).or_default().push(i);
            absorbed.extend(counts.keys().filter(|n| **n != best).map(|n| (best, *n)));
        }
    }

    let mut assigned: Vec<Option<NetId>> = vec![None; comps.len()];
    for (net, mut idxs) in claims {
        idxs.sort_by(|&x, &y| {
            comps[y]
                .vertices
                .len()
                .cmp(&comps[x].vertices.len())
                .then(comps[x].anchor().cmp(&comps[y].anchor()))
        });
        assigned[idxs[0]] = Some(net);
        if idxs.len() > 1 {
            log::debug!("net {} split into {} fragments", net, idxs.len());
        }
    }

    let kept: HashSet<NetId> = assigned.iter().flatten().copied().collect();
    for (keep, other) in absorbed {
        if !kept.contains(&other) {
            merge_names(state, keep, other);
        }
    }

    let mut minted = 0;
    for (i, comp) in comps.iter().enumerate() {
        if comp.edges.is_empty() {
            continue;
        }
        let net = match assigned[i] {
            Some(net) => net,
            None => {
                minted += 1;
                mint_net(state)
            }
        };
        label(state, &comp.vertices, Some(net));
    }

    let live: HashSet<NetId> = state.vertices().values().filter_map(|v| v.net).collect();
    state.net_names.retain(|net, _| live.contains(net));
    let mut unnamed: Vec<NetId> = live
        .into_iter()
        .filter(|net| !state.net_names.contains_key(net))
        .collect();
    unnamed.sort_unstable();
    for net in unnamed {
        let name = next_auto_name(state);
        state.net_names.insert(
            net,
            NetName {
                name,
                user_assigned: false,
            },
        );
    }
    minted
}

/// Give a net a user-assigned display name.
pub fn rename_net(state: &mut GraphState, net: NetId, name: &str) -> Result<(), EngineError> {
    let in_use = state.vertices().values().any(|v| v.net == Some(net));
    if !in_use && !state.net_names.contains_key(&net) {
        return Err(EngineError::UnknownNet(net));
    }
    state.net_names.insert(
        net,
        NetName {
            name: name.to_string(),
            user_assigned: true,
        },
    );
    Ok(())
}

/// Identifier, name and size of every net, ordered by name.
pub fn nets_summary(state: &GraphState) -> Vec<NetSummary> {
    let mut by_net: HashMap<NetId, (usize, usize)> = HashMap::new();
    for comp in components(state) {
        if comp.edges.is_empty() {
            continue;
        }
        let Some(net) = state.vertex(comp.anchor()).and_then(|v| v.net) else {
            continue;
        };
        let entry = by_net.entry(net).or_default();
        entry.0 += comp.vertices.len();
        entry.1 += comp.edges.len();
    }
    let mut out: Vec<NetSummary> = by_net
        .into_iter()
        .map(|(net, (vertex_count, edge_count))| NetSummary {
            net,
            name: state
                .net_name(net)
                .map(|n| n.name.clone())
                .unwrap_or_default(),
            vertex_count,
            edge_count,
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then(a.net.cmp(&b.net)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::graph::Ownership;

    fn chain(g: &mut GraphState, xs: &[f64]) -> Vec<VertexId> {
        let ids: Vec<VertexId> = xs
            .iter()
            .map(|x| g.add_vertex(Point::new(*x, 0.0), Ownership::Free))
            .collect();
        for w in ids.windows(2) {
            g.add_edge(w[0], w[1]);
        }
        ids
    }

    #[test]
    fn test_component_of_is_iterative_and_complete() {
        let mut g = GraphState::new();
        let xs: Vec<f64> = (0..5000).map(|i| i as f64).collect();
        let ids = chain(&mut g, &xs);
        let (verts, edges) = component_of(&g, ids[0]);
        assert_eq!(verts.len(), 5000);
        assert_eq!(edges.len(), 4999);
    }

    #[test]
    fn test_unify_mints_auto_name() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0]);
        unify(&mut g, ids[0], ids[1]);
        let net = g.vertex(ids[0]).unwrap().net.unwrap();
        assert_eq!(g.vertex(ids[1]).unwrap().net, Some(net));
        assert_eq!(g.net_name(net).unwrap().name, "N$1");
    }

    #[test]
    fn test_unify_isolated_vertices_have_no_net() {
        let mut g = GraphState::new();
        let a = g.add_vertex(Point::new(0.0, 0.0), Ownership::Free);
        let b = g.add_vertex(Point::new(5.0, 0.0), Ownership::Free);
        unify(&mut g, a, b);
        assert!(g.vertex(a).unwrap().net.is_none());
        assert!(g.net_names().is_empty());
    }

    #[test]
    fn test_unify_prefers_user_name() {
        let mut g = GraphState::new();
        let left = chain(&mut g, &[0.0, 10.0]);
        let right = chain(&mut g, &[20.0, 30.0]);
        unify(&mut g, left[0], left[1]);
        unify(&mut g, right[0], right[1]);
        let right_net = g.vertex(right[0]).unwrap().net.unwrap();
        rename_net(&mut g, right_net, "VCC").unwrap();

        g.add_edge(left[1], right[0]);
        unify(&mut g, left[0], right[1]);

        let left_net = g.vertex(left[0]).unwrap().net.unwrap();
        for v in left.iter().chain(right.iter()) {
            assert_eq!(g.vertex(*v).unwrap().net, Some(left_net));
        }
        assert_eq!(g.net_name(left_net).unwrap().name, "VCC");
        assert!(g.net_name(right_net).is_none());
    }

    #[test]
    fn test_unify_keeps_user_name_of_third_net() {
        let mut g = GraphState::new();
        let left = chain(&mut g, &[0.0, 10.0]);
        let middle = chain(&mut g, &[20.0, 30.0]);
        let right = chain(&mut g, &[40.0, 50.0]);
        for ids in [&left, &middle, &right] {
            unify(&mut g, ids[0], ids[1]);
        }
        let middle_net = g.vertex(middle[0]).unwrap().net.unwrap();
        rename_net(&mut g, middle_net, "VCC").unwrap();

        g.add_edge(left[1], middle[0]);
        g.add_edge(middle[1], right[0]);
        unify(&mut g, left[0], right[1]);

        let net = g.vertex(left[0]).unwrap().net.unwrap();
        for v in left.iter().chain(&middle).chain(&right) {
            assert_eq!(g.vertex(*v).unwrap().net, Some(net));
        }
        assert_eq!(g.net_name(net).unwrap().name, "VCC");
        assert_eq!(g.net_names().len(), 1);
    }

    #[test]
    fn test_discover_equal_split_keeps_id_on_smallest_vertex() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0, 20.0, 30.0]);
        unify(&mut g, ids[0], ids[3]);
        let net = g.vertex(ids[0]).unwrap().net.unwrap();

        let bc = g.edge_between(ids[1], ids[2]).unwrap();
        g.remove_edge(bc);
        assert_eq!(discover_nets(&mut g), 1);

        let keeper = if ids[0].min(ids[1]) < ids[2].min(ids[3]) {
            &ids[..2]
        } else {
            &ids[2..]
        };
        for v in keeper {
            assert_eq!(g.vertex(*v).unwrap().net, Some(net));
        }
        let fresh = ids.iter().filter(|v| g.vertex(**v).unwrap().net != Some(net)).count();
        assert_eq!(fresh, 2);
    }

    #[test]
    fn test_discover_split_keeps_id_on_larger_fragment() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0, 20.0, 30.0, 40.0]);
        unify(&mut g, ids[0], ids[4]);
        let net = g.vertex(ids[0]).unwrap().net.unwrap();

        let bc = g.edge_between(ids[1], ids[2]).unwrap();
        g.remove_edge(bc);
        assert_eq!(discover_nets(&mut g), 1);

        // C-D-E has three vertices, A-B two.
        for v in &ids[2..] {
            assert_eq!(g.vertex(*v).unwrap().net, Some(net));
        }
        let other = g.vertex(ids[0]).unwrap().net.unwrap();
        assert_ne!(other, net);
        assert_eq!(g.vertex(ids[1]).unwrap().net, Some(other));
        assert_ne!(g.net_name(other).unwrap().name, g.net_name(net).unwrap().name);
    }

    #[test]
    fn test_discover_clears_isolated_vertices() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0]);
        unify(&mut g, ids[0], ids[1]);
        let e = g.edge_between(ids[0], ids[1]).unwrap();
        g.remove_edge(e);
        discover_nets(&mut g);
        assert!(g.vertex(ids[0]).unwrap().net.is_none());
        assert!(g.net_names().is_empty());
    }

    #[test]
    fn test_discover_is_stable() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0, 20.0]);
        discover_nets(&mut g);
        let before = g.vertex(ids[0]).unwrap().net;
        assert_eq!(discover_nets(&mut g), 0);
        assert_eq!(g.vertex(ids[0]).unwrap().net, before);
    }

    #[test]
    fn test_restore_counter_skips_existing_names() {
        let mut g = GraphState::new();
        g.net_names.insert(
            NetId::new(),
            NetName {
                name: "N$7".to_string(),
                user_assigned: false,
            },
        );
        restore_counter(&mut g);
        let net = mint_net(&mut g);
        assert_eq!(g.net_name(net).unwrap().name, "N$8");
    }

    #[test]
    fn test_nets_summary_counts() {
        let mut g = GraphState::new();
        let ids = chain(&mut g, &[0.0, 10.0, 20.0]);
        g.add_vertex(Point::new(99.0, 99.0), Ownership::Free);
        unify(&mut g, ids[0], ids[2]);
        let summary = nets_summary(&g);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].vertex_count, 3);
        assert_eq!(summary[0].edge_count, 2);
        assert_eq!(summary[0].name, "N$1");
    }

    #[test]
    fn test_rename_unknown_net_fails() {
        let mut g = GraphState::new();
        let net = NetId::new();
        assert_eq!(rename_net(&mut g, net, "GND"), Err(EngineError::UnknownNet(net)));
    }
}
