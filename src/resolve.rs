//! Worst-case stack depth over the call graph.
//!
//! Depths are computed with a memoized depth first walk. Every record moves
//! `Unvisited -> InProgress -> Resolved`; reaching an `InProgress` record
//! again means the walk went around a recursion cycle, and the record's
//! partial value is used instead of descending further. The walk always
//! terminates, but the depth through a cycle is under-approximated.

use std::collections::HashSet;

use log::{trace, warn};
use petgraph::{algo, graph::DiGraph};

use crate::graph::CallGraph;
use crate::Resolution;


/// A call whose target address isn't inside any known function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedCall
{
    pub caller: String,
    pub target: u64,
}


/// Resolve every function in discovery order.
pub fn resolve_all(graph: &mut CallGraph) -> Vec<UnresolvedCall>
{
    let mut unresolved = vec![];
    for index in 0..graph.len()
    {
        deepest_stack_usage(graph, index, &mut unresolved);
    }
    unresolved
}

///
/// Deepest stack usage of the function at `index`: its own frame plus the
/// deepest of its callees. Calls to unknown addresses contribute nothing
/// and are appended to `unresolved`.
///
pub fn deepest_stack_usage(
    graph:      &mut CallGraph,
    index:      usize,
    unresolved: &mut Vec<UnresolvedCall>,
) -> u64
{
    let record = graph.record_mut(index);
    match record.state
    {
        Resolution::Resolved   => return record.deepest,
        Resolution::InProgress =>
        {
            trace!("`{}` is already being resolved (recursion)", record.name);
            return record.deepest;
        }
        Resolution::Unvisited  => record.state = Resolution::InProgress,
    }

    let calls = record.calls.len();
    for i in 0..calls
    {
        let target = graph.record_mut(index).calls[i];

        let contribution = match graph.function_at(target)
        {
            Some(callee) => deepest_stack_usage(graph, callee, unresolved),
            None         =>
            {
                let caller = graph.record_mut(index).name.clone();
                warn!("call target not found: `{}` jumps to {:#x}", caller, target);
                unresolved.push(UnresolvedCall { caller, target });
                continue;
            }
        };

        // partial maximum, visible to anyone coming back here through a cycle
        let record = graph.record_mut(index);
        if contribution > record.deepest
        {
            record.deepest = contribution;
        }
    }

    let record = graph.record_mut(index);
    record.deepest = record.deepest.saturating_add(record.own_stack);
    record.state = Resolution::Resolved;
    record.deepest
}

///
/// Strongly connected components of the resolved call graph that form a
/// recursion cycle. Members are flagged `in_cycle`, since their deepest
/// value doesn't account for the recursion.
///
/// Cycles are returned sorted, each as ascending record indices.
///
pub fn find_cycles(graph: &mut CallGraph) -> Vec<Vec<usize>>
{
    let mut g = DiGraph::<usize, ()>::with_capacity(graph.len(), 0);
    let nodes: Vec<_> = (0..graph.len()).map(|i| g.add_node(i)).collect();

    let mut seen = HashSet::new();
    for (caller, record) in graph.records().iter().enumerate()
    {
        if record.calls_itself && seen.insert((caller, caller))
        {
            g.add_edge(nodes[caller], nodes[caller], ());
        }
        for &target in &record.calls
        {
            if let Some(callee) = graph.function_at(target)
            {
                if seen.insert((caller, callee))
                {
                    g.add_edge(nodes[caller], nodes[callee], ());
                }
            }
        }
    }

    let mut cycles: Vec<Vec<usize>> = algo::tarjan_scc(&g)
        .into_iter()
        .filter(|scc|
        {
            scc.len() > 1 || g.contains_edge(scc[0], scc[0])
        })
        .map(|scc|
        {
            let mut members: Vec<usize> = scc.iter().map(|n| g[*n]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    cycles.sort();

    for cycle in &cycles
    {
        for &index in cycle
        {
            graph.record_mut(index).in_cycle = true;
        }

        let names: Vec<&str> = cycle.iter()
            .map(|&i| graph.records()[i].name.as_str())
            .collect();
        warn!(
            "recursion between {}; their deepest stack usage is a lower bound",
            names.join(", ")
        );
    }

    cycles
}
