//! Task ordering.
//!
//! A task depends on every task whose target is one of its sources.
//! [`order_tasks`] produces a total order placing producers first;
//! [`task_waves`] groups tasks into levels that may run concurrently.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::ExecuteError;
use crate::build::BuildTask;
use crate::path::EntryKey;
use crate::util::topo::{TopoError, depth_first_order};

/// Map each target to the index of the task producing it.
fn producers(tasks: &[BuildTask]) -> Result<HashMap<EntryKey, usize>, ExecuteError> {
  let mut producers = HashMap::with_capacity(tasks.len());
  for (idx, task) in tasks.iter().enumerate() {
    if producers.insert(task.target().key(), idx).is_some() {
      return Err(ExecuteError::DuplicateTarget {
        target: task.target().to_string(),
      });
    }
  }
  Ok(producers)
}

/// Indices of the tasks producing `task`'s sources.
fn dependencies(task: &BuildTask, producers: &HashMap<EntryKey, usize>) -> Vec<usize> {
  task
    .sources()
    .iter()
    .filter_map(|source| producers.get(&source.key()).copied())
    .collect()
}

/// Order `tasks` so each task follows the producers of its sources.
///
/// Unrelated tasks keep their relative order. Two tasks with the same target
/// are rejected, as is a cycle, which is reported by target name.
pub fn order_tasks(tasks: Vec<BuildTask>) -> Result<Vec<BuildTask>, ExecuteError> {
  let producers = producers(&tasks)?;

  let order = depth_first_order(tasks.len(), |idx| {
    Ok::<_, Infallible>(dependencies(&tasks[idx], &producers))
  })
  .map_err(|e| match e {
    TopoError::Cycle(cycle) => ExecuteError::CyclicDependency {
      cycle: cycle
        .iter()
        .map(|&idx| tasks[idx].target().to_string())
        .collect::<Vec<_>>()
        .join(" -> "),
    },
    TopoError::Dependency(never) => match never {},
  })?;

  let mut slots: Vec<Option<BuildTask>> = tasks.into_iter().map(Some).collect();
  Ok(order.into_iter().filter_map(|idx| slots[idx].take()).collect())
}

/// Group task indices into waves.
///
/// Every task's producers sit in earlier waves, so the tasks of one wave can
/// run in parallel once the previous wave has finished. Indices within a wave
/// are ascending.
pub fn task_waves(tasks: &[BuildTask]) -> Result<Vec<Vec<usize>>, ExecuteError> {
  let producers = producers(tasks)?;

  let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(tasks.len(), 0);
  let nodes: Vec<NodeIndex> = (0..tasks.len()).map(|idx| graph.add_node(idx)).collect();
  for (idx, task) in tasks.iter().enumerate() {
    for dep in dependencies(task, &producers) {
      // Edge from producer to consumer
      graph.add_edge(nodes[dep], nodes[idx], ());
    }
  }

  // Kahn's algorithm, one level at a time
  let mut in_degree: BTreeMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|node| (node, graph.neighbors_directed(node, Direction::Incoming).count()))
    .collect();
  let mut remaining: BTreeSet<NodeIndex> = graph.node_indices().collect();
  let mut waves = Vec::new();

  while !remaining.is_empty() {
    let ready: Vec<NodeIndex> = remaining.iter().filter(|&&node| in_degree[&node] == 0).copied().collect();

    if ready.is_empty() {
      let stuck: Vec<String> = remaining.iter().map(|node| tasks[graph[*node]].target().to_string()).collect();
      return Err(ExecuteError::CyclicDependency {
        cycle: stuck.join(", "),
      });
    }

    for node in &ready {
      remaining.remove(node);
      for neighbor in graph.neighbors_directed(*node, Direction::Outgoing) {
        if let Some(deg) = in_degree.get_mut(&neighbor) {
          *deg = deg.saturating_sub(1);
        }
      }
    }

    waves.push(ready.into_iter().map(|node| graph[node]).collect());
  }

  Ok(waves)
}
