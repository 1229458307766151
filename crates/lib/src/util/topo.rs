//! Depth-first topological ordering with cycle detection.
//!
//! Items are addressed by index. Visiting an item first visits every item it
//! depends on, then appends the item itself, so the output places each
//! dependency before its dependents. The walk keeps an explicit stack, so deep
//! dependency chains cannot overflow the call stack, and an in-progress marker
//! turns a back edge into a [`TopoError::Cycle`] instead of endless recursion.

/// Failure while ordering items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopoError<E> {
  /// The items on the cycle, in visiting order. The first item is repeated at
  /// the end (`[a, b, a]`).
  Cycle(Vec<usize>),
  /// The dependency callback failed for an item.
  Dependency(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

struct Frame {
  item: usize,
  deps: Vec<usize>,
  next: usize,
}

/// Order `count` items so that every item follows the items `deps` returns for it.
///
/// Roots are visited in index order and dependencies in the order `deps`
/// yields them, so the result is deterministic for a given input.
pub fn depth_first_order<E>(
  count: usize,
  mut deps: impl FnMut(usize) -> Result<Vec<usize>, E>,
) -> Result<Vec<usize>, TopoError<E>> {
  let mut marks = vec![Mark::Unvisited; count];
  let mut order = Vec::with_capacity(count);

  for start in 0..count {
    if marks[start] != Mark::Unvisited {
      continue;
    }

    marks[start] = Mark::InProgress;
    let mut stack = vec![Frame {
      item: start,
      deps: deps(start).map_err(TopoError::Dependency)?,
      next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
      if frame.next < frame.deps.len() {
        let dep = frame.deps[frame.next];
        frame.next += 1;

        match marks[dep] {
          Mark::Done => {}
          Mark::InProgress => {
            let pos = stack.iter().position(|f| f.item == dep).unwrap_or(0);
            let mut cycle: Vec<usize> = stack[pos..].iter().map(|f| f.item).collect();
            cycle.push(dep);
            return Err(TopoError::Cycle(cycle));
          }
          Mark::Unvisited => {
            marks[dep] = Mark::InProgress;
            let dep_deps = deps(dep).map_err(TopoError::Dependency)?;
            stack.push(Frame {
              item: dep,
              deps: dep_deps,
              next: 0,
            });
          }
        }
      } else {
        let item = frame.item;
        marks[item] = Mark::Done;
        order.push(item);
        stack.pop();
      }
    }
  }

  Ok(order)
}
