//! Generic dependency-ordered sort.
//!
//! Pure algorithm with no module knowledge: callers hand in items and a
//! `deps_of` closure, and get back an order in which every dependency
//! precedes its dependents. The domain layer maps [`Cycle`] onto its own
//! error surface.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A dependency cycle was found; carries one item on the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle<T>(pub T);

impl<T: fmt::Display> fmt::Display for Cycle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency cycle detected at '{}'", self.0)
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for Cycle<T> {}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Topologically sort `items` so that for every item, each of its
/// dependencies appears at a strictly earlier index.
///
/// Depth-first visit with a three-state marker per item: unvisited (absent
/// from the marker map), in-progress, done. Re-entering an in-progress item
/// means the dependency relation is cyclic. Siblings with no ordering
/// constraint between them come out in visit order; nothing more is
/// guaranteed. O(V+E).
///
/// # Errors
/// Returns [`Cycle`] naming an item on the cycle if the relation induced by
/// `deps_of` is not acyclic.
pub fn sort<T, D>(items: &[T], mut deps_of: D) -> Result<Vec<T>, Cycle<T>>
where
    T: Clone + Eq + Hash,
    D: FnMut(&T) -> Vec<T>,
{
    fn visit<T, D>(
        item: &T,
        deps_of: &mut D,
        marks: &mut HashMap<T, Mark>,
        out: &mut Vec<T>,
    ) -> Result<(), Cycle<T>>
    where
        T: Clone + Eq + Hash,
        D: FnMut(&T) -> Vec<T>,
    {
        match marks.get(item) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(Cycle(item.clone())),
            None => {}
        }
        marks.insert(item.clone(), Mark::InProgress);
        for dep in deps_of(item) {
            visit(&dep, deps_of, marks, out)?;
        }
        marks.insert(item.clone(), Mark::Done);
        out.push(item.clone());
        Ok(())
    }

    let mut marks = HashMap::with_capacity(items.len());
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        visit(item, &mut deps_of, &mut marks, &mut out)?;
    }
    Ok(out)
}
