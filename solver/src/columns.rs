#[cfg(test)]
mod tests;

use std::collections::HashSet;

use model::base_types::Cost;
use model::cover_set::CoverSet;

/// A column as returned by a pricing generator, together with its reduced cost under the dual
/// prices it was priced with.
#[derive(Debug, Clone, PartialEq)]
pub struct Priced<C> {
    pub reduced_cost: Cost,
    pub column: C,
}

impl<C> Priced<C> {
    pub fn new(reduced_cost: Cost, column: C) -> Priced<C> {
        Priced {
            reduced_cost,
            column,
        }
    }
}

/// Chooses at most `max` of the candidates, which have to be sorted cheapest first.
/// A greedy pass picks pairwise disjoint sets, the remaining slots are filled with the cheapest
/// candidates whose set was not picked yet. Returns positions into `sorted`.
pub fn select_columns(sorted: &[&CoverSet], max: usize) -> Vec<usize> {
    let mut selected = Vec::new();
    let mut taken = vec![false; sorted.len()];
    let mut covered: Option<CoverSet> = None;
    for (i, set) in sorted.iter().enumerate() {
        if selected.len() >= max {
            return selected;
        }
        let disjoint = covered.as_ref().map_or(true, |c| c.is_disjoint(set));
        if disjoint {
            match covered.as_mut() {
                Some(c) => c.union_with(set),
                None => covered = Some((*set).clone()),
            }
            taken[i] = true;
            selected.push(i);
        }
    }

    let mut seen: HashSet<&CoverSet> = selected.iter().map(|i| sorted[*i]).collect();
    for (i, set) in sorted.iter().enumerate() {
        if selected.len() >= max {
            break;
        }
        if !taken[i] && seen.insert(*set) {
            selected.push(i);
        }
    }
    selected
}
