use model::cover_set::CoverSet;

use super::select_columns;

fn set(indices: &[usize]) -> CoverSet {
    CoverSet::from_indices(6, indices.iter().copied())
}

#[test]
fn disjoint_sets_come_first_then_unique_fill() {
    // ARRANGE
    let sets = [
        set(&[0, 1]),
        set(&[1, 2]),
        set(&[2, 3]),
        set(&[0, 1]),
        set(&[4]),
        set(&[1, 2]),
    ];
    let sorted: Vec<&CoverSet> = sets.iter().collect();

    // ACT
    let selected = select_columns(&sorted, 10);

    // ASSERT
    itertools::assert_equal(selected, vec![0, 2, 4, 1]);
}

#[test]
fn selection_respects_the_cap() {
    // ARRANGE
    let sets = [set(&[0]), set(&[1]), set(&[0, 1]), set(&[2])];
    let sorted: Vec<&CoverSet> = sets.iter().collect();

    // ACT
    let selected = select_columns(&sorted, 2);

    // ASSERT
    itertools::assert_equal(selected, vec![0, 1]);
}

#[test]
fn nothing_to_select() {
    // ACT
    let selected = select_columns(&[], 5);

    // ASSERT
    assert!(selected.is_empty());
}
