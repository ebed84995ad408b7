// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use super::*;

#[test]
fn test_block_permutation_is_a_bijection() {
    let perm = build_block_permutation();
    assert_eq!(perm.len(), N_BLOCKS);
    assert_eq!(perm[0], 0);

    let unique: HashSet<usize> = perm.as_slice().iter().copied().collect();
    assert_eq!(unique.len(), N_BLOCKS);
    assert!(perm.as_slice().iter().all(|&b| b < N_BLOCKS));
}

#[test]
fn test_block_permutation_follows_recurrence() {
    let perm = build_block_permutation();
    assert_eq!(&perm.as_slice()[..8], &[0, 3, 2, 5, 4, 7, 6, 9]);
    // The final even block wraps around to block 1.
    assert_eq!(perm[N_BLOCKS - 2], 510);
    assert_eq!(perm[N_BLOCKS - 1], 1);

    for window in perm.as_slice().windows(2) {
        let (current, next) = (window[0], window[1]);
        if current % 2 == 0 {
            assert_eq!(next, (current + 3) % N_BLOCKS);
        } else {
            assert_eq!(next, (current + N_BLOCKS - 1) % N_BLOCKS);
        }
    }
}

#[test]
fn test_cell_id_map_is_a_bijection() {
    let perm = build_block_permutation();
    let cell_ids = build_cell_id_map(&perm);
    assert_eq!(cell_ids.len(), N_CELLS);

    let unique: HashSet<usize> = cell_ids.as_slice().iter().copied().collect();
    assert_eq!(unique.len(), N_CELLS);
    assert!(cell_ids.as_slice().iter().all(|&c| c < N_CELLS));
}

#[test]
fn test_cell_id_map_expands_blocks() {
    let perm = build_block_permutation();
    let cell_ids = build_cell_id_map(&perm);
    // Traversal step 1 is physical block 3.
    assert_eq!(cell_ids[32], 96);
    assert_eq!(cell_ids[63], 127);
    // Traversal step 2 is physical block 2.
    assert_eq!(cell_ids[64], 64);
    assert_eq!(cell_ids[N_CELLS - 1], 63);
}

#[test]
fn test_cells_for_window_simple() {
    let mapper = CellAddressMapper::new();
    let cells = mapper.cells_for_window(3, 0, 4).unwrap();
    assert_eq!(cells, vec![96, 97, 98, 99]);
}

#[test]
fn test_cells_for_window_crosses_blocks() {
    let mapper = CellAddressMapper::new();
    // Starting in block 0 with phase 30, the third sample lands in the next
    // traversal block (physical block 3).
    let cells = mapper.cells_for_window(0, 30, 4).unwrap();
    assert_eq!(cells, vec![30, 31, 96, 97]);
}

#[test]
fn test_cells_for_window_wraps_around() {
    let mapper = CellAddressMapper::new();
    // Block 1 is the last traversal step; the window wraps to the start.
    let cells = mapper.cells_for_window(1, 31, 3).unwrap();
    assert_eq!(cells, vec![63, 0, 1]);
}

#[test]
fn test_cells_for_window_matches_linear_search() {
    let mapper = CellAddressMapper::new();
    let perm = build_block_permutation();
    let cell_ids = build_cell_id_map(&perm);
    for &(block, phase) in &[(0, 0), (17, 5), (510, 31), (1, 12), (255, 0)] {
        let fast = mapper.cells_for_window(block, phase, 128).unwrap();
        let slow = cells_for_window(&perm, &cell_ids, block, phase, 128).unwrap();
        assert_eq!(fast, slow, "block {block}, phase {phase}");
    }
}

#[test]
fn test_cells_for_window_is_deterministic() {
    let mapper = CellAddressMapper::new();
    let first = mapper.cells_for_window(42, 7, 96).unwrap();
    let second = mapper.cells_for_window(42, 7, 96).unwrap();
    assert_eq!(first, second);

    let other_mapper = CellAddressMapper::new();
    assert_eq!(first, other_mapper.cells_for_window(42, 7, 96).unwrap());
}

#[test]
fn test_unknown_block_is_an_error() {
    let mapper = CellAddressMapper::new();
    let result = mapper.cells_for_window(N_BLOCKS, 0, 10);
    assert_eq!(result, Err(CellMapError::BlockNotFound { block: N_BLOCKS }));

    let perm = build_block_permutation();
    let cell_ids = build_cell_id_map(&perm);
    let result = cells_for_window(&perm, &cell_ids, 9000, 0, 10);
    assert_eq!(result, Err(CellMapError::BlockNotFound { block: 9000 }));
}

#[test]
fn test_traversal_index_inverts_permutation() {
    let mapper = CellAddressMapper::new();
    for (step, &block) in mapper.block_order().as_slice().iter().enumerate() {
        assert_eq!(mapper.traversal_index(block), Ok(step));
    }
}
