// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Storage-cell addressing.
//!
//! The readout chip doesn't write its blocks in physical order; consecutive
//! acquisition blocks are wired to physical blocks following a fixed
//! permutation. Each sample of an event therefore has to be traced back to the
//! physical cell that stored it before anything can be said about its
//! pedestal.

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::constants::{N_BLOCKS, N_CELLS, N_CELLS_PER_BLOCK};

/// The order in which physical blocks are visited. `self[i]` is the physical
/// block visited at traversal step `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPermutation(Vec<usize>);

impl BlockPermutation {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find the traversal step at which `block` is visited.
    pub fn position(&self, block: usize) -> Option<usize> {
        self.0.iter().position(|&b| b == block)
    }
}

impl std::ops::Index<usize> for BlockPermutation {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// Physical cell ids in acquisition order. `self[k]` is the physical cell
/// backing acquisition index `k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellIdMap(Vec<usize>);

impl CellIdMap {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::ops::Index<usize> for CellIdMap {
    type Output = usize;

    fn index(&self, k: usize) -> &usize {
        &self.0[k]
    }
}

/// Generate the block traversal order. Starting at block 0, an even block is
/// followed by the block 3 ahead and an odd block by the block 1 behind (both
/// modulo the number of blocks).
pub fn build_block_permutation() -> BlockPermutation {
    let mut order = Vec::with_capacity(N_BLOCKS);
    let mut current = 0;
    order.push(current);
    for _ in 1..N_BLOCKS {
        current = if current % 2 == 0 {
            (current + 3) % N_BLOCKS
        } else {
            (current + N_BLOCKS - 1) % N_BLOCKS
        };
        order.push(current);
    }
    BlockPermutation(order)
}

/// Expand a block traversal order into per-cell ids; each traversal step
/// covers the 32 consecutive cells of its physical block.
pub fn build_cell_id_map(perm: &BlockPermutation) -> CellIdMap {
    let cell_ids = perm
        .as_slice()
        .iter()
        .flat_map(|&block| {
            let first = block * N_CELLS_PER_BLOCK;
            first..first + N_CELLS_PER_BLOCK
        })
        .collect();
    CellIdMap(cell_ids)
}

/// Get the physical cell ids backing each of the `window_length` samples of an
/// acquisition that started at `block` with offset `phase`. The cells are
/// returned in sample order.
///
/// This does a linear search of `perm`; [`CellAddressMapper::cells_for_window`]
/// does the same with a precomputed inverse.
pub fn cells_for_window(
    perm: &BlockPermutation,
    cell_id_map: &CellIdMap,
    block: usize,
    phase: i32,
    window_length: usize,
) -> Result<Vec<usize>, CellMapError> {
    let step = perm
        .position(block)
        .ok_or(CellMapError::BlockNotFound { block })?;
    Ok(window_cells(cell_id_map, step, phase, window_length))
}

fn window_cells(
    cell_id_map: &CellIdMap,
    step: usize,
    phase: i32,
    window_length: usize,
) -> Vec<usize> {
    let num_cells = cell_id_map.len() as i64;
    let first_cell = (step * N_CELLS_PER_BLOCK) as i64 + i64::from(phase);
    (0..window_length as i64)
        .map(|i| cell_id_map[(first_cell + i).rem_euclid(num_cells) as usize])
        .collect()
}

/// Owns the block traversal order, the cell-id map and the inverse of the
/// traversal order. Built once and shared read-only between all workers.
#[derive(Debug, Clone)]
pub struct CellAddressMapper {
    block_order: BlockPermutation,
    cell_ids: CellIdMap,

    /// `traversal[block]` is the step at which `block` is visited.
    traversal: Vec<Option<usize>>,
}

impl CellAddressMapper {
    pub fn new() -> CellAddressMapper {
        let block_order = build_block_permutation();
        let cell_ids = build_cell_id_map(&block_order);
        let mut traversal = vec![None; N_BLOCKS];
        for (step, &block) in block_order.as_slice().iter().enumerate() {
            traversal[block] = Some(step);
        }
        debug_assert_eq!(cell_ids.len(), N_CELLS);

        CellAddressMapper {
            block_order,
            cell_ids,
            traversal,
        }
    }

    pub fn block_order(&self) -> &BlockPermutation {
        &self.block_order
    }

    pub fn cell_ids(&self) -> &CellIdMap {
        &self.cell_ids
    }

    /// The traversal step at which `block` is visited.
    pub fn traversal_index(&self, block: usize) -> Result<usize, CellMapError> {
        self.traversal
            .get(block)
            .copied()
            .flatten()
            .ok_or(CellMapError::BlockNotFound { block })
    }

    /// Get the physical cell ids backing each sample of an acquisition window.
    /// Identical to [`cells_for_window`].
    pub fn cells_for_window(
        &self,
        block: usize,
        phase: i32,
        window_length: usize,
    ) -> Result<Vec<usize>, CellMapError> {
        let step = self.traversal_index(block)?;
        Ok(window_cells(&self.cell_ids, step, phase, window_length))
    }
}

impl Default for CellAddressMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellMapError {
    #[error("Block {block} isn't in the block traversal order")]
    BlockNotFound { block: usize },
}
