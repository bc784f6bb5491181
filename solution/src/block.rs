#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use model::base_types::{BlockIdx, LocationIdx, TripIdx};
use model::descriptor::{Descriptor, DescriptorHalf};
use model::instance::Instance;
use time::{Duration, Time};

use crate::vehicle_task::VehicleTask;

/// Piece of a vehicle task between two points at which the crew may change. The descriptor is
/// the identity shared by the vehicle and the crew side; `trips` only serves reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub descriptor: Descriptor,
    pub trips: Vec<TripIdx>,
}

impl Block {
    pub fn start_location(&self) -> LocationIdx {
        self.descriptor.start.location
    }

    pub fn start_time(&self) -> Time {
        self.descriptor.start.time
    }

    pub fn end_location(&self) -> LocationIdx {
        self.descriptor.end.location
    }

    pub fn end_time(&self) -> Time {
        self.descriptor.end.time
    }

    pub fn duration(&self) -> Duration {
        self.end_time() - self.start_time()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "block {} [{} - {}] ({} trips)",
            self.descriptor,
            self.start_time(),
            self.end_time(),
            self.trips.len()
        )
    }
}

/// Splits a task at every idle or charge element that is long enough for a crew handover at its
/// location. The first block starts with the pull-out, the last one ends with the pull-in.
pub fn blocks_of(task: &VehicleTask, instance: &Instance) -> Vec<Block> {
    let elements = task.elements();
    let mut blocks = Vec::new();
    let mut half = DescriptorHalf::new(elements[0].from, elements[0].start_time);
    let mut trips = Vec::new();

    for element in elements.iter() {
        if element.is_stationary()
            && instance
                .location(element.from)
                .allows_handover(element.duration())
        {
            blocks.push(Block {
                descriptor: half.close(DescriptorHalf::new(element.from, element.start_time)),
                trips: std::mem::take(&mut trips),
            });
            half = DescriptorHalf::new(element.to, element.end_time);
        } else if let Some(trip) = element.trip() {
            trips.push(trip);
        }
    }

    let last = &elements[elements.len() - 1];
    blocks.push(Block {
        descriptor: half.close(DescriptorHalf::new(last.to, last.end_time)),
        trips,
    });
    blocks
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// BlockRegistry ////////////////////////
/////////////////////////////////////////////////////////////////////

/// All blocks seen so far, indexed in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    index: HashMap<Descriptor, BlockIdx>,
}

// static functions
impl BlockRegistry {
    pub fn new() -> BlockRegistry {
        BlockRegistry::default()
    }
}

// modifying methods
impl BlockRegistry {
    /// Returns the index of the block and whether it was unknown before.
    pub fn register(&mut self, block: Block) -> (BlockIdx, bool) {
        if let Some(idx) = self.index.get(&block.descriptor) {
            return (*idx, false);
        }
        let idx = BlockIdx(self.blocks.len());
        self.index.insert(block.descriptor, idx);
        self.blocks.push(block);
        (idx, true)
    }
}

// methods
impl BlockRegistry {
    pub fn get(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx.0]
    }

    pub fn find(&self, descriptor: &Descriptor) -> Option<BlockIdx> {
        self.index.get(descriptor).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockIdx, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockIdx(i), b))
    }
}
