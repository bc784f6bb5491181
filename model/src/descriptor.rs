use std::fmt;

use time::Time;

use crate::base_types::LocationIdx;

/// One end of a block: where and when a crew takes over or hands off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorHalf {
    pub location: LocationIdx,
    pub time: Time,
}

impl DescriptorHalf {
    pub fn new(location: LocationIdx, time: Time) -> DescriptorHalf {
        DescriptorHalf { location, time }
    }

    pub fn close(self, end: DescriptorHalf) -> Descriptor {
        Descriptor { start: self, end }
    }
}

/// Identity of a block, shared between vehicle and crew side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Descriptor {
    pub start: DescriptorHalf,
    pub end: DescriptorHalf,
}

impl Descriptor {
    pub fn new(
        start_location: LocationIdx,
        start_time: Time,
        end_location: LocationIdx,
        end_time: Time,
    ) -> Descriptor {
        Descriptor {
            start: DescriptorHalf::new(start_location, start_time),
            end: DescriptorHalf::new(end_location, end_time),
        }
    }
}

impl fmt::Display for DescriptorHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}#t{}", self.location, self.time.in_sec())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.start, self.end)
    }
}
