use derive_more::Display;
use derive_more::From;
use serde::{Deserialize, Serialize};

pub type Idx = usize;

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationIdx(pub Idx);

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripIdx(pub Idx);

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockIdx(pub Idx);

/// Node of the vehicle network: trips first, then the depot start and the depot end.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeIdx {
    #[display(fmt = "trip_{}", _0)]
    Trip(TripIdx),
    #[display(fmt = "depot_start")]
    DepotStart,
    #[display(fmt = "depot_end")]
    DepotEnd,
}

impl NodeIdx {
    pub fn trip_from(idx: Idx) -> NodeIdx {
        NodeIdx::Trip(TripIdx(idx))
    }

    pub fn trip(&self) -> Option<TripIdx> {
        match self {
            NodeIdx::Trip(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_depot(&self) -> bool {
        !matches!(self, NodeIdx::Trip(_))
    }

    /// Dense position: trips keep their index, depot start is `trip_count`, depot end
    /// `trip_count + 1`.
    pub fn position(&self, trip_count: usize) -> usize {
        match self {
            NodeIdx::Trip(t) => t.0,
            NodeIdx::DepotStart => trip_count,
            NodeIdx::DepotEnd => trip_count + 1,
        }
    }

    pub fn from_position(position: usize, trip_count: usize) -> NodeIdx {
        if position < trip_count {
            NodeIdx::trip_from(position)
        } else if position == trip_count {
            NodeIdx::DepotStart
        } else {
            NodeIdx::DepotEnd
        }
    }
}

pub type Cost = f64;
pub type Soc = f64; // state of charge in percent of battery capacity
pub type Meter = u32;
pub type Kwh = f64;
