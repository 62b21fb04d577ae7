//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{LandmarkId, Point2d, SegmentId};

pub use crate::profile::{AggregateError, FlagRing, Profile, ProfileAggregate};

pub use crate::segment::{
    BorderSegment, CommandError, RingCommand, RingError, SegmentRing, SegmentRuleset, Segmenter,
    SegmenterError, UpdateError, Window, DEFAULT_RULESET,
};

pub use crate::segmented::{AnyProfile, LandmarkRecord, SegmentRecord, SegmentedProfile};

pub use crate::consensus::{
    compare_population, population_fit, resample_members, ConsensusBuilder, ConsensusError,
};

pub use crate::mesh::{DeviationPalette, Mesh, MeshEdge, MeshEdgeRecord, MeshError, MeshVertex};

pub use crate::consts::{CONSENSUS_WORKING_LEN, DEFAULT_MIN_SEGMENT_LEN};
