pub mod clustering;
pub mod config;
pub mod district;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod polyline;
pub mod run;
pub mod spatial;
pub mod splitter;

pub use clustering::{cluster_students, ClusterOutcome};
pub use config::SuggestionConfig;
pub use district::{District, DistrictResolver, KeywordDistrictResolver};
pub use error::{GeoError, RunNotice, SequenceError};
pub use filter::{filter_students, FilterMode, FilterOutcome};
pub use ingest::{parse_students, StudentRecord};
pub use models::{
    Anchor, Coordinate, RouteDirection, RouteWarning, StopCandidate, StopKind, Student,
    SuggestedRoute, UnassignedReason, UnassignedStudent,
};
pub use polyline::decode_polyline;
pub use run::{SuggestionOutcome, SuggestionRun};
pub use spatial::{haversine, haversine_distance, is_within_corridor};
pub use splitter::{mirror_route, split_routes, validate_sequence};
