//! Global constants for hostwatch
//!
//! Centralized location for pipeline-wide constants

/// Maximum level count for object name indexes and the event queue.
pub const SKIPLIST_MAX_LEVELS: usize = 16;

/// Level promotion probability for skiplist inserts.
pub const SKIPLIST_PROBABILITY: f32 = 0.5;

/// File suffix picked up by directory includes.
pub const CFG_FILE_SUFFIX: &str = ".cfg";

/// Banner written at the top of a generated object cache file.
pub const CACHE_BANNER: &str = "# hostwatch object cache file\n# do not edit - regenerated on every load\n";
