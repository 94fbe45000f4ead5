//! Application constants for the ASCII cloud reader
//!
//! Default separators, extensions and the fixed metadata reported for
//! ASCII files, which carry no acquisition information of their own.

// =============================================================================
// Tokenizing
// =============================================================================

/// Default separator characters: space, tab, newline and comma
pub const DEFAULT_SEPARATORS: &str = " \t\n,";

// =============================================================================
// File handling
// =============================================================================

/// Extension used by callers that opt into extension checking
pub const DEFAULT_EXTENSION: &str = ".txt";

/// Size of a TAR entry header; payloads inside a TAR start one byte past it
pub const TAR_HEADER_SIZE: u64 = 512;

/// Byte offset at which reading starts when none is configured
pub const DEFAULT_OFFSET: u64 = 0;

// =============================================================================
// Reported metadata
// =============================================================================

/// Sensor origin reported for ASCII files (x, y, z, w)
pub const ZERO_ORIGIN: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Sensor orientation reported for ASCII files, as (w, x, y, z)
pub const IDENTITY_ORIENTATION: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Name of fields that only pad a record layout and carry no data
pub const PADDING_FIELD_NAME: &str = "_";

/// Height of every cloud produced by this reader (clouds are unorganized)
pub const CLOUD_HEIGHT: u32 = 1;
