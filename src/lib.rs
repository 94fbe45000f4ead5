//! ASCII point cloud reader
//!
//! Reads text files in which every non-blank line is one point record,
//! converts each token according to a caller-supplied field schema, and packs
//! the values into contiguous binary rows matching that schema's layout.
//!
//! This library provides:
//! - A datatype table and field schemas, built explicitly, from a textual
//!   spec, or from built-in and user-declared record layouts
//! - A separator-driven tokenizer
//! - Typed, range-checked token conversion into packed little-endian rows
//! - A header-only probe that counts records without converting them
//! - A full reader that fails the whole read on the first malformed line
//!
//! ```no_run
//! use ascii_cloud::{AsciiReader, PointType};
//! use std::path::Path;
//!
//! # fn main() -> ascii_cloud::Result<()> {
//! let mut reader = AsciiReader::new();
//! reader.set_point_type(PointType::Xyz);
//! reader.set_separators(",")?;
//!
//! let cloud = reader.read(Path::new("points.txt"), 0)?;
//! println!("{} points, {} bytes per row", cloud.width, cloud.row_stride);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod converter;
pub mod error;
pub mod header;
pub mod models;
pub mod reader;
pub mod schema;
pub mod tokenizer;

pub use config::ReaderConfig;
pub use error::{CloudError, Result};
pub use models::{Datatype, FieldDescriptor, FormatVersion, HeaderInfo, OutputCloud, size_of_tag};
pub use reader::{AsciiReader, ReadStatus};
pub use schema::{DeclaredField, PointType, RecordType, Schema};
pub use tokenizer::{SeparatorSet, tokenize};
