//! Core data structures for ASCII point cloud reads.
//!
//! Defines the field datatype table, field descriptors, the metadata
//! produced by a header scan, and the packed output cloud.

use crate::constants::CLOUD_HEIGHT;
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar datatype of a point field.
///
/// Discriminants match the PointField wire tags used by point cloud
/// containers (INT8 = 1 through FLOAT64 = 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Datatype {
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl Datatype {
    /// All datatypes in tag order
    pub const ALL: [Datatype; 8] = [
        Datatype::Int8,
        Datatype::Uint8,
        Datatype::Int16,
        Datatype::Uint16,
        Datatype::Int32,
        Datatype::Uint32,
        Datatype::Float32,
        Datatype::Float64,
    ];

    /// Get byte size for this datatype
    pub fn byte_size(&self) -> usize {
        match self {
            Datatype::Int8 | Datatype::Uint8 => 1,
            Datatype::Int16 | Datatype::Uint16 => 2,
            Datatype::Int32 | Datatype::Uint32 | Datatype::Float32 => 4,
            Datatype::Float64 => 8,
        }
    }

    /// Wire tag of this datatype
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Resolve a wire tag, failing for anything outside the fixed set
    pub fn from_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|datatype| datatype.tag() == tag)
            .ok_or(CloudError::UnknownDatatype { tag })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Float32 | Datatype::Float64)
    }

    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Int8 => "int8",
            Datatype::Uint8 => "uint8",
            Datatype::Int16 => "int16",
            Datatype::Uint16 => "uint16",
            Datatype::Int32 => "int32",
            Datatype::Uint32 => "uint32",
            Datatype::Float32 => "float32",
            Datatype::Float64 => "float64",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" | "i8" => Ok(Datatype::Int8),
            "uint8" | "u8" => Ok(Datatype::Uint8),
            "int16" | "i16" => Ok(Datatype::Int16),
            "uint16" | "u16" => Ok(Datatype::Uint16),
            "int32" | "i32" => Ok(Datatype::Int32),
            "uint32" | "u32" => Ok(Datatype::Uint32),
            "float32" | "f32" => Ok(Datatype::Float32),
            "float64" | "f64" => Ok(Datatype::Float64),
            other => Err(CloudError::InvalidSchema {
                reason: format!("unknown datatype name '{}'", other),
            }),
        }
    }
}

/// Byte width of the datatype with the given wire tag
pub fn size_of_tag(tag: u8) -> Result<usize> {
    Datatype::from_tag(tag).map(|datatype| datatype.byte_size())
}

/// One field of a packed point record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub datatype: Datatype,
    /// Number of scalar components (e.g. 3 for a packed vector)
    pub count: u32,
    /// Byte offset of the first component within a row
    pub offset: usize,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, datatype: Datatype, offset: usize, count: u32) -> Self {
        Self {
            name: name.into(),
            datatype,
            count,
            offset,
        }
    }

    /// Total bytes this field occupies in a row
    pub fn byte_size(&self) -> usize {
        self.datatype.byte_size() * self.count as usize
    }

    /// Offset one past the last byte of this field
    pub fn end(&self) -> usize {
        self.offset + self.byte_size()
    }
}

/// File format version reported alongside a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Files without acquisition metadata
    V6,
    /// Files carrying sensor origin and orientation
    V7,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::V6 => f.write_str("v6"),
            FormatVersion::V7 => f.write_str("v7"),
        }
    }
}

/// Result of a header-only read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Number of non-blank lines in the payload
    pub point_count: usize,
    pub row_stride: usize,
    /// Sensor origin (x, y, z, w)
    pub origin: [f32; 4],
    /// Sensor orientation quaternion (w, x, y, z)
    pub orientation: [f32; 4],
    pub version: FormatVersion,
    /// Byte offset at which the text payload begins
    pub data_offset: u64,
}

/// Scalar types that can be decoded from packed row bytes
pub trait Scalar: Copy {
    const DATATYPE: Datatype;

    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty => $datatype:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DATATYPE: Datatype = Datatype::$datatype;

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
);

/// Packed point cloud produced by a full read.
///
/// Rows are stored back to back, `row_stride` bytes each, with every scalar
/// in little-endian byte order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputCloud {
    pub width: usize,
    pub height: u32,
    pub row_stride: usize,
    pub fields: Vec<FieldDescriptor>,
    pub is_dense: bool,
    pub origin: [f32; 4],
    pub orientation: [f32; 4],
    pub version: FormatVersion,
    pub data: Vec<u8>,
}

impl OutputCloud {
    /// Build an empty cloud carrying the metadata of a header scan
    pub fn from_header(header: &HeaderInfo, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            width: header.point_count,
            height: CLOUD_HEIGHT,
            row_stride: header.row_stride,
            fields,
            is_dense: true,
            origin: header.origin,
            orientation: header.orientation,
            version: header.version,
            data: Vec::new(),
        }
    }

    /// Number of points in the cloud
    pub fn len(&self) -> usize {
        self.width * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per row of the (single-row) cloud
    pub fn row_step(&self) -> usize {
        self.width * self.row_stride
    }

    /// Total bytes of packed point data
    pub fn total_bytes(&self) -> usize {
        self.row_step() * self.height as usize
    }

    /// Packed bytes of point `index`
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len() || self.row_stride == 0 {
            return None;
        }
        let start = index * self.row_stride;
        self.data.get(start..start + self.row_stride)
    }

    /// Iterate over packed rows in file order
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.row_stride.max(1))
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Decode the first component of field `name` across all rows.
    ///
    /// Returns `None` if the field does not exist or `T` does not match its
    /// datatype.
    pub fn field_values<T: Scalar>(&self, name: &str) -> Option<Vec<T>> {
        let field = self.field(name)?;
        if field.datatype != T::DATATYPE {
            return None;
        }
        Some(
            self.rows()
                .map(|row| T::from_le_slice(&row[field.offset..]))
                .collect(),
        )
    }
}
