//! Field schema and built-in point record layouts.
//!
//! A [`Schema`] is the ordered, contiguous list of fields that makes up one
//! packed row. Schemas come from an explicit field list, from a compact
//! textual spec, or from a statically declared record layout. Declared
//! layouts may include `_` padding fields, which are dropped when the schema
//! is built.

use crate::constants::PADDING_FIELD_NAME;
use crate::error::{CloudError, Result};
use crate::models::{Datatype, FieldDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// Ordered field list describing one packed row
///
/// Deserializing goes through [`Schema::new`], so a schema loaded from a
/// config file is validated like one built in code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl TryFrom<Vec<FieldDescriptor>> for Schema {
    type Error = CloudError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<FieldDescriptor> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl Schema {
    /// Validate and wrap an explicit field list.
    ///
    /// Offsets must start at zero and follow each other without gaps or
    /// overlap, and every field needs a positive count.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut expected_offset = 0;
        for field in &fields {
            if field.count == 0 {
                return Err(CloudError::InvalidSchema {
                    reason: format!("field '{}' has a count of zero", field.name),
                });
            }
            if field.offset != expected_offset {
                return Err(CloudError::InvalidSchema {
                    reason: format!(
                        "field '{}' starts at byte {} but the preceding fields end at byte {}",
                        field.name, field.offset, expected_offset
                    ),
                });
            }
            expected_offset = field.end();
        }
        Ok(Self { fields })
    }

    /// Build a schema from (name, datatype, count) triples, laying fields
    /// out back to back
    pub fn contiguous<N: Into<String>>(
        fields: impl IntoIterator<Item = (N, Datatype, u32)>,
    ) -> Result<Self> {
        let mut offset = 0;
        let mut descriptors = Vec::new();
        for (name, datatype, count) in fields {
            let descriptor = FieldDescriptor::new(name, datatype, offset, count);
            offset = descriptor.end();
            descriptors.push(descriptor);
        }
        Self::new(descriptors)
    }

    /// Build a schema from a declared record layout, dropping padding
    pub fn from_layout(layout: &[DeclaredField]) -> Result<Self> {
        let schema = Self::contiguous(
            layout
                .iter()
                .filter(|field| field.name != PADDING_FIELD_NAME)
                .map(|field| (field.name, field.datatype, field.count)),
        )?;
        debug!(
            "Built schema from layout: {} declared fields, {} kept, stride {}",
            layout.len(),
            schema.fields.len(),
            schema.row_stride()
        );
        Ok(schema)
    }

    /// Build the schema of a statically described record type
    pub fn for_record<T: RecordType>() -> Result<Self> {
        Self::from_layout(T::LAYOUT)
    }

    /// Parse a compact spec such as `x:f32,y:f32,z:f32,rgb:u8x3`
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let mut fields = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, type_spec) =
                entry
                    .split_once(':')
                    .ok_or_else(|| CloudError::InvalidSchema {
                        reason: format!("field spec '{}' is not of the form name:type", entry),
                    })?;

            let (type_name, count) = match type_spec.rsplit_once('x') {
                Some((type_name, count))
                    if !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    let count = count.parse::<u32>().map_err(|_| CloudError::InvalidSchema {
                        reason: format!("invalid count in field spec '{}'", entry),
                    })?;
                    (type_name, count)
                }
                _ => (type_spec, 1),
            };

            let name = name.trim();
            if name.is_empty() {
                return Err(CloudError::InvalidSchema {
                    reason: format!("field spec '{}' has an empty name", entry),
                });
            }
            fields.push((name.to_string(), Datatype::from_str(type_name)?, count));
        }
        Self::contiguous(fields)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Bytes in one packed row
    pub fn row_stride(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::byte_size).sum()
    }

    /// Number of tokens one line must carry
    pub fn expected_token_count(&self) -> usize {
        self.fields.iter().map(|field| field.count as usize).sum()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|field| {
                if field.count == 1 {
                    format!("{}:{}", field.name, field.datatype)
                } else {
                    format!("{}:{}x{}", field.name, field.datatype, field.count)
                }
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

/// One field of a statically declared record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredField {
    pub name: &'static str,
    pub datatype: Datatype,
    pub count: u32,
}

impl DeclaredField {
    pub const fn new(name: &'static str, datatype: Datatype, count: u32) -> Self {
        Self {
            name,
            datatype,
            count,
        }
    }

    /// Four bytes of alignment padding
    pub const fn padding() -> Self {
        Self::new(PADDING_FIELD_NAME, Datatype::Float32, 1)
    }
}

/// A record type with a layout known at compile time
pub trait RecordType {
    const LAYOUT: &'static [DeclaredField];
}

const F32: Datatype = Datatype::Float32;

const XYZ: &[DeclaredField] = &[
    DeclaredField::new("x", F32, 1),
    DeclaredField::new("y", F32, 1),
    DeclaredField::new("z", F32, 1),
    DeclaredField::padding(),
];

const XYZI: &[DeclaredField] = &[
    DeclaredField::new("x", F32, 1),
    DeclaredField::new("y", F32, 1),
    DeclaredField::new("z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("intensity", F32, 1),
];

const XYZRGBA: &[DeclaredField] = &[
    DeclaredField::new("x", F32, 1),
    DeclaredField::new("y", F32, 1),
    DeclaredField::new("z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("rgba", Datatype::Uint32, 1),
];

const XYZL: &[DeclaredField] = &[
    DeclaredField::new("x", F32, 1),
    DeclaredField::new("y", F32, 1),
    DeclaredField::new("z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("label", Datatype::Uint32, 1),
];

const NORMAL: &[DeclaredField] = &[
    DeclaredField::new("normal_x", F32, 1),
    DeclaredField::new("normal_y", F32, 1),
    DeclaredField::new("normal_z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("curvature", F32, 1),
];

const XYZ_NORMAL: &[DeclaredField] = &[
    DeclaredField::new("x", F32, 1),
    DeclaredField::new("y", F32, 1),
    DeclaredField::new("z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("normal_x", F32, 1),
    DeclaredField::new("normal_y", F32, 1),
    DeclaredField::new("normal_z", F32, 1),
    DeclaredField::padding(),
    DeclaredField::new("curvature", F32, 1),
];

const POINT_UV: &[DeclaredField] = &[
    DeclaredField::new("u", F32, 1),
    DeclaredField::new("v", F32, 1),
];

/// Built-in point record layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    Xyz,
    XyzI,
    XyzRgba,
    XyzL,
    Normal,
    XyzNormal,
    PointUv,
}

impl PointType {
    pub const ALL: [PointType; 7] = [
        PointType::Xyz,
        PointType::XyzI,
        PointType::XyzRgba,
        PointType::XyzL,
        PointType::Normal,
        PointType::XyzNormal,
        PointType::PointUv,
    ];

    /// Declared layout, padding included
    pub fn layout(&self) -> &'static [DeclaredField] {
        match self {
            PointType::Xyz => XYZ,
            PointType::XyzI => XYZI,
            PointType::XyzRgba => XYZRGBA,
            PointType::XyzL => XYZL,
            PointType::Normal => NORMAL,
            PointType::XyzNormal => XYZ_NORMAL,
            PointType::PointUv => POINT_UV,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::Xyz => "xyz",
            PointType::XyzI => "xyzi",
            PointType::XyzRgba => "xyzrgba",
            PointType::XyzL => "xyzl",
            PointType::Normal => "normal",
            PointType::XyzNormal => "xyznormal",
            PointType::PointUv => "pointuv",
        }
    }

    /// Schema of this point type, built once per process
    pub fn schema(&self) -> &'static Schema {
        static REGISTRY: OnceLock<HashMap<PointType, Schema>> = OnceLock::new();
        let registry = REGISTRY.get_or_init(|| {
            PointType::ALL
                .iter()
                .map(|point_type| {
                    let schema = Schema::from_layout(point_type.layout());
                    debug_assert!(
                        schema.is_ok(),
                        "built-in layout '{}' is invalid: {:?}",
                        point_type,
                        schema
                    );
                    (*point_type, schema.unwrap_or_default())
                })
                .collect()
        });
        &registry[self]
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointType {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PointType::ALL
            .iter()
            .copied()
            .find(|point_type| point_type.as_str() == wanted)
            .ok_or_else(|| CloudError::Configuration {
                message: format!("unknown point type '{}'", s),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyz_stride() {
        let schema = Schema::contiguous([
            ("x", Datatype::Float32, 1),
            ("y", Datatype::Float32, 1),
            ("z", Datatype::Float32, 1),
        ])
        .unwrap();
        assert_eq!(schema.row_stride(), 12);
        assert_eq!(schema.expected_token_count(), 3);
        assert_eq!(schema.fields()[2].offset, 8);
    }

    #[test]
    fn test_rejects_gaps_and_overlaps() {
        let gap = Schema::new(vec![
            FieldDescriptor::new("x", Datatype::Float32, 0, 1),
            FieldDescriptor::new("y", Datatype::Float32, 8, 1),
        ]);
        assert!(matches!(gap, Err(CloudError::InvalidSchema { .. })));

        let overlap = Schema::new(vec![
            FieldDescriptor::new("x", Datatype::Float64, 0, 1),
            FieldDescriptor::new("y", Datatype::Float32, 4, 1),
        ]);
        assert!(matches!(overlap, Err(CloudError::InvalidSchema { .. })));

        let shifted = Schema::new(vec![FieldDescriptor::new("x", Datatype::Int8, 1, 1)]);
        assert!(shifted.is_err());
    }

    #[test]
    fn test_rejects_zero_count() {
        let result = Schema::new(vec![FieldDescriptor::new("x", Datatype::Int8, 0, 0)]);
        assert!(matches!(result, Err(CloudError::InvalidSchema { .. })));
    }

    #[test]
    fn test_empty_schema_is_allowed_until_read() {
        let schema = Schema::new(Vec::new()).unwrap();
        assert!(schema.is_empty());
        assert_eq!(schema.row_stride(), 0);
    }

    #[test]
    fn test_padding_removed_from_layouts() {
        let schema = PointType::XyzI.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z", "intensity"]);
        assert_eq!(schema.fields()[3].offset, 12);
        assert_eq!(schema.row_stride(), 16);

        let normals = PointType::XyzNormal.schema();
        assert_eq!(normals.expected_token_count(), 7);
        assert_eq!(normals.row_stride(), 28);
    }

    #[test]
    fn test_every_point_type_builds() {
        for point_type in PointType::ALL {
            let schema = point_type.schema();
            assert!(!schema.is_empty(), "{} built an empty schema", point_type);
            assert!(schema.row_stride() > 0);
            assert_eq!(point_type.as_str().parse::<PointType>().unwrap(), point_type);
        }
    }

    #[test]
    fn test_every_builtin_layout_is_valid() {
        for point_type in PointType::ALL {
            let schema = Schema::from_layout(point_type.layout()).unwrap();
            assert_eq!(&schema, point_type.schema());
        }
    }

    #[test]
    fn test_deserialized_schema_is_validated() {
        let valid = r#"[
            {"name": "x", "datatype": "float32", "count": 1, "offset": 0},
            {"name": "rgb", "datatype": "uint8", "count": 3, "offset": 4}
        ]"#;
        let schema: Schema = serde_json::from_str(valid).unwrap();
        assert_eq!(schema.row_stride(), 7);
        assert_eq!(schema.expected_token_count(), 4);

        let zero_count = r#"[{"name": "x", "datatype": "float32", "count": 0, "offset": 0}]"#;
        let err = serde_json::from_str::<Schema>(zero_count).unwrap_err();
        assert!(err.to_string().contains("count of zero"), "{}", err);

        let gap = r#"[{"name": "x", "datatype": "float32", "count": 1, "offset": 100}]"#;
        let err = serde_json::from_str::<Schema>(gap).unwrap_err();
        assert!(err.to_string().contains("starts at byte 100"), "{}", err);
    }

    #[test]
    fn test_schema_serializes_as_field_list() {
        let schema = PointType::Xyz.schema();
        let json = serde_json::to_string(schema).unwrap();
        assert!(json.starts_with('['), "{}", json);
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, schema);
    }

    #[test]
    fn test_custom_record_type() {
        struct Labelled;
        impl RecordType for Labelled {
            const LAYOUT: &'static [DeclaredField] = &[
                DeclaredField::new("position", Datatype::Float64, 3),
                DeclaredField::padding(),
                DeclaredField::new("class", Datatype::Uint8, 1),
            ];
        }

        let schema = Schema::for_record::<Labelled>().unwrap();
        assert_eq!(schema.row_stride(), 25);
        assert_eq!(schema.expected_token_count(), 4);
        assert_eq!(schema.fields()[1].offset, 24);
    }

    #[test]
    fn test_parse_spec() {
        let schema = Schema::parse_spec("x:f32, y:f32, z:f32, rgb:u8x3, t:float64").unwrap();
        assert_eq!(schema.fields().len(), 5);
        assert_eq!(schema.fields()[3].count, 3);
        assert_eq!(schema.fields()[4].offset, 15);
        assert_eq!(schema.row_stride(), 23);
        assert_eq!(schema.to_string(), "x:float32,y:float32,z:float32,rgb:uint8x3,t:float64");
    }

    #[test]
    fn test_parse_spec_errors() {
        assert!(Schema::parse_spec("x").is_err());
        assert!(Schema::parse_spec("x:f16").is_err());
        assert!(Schema::parse_spec(":f32").is_err());
        assert!(Schema::parse_spec("x:f32x0").is_err());
    }
}
