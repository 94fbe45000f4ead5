//! Typed token conversion into packed row bytes.
//!
//! Each token is parsed as a literal of its field's datatype and written
//! little-endian at the field's offset (plus the component index times the
//! scalar width). Nothing outside the target component's bytes is touched.

use crate::error::{CloudError, Result};
use crate::models::{Datatype, FieldDescriptor};
use std::num::IntErrorKind;

/// Why a token could not be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertFailure {
    /// Not a valid literal of the requested type
    Parse,
    /// A valid literal outside the type's representable range
    Overflow,
}

/// Parse `token` as `datatype` and write its bytes to the start of `target`.
///
/// Returns the number of bytes written.
pub fn convert_scalar(
    token: &str,
    datatype: Datatype,
    target: &mut [u8],
) -> std::result::Result<usize, ConvertFailure> {
    match datatype {
        Datatype::Int8 => write(target, &narrow::<i8>(token)?.to_le_bytes()),
        Datatype::Uint8 => write(target, &narrow::<u8>(token)?.to_le_bytes()),
        Datatype::Int16 => write(target, &narrow::<i16>(token)?.to_le_bytes()),
        Datatype::Uint16 => write(target, &narrow::<u16>(token)?.to_le_bytes()),
        Datatype::Int32 => write(target, &narrow::<i32>(token)?.to_le_bytes()),
        Datatype::Uint32 => write(target, &narrow::<u32>(token)?.to_le_bytes()),
        Datatype::Float32 => {
            let value = token
                .parse::<f32>()
                .map_err(|_| ConvertFailure::Parse)?;
            check_finite(token, value.is_infinite())?;
            write(target, &value.to_le_bytes())
        }
        Datatype::Float64 => {
            let value = token
                .parse::<f64>()
                .map_err(|_| ConvertFailure::Parse)?;
            check_finite(token, value.is_infinite())?;
            write(target, &value.to_le_bytes())
        }
    }
}

/// Convert one component of `field` from `token` into `row`.
///
/// `line` is only used for error context.
pub fn convert_component(
    token: &str,
    field: &FieldDescriptor,
    component: u32,
    row: &mut [u8],
    line: usize,
) -> Result<()> {
    let width = field.datatype.byte_size();
    let start = field.offset + component as usize * width;
    let target = &mut row[start..start + width];

    convert_scalar(token, field.datatype, target)
        .map(|_| ())
        .map_err(|failure| {
            let field_name = field.name.clone();
            let token = token.to_string();
            let datatype = field.datatype.as_str();
            match failure {
                ConvertFailure::Parse => CloudError::TokenParse {
                    line,
                    field: field_name,
                    token,
                    datatype,
                },
                ConvertFailure::Overflow => CloudError::TokenOverflow {
                    line,
                    field: field_name,
                    token,
                    datatype,
                },
            }
        })
}

/// Convert all components of `field`, consuming one token per component
pub fn convert_field<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &FieldDescriptor,
    row: &mut [u8],
    line: usize,
) -> Result<()> {
    for component in 0..field.count {
        // Token counts are checked against the schema before conversion.
        let token = tokens.next().ok_or(CloudError::FieldCountMismatch {
            line,
            expected: component as usize + 1,
            found: component as usize,
        })?;
        convert_component(token, field, component, row, line)?;
    }
    Ok(())
}

fn write(target: &mut [u8], bytes: &[u8]) -> std::result::Result<usize, ConvertFailure> {
    target[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Parse an integer literal through i128 and narrow it to `T`
fn narrow<T: TryFrom<i128>>(token: &str) -> std::result::Result<T, ConvertFailure> {
    let wide = token.parse::<i128>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConvertFailure::Overflow,
        _ => ConvertFailure::Parse,
    })?;
    T::try_from(wide).map_err(|_| ConvertFailure::Overflow)
}

/// A finite literal that rounds to infinity is out of range
fn check_finite(token: &str, is_infinite: bool) -> std::result::Result<(), ConvertFailure> {
    if !is_infinite {
        return Ok(());
    }
    let spelled = token
        .trim_start_matches(&['+', '-'][..])
        .to_ascii_lowercase();
    if spelled == "inf" || spelled == "infinity" {
        Ok(())
    } else {
        Err(ConvertFailure::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(datatype: Datatype) -> FieldDescriptor {
        FieldDescriptor::new("v", datatype, 0, 1)
    }

    #[test]
    fn test_integer_conversions() {
        let mut buf = [0u8; 8];
        assert_eq!(convert_scalar("-12", Datatype::Int8, &mut buf), Ok(1));
        assert_eq!(buf[0] as i8, -12);

        assert_eq!(convert_scalar("65535", Datatype::Uint16, &mut buf), Ok(2));
        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), 65535);

        assert_eq!(convert_scalar("+42", Datatype::Int32, &mut buf), Ok(4));
        assert_eq!(i32::from_le_bytes(buf[..4].try_into().unwrap()), 42);

        assert_eq!(convert_scalar("-0", Datatype::Uint32, &mut buf), Ok(4));
        assert_eq!(u32::from_le_bytes(buf[..4].try_into().unwrap()), 0);
    }

    #[test]
    fn test_float_conversions() {
        let mut buf = [0u8; 8];
        assert_eq!(convert_scalar("1.5e2", Datatype::Float32, &mut buf), Ok(4));
        assert_eq!(f32::from_le_bytes(buf[..4].try_into().unwrap()), 150.0);

        assert_eq!(convert_scalar("-0.125", Datatype::Float64, &mut buf), Ok(8));
        assert_eq!(f64::from_le_bytes(buf), -0.125);

        assert_eq!(convert_scalar("nan", Datatype::Float32, &mut buf), Ok(4));
        assert!(f32::from_le_bytes(buf[..4].try_into().unwrap()).is_nan());

        assert_eq!(convert_scalar("-inf", Datatype::Float64, &mut buf), Ok(8));
    }

    #[test]
    fn test_parse_failures() {
        let mut buf = [0u8; 8];
        assert_eq!(
            convert_scalar("abc", Datatype::Int32, &mut buf),
            Err(ConvertFailure::Parse)
        );
        assert_eq!(
            convert_scalar("1.0", Datatype::Int16, &mut buf),
            Err(ConvertFailure::Parse)
        );
        assert_eq!(
            convert_scalar("", Datatype::Float32, &mut buf),
            Err(ConvertFailure::Parse)
        );
        assert_eq!(
            convert_scalar("1,5", Datatype::Float64, &mut buf),
            Err(ConvertFailure::Parse)
        );
    }

    #[test]
    fn test_range_failures() {
        let mut buf = [0u8; 8];
        assert_eq!(
            convert_scalar("99999999999", Datatype::Int16, &mut buf),
            Err(ConvertFailure::Overflow)
        );
        assert_eq!(
            convert_scalar("256", Datatype::Uint8, &mut buf),
            Err(ConvertFailure::Overflow)
        );
        assert_eq!(
            convert_scalar("-1", Datatype::Uint16, &mut buf),
            Err(ConvertFailure::Overflow)
        );
        assert_eq!(
            convert_scalar("-129", Datatype::Int8, &mut buf),
            Err(ConvertFailure::Overflow)
        );
        assert_eq!(
            convert_scalar("1e40", Datatype::Float32, &mut buf),
            Err(ConvertFailure::Overflow)
        );
        assert_eq!(
            convert_scalar("999999999999999999999999999999999999999999", Datatype::Int32, &mut buf),
            Err(ConvertFailure::Overflow)
        );
    }

    #[test]
    fn test_component_writes_only_its_bytes() {
        let rgb = FieldDescriptor::new("rgb", Datatype::Uint8, 1, 3);
        let mut row = [0xAAu8; 5];

        convert_component("7", &rgb, 1, &mut row, 1).unwrap();
        assert_eq!(row, [0xAA, 0xAA, 7, 0xAA, 0xAA]);
    }

    #[test]
    fn test_convert_field_consumes_count_tokens() {
        let normal = FieldDescriptor::new("normal", Datatype::Int16, 0, 3);
        let mut row = [0u8; 6];
        let mut tokens = ["1", "-2", "3", "extra"].into_iter();

        convert_field(&mut tokens, &normal, &mut row, 1).unwrap();
        assert_eq!(tokens.next(), Some("extra"));
        assert_eq!(i16::from_le_bytes([row[2], row[3]]), -2);
    }

    #[test]
    fn test_errors_carry_context() {
        let mut row = [0u8; 4];
        match convert_component("abc", &field(Datatype::Int32), 0, &mut row, 7) {
            Err(CloudError::TokenParse {
                line,
                field,
                token,
                datatype,
            }) => {
                assert_eq!(line, 7);
                assert_eq!(field, "v");
                assert_eq!(token, "abc");
                assert_eq!(datatype, "int32");
            }
            other => panic!("Expected TokenParse, got {:?}", other),
        }

        let mut row = [0u8; 2];
        assert!(matches!(
            convert_component("99999999999", &field(Datatype::Int16), 0, &mut row, 1),
            Err(CloudError::TokenOverflow { .. })
        ));
        assert_eq!(row, [0, 0]);
    }
}
