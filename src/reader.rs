//! ASCII point cloud reader.
//!
//! A full read is two traversals of the same byte range: a header scan that
//! counts records and pre-sizes the output, then a fill pass that converts
//! every line into a packed row. Any malformed line aborts the whole read;
//! no partial rows are ever returned.

use crate::config::{ReaderConfig, validate_extension};
use crate::converter::convert_field;
use crate::error::{CloudError, Result};
use crate::header::{PayloadLines, scan_header};
use crate::models::{Datatype, FieldDescriptor, HeaderInfo, OutputCloud};
use crate::schema::{PointType, RecordType, Schema};
use crate::tokenizer::{SeparatorSet, tokenize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stage of one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadState {
    Idle,
    HeaderScanned,
    RowsPending,
    Complete,
    Failed,
}

/// Drives one full read from `Idle` to `Complete` or `Failed`.
///
/// Terminal states are final; a new read needs a new assembler.
pub(crate) struct RowAssembler<'r> {
    path: PathBuf,
    offset: u64,
    schema: &'r Schema,
    separators: &'r SeparatorSet,
    required_extension: Option<&'r str>,
    state: ReadState,
    header: Option<HeaderInfo>,
    data: Vec<u8>,
    rows_parsed: usize,
    is_dense: bool,
}

impl<'r> RowAssembler<'r> {
    pub(crate) fn new(reader: &'r AsciiReader, path: &Path, offset: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            offset,
            schema: &reader.schema,
            separators: &reader.separators,
            required_extension: reader.required_extension.as_deref(),
            state: ReadState::Idle,
            header: None,
            data: Vec::new(),
            rows_parsed: 0,
            is_dense: true,
        }
    }

    pub(crate) fn state(&self) -> ReadState {
        self.state
    }

    /// Run every stage, discarding all row data on failure
    pub(crate) fn run(mut self) -> Result<OutputCloud> {
        let outcome = self.advance();
        if outcome.is_err() {
            self.fail();
        }
        debug!(
            "Read of {} finished in state {:?} with {} rows",
            self.path.display(),
            self.state(),
            self.rows_parsed
        );
        outcome.and_then(|_| self.into_cloud())
    }

    fn advance(&mut self) -> Result<()> {
        self.scan()?;
        self.fill()?;
        self.complete()
    }

    /// `Idle -> HeaderScanned`
    fn scan(&mut self) -> Result<()> {
        self.expect_state(ReadState::Idle)?;

        let header = scan_header(
            &self.path,
            self.offset,
            self.schema,
            self.separators,
            self.required_extension,
        )?;
        self.data = vec![0u8; header.point_count * header.row_stride];
        self.header = Some(header);
        self.state = ReadState::HeaderScanned;
        Ok(())
    }

    /// `HeaderScanned -> RowsPending`, then convert every line
    fn fill(&mut self) -> Result<()> {
        self.expect_state(ReadState::HeaderScanned)?;
        let mut lines = PayloadLines::open(&self.path, self.offset, self.required_extension)?;
        self.state = ReadState::RowsPending;

        let stride = self.schema.row_stride();
        let expected = self.schema.expected_token_count();
        let capacity = self.data.len() / stride;
        let mut row = vec![0u8; stride];

        while let Some((line_number, line)) = lines.next_line()? {
            let found = tokenize(&line, self.separators).count();
            if found == 0 {
                continue;
            }
            if found != expected {
                return Err(CloudError::FieldCountMismatch {
                    line: line_number,
                    expected,
                    found,
                });
            }

            let mut tokens = tokenize(&line, self.separators);
            for field in self.schema.fields() {
                convert_field(&mut tokens, field, &mut row, line_number)?;
            }

            // Rows past the scanned count mean the file grew since the scan.
            // They are still converted so a malformed one reports its own
            // error, and counted so the mismatch carries the true total.
            if self.rows_parsed < capacity {
                if self.is_dense && !row_is_finite(self.schema.fields(), &row) {
                    self.is_dense = false;
                }
                let start = self.rows_parsed * stride;
                self.data[start..start + stride].copy_from_slice(&row);
            }
            self.rows_parsed += 1;
        }

        Ok(())
    }

    /// `RowsPending -> Complete`
    fn complete(&mut self) -> Result<()> {
        self.expect_state(ReadState::RowsPending)?;
        let scanned = self.header.as_ref().map_or(0, |h| h.point_count);

        if self.rows_parsed != scanned {
            warn!(
                "File {} changed between passes: scanned {} records, parsed {}",
                self.path.display(),
                scanned,
                self.rows_parsed
            );
            return Err(CloudError::RowCountMismatch {
                path: self.path.clone(),
                scanned,
                parsed: self.rows_parsed,
            });
        }

        self.state = ReadState::Complete;
        Ok(())
    }

    fn fail(&mut self) {
        self.state = ReadState::Failed;
        self.data = Vec::new();
        self.rows_parsed = 0;
    }

    fn expect_state(&self, expected: ReadState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CloudError::Configuration {
                message: format!(
                    "read of {} is in state {:?}, expected {:?}",
                    self.path.display(),
                    self.state,
                    expected
                ),
            })
        }
    }

    fn into_cloud(self) -> Result<OutputCloud> {
        let header = self.header.ok_or_else(|| CloudError::Configuration {
            message: "read completed without a header scan".to_string(),
        })?;
        let mut cloud = OutputCloud::from_header(&header, self.schema.fields().to_vec());
        cloud.is_dense = self.is_dense;
        cloud.data = self.data;
        Ok(cloud)
    }
}

/// True unless a float field in `row` holds NaN or an infinity
fn row_is_finite(fields: &[FieldDescriptor], row: &[u8]) -> bool {
    fields
        .iter()
        .filter(|field| field.datatype.is_float())
        .all(|field| {
            let width = field.datatype.byte_size();
            (0..field.count as usize).all(|component| {
                let start = field.offset + component * width;
                let bytes = &row[start..start + width];
                match field.datatype {
                    Datatype::Float32 => {
                        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).is_finite()
                    }
                    _ => {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(bytes);
                        f64::from_le_bytes(raw).is_finite()
                    }
                }
            })
        })
}

/// Reader for delimiter-separated point records.
///
/// The schema must be set before reading. Schema, separators and extension
/// are fixed for the duration of a call since reads borrow the reader.
#[derive(Debug, Clone, Default)]
pub struct AsciiReader {
    schema: Schema,
    separators: SeparatorSet,
    required_extension: Option<String>,
}

impl AsciiReader {
    /// Create a reader with default separators, no schema and no extension check
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader from a validated configuration
    pub fn with_config(config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            schema: Schema::default(),
            separators: config.separator_set()?,
            required_extension: config.required_extension.clone(),
        })
    }

    /// Set the input fields from an explicit list, in file order
    pub fn set_input_fields(&mut self, fields: Vec<FieldDescriptor>) -> Result<()> {
        self.set_schema(Schema::new(fields)?);
        Ok(())
    }

    /// Set the input fields from a built-in point type
    pub fn set_point_type(&mut self, point_type: PointType) {
        self.set_schema(point_type.schema().clone());
    }

    /// Set the input fields from a statically described record type
    pub fn set_record_type<T: RecordType>(&mut self) -> Result<()> {
        self.set_schema(Schema::for_record::<T>()?);
        Ok(())
    }

    pub fn set_schema(&mut self, schema: Schema) {
        debug!("Input fields set: {}", schema);
        self.schema = schema;
    }

    /// Set the separator characters (default: space, tab, newline, comma)
    pub fn set_separators(&mut self, chars: &str) -> Result<()> {
        self.separators = SeparatorSet::new(chars)?;
        debug!("Separators set: {:?}", chars);
        Ok(())
    }

    /// Require read paths to end in `extension` (e.g. ".xyz")
    pub fn set_required_extension(&mut self, extension: &str) -> Result<()> {
        validate_extension(extension)?;
        self.required_extension = Some(extension.to_string());
        Ok(())
    }

    /// Stop checking path extensions
    pub fn clear_required_extension(&mut self) {
        self.required_extension = None;
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn separators(&self) -> &SeparatorSet {
        &self.separators
    }

    pub fn required_extension(&self) -> Option<&str> {
        self.required_extension.as_deref()
    }

    /// Read only the metadata of `path`: record count and row geometry
    pub fn read_header(&self, path: &Path, offset: u64) -> Result<HeaderInfo> {
        info!("Reading header of {} at offset {}", path.display(), offset);
        scan_header(
            path,
            offset,
            &self.schema,
            &self.separators,
            self.required_extension.as_deref(),
        )
    }

    /// Read every record of `path` into a packed cloud
    pub fn read(&self, path: &Path, offset: u64) -> Result<OutputCloud> {
        info!("Reading {} at offset {}", path.display(), offset);
        let cloud = RowAssembler::new(self, path, offset).run()?;
        info!(
            "Read {} points ({} bytes) from {}",
            cloud.width,
            cloud.total_bytes(),
            path.display()
        );
        Ok(cloud)
    }
}

/// Integer status of a read: the point count on success, a negative code on
/// failure
pub trait ReadStatus {
    fn status(&self) -> i32;
}

impl ReadStatus for Result<HeaderInfo> {
    fn status(&self) -> i32 {
        match self {
            Ok(header) => i32::try_from(header.point_count).unwrap_or(i32::MAX),
            Err(e) => e.status(),
        }
    }
}

impl ReadStatus for Result<OutputCloud> {
    fn status(&self) -> i32 {
        match self {
            Ok(cloud) => i32::try_from(cloud.width).unwrap_or(i32::MAX),
            Err(e) => e.status(),
        }
    }
}
