//! Header scan: record count and row geometry without materializing rows.
//!
//! ASCII files carry no header of their own, so the "header" is derived by
//! counting the non-blank lines of the payload. Token counts are not checked
//! here; that is left to the full read.

use crate::constants::{IDENTITY_ORIENTATION, ZERO_ORIGIN};
use crate::error::{CloudError, Result};
use crate::models::{FormatVersion, HeaderInfo};
use crate::schema::Schema;
use crate::tokenizer::{SeparatorSet, is_blank};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Line-by-line view of a file's text payload, starting at a byte offset.
///
/// The file handle is owned here and closed when this is dropped, on every
/// exit path of the read that opened it.
pub(crate) struct PayloadLines {
    path: PathBuf,
    reader: BufReader<File>,
    buffer: Vec<u8>,
    line_number: usize,
}

impl PayloadLines {
    /// Open `path`, check its extension and seek to `offset`
    pub(crate) fn open(path: &Path, offset: u64, required_extension: Option<&str>) -> Result<Self> {
        let file = File::open(path).map_err(|e| CloudError::open_failed(path, e))?;

        if let Some(extension) = required_extension {
            check_extension(path, extension)?;
        }

        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| CloudError::FileUnreadable {
                path: path.to_path_buf(),
                reason: format!("cannot seek to offset {}: {}", offset, e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            buffer: Vec::new(),
            line_number: 0,
        })
    }

    /// Next line (1-based number, text without its line ending), or `None`
    /// at end of file
    pub(crate) fn next_line(&mut self) -> Result<Option<(usize, Cow<'_, str>)>> {
        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(|e| CloudError::FileUnreadable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let mut line = self.buffer.as_slice();
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        Ok(Some((self.line_number, String::from_utf8_lossy(line))))
    }
}

/// Fail unless `path` ends in `extension` (given with its leading dot)
pub(crate) fn check_extension(path: &Path, extension: &str) -> Result<()> {
    let actual = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()));

    if actual.as_deref() == Some(extension) {
        return Ok(());
    }

    warn!(
        "File {} does not have the {} extension",
        path.display(),
        extension
    );
    Err(CloudError::ExtensionMismatch {
        path: path.to_path_buf(),
        expected: extension.to_string(),
    })
}

/// Count the records in `path` and report the geometry `schema` gives them
pub fn scan_header(
    path: &Path,
    offset: u64,
    schema: &Schema,
    separators: &SeparatorSet,
    required_extension: Option<&str>,
) -> Result<HeaderInfo> {
    if schema.is_empty() {
        return Err(CloudError::EmptySchema);
    }

    let mut lines = PayloadLines::open(path, offset, required_extension)?;
    let mut point_count = 0;
    let mut blank_lines = 0;

    while let Some((line_number, line)) = lines.next_line()? {
        if is_blank(&line, separators) {
            blank_lines += 1;
            trace!("Skipping blank line {}", line_number);
            continue;
        }
        point_count += 1;
    }

    let header = HeaderInfo {
        point_count,
        row_stride: schema.row_stride(),
        origin: ZERO_ORIGIN,
        orientation: IDENTITY_ORIENTATION,
        version: FormatVersion::V6,
        data_offset: offset,
    };

    debug!(
        "Scanned header for {}: points={}, blank_lines={}, row_stride={}, offset={}",
        path.display(),
        header.point_count,
        blank_lines,
        header.row_stride,
        offset
    );

    Ok(header)
}
