use crate::domain::model::{non_blank, NewStudent};
use crate::utils::error::{Result, RosterError};
use csv::{ReaderBuilder, StringRecord, Trim};

/// Result of parsing pasted roster text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvImport {
    /// Accepted rows, in input order, bound to the target class.
    pub candidates: Vec<NewStudent>,
    /// 1-based line numbers of data rows that were dropped.
    pub skipped_lines: Vec<u64>,
}

impl CsvImport {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Accepted rows, or `NoValidRows` when there is nothing to import.
    pub fn into_candidates(self) -> Result<Vec<NewStudent>> {
        if self.candidates.is_empty() {
            return Err(RosterError::NoValidRows);
        }
        Ok(self.candidates)
    }
}

/// Parses `Name,Email,StudentID` rows for `class_id`.
///
/// The first line is a header and is always discarded, whatever it holds.
/// Lines are split on every comma; quote characters are kept as text.
/// Fields are trimmed, only the first three columns are read, and blank
/// email / student id become `None`. A row whose name is blank is dropped
/// and its line number recorded in `skipped_lines`; blank lines are ignored.
/// Never fails: an input with no usable rows yields an empty import.
pub fn parse_roster_csv(class_id: &str, text: &str) -> CsvImport {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return CsvImport::default();
    }
    let leading = text.len() - text.trim_start().len();
    let line_offset = text[..leading].matches('\n').count() as u64;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(trimmed.as_bytes());

    let mut import = CsvImport::default();
    let mut record = StringRecord::new();
    let mut header_seen = false;

    loop {
        let line = reader.position().line() + line_offset;
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if !header_seen {
                    header_seen = true;
                    continue;
                }
                let line = record
                    .position()
                    .map_or(line, |pos| pos.line() + line_offset);
                match candidate_from(class_id, &record) {
                    Some(candidate) => import.candidates.push(candidate),
                    None => import.skipped_lines.push(line),
                }
            }
            Err(err) => {
                let line = err
                    .position()
                    .map_or(line, |pos| pos.line() + line_offset);
                tracing::debug!("Skipping unreadable CSV line {}: {}", line, err);
                header_seen = true;
                import.skipped_lines.push(line);
                if err.is_io_error() {
                    break;
                }
            }
        }
    }

    if !import.skipped_lines.is_empty() {
        tracing::debug!(
            "CSV import kept {} rows, skipped lines {:?}",
            import.candidates.len(),
            import.skipped_lines
        );
    }
    import
}

fn candidate_from(class_id: &str, record: &StringRecord) -> Option<NewStudent> {
    let name = record.get(0).unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }
    Some(NewStudent {
        class_id: class_id.to_string(),
        name: name.to_string(),
        email: record.get(1).and_then(non_blank),
        student_id: record.get(2).and_then(non_blank),
    })
}
