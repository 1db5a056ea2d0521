use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected end of file while reading '{section}'")]
    UnexpectedEof { section: &'static str },

    #[error("Line {line}: expected header '{expected}', found '{found}'")]
    UnexpectedHeader {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column '{0}' is not present in the dump")]
    MissingColumn(String),
}

/// One timestep of a text-format custom dump.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpSnapshot {
    pub timestep: u64,
    /// `[lo, hi]` per axis, tilt factors dropped.
    pub bounds: [[f64; 2]; 3],
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DumpSnapshot {
    pub fn num_atoms(&self) -> usize {
        self.rows.len()
    }

    /// Returns the values of one per-atom column, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::MissingColumn`] if no column carries that name.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DumpError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DumpError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// Reader for the engine's text dump format (`ITEM:` sections).
pub struct DumpFile;

impl DumpFile {
    /// Reads every snapshot in the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if a section header is out of place, a number fails to parse,
    /// an atom line has the wrong number of fields, or the stream ends mid-snapshot.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Vec<DumpSnapshot>, DumpError> {
        let mut lines = NumberedLines::new(reader);
        let mut snapshots = Vec::new();

        while let Some((line_no, header)) = lines.next_non_empty()? {
            expect_header(line_no, &header, "ITEM: TIMESTEP")?;
            let timestep = lines.parse_single::<u64>("TIMESTEP")?;

            let (line_no, header) = lines.require("NUMBER OF ATOMS")?;
            expect_header(line_no, &header, "ITEM: NUMBER OF ATOMS")?;
            let num_atoms = lines.parse_single::<usize>("NUMBER OF ATOMS")?;

            let (line_no, header) = lines.require("BOX BOUNDS")?;
            expect_header(line_no, &header, "ITEM: BOX BOUNDS")?;
            let mut bounds = [[0.0; 2]; 3];
            for axis in bounds.iter_mut() {
                let (line_no, line) = lines.require("BOX BOUNDS")?;
                let values = parse_fields(line_no, &line)?;
                if values.len() < 2 {
                    return Err(DumpError::ColumnCount {
                        line: line_no,
                        expected: 2,
                        found: values.len(),
                    });
                }
                *axis = [values[0], values[1]];
            }

            let (line_no, header) = lines.require("ATOMS")?;
            expect_header(line_no, &header, "ITEM: ATOMS")?;
            let columns: Vec<String> = header["ITEM: ATOMS".len()..]
                .split_whitespace()
                .map(str::to_string)
                .collect();

            let mut rows = Vec::with_capacity(num_atoms);
            for _ in 0..num_atoms {
                let (line_no, line) = lines.require("ATOMS")?;
                let row = parse_fields(line_no, &line)?;
                if row.len() != columns.len() {
                    return Err(DumpError::ColumnCount {
                        line: line_no,
                        expected: columns.len(),
                        found: row.len(),
                    });
                }
                rows.push(row);
            }

            snapshots.push(DumpSnapshot {
                timestep,
                bounds,
                columns,
                rows,
            });
        }

        Ok(snapshots)
    }

    pub fn read_from_path(path: &Path) -> Result<Vec<DumpSnapshot>, DumpError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}

fn expect_header(line: usize, found: &str, expected: &'static str) -> Result<(), DumpError> {
    if found.starts_with(expected) {
        Ok(())
    } else {
        Err(DumpError::UnexpectedHeader {
            line,
            expected,
            found: found.to_string(),
        })
    }
}

fn parse_fields(line_no: usize, line: &str) -> Result<Vec<f64>, DumpError> {
    line.split_whitespace()
        .map(|field| {
            field.parse::<f64>().map_err(|_| DumpError::InvalidNumber {
                line: line_no,
                value: field.to_string(),
            })
        })
        .collect()
}

struct NumberedLines<'r, R: BufRead> {
    reader: &'r mut R,
    line_no: usize,
    buf: String,
}

impl<'r, R: BufRead> NumberedLines<'r, R> {
    fn new(reader: &'r mut R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>, DumpError> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some((self.line_no, self.buf.trim().to_string())))
    }

    fn next_non_empty(&mut self) -> Result<Option<(usize, String)>, DumpError> {
        while let Some((no, line)) = self.next_line()? {
            if !line.is_empty() {
                return Ok(Some((no, line)));
            }
        }
        Ok(None)
    }

    fn require(&mut self, section: &'static str) -> Result<(usize, String), DumpError> {
        self.next_line()?
            .ok_or(DumpError::UnexpectedEof { section })
    }

    fn parse_single<T: std::str::FromStr>(&mut self, section: &'static str) -> Result<T, DumpError> {
        let (line_no, line) = self.require(section)?;
        line.parse::<T>().map_err(|_| DumpError::InvalidNumber {
            line: line_no,
            value: line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SNAPSHOT: &str = "\
ITEM: TIMESTEP
200
ITEM: NUMBER OF ATOMS
4
ITEM: BOX BOUNDS pp pp mm
-65.16 65.16
-65.16 65.16
-87.0 130.5
ITEM: ATOMS id c_clusters
1 0
2 7
3 7
4 12
";

    #[test]
    fn reads_single_snapshot_with_columns() {
        let snapshots = DumpFile::read_from(&mut Cursor::new(SNAPSHOT)).unwrap();
        assert_eq!(snapshots.len(), 1);
        let snap = &snapshots[0];
        assert_eq!(snap.timestep, 200);
        assert_eq!(snap.num_atoms(), 4);
        assert_eq!(snap.bounds[2], [-87.0, 130.5]);
        assert_eq!(snap.columns, vec!["id", "c_clusters"]);
        assert_eq!(snap.column("c_clusters").unwrap(), vec![0.0, 7.0, 7.0, 12.0]);
    }

    #[test]
    fn reads_consecutive_snapshots() {
        let text = format!("{}\n{}", SNAPSHOT, SNAPSHOT.replace("\n200\n", "\n201\n"));
        let snapshots = DumpFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].timestep, 201);
    }

    #[test]
    fn missing_column_is_reported() {
        let snapshots = DumpFile::read_from(&mut Cursor::new(SNAPSHOT)).unwrap();
        assert!(matches!(
            snapshots[0].column("vx"),
            Err(DumpError::MissingColumn(c)) if c == "vx"
        ));
    }

    #[test]
    fn truncated_atom_section_fails() {
        let truncated = SNAPSHOT.trim_end().rsplit_once('\n').unwrap().0;
        let err = DumpFile::read_from(&mut Cursor::new(truncated)).unwrap_err();
        assert!(matches!(err, DumpError::UnexpectedEof { section: "ATOMS" }));
    }

    #[test]
    fn malformed_number_reports_line() {
        let bad = SNAPSHOT.replace("2 7", "2 seven");
        let err = DumpFile::read_from(&mut Cursor::new(bad)).unwrap_err();
        assert!(matches!(err, DumpError::InvalidNumber { line: 11, .. }));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let bad = SNAPSHOT.replace("ITEM: NUMBER OF ATOMS", "ITEM: ATOM COUNT");
        let err = DumpFile::read_from(&mut Cursor::new(bad)).unwrap_err();
        assert!(matches!(
            err,
            DumpError::UnexpectedHeader {
                expected: "ITEM: NUMBER OF ATOMS",
                ..
            }
        ));
    }

    #[test]
    fn reads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dump");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let snapshots = DumpFile::read_from_path(&path).unwrap();
        assert_eq!(snapshots[0].num_atoms(), 4);
    }
}
