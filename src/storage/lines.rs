//! Lazy line reading for NDJSON input files

use crate::error::LoadError;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

/// Forward-only reader over the lines of an NDJSON file.
///
/// Lines are yielded without their terminator (`\n` or `\r\n`), one at a
/// time, through a buffered reader. A final line without a trailing newline
/// is still yielded. The reader is not restartable: open a new one to read
/// the file again.
///
/// The file is opened read-only without any locking, so other processes may
/// keep reading or appending to it while a load is running.
///
/// # Example
/// ```no_run
/// use couchdb_bulk_loader::storage::LineReader;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = LineReader::open("export.ndjson")?;
/// for line in reader {
///     println!("{}", line?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LineReader {
    lines: Lines<BufReader<File>>,
}

impl LineReader {
    /// Open `path` for reading.
    ///
    /// # Errors
    /// Returns [`LoadError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::io(path, source))?;

        log::debug!("Opened {} for reading", path.display());

        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for LineReader {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read_all(content: &str) -> Vec<String> {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{}", content).unwrap();
        LineReader::open(temp.path())
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_reads_lines_without_terminators() {
        let lines = read_all("{\"a\":1}\n{\"b\":2}\r\n{\"c\":3}\n");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[test]
    fn test_last_line_without_newline() {
        let lines = read_all("{\"a\":1}\n{\"b\":2}");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_empty_file() {
        assert!(read_all("").is_empty());
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let lines = read_all("{\"a\":1}\n\n{\"b\":2}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "");
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.ndjson");

        let err = LineReader::open(&missing).unwrap_err();
        match err {
            LoadError::Io { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
