//! Line input and output for stage commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use citypulse_processing_core::StageStats;

fn open_reader(path: Option<&Path>) -> anyhow::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    })
}

/// Lines of the input, stopping at the first read error.
///
/// Lines that are not valid UTF-8 are skipped and counted. A read error is
/// kept and surfaced by [`InputLines::finish`], so a stage can consume the
/// lines as a plain `Iterator<Item = String>`.
pub struct InputLines {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    invalid: u64,
    error: Option<io::Error>,
}

impl InputLines {
    pub fn open(path: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self::from_reader(open_reader(path)?))
    }

    pub fn from_reader(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            invalid: 0,
            error: None,
        }
    }

    /// Count skipped lines as malformed input of `stats`.
    pub fn count_invalid(&self, stats: &mut StageStats) {
        stats.records_in += self.invalid;
        stats.malformed += self.invalid;
    }

    pub fn finish(self) -> anyhow::Result<()> {
        if self.invalid > 0 {
            tracing::warn!(lines = self.invalid, "skipped input lines that were not valid UTF-8");
        }
        match self.error {
            Some(e) => Err(anyhow::anyhow!("Failed to read input: {e}")),
            None => Ok(()),
        }
    }
}

impl Iterator for InputLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.error.is_none() {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    if self.buf.last() == Some(&b'\n') {
                        self.buf.pop();
                        if self.buf.last() == Some(&b'\r') {
                            self.buf.pop();
                        }
                    }
                    match String::from_utf8(std::mem::take(&mut self.buf)) {
                        Ok(line) => return Some(line),
                        Err(e) => {
                            tracing::trace!(error = %e, "input line is not valid UTF-8");
                            self.invalid += 1;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => self.error = Some(e),
            }
        }
        None
    }
}

/// Read the whole input into memory.
pub fn read_to_string(path: Option<&Path>) -> anyhow::Result<String> {
    let mut content = String::new();
    open_reader(path)?
        .read_to_string(&mut content)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {e}"))?;
    Ok(content)
}

pub fn read_lines(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut input = InputLines::open(path)?;
    let lines: Vec<String> = input.by_ref().collect();
    input.finish()?;
    Ok(lines)
}

/// Buffered output to a file or stdout.
pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Write each line followed by a newline, then flush.
pub fn write_lines<S: AsRef<str>>(
    out: &mut dyn Write,
    lines: impl IntoIterator<Item = S>,
) -> anyhow::Result<()> {
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join("citypulse_test_cli_io");
        let path = dir.join("nested").join("lines.txt");
        let _ = std::fs::remove_dir_all(&dir);

        let mut out = open_output(Some(path.as_path())).unwrap();
        write_lines(out.as_mut(), ["a\t1", "b\t2"]).unwrap();
        drop(out);

        assert_eq!(read_lines(Some(path.as_path())).unwrap(), vec!["a\t1", "b\t2"]);
        assert_eq!(read_to_string(Some(path.as_path())).unwrap(), "a\t1\nb\t2\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_utf8_lines_are_skipped_and_counted() {
        let bytes = b"V1_100\tGPS|1,1\r\nV2_100\tGPS|\xff\xfe\nV3_100\tGPS|3,3\n\xc3\nlast".to_vec();
        let mut input = InputLines::from_reader(Box::new(io::Cursor::new(bytes)));

        let lines: Vec<String> = input.by_ref().collect();
        assert_eq!(lines, vec!["V1_100\tGPS|1,1", "V3_100\tGPS|3,3", "last"]);

        let mut stats = StageStats::default();
        input.count_invalid(&mut stats);
        assert_eq!(stats.records_in, 2);
        assert_eq!(stats.malformed, 2);
        assert!(input.finish().is_ok());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let path = std::env::temp_dir().join("citypulse_test_cli_no_such_file");
        assert!(InputLines::open(Some(path.as_path())).is_err());
    }
}
