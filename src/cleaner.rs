//! Streaming log cleaner.
//!
//! [`FilterChain`] applies an ordered list of [`Filter`]s to every line of an
//! input file and writes the surviving lines to an output file, one pass,
//! with memory bounded by the longest line.
//!
//! Filters are evaluated in list order and the first veto wins:
//! a `Remove` filter vetoes a line it matches, a `Keep` filter vetoes a line
//! it does not match. A line nobody vetoes is kept, so an empty chain keeps
//! everything.

use crate::filter::{Filter, FilterKind};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Number of lines between two progress notifications.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Initial capacity of the read buffer and of the reusable line buffer.
pub const INITIAL_LINE_CAPACITY: usize = 64 * 1024;

/// Default ceiling for a single line, terminator excluded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Lowest ceiling a chain accepts. Lines up to this size are always handled.
pub const MIN_MAX_LINE_BYTES: usize = 1024 * 1024;

const OUTPUT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Summary of one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Lines read from the input.
    pub total_lines: u64,
    /// Lines dropped by the chain.
    pub filtered_lines: u64,
    /// Sum of line lengths in bytes, terminators excluded.
    pub bytes_read: u64,
}

impl CleanStats {
    /// Lines written to the output.
    pub fn kept_lines(&self) -> u64 {
        self.total_lines - self.filtered_lines
    }
}

/// I/O failures of a cleaning pass.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("failed to open input file {}: {source}", path.display())]
    OpenInput { path: PathBuf, source: io::Error },
    #[error("failed to create output file {}: {source}", path.display())]
    CreateOutput { path: PathBuf, source: io::Error },
    #[error("error reading line {line}: {source}")]
    Read { line: u64, source: io::Error },
    #[error("failed to write line {line}: {source}")]
    Write { line: u64, source: io::Error },
    #[error("line {line} exceeds the maximum length of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },
}

/// A failed pass: the error plus whatever was counted before it happened.
///
/// `stats` is `None` when the pass failed before any line was read
/// (the input or output could not be opened).
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CleanFailure {
    pub stats: Option<CleanStats>,
    #[source]
    pub error: CleanError,
}

impl CleanFailure {
    fn before_start(error: CleanError) -> Self {
        Self { stats: None, error }
    }

    fn partial(stats: CleanStats, error: CleanError) -> Self {
        Self {
            stats: Some(stats),
            error,
        }
    }
}

/// Receives progress notifications during a pass.
///
/// Called on the streaming thread every [`PROGRESS_INTERVAL`] lines with the
/// cumulative `(lines_processed, filtered_so_far)`. A slow sink stalls the
/// pass. No call is made for a trailing partial batch.
pub trait ProgressSink {
    fn on_progress(&mut self, lines_processed: u64, filtered_lines: u64);
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, u64),
{
    fn on_progress(&mut self, lines_processed: u64, filtered_lines: u64) {
        self(lines_processed, filtered_lines)
    }
}

/// An ordered list of filters with first-veto semantics.
#[derive(Debug, Clone)]
pub struct FilterChain {
    filters: Vec<Filter>,
    max_line_bytes: usize,
}

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Sets the hard ceiling for a single line.
    ///
    /// Values below [`MIN_MAX_LINE_BYTES`] are raised to it.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(MIN_MAX_LINE_BYTES);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    pub fn into_filters(self) -> Vec<Filter> {
        self.filters
    }

    /// Returns the first filter that vetoes `line`, in chain order.
    pub fn first_veto(&self, line: &str) -> Option<&Filter> {
        self.filters.iter().find(|filter| match filter.kind() {
            FilterKind::Remove => filter.matches(line),
            FilterKind::Keep => !filter.matches(line),
        })
    }

    /// Returns true if `line` survives the chain.
    pub fn should_keep(&self, line: &str) -> bool {
        self.first_veto(line).is_none()
    }

    /// Cleans `input_path` into `output_path`.
    ///
    /// The input is opened first, so a missing input never creates the
    /// output. The output is truncated if it exists. On a mid-stream failure
    /// the lines already kept are flushed and the output is left as a
    /// correct prefix.
    ///
    /// # Errors
    ///
    /// Returns a [`CleanFailure`] carrying the partial statistics, if any.
    pub fn clean(
        &self,
        input_path: &Path,
        output_path: &Path,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CleanStats, CleanFailure> {
        let input = File::open(input_path).map_err(|source| {
            CleanFailure::before_start(CleanError::OpenInput {
                path: input_path.to_path_buf(),
                source,
            })
        })?;

        let output = File::create(output_path).map_err(|source| {
            CleanFailure::before_start(CleanError::CreateOutput {
                path: output_path.to_path_buf(),
                source,
            })
        })?;

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            filters = self.filters.len(),
            "starting clean pass"
        );

        let mut reader = BufReader::with_capacity(INITIAL_LINE_CAPACITY, input);
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_CAPACITY, output);
        let result = self.clean_stream(&mut reader, &mut writer, progress);

        match &result {
            Ok(stats) => info!(
                total = stats.total_lines,
                filtered = stats.filtered_lines,
                bytes = stats.bytes_read,
                "clean pass complete"
            ),
            Err(failure) => warn!(error = %failure.error, "clean pass failed"),
        }

        result
    }

    /// Cleans an arbitrary reader into an arbitrary writer.
    ///
    /// The writer is flushed exactly once, whether the pass succeeds or not.
    pub fn clean_stream<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CleanStats, CleanFailure>
    where
        R: BufRead,
        W: Write,
    {
        let mut stats = CleanStats::default();
        let streamed = self.stream_lines(reader, writer, &mut stats, progress);
        let flushed = writer.flush().map_err(|source| CleanError::Write {
            line: stats.total_lines,
            source,
        });

        match (streamed, flushed) {
            (Ok(()), Ok(())) => Ok(stats),
            (Err(error), _) | (Ok(()), Err(error)) => Err(CleanFailure::partial(stats, error)),
        }
    }

    fn stream_lines<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        stats: &mut CleanStats,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<(), CleanError>
    where
        R: BufRead,
        W: Write,
    {
        let mut buf = Vec::with_capacity(INITIAL_LINE_CAPACITY);

        loop {
            let line_no = stats.total_lines + 1;
            let line = match read_line(reader, &mut buf, self.max_line_bytes) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(ReadLineError::Io(source)) => {
                    return Err(CleanError::Read {
                        line: line_no,
                        source,
                    });
                }
                Err(ReadLineError::TooLong) => {
                    return Err(CleanError::LineTooLong {
                        line: line_no,
                        limit: self.max_line_bytes,
                    });
                }
            };

            stats.total_lines += 1;
            stats.bytes_read += line.len() as u64;

            if self.should_keep(&String::from_utf8_lossy(line)) {
                writer
                    .write_all(line)
                    .and_then(|()| writer.write_all(b"\n"))
                    .map_err(|source| CleanError::Write {
                        line: line_no,
                        source,
                    })?;
            } else {
                stats.filtered_lines += 1;
            }

            if stats.total_lines % PROGRESS_INTERVAL == 0
                && let Some(sink) = progress.as_deref_mut()
            {
                debug!(
                    lines = stats.total_lines,
                    filtered = stats.filtered_lines,
                    "progress"
                );
                sink.on_progress(stats.total_lines, stats.filtered_lines);
            }
        }

        Ok(())
    }
}

enum ReadLineError {
    Io(io::Error),
    TooLong,
}

/// Reads the next line into `buf` and returns it without its terminator.
///
/// Both `\n` and `\r\n` end a line. A final line without a terminator is
/// still returned. At most `limit + 2` bytes are pulled per call, so an
/// oversized line fails without being buffered in full.
fn read_line<'a, R: BufRead>(
    reader: &mut R,
    buf: &'a mut Vec<u8>,
    limit: usize,
) -> Result<Option<&'a [u8]>, ReadLineError> {
    buf.clear();
    let cap = limit as u64 + 2;
    let read = reader
        .by_ref()
        .take(cap)
        .read_until(b'\n', buf)
        .map_err(ReadLineError::Io)?;

    if read == 0 {
        return Ok(None);
    }

    let mut end = buf.len();
    let terminated = buf[end - 1] == b'\n';
    if terminated {
        end -= 1;
    }
    if (terminated || (read as u64) < cap) && end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    if end > limit {
        return Err(ReadLineError::TooLong);
    }

    Ok(Some(&buf[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chain(specs: &[(&str, &str, FilterKind)]) -> FilterChain {
        FilterChain::new(
            specs
                .iter()
                .map(|(name, pattern, kind)| Filter::new(*name, *pattern, *kind).unwrap())
                .collect(),
        )
    }

    fn run(chain: &FilterChain, input: &str) -> (CleanStats, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let stats = chain.clean_stream(&mut reader, &mut output, None).unwrap();
        (stats, String::from_utf8(output).unwrap())
    }

    /// Reader that yields some bytes and then fails.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(out)?;
            if n == 0 {
                Err(io::Error::other("disk vanished"))
            } else {
                Ok(n)
            }
        }
    }

    /// Writer that accepts a fixed number of bytes and then fails.
    struct FullWriter {
        written: Vec<u8>,
        capacity: usize,
        flushes: usize,
    }

    impl Write for FullWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.written.len() + data.len() > self.capacity {
                return Err(io::Error::other("no space left"));
            }
            self.written.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_empty_chain_keeps_everything() {
        let input = "one\ntwo\n\nthree\n";
        let (stats, output) = run(&FilterChain::new(Vec::new()), input);

        assert_eq!(output, input);
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.filtered_lines, 0);
        assert_eq!(stats.kept_lines(), 4);
    }

    #[test]
    fn test_remove_filter_stats() {
        let chain = chain(&[("remove-errors", "^ERROR", FilterKind::Remove)]);
        let input = "ERROR: a\nINFO: b\nERROR: c\nDEBUG: d\n";
        let (stats, output) = run(&chain, input);

        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.filtered_lines, 2);
        assert_eq!(stats.kept_lines(), 2);
        assert_eq!(stats.bytes_read, 31);
        assert_eq!(output, "INFO: b\nDEBUG: d\n");
    }

    #[test]
    fn test_keep_filter_is_allow_list() {
        let chain = chain(&[("only-info", "INFO", FilterKind::Keep)]);
        let (stats, output) = run(&chain, "INFO: a\nWARN: b\nINFO: c\n");

        assert_eq!(output, "INFO: a\nINFO: c\n");
        assert_eq!(stats.filtered_lines, 1);
    }

    #[test]
    fn test_multiple_keep_filters_are_conjunctive() {
        let chain = chain(&[
            ("info", "INFO", FilterKind::Keep),
            ("db", "database", FilterKind::Keep),
        ]);
        let (_, output) = run(&chain, "INFO: database up\nINFO: cache up\nWARN: database slow\n");

        assert_eq!(output, "INFO: database up\n");
    }

    #[test]
    fn test_first_veto_follows_chain_order() {
        let remove_first = chain(&[
            ("errors", "^ERROR", FilterKind::Remove),
            ("info", "INFO", FilterKind::Keep),
        ]);
        let keep_first = chain(&[
            ("info", "INFO", FilterKind::Keep),
            ("errors", "^ERROR", FilterKind::Remove),
        ]);
        // Matches the Remove pattern and fails the Keep pattern.
        let error_line = "ERROR: disk full";
        // Matches both patterns.
        let both = "ERROR: INFO lost";

        assert_eq!(remove_first.first_veto(error_line).unwrap().name(), "errors");
        assert_eq!(keep_first.first_veto(error_line).unwrap().name(), "info");
        assert_eq!(remove_first.first_veto(both).unwrap().name(), "errors");
        assert_eq!(keep_first.first_veto(both).unwrap().name(), "errors");
        assert!(remove_first.should_keep("INFO: fine"));
        assert!(keep_first.should_keep("INFO: fine"));
    }

    #[test]
    fn test_final_line_without_newline() {
        let (stats, output) = run(&FilterChain::new(Vec::new()), "a\nb");

        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.bytes_read, 2);
        assert_eq!(output, "a\nb\n");
    }

    #[test]
    fn test_crlf_terminators_are_stripped() {
        let chain = chain(&[("end", "x$", FilterKind::Remove)]);
        let (stats, output) = run(&chain, "ax\r\nb\r\n");

        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.filtered_lines, 1);
        assert_eq!(stats.bytes_read, 3);
        assert_eq!(output, "b\n");
    }

    #[test]
    fn test_empty_input() {
        let (stats, output) = run(&FilterChain::new(Vec::new()), "");

        assert_eq!(stats, CleanStats::default());
        assert!(output.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_written_verbatim() {
        let chain = chain(&[("drop", "^drop", FilterKind::Remove)]);
        let input = b"keep \xff\xfe bytes\ndrop me\n".to_vec();
        let mut output = Vec::new();
        let stats = chain
            .clean_stream(&mut Cursor::new(input), &mut output, None)
            .unwrap();

        assert_eq!(stats.filtered_lines, 1);
        assert_eq!(output, b"keep \xff\xfe bytes\n".to_vec());
    }

    #[test]
    fn test_progress_every_thousand_lines() {
        let chain = chain(&[("odd", "1$|3$|5$|7$|9$", FilterKind::Remove)]);
        let input: String = (1..=2500).map(|i| format!("line {}\n", i)).collect();
        let mut calls = Vec::new();
        let mut sink = |lines: u64, filtered: u64| calls.push((lines, filtered));

        let mut output = Vec::new();
        let stats = chain
            .clean_stream(&mut Cursor::new(input.into_bytes()), &mut output, Some(&mut sink))
            .unwrap();

        assert_eq!(calls, vec![(1000, 500), (2000, 1000)]);
        assert_eq!(stats.total_lines, 2500);
        assert_eq!(stats.filtered_lines, 1250);
    }

    #[test]
    fn test_progress_on_exact_multiple() {
        let input: String = (0..1000).map(|i| format!("{}\n", i)).collect();
        let mut calls = 0;
        let mut sink = |_: u64, _: u64| calls += 1;

        let mut output = Vec::new();
        FilterChain::new(Vec::new())
            .clean_stream(&mut Cursor::new(input.into_bytes()), &mut output, Some(&mut sink))
            .unwrap();

        assert_eq!(calls, 1);
    }

    #[test]
    fn test_large_line_is_not_truncated() {
        let long = "x".repeat(1024 * 1024);
        let input = format!("short\n{}\nend\n", long);
        let (stats, output) = run(&FilterChain::new(Vec::new()), &input);

        assert_eq!(stats.total_lines, 3);
        assert_eq!(stats.bytes_read, (5 + long.len() + 3) as u64);
        assert_eq!(output, input);
    }

    #[test]
    fn test_line_too_long_fails_with_partial_stats() {
        let chain = FilterChain::new(Vec::new()).with_max_line_bytes(MIN_MAX_LINE_BYTES);
        let input = format!("ok\n{}\nafter\n", "y".repeat(MIN_MAX_LINE_BYTES + 1));
        let mut output = Vec::new();

        let failure = chain
            .clean_stream(&mut Cursor::new(input.into_bytes()), &mut output, None)
            .unwrap_err();

        assert!(matches!(
            failure.error,
            CleanError::LineTooLong { line: 2, limit } if limit == MIN_MAX_LINE_BYTES
        ));
        assert_eq!(failure.stats.unwrap().total_lines, 1);
        assert_eq!(output, b"ok\n".to_vec());
    }

    #[test]
    fn test_line_at_limit_is_accepted() {
        let chain = FilterChain::new(Vec::new()).with_max_line_bytes(MIN_MAX_LINE_BYTES);
        let input = format!("{}\r\n", "z".repeat(MIN_MAX_LINE_BYTES));
        let mut output = Vec::new();

        let stats = chain
            .clean_stream(&mut Cursor::new(input.into_bytes()), &mut output, None)
            .unwrap();

        assert_eq!(stats.bytes_read, MIN_MAX_LINE_BYTES as u64);
    }

    #[test]
    fn test_max_line_bytes_has_floor() {
        let chain = FilterChain::new(Vec::new()).with_max_line_bytes(10);
        assert_eq!(chain.max_line_bytes(), MIN_MAX_LINE_BYTES);
    }

    #[test]
    fn test_read_error_returns_partial_stats() {
        let chain = chain(&[("errors", "^ERROR", FilterKind::Remove)]);
        let mut reader = BufReader::new(FailingReader {
            data: Cursor::new(b"INFO: a\nERROR: b\n".to_vec()),
        });
        let mut output = Vec::new();

        let failure = chain.clean_stream(&mut reader, &mut output, None).unwrap_err();

        assert!(matches!(failure.error, CleanError::Read { line: 3, .. }));
        let stats = failure.stats.unwrap();
        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.filtered_lines, 1);
        assert_eq!(output, b"INFO: a\n".to_vec());
    }

    #[test]
    fn test_write_error_flushes_once() {
        let mut reader = Cursor::new(b"aaaa\nbbbb\ncccc\n".to_vec());
        let mut writer = FullWriter {
            written: Vec::new(),
            capacity: 8,
            flushes: 0,
        };

        let failure = FilterChain::new(Vec::new())
            .clean_stream(&mut reader, &mut writer, None)
            .unwrap_err();

        assert!(matches!(failure.error, CleanError::Write { line: 2, .. }));
        assert_eq!(failure.stats.unwrap().total_lines, 2);
        assert_eq!(writer.written, b"aaaa\n".to_vec());
        assert_eq!(writer.flushes, 1);
    }
}
