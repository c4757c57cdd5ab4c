use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::BufRead;
use tracing::{debug, warn};

/// Counters collected while scanning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Input lines read
    pub lines: usize,
    /// Candidate objects whose braces balanced out
    pub candidates: usize,
    /// Candidates that decoded into a JSON object
    pub recovered: usize,
    /// Candidates that failed to decode, plus an unterminated tail at EOF
    pub discarded: usize,
}

/// Line-oriented brace counter that recovers top-level JSON objects.
///
/// Boundaries come from counting `{` and `}` per line, not from tokenizing.
/// Braces inside string literals are counted like any other, so a string
/// holding an unbalanced brace shifts the boundary and the affected
/// candidates fail to decode. Which objects get recovered depends on this
/// exact heuristic.
#[derive(Debug, Default)]
pub struct ObjectScanner {
    depth: i64,
    buffer: Vec<String>,
    stats: ScanStats,
}

impl ObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the decoded object when this line closes a
    /// candidate that parses.
    pub fn push_line(&mut self, line: &str) -> Option<Value> {
        self.stats.lines += 1;

        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;

        // A brace at depth zero starts a fresh candidate
        if opens > 0 && self.depth == 0 {
            self.buffer.clear();
        }

        self.depth += opens - closes;
        self.buffer.push(line.to_string());

        if self.depth == 0 && !self.buffer.is_empty() {
            let candidate = self.buffer.concat();
            self.buffer.clear();
            if candidate.trim().is_empty() {
                return None;
            }
            return self.try_decode(&candidate);
        }

        None
    }

    /// Finish the scan. A buffer still open at EOF is a truncated object.
    pub fn finish(&mut self) -> ScanStats {
        if !self.buffer.is_empty() && self.buffer.iter().any(|l| !l.trim().is_empty()) {
            debug!(depth = self.depth, lines = self.buffer.len(), "dropping unterminated object at end of input");
            self.stats.discarded += 1;
        }
        self.buffer.clear();
        self.depth = 0;
        self.stats
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn try_decode(&mut self, candidate: &str) -> Option<Value> {
        self.stats.candidates += 1;

        let text = candidate.trim();
        let text = text.strip_suffix(',').unwrap_or(text);

        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => {
                self.stats.recovered += 1;
                Some(value)
            }
            Ok(other) => {
                let kind = match other {
                    Value::Array(ref items) => format!("array of {} values", items.len()),
                    _ => "scalar".to_string(),
                };
                warn!(line = self.stats.lines, %kind, "discarding top-level value that is not an object");
                self.stats.discarded += 1;
                None
            }
            Err(e) => {
                debug!(line = self.stats.lines, error = %e, "skipping invalid candidate");
                self.stats.discarded += 1;
                None
            }
        }
    }
}

/// Iterator over the objects recovered from a reader.
///
/// Only I/O errors are yielded as `Err`; decode failures are absorbed.
pub struct RecoveredObjects<R: BufRead> {
    reader: R,
    scanner: ObjectScanner,
    line_buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> RecoveredObjects<R> {
    pub fn new(reader: R) -> Self {
        RecoveredObjects {
            reader,
            scanner: ObjectScanner::new(),
            line_buf: Vec::new(),
            done: false,
        }
    }

    pub fn stats(&self) -> ScanStats {
        self.scanner.stats()
    }
}

impl<R: BufRead> Iterator for RecoveredObjects<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line_buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.line_buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(anyhow::Error::new(e).context("Failed to read line")));
                }
            };

            if read == 0 {
                self.done = true;
                self.scanner.finish();
                break;
            }

            // Invalid UTF-8 only spoils the object it sits in
            let line = String::from_utf8_lossy(&self.line_buf);
            if let Some(obj) = self.scanner.push_line(&line) {
                return Some(Ok(obj));
            }
        }

        None
    }
}

/// Recover every valid top-level object from `reader`, in input order
pub fn recover_objects<R: BufRead>(reader: R) -> Result<(Vec<Value>, ScanStats)> {
    let mut iter = RecoveredObjects::new(reader);
    let objects = iter.by_ref().collect::<Result<Vec<_>>>()?;
    Ok((objects, iter.stats()))
}
