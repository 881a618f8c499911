use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Files up to this size are read in one go; larger ones are streamed.
pub(crate) const FULL_READ_LIMIT: u64 = 1_048_576;

/// Prefix inspected for NUL bytes before a file is treated as text.
pub(crate) const LEAD_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, Default)]
pub(crate) struct DecodedLines {
    pub(crate) lines: Vec<String>,
    /// Some bytes were not valid UTF-8 and were replaced with U+FFFD.
    pub(crate) replaced: bool,
}

impl DecodedLines {
    /// Append one raw line, stripping `\n` / `\r\n`.
    fn push_raw(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match String::from_utf8_lossy(raw) {
            Cow::Borrowed(text) => self.lines.push(text.to_string()),
            Cow::Owned(text) => {
                self.replaced = true;
                self.lines.push(text);
            }
        }
    }

    /// Push every complete line of `bytes`; return the trailing unterminated fragment.
    fn push_complete<'b>(&mut self, bytes: &'b [u8]) -> &'b [u8] {
        let mut start = 0;
        for (idx, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                self.push_raw(&bytes[start..=idx]);
                start = idx + 1;
            }
        }
        &bytes[start..]
    }
}

/// Read and split a file into lines. `Ok(None)` means the file looks binary.
pub(crate) fn read_lines(path: &Path, len: u64) -> io::Result<Option<DecodedLines>> {
    if len <= FULL_READ_LIMIT {
        read_full(path)
    } else {
        read_streaming(path)
    }
}

fn read_full(path: &Path) -> io::Result<Option<DecodedLines>> {
    let bytes = std::fs::read(path)?;
    let lead = &bytes[..bytes.len().min(LEAD_CHUNK_BYTES)];
    if lead.contains(&0) {
        return Ok(None);
    }

    let mut decoded = DecodedLines::default();
    let rest = decoded.push_complete(&bytes);
    if !rest.is_empty() {
        decoded.push_raw(rest);
    }
    Ok(Some(decoded))
}

/// Bounded-memory path: classify on the lead chunk, then read the remainder line by line.
///
/// The lead chunk usually ends mid-line. Its unterminated tail is held back and joined with
/// the first line of the remainder so no line is split at the chunk boundary; if the file ends
/// exactly there, the tail is flushed as the final line.
fn read_streaming(path: &Path) -> io::Result<Option<DecodedLines>> {
    let mut file = File::open(path)?;

    let mut lead = Vec::with_capacity(LEAD_CHUNK_BYTES);
    (&mut file)
        .take(LEAD_CHUNK_BYTES as u64)
        .read_to_end(&mut lead)?;
    if lead.contains(&0) {
        return Ok(None);
    }

    let mut decoded = DecodedLines::default();
    let mut pending: Vec<u8> = decoded.push_complete(&lead).to_vec();

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if pending.is_empty() {
            decoded.push_raw(&buf);
        } else {
            pending.extend_from_slice(&buf);
            decoded.push_raw(&pending);
            pending.clear();
        }
    }
    if !pending.is_empty() {
        decoded.push_raw(&pending);
    }

    Ok(Some(decoded))
}
