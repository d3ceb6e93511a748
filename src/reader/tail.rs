// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

/// Where the tailer stands in the followed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCursor {
  /// byte offset just past the last complete line handed out
  pub position: u64,

  /// display name, the file name of the followed path
  pub name: String
}

/// Follows a growing file line by line, starting from its current end
pub struct FileTailer {
  reader: BufReader<File>,
  cursor: TailCursor,
  interval: Duration,
  buf: Vec<u8>
}

fn display_name(path: &Path) -> String {
  path.file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

impl FileTailer {
  /// Opens `path` and seeks to its end; lines already present are skipped
  pub fn open<P: AsRef<Path>>(path: P, interval: Duration) -> io::Result<Self> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let position = reader.seek(SeekFrom::End(0))?;

    let cursor = TailCursor {
      position,
      name: display_name(path)
    };

    debug!(name = %cursor.name, position, "following file");

    Ok(FileTailer {
      reader,
      cursor,
      interval,
      buf: Vec::new()
    })
  }

  pub fn cursor(&self) -> &TailCursor {
    &self.cursor
  }

  pub fn name(&self) -> &str {
    &self.cursor.name
  }

  /// Makes one attempt at reading a complete line.
  ///
  /// Returns `Ok(None)` if no complete line is available yet. In that case the
  /// read position is restored so a partially written line is read again in
  /// full once its newline arrives.
  pub fn poll_line(&mut self) -> io::Result<Option<String>> {
    self.buf.clear();
    let read = self.reader.read_until(b'\n', &mut self.buf)?;

    if read == 0 || self.buf.last() != Some(&b'\n') {
      if read > 0 {
        trace!(name = %self.cursor.name, bytes = read, "partial line, rewinding");
      }

      self.reader.seek(SeekFrom::Start(self.cursor.position))?;
      return Ok(None);
    }

    self.cursor.position += read as u64;

    let mut end = self.buf.len() - 1;
    if end > 0 && self.buf[end - 1] == b'\r' {
      end -= 1;
    }

    Ok(Some(String::from_utf8_lossy(&self.buf[..end]).into_owned()))
  }

  /// Hands every new line to `on_line`, sleeping between polls while the
  /// file is idle. Only returns on an I/O error.
  pub fn run<F>(&mut self, mut on_line: F) -> io::Result<()>
  where
    F: FnMut(&str)
  {
    loop {
      match self.poll_line()? {
        Some(line) => on_line(&line),
        None => thread::sleep(self.interval)
      }
    }
  }
}
