//! NDJSON (newline-delimited JSON) stream sink.
//!
//! Each row is serialized straight into a buffered writer, no intermediate
//! `String`.
//!
//! ```ignore
//! let mut sink = JsonStreamSink::open(&SinkTarget::Stdout)?;
//! sink.write_rows(&block_rows)?;
//! let n = sink.finish()?;
//! ```

use super::SinkTarget;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};

pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<Box<dyn Write>> {
    /// Opens `target`, creating or truncating the file if there is one.
    pub fn open(target: &SinkTarget) -> io::Result<Self> {
        let writer: Box<dyn Write> = match target {
            SinkTarget::Stdout => Box::new(io::stdout()),
            SinkTarget::File(path) => Box::new(File::create(path)?),
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_rows<T: Serialize>(&mut self, rows: &[T]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{BlockRow, WindowRow};
    use vantage_core::{ClassifiedBlock, WindowBucket};

    #[test]
    fn one_json_object_per_line() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);

        let block = ClassifiedBlock {
            slot: 250_000_000,
            blockhash: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d".into(),
            parent_slot: 249_999_999,
            block_time: Some(1_700_000_000),
            tx_count: 1_200,
            vote_count: 840,
            transfer_count: 180,
            program_count: 120,
            other_count: 60,
        };
        let bucket = WindowBucket {
            start_slot: 249_999_700,
            end_slot: 250_000_000,
            samples: 2,
            period_secs: 120,
            tx_total: 480_000,
            vote: 336_000,
            transfer: 72_000,
            program: 48_000,
            other: 24_000,
        };

        sink.write_rows(&[BlockRow::new(&block, 1), BlockRow::new(&block, 2)]).unwrap();
        sink.write_row(&WindowRow::new(&bucket, 3)).unwrap();
        assert_eq!(sink.rows_written(), 3);
        assert_eq!(sink.finish().unwrap(), 3);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "block");
        assert_eq!(lines[1]["observed_at"], 2);
        assert_eq!(lines[2]["tps"], 4_000.0);
    }

    #[test]
    fn file_target_is_created() {
        let path = std::env::temp_dir().join(format!("vantage-sink-{}.ndjson", std::process::id()));
        let mut sink = JsonStreamSink::open(&SinkTarget::File(path.clone())).unwrap();
        sink.write_row(&serde_json::json!({"kind": "probe"})).unwrap();
        assert_eq!(sink.finish().unwrap(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"kind\":\"probe\"}\n");
        std::fs::remove_file(path).unwrap();
    }
}
