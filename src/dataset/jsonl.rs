//! JSON Lines files.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{ChunkIter, ColumnSchema, InputDataset, OutputDataset};
use crate::row::Row;
use crate::{Error, ErrorContext, Result};

/// A table stored as one JSON object per line.
///
/// The schema lives next to the data in `<file>.schema.json`; without it the
/// schema is inferred from the first row.
pub struct JsonLinesDataset {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl JsonLinesDataset {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".schema.json");
        PathBuf::from(name)
    }

    fn parse_line(&self, number: usize, line: &str) -> Result<Row> {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(row) => Ok(row),
            _ => Err(Error::validation_with_context(
                format!("Line {} is not a JSON object", number + 1),
                ErrorContext::new()
                    .with_details(self.path.display().to_string())
                    .with_source("jsonl_dataset"),
            )),
        }
    }

    fn lines(&self) -> Result<impl Iterator<Item = Result<Row>> + '_> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(reader
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
            .map(move |(n, line)| self.parse_line(n, &line?)))
    }
}

struct Chunks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator<Item = Result<Row>>> Iterator for Chunks<I> {
    type Item = Result<Vec<Row>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::with_capacity(self.size);
        for row in self.inner.by_ref() {
            match row {
                Ok(r) => chunk.push(r),
                Err(e) => return Some(Err(e)),
            }
            if chunk.len() == self.size {
                break;
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}

impl InputDataset for JsonLinesDataset {
    fn read_schema(&self) -> Result<Vec<ColumnSchema>> {
        let sidecar = self.schema_path();
        if sidecar.exists() {
            let file = File::open(&sidecar)?;
            return Ok(serde_json::from_reader(BufReader::new(file))?);
        }
        match self.lines()?.next() {
            Some(row) => Ok(ColumnSchema::infer_all(&row?)),
            None => Ok(Vec::new()),
        }
    }

    fn read_rows(&self) -> Result<Vec<Row>> {
        self.lines()?.collect()
    }

    fn read_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>> {
        Ok(Box::new(Chunks {
            inner: self.lines()?,
            size: chunk_size.max(1),
        }))
    }
}

impl OutputDataset for JsonLinesDataset {
    fn write_schema(&mut self, schema: &[ColumnSchema]) -> Result<()> {
        let mut sidecar = BufWriter::new(File::create(self.schema_path())?);
        serde_json::to_writer_pretty(&mut sidecar, schema)?;
        sidecar.flush()?;
        self.writer = Some(BufWriter::new(File::create(&self.path)?));
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::runtime_with_context(
                "Schema must be written before any row",
                ErrorContext::new()
                    .with_details(self.path.display().to_string())
                    .with_source("jsonl_dataset"),
            )
        })?;
        serde_json::to_writer(&mut *writer, row)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnType;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.jsonl", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_write_then_read_with_sidecar() {
        let path = temp_path("roundtrip");
        let mut out = JsonLinesDataset::new(&path);
        let schema = vec![
            ColumnSchema::new("text", ColumnType::String),
            ColumnSchema::new("score", ColumnType::Double).with_comment("confidence"),
        ];
        out.write_schema(&schema).unwrap();
        out.write_row(json!({"text": "a", "score": 0.5}).as_object().unwrap()).unwrap();
        out.write_row(json!({"text": "b", "score": 1.0}).as_object().unwrap()).unwrap();
        out.finish().unwrap();

        let input = JsonLinesDataset::new(&path);
        assert_eq!(input.read_schema().unwrap(), schema);
        let rows = input.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["text"], "b");

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(input.schema_path());
    }

    #[test]
    fn test_inferred_schema_and_chunks() {
        let path = temp_path("chunks");
        std::fs::write(&path, "{\"id\": 1, \"text\": \"x\"}\n\n{\"id\": 2, \"text\": \"y\"}\n{\"id\": 3, \"text\": \"z\"}\n").unwrap();
        let ds = JsonLinesDataset::new(&path);
        let schema = ds.read_schema().unwrap();
        assert_eq!(schema[0].column_type, ColumnType::Bigint);
        let chunks: Vec<Vec<Row>> = ds.read_chunks(2).unwrap().map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1][0]["id"], 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_non_object_line_is_rejected() {
        let path = temp_path("bad");
        std::fs::write(&path, "[1, 2]\n").unwrap();
        assert!(JsonLinesDataset::new(&path).read_rows().is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_row_before_schema_is_rejected() {
        let mut ds = JsonLinesDataset::new(temp_path("noschema"));
        assert!(ds.write_row(&Row::new()).is_err());
    }
}
