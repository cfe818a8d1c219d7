use super::{ChunkIter, ColumnSchema, InputDataset, OutputDataset};
use crate::row::Row;
use crate::{Error, ErrorContext, Result};

/// In-memory table, usable as input or output.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    schema: Vec<ColumnSchema>,
    rows: Vec<Row>,
    finished: bool,
}

impl MemoryDataset {
    pub fn new(schema: Vec<ColumnSchema>, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows,
            finished: false,
        }
    }

    /// Schema inferred from the first row.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let schema = rows.first().map(ColumnSchema::infer_all).unwrap_or_default();
        Self::new(schema, rows)
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl InputDataset for MemoryDataset {
    fn read_schema(&self) -> Result<Vec<ColumnSchema>> {
        Ok(self.schema.clone())
    }

    fn read_rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }

    fn read_chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>> {
        let chunks = self
            .rows
            .chunks(chunk_size.max(1))
            .map(|c| -> Result<Vec<Row>> { Ok(c.to_vec()) });
        Ok(Box::new(chunks))
    }
}

impl OutputDataset for MemoryDataset {
    fn write_schema(&mut self, schema: &[ColumnSchema]) -> Result<()> {
        if !self.rows.is_empty() {
            return Err(Error::runtime_with_context(
                "Schema must be written before any row",
                ErrorContext::new().with_source("memory_dataset"),
            ));
        }
        self.schema = schema.to_vec();
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
