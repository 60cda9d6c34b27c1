//! Text assembly for the analysis output.
//!
//! Page text, tables and image descriptions are interleaved in page order
//! with plain-text boundary markers so the summarizing model can tell the
//! sources apart.

use crate::ingestion::Table;

/// Accumulates the combined document text
#[derive(Debug, Default)]
pub struct DocumentText {
    buffer: String,
}

impl DocumentText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, page_number: usize, text: &str) {
        self.buffer.push_str(&format!("--- Page {} ---\n", page_number));
        let text = text.trim();
        if !text.is_empty() {
            self.buffer.push_str(text);
            self.buffer.push('\n');
        }
    }

    pub fn push_table(&mut self, table_number: usize, table: &Table) {
        self.buffer.push_str(&format!("\n[Table {}]\n", table_number));
        for row in table.rows.iter().filter(|row| !row.is_empty()) {
            self.buffer.push_str(&row.join(" | "));
            self.buffer.push('\n');
        }
        self.buffer.push('\n');
    }

    pub fn push_images_header(&mut self, image_count: usize) {
        self.buffer
            .push_str(&format!("\n[{} image(s) on this page]\n", image_count));
    }

    pub fn push_image_description(&mut self, image_number: usize, description: &str) {
        self.buffer.push_str(&format!(
            "[Image {}]\n{}\n\n",
            image_number,
            description.trim()
        ));
    }

    pub fn push_image_failure(&mut self, image_number: usize, error: &str) {
        self.buffer.push_str(&format!(
            "[Image {}: description failed - {}]\n\n",
            image_number, error
        ));
    }

    pub fn end_page(&mut self) {
        self.buffer.push('\n');
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    pub fn finish(self) -> String {
        self.buffer.trim().to_string()
    }
}
