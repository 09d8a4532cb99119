//! Document model and the page-source abstraction.
//!
//! Everything downstream of the reader (structure analysis, chunking) works
//! against [`PageSource`] rather than pdfium directly. The pdfium-backed
//! [`reader::DocumentHandle`] and the in-memory [`MemoryDocument`] both
//! implement it, so the analyzer and chunker run unchanged over a live PDF
//! or over pages that were extracted once and shared.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ reader ──▶ PageContent ──┬──▶ structure (fonts, sections)
//! (path/URL)  (pdfium)               └──▶ chunking ──▶ classify
//! ```

pub mod images;
pub mod input;
pub mod reader;
pub mod structure;
pub mod tables;

use crate::error::Pdf2SlidesError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned box in PDF points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// A run of text drawn with one font at one size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedSpan {
    pub font_id: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl TypedSpan {
    pub fn new(font_id: impl Into<String>, size: f32, text: impl Into<String>) -> Self {
        Self {
            font_id: font_id.into(),
            size,
            bold: false,
            italic: false,
            text: text.into(),
            bbox: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// An image embedded in a page, re-encoded for downstream use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    /// 0-based page index.
    pub page_index: usize,
    /// 0-based position among the page's images.
    pub image_index: usize,
    #[serde(skip)]
    pub byte_data: Vec<u8>,
    /// File extension of `byte_data` (always "png" for pdfium extraction).
    pub extension: String,
    pub width: u32,
    pub height: u32,
    pub bounding_box: Option<BoundingBox>,
}

/// A table reported by the geometric detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn num_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Render as a pipe-format Markdown table, first row as header.
    pub fn to_markdown(&self) -> String {
        let num_cols = self.num_cols();
        if self.rows.is_empty() || num_cols == 0 {
            return String::new();
        }

        let mut col_widths = vec![3usize; num_cols];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.chars().count());
            }
        }

        let render_row = |row: &[String]| {
            let mut line = String::from("|");
            for (i, width) in col_widths.iter().copied().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                line.push_str(&format!(" {cell:width$} |"));
            }
            line.push('\n');
            line
        };

        let mut md = render_row(&self.rows[0]);
        md.push('|');
        for width in &col_widths {
            md.push_str(&format!(" {} |", "-".repeat(*width)));
        }
        md.push('\n');
        for row in self.rows.iter().skip(1) {
            md.push_str(&render_row(row));
        }
        md
    }
}

/// One entry of the document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting depth, 1 for top-level entries.
    pub level: u32,
    pub title: String,
    /// 1-based target page, if the bookmark has a resolvable destination.
    pub page: Option<usize>,
}

/// Everything extracted from one page. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// 0-based page index.
    pub index: usize,
    pub text: String,
    pub spans: Vec<TypedSpan>,
    pub images: Vec<EmbeddedImage>,
    pub tables: Vec<Table>,
}

impl PageContent {
    /// A page carrying only text.
    pub fn from_text(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_spans(mut self, spans: Vec<TypedSpan>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_images(mut self, images: Vec<EmbeddedImage>) -> Self {
        self.images = images;
        self
    }

    /// 1-based page number.
    pub fn page_number(&self) -> usize {
        self.index + 1
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub source: Option<PathBuf>,
}

impl DocumentMetadata {
    /// Name used in logs and error messages.
    pub fn source_name(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}

/// Random access to the pages of a document.
///
/// `page` may do real work (pdfium parses the page on every call), which is
/// what makes [`Pages`] restartable: iterating twice reads twice.
/// Absence of images, tables or an outline is an empty result.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    fn page(&self, index: usize) -> Result<PageContent, Pdf2SlidesError>;

    fn toc(&self) -> Result<Vec<TocEntry>, Pdf2SlidesError>;

    fn metadata(&self) -> DocumentMetadata;

    fn images_on_page(&self, index: usize) -> Result<Vec<EmbeddedImage>, Pdf2SlidesError> {
        Ok(self.page(index)?.images)
    }

    fn tables_on_page(&self, index: usize) -> Result<Vec<Table>, Pdf2SlidesError> {
        Ok(self.page(index)?.tables)
    }

    /// Lazy sequence over every page.
    fn pages(&self) -> Pages<'_>
    where
        Self: Sized,
    {
        Pages::new(self)
    }
}

/// Lazy, finite page iterator. Create a new one to re-read.
pub struct Pages<'a> {
    source: &'a dyn PageSource,
    next: usize,
    end: usize,
}

impl<'a> Pages<'a> {
    pub fn new(source: &'a dyn PageSource) -> Self {
        Self {
            source,
            next: 0,
            end: source.page_count(),
        }
    }

    /// Only the first `limit` pages.
    pub fn take_leading(source: &'a dyn PageSource, limit: usize) -> Self {
        Self {
            source,
            next: 0,
            end: source.page_count().min(limit),
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<PageContent, Pdf2SlidesError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.source.page(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

/// A document whose pages are already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<PageContent>,
    toc: Vec<TocEntry>,
    metadata: DocumentMetadata,
}

impl MemoryDocument {
    pub fn new(pages: Vec<PageContent>) -> Self {
        let metadata = DocumentMetadata {
            page_count: pages.len(),
            ..Default::default()
        };
        Self {
            pages,
            toc: Vec::new(),
            metadata,
        }
    }

    /// One text-only page per string.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .enumerate()
                .map(|(i, t)| PageContent::from_text(i, t))
                .collect(),
        )
    }

    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn as_pages(&self) -> &[PageContent] {
        &self.pages
    }
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageContent, Pdf2SlidesError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(Pdf2SlidesError::PageOutOfRange {
                page: index + 1,
                total: self.pages.len(),
            })
    }

    fn toc(&self) -> Result<Vec<TocEntry>, Pdf2SlidesError> {
        Ok(self.toc.clone())
    }

    fn metadata(&self) -> DocumentMetadata {
        self.metadata.clone()
    }
}
