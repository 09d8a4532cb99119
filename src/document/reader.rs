//! pdfium-backed [`PageSource`].
//!
//! pdfium is not async-aware and `PdfDocument<'a>` borrows its `Pdfium`
//! binding, so a [`DocumentHandle`] keeps only the path and the cheap
//! document-level facts (page count, outline, metadata). Every page read
//! binds and loads again inside the calling thread. Async callers go
//! through [`DocumentHandle::open_async`] and [`extract_pages`], which run
//! the blocking work on `spawn_blocking`.

use crate::document::tables::{detect_tables_in_spans, TableDetectorConfig};
use crate::document::{
    images::encode_png, BoundingBox, DocumentMetadata, EmbeddedImage, PageContent, PageSource,
    TocEntry, TypedSpan,
};
use crate::error::Pdf2SlidesError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bookmark trees deeper than this are truncated.
const MAX_OUTLINE_DEPTH: u32 = 64;

/// What to pull out of each page besides its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub extract_images: bool,
    pub detect_tables: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            extract_images: false,
            detect_tables: true,
        }
    }
}

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH`, the platform library in the working
/// directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2SlidesError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2SlidesError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn load<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2SlidesError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2SlidesError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                Pdf2SlidesError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            Pdf2SlidesError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// An opened PDF.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    path: PathBuf,
    password: Option<String>,
    options: ExtractOptions,
    page_count: usize,
    toc: Vec<TocEntry>,
    metadata: DocumentMetadata,
}

impl DocumentHandle {
    /// Open and validate a PDF. Blocking.
    pub fn open(
        path: impl AsRef<Path>,
        password: Option<&str>,
        options: ExtractOptions,
    ) -> Result<Self, Pdf2SlidesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Pdf2SlidesError::FileNotFound { path });
        }

        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &path, password)?;
        let page_count = document.pages().len() as usize;
        let toc = read_outline(&document);
        let metadata = read_metadata(&document, &path, page_count);
        info!(
            "Opened {}: {} pages, {} outline entries",
            path.display(),
            page_count,
            toc.len()
        );

        Ok(Self {
            path,
            password: password.map(str::to_string),
            options,
            page_count,
            toc,
            metadata,
        })
    }

    /// [`DocumentHandle::open`] on the blocking pool.
    pub async fn open_async(
        path: impl AsRef<Path>,
        password: Option<String>,
        options: ExtractOptions,
    ) -> Result<Self, Pdf2SlidesError> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::open(&path, password.as_deref(), options))
            .await
            .map_err(|e| Pdf2SlidesError::Internal(format!("Open task panicked: {}", e)))?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    /// Read several pages with one document load. Blocking.
    ///
    /// A page pdfium cannot parse is logged and left out; any other error
    /// aborts the batch.
    pub fn read_pages(&self, indices: &[usize]) -> Result<Vec<PageContent>, Pdf2SlidesError> {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &self.path, self.password.as_deref())?;
        let mut pages = Vec::with_capacity(indices.len());
        for &idx in indices {
            match self.read_page(&document, idx) {
                Ok(page) => pages.push(page),
                Err(Pdf2SlidesError::PageUnreadable { page, detail }) => {
                    warn!("Skipping unreadable page {}: {}", page, detail);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(pages)
    }

    fn read_page(
        &self,
        document: &PdfDocument<'_>,
        index: usize,
    ) -> Result<PageContent, Pdf2SlidesError> {
        if index >= self.page_count {
            return Err(Pdf2SlidesError::PageOutOfRange {
                page: index + 1,
                total: self.page_count,
            });
        }
        let unreadable = |e: PdfiumError| Pdf2SlidesError::PageUnreadable {
            page: index + 1,
            detail: format!("{:?}", e),
        };

        let page = document.pages().get(index as u16).map_err(unreadable)?;
        let page_text = page.text().map_err(unreadable)?;
        let text = page_text.all();

        let mut spans = Vec::new();
        let mut images = Vec::new();
        for object in page.objects().iter() {
            if let Some(text_object) = object.as_text_object() {
                let content = text_object.text();
                if content.trim().is_empty() {
                    continue;
                }
                spans.push(span_from(text_object, content));
            } else if self.options.extract_images {
                if let Some(image_object) = object.as_image_object() {
                    match image_from(image_object, index, images.len()) {
                        Ok(image) => images.push(image),
                        Err(e) => warn!("Page {}: skipping image: {}", index + 1, e),
                    }
                }
            }
        }

        let tables = if self.options.detect_tables {
            detect_tables_in_spans(&spans, &TableDetectorConfig::default())
        } else {
            Vec::new()
        };

        debug!(
            "Read page {}: {} chars, {} spans, {} images, {} tables",
            index + 1,
            text.len(),
            spans.len(),
            images.len(),
            tables.len()
        );

        Ok(PageContent {
            index,
            text,
            spans,
            images,
            tables,
        })
    }
}

impl PageSource for DocumentHandle {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, index: usize) -> Result<PageContent, Pdf2SlidesError> {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &self.path, self.password.as_deref())?;
        self.read_page(&document, index)
    }

    fn toc(&self) -> Result<Vec<TocEntry>, Pdf2SlidesError> {
        Ok(self.toc.clone())
    }

    fn metadata(&self) -> DocumentMetadata {
        self.metadata.clone()
    }
}

/// Read `indices` concurrently in at most `bound` contiguous batches.
///
/// Each batch loads the document once on the blocking pool. The result is
/// in the order of `indices` whatever order the batches finish in.
pub async fn extract_pages(
    doc: Arc<DocumentHandle>,
    indices: Vec<usize>,
    bound: Option<usize>,
) -> Result<Vec<PageContent>, Pdf2SlidesError> {
    if indices.is_empty() {
        return Ok(Vec::new());
    }
    let batches = bound.unwrap_or(indices.len()).clamp(1, indices.len());
    let per_batch = indices.len().div_ceil(batches);

    let handles: Vec<_> = indices
        .chunks(per_batch)
        .map(|batch| {
            let doc = Arc::clone(&doc);
            let batch = batch.to_vec();
            tokio::task::spawn_blocking(move || doc.read_pages(&batch))
        })
        .collect();

    let mut pages = Vec::with_capacity(indices.len());
    for handle in handles {
        let batch = handle
            .await
            .map_err(|e| Pdf2SlidesError::Internal(format!("Extraction task panicked: {}", e)))??;
        pages.extend(batch);
    }
    Ok(pages)
}

fn span_from(text_object: &PdfPageTextObject, text: String) -> TypedSpan {
    let font = text_object.font();
    let name = font.name();
    let lower = name.to_lowercase();
    let bold = font.is_bold_reenforced()
        || lower.contains("bold")
        || lower.contains("black")
        || lower.contains("heavy");
    let italic = font.is_italic() || lower.contains("italic") || lower.contains("oblique");

    TypedSpan {
        font_id: name,
        size: text_object.scaled_font_size().value,
        bold,
        italic,
        text,
        bbox: object_bounds(text_object),
    }
}

/// Page-space bounds of a page object, if pdfium can report them.
fn object_bounds<'a>(object: &impl PdfPageObjectCommon<'a>) -> Option<BoundingBox> {
    object.bounds().ok().map(|b| BoundingBox {
        left: b.left().value,
        bottom: b.bottom().value,
        right: b.right().value,
        top: b.top().value,
    })
}

fn image_from(
    image_object: &PdfPageImageObject,
    page_index: usize,
    image_index: usize,
) -> Result<EmbeddedImage, String> {
    let raw = image_object.get_raw_image().map_err(|e| format!("{:?}", e))?;
    let byte_data = encode_png(&raw).map_err(|e| e.to_string())?;
    Ok(EmbeddedImage {
        page_index,
        image_index,
        byte_data,
        extension: "png".to_string(),
        width: raw.width(),
        height: raw.height(),
        bounding_box: object_bounds(image_object),
    })
}

fn read_outline(document: &PdfDocument<'_>) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    if let Some(root) = document.bookmarks().root() {
        walk_bookmarks(Some(root), 1, &mut entries);
    }
    entries
}

fn walk_bookmarks(mut current: Option<PdfBookmark<'_>>, level: u32, out: &mut Vec<TocEntry>) {
    if level > MAX_OUTLINE_DEPTH {
        warn!("Outline deeper than {} levels, truncating", MAX_OUTLINE_DEPTH);
        return;
    }
    while let Some(bookmark) = current {
        let title = bookmark.title().unwrap_or_default();
        if !title.trim().is_empty() {
            let page = bookmark
                .destination()
                .and_then(|d| d.page_index().ok())
                .map(|idx| idx as usize + 1);
            out.push(TocEntry {
                level,
                title: title.trim().to_string(),
                page,
            });
        }
        walk_bookmarks(bookmark.first_child(), level + 1, out);
        current = bookmark.next_sibling();
    }
}

fn read_metadata(document: &PdfDocument<'_>, path: &Path, page_count: usize) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        keywords: get_meta(PdfDocumentMetadataTagType::Keywords),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count,
        pdf_version: format!("{:?}", document.version()),
        source: Some(path.to_path_buf()),
    }
}
