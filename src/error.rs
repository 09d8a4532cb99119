//! Error types for the edgequake-pdf2slides library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2SlidesError`] is **fatal**: ingestion cannot proceed at all
//!   (missing file, corrupt PDF, wrong password, nothing to chunk). Returned
//!   as `Err(Pdf2SlidesError)` from the top-level `ingest*` functions and
//!   aborts the whole run.
//!
//! * [`ItemError`] is **non-fatal**: a single work item failed in the
//!   enrichment pipeline (missing prior output, collaborator error,
//!   cancellation) but every other item is unaffected. Stored inside
//!   [`crate::pipeline::ItemResult`] so callers see partial success.
//!
//! Malformed collaborator output is deliberately *not* an error: the lenient
//! parser returns [`crate::structured::Extracted::Raw`] and the text flows on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2slides library.
#[derive(Debug, Error)]
pub enum Pdf2SlidesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could open the document but failed on one page.
    #[error("Failed to read page {page}: {detail}")]
    PageUnreadable { page: usize, detail: String },

    // ── Chunking errors ───────────────────────────────────────────────────
    /// The document yielded no pages or no extractable text at all.
    ///
    /// Encrypted-without-text-layer and image-only PDFs end up here; an
    /// empty chunk list is never reported as success.
    #[error("No extractable content in '{source_name}': {cause}")]
    NoContent { source_name: String, cause: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing a file or image failed.
    #[error("I/O failure on '{path}': {source}")]
    ResourceExhausted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place the platform pdfium library in the working directory.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2SlidesError {
    /// `true` for the errors that mean the document itself cannot be read.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            Pdf2SlidesError::CorruptPdf { .. }
                | Pdf2SlidesError::NotAPdf { .. }
                | Pdf2SlidesError::PasswordRequired { .. }
                | Pdf2SlidesError::WrongPassword { .. }
        )
    }
}

/// A non-fatal error for a single work item.
///
/// Stored alongside [`crate::pipeline::ItemResult`] when an item fails.
/// The run continues for every other item.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// A stage needed the output of an earlier stage that is absent.
    #[error("Item {ordinal}: stage '{stage}' requires output of '{requires}', which is missing")]
    MissingInput {
        ordinal: usize,
        stage: String,
        requires: String,
    },

    /// A stage (usually an enrichment collaborator) returned an error.
    #[error("Item {ordinal}: stage '{stage}' failed: {detail}")]
    StageFailed {
        ordinal: usize,
        stage: String,
        detail: String,
    },

    /// The run was cancelled before this item started.
    #[error("Item {ordinal}: cancelled before start")]
    Cancelled { ordinal: usize },

    /// The task driving this item panicked.
    #[error("Item {ordinal}: task panicked: {detail}")]
    TaskPanicked { ordinal: usize, detail: String },
}

impl ItemError {
    /// Ordinal of the work item this error belongs to.
    pub fn ordinal(&self) -> usize {
        match self {
            ItemError::MissingInput { ordinal, .. }
            | ItemError::StageFailed { ordinal, .. }
            | ItemError::Cancelled { ordinal }
            | ItemError::TaskPanicked { ordinal, .. } => *ordinal,
        }
    }
}

/// Lookup and write failures of the [`crate::store::ResultStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry under this key. Distinct from an entry holding an empty value.
    #[error("No entry stored under key '{key}'")]
    Missing { key: String },

    /// The stored value could not be converted to or from the requested type.
    #[error("Entry '{key}' could not be (de)serialised: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of an enrichment collaborator call.
#[derive(Debug, Clone, Error)]
pub enum EnrichError {
    /// The call did not return within the configured timeout.
    #[error("enrichment call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider returned an error after all retries.
    #[error("provider error after {retries} retries: {detail}")]
    Provider { retries: u32, detail: String },
}
