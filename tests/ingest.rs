//! Ingestion over in-memory documents: structure, chunking, classification,
//! slide planning and the result store. No pdfium, no LLM.

use async_trait::async_trait;
use edgequake_pdf2slides::document::structure::{
    build_font_profiles, infer_sections, SectionSource,
};
use edgequake_pdf2slides::document::{DocumentMetadata, PageContent, PageSource, TocEntry, TypedSpan};
use edgequake_pdf2slides::ingest::record_ingestion;
use edgequake_pdf2slides::store::keys;
use edgequake_pdf2slides::{
    analyze, chunk_document, ingest, ingest_from_bytes, plan_slides, ChunkSpec, ChunkStrategy,
    ClassifiedChunk, ContentType, EnrichError, Enricher, EnrichmentTask, IngestConfig, Ingestion,
    MemoryDocument, Pdf2SlidesError, ResultStore,
};
use std::io::Write;
use std::sync::Arc;

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn table_text() -> String {
    let mut rows = vec!["Quarterly results by region".to_string()];
    for r in 0..6 {
        rows.push(format!("| region {r} | {} | {} |", r * 10, r * 12));
    }
    rows.join("\n")
}

fn list_text() -> String {
    [
        "Agenda for the review",
        "- Budget status",
        "- Hiring plan",
        "- Vendor contracts",
        "- Open risks",
    ]
    .join("\n")
}

fn long_text() -> String {
    (0..12)
        .map(|i| format!("Plain sentence number {i} describes the survey method"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ten pages; page 3 holds a 6x3 pipe table, page 6 a four-item list and
/// page 9 twelve plain lines.
fn ten_page_document() -> MemoryDocument {
    let texts: Vec<String> = (0..10)
        .map(|i| match i {
            2 => table_text(),
            5 => list_text(),
            8 => long_text(),
            _ => format!("Page {i} discusses the results in plain words without any structure."),
        })
        .collect();
    MemoryDocument::from_texts(texts)
}

fn chunk_on_page(ingestion: &Ingestion, page_index: usize) -> &ClassifiedChunk {
    ingestion
        .chunks
        .iter()
        .find(|c| c.chunk.metadata.page_index == page_index)
        .expect("page should have a chunk")
}

struct ReplyWith(String);

#[async_trait]
impl Enricher for ReplyWith {
    async fn enrich(&self, task: EnrichmentTask, _input: &str) -> Result<String, EnrichError> {
        assert_eq!(task, EnrichmentTask::ContentAnalysis);
        Ok(self.0.clone())
    }
}

// ── Classification ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ten_page_document_classifies_by_content() {
    let config = IngestConfig::default();
    let ingestion = analyze(Arc::new(ten_page_document()), &config).await.unwrap();

    assert_eq!(ingestion.stats.processed_pages, 10);
    assert_eq!(ingestion.stats.total_chunks, 10, "each page fits one chunk");

    assert_eq!(chunk_on_page(&ingestion, 2).content_type, ContentType::Table);
    assert_eq!(chunk_on_page(&ingestion, 5).content_type, ContentType::List);
    assert_eq!(chunk_on_page(&ingestion, 8).content_type, ContentType::LongText);
    assert_eq!(chunk_on_page(&ingestion, 0).content_type, ContentType::Paragraph);

    let counts = &ingestion.chunking_info.content_types;
    assert_eq!(counts.get(&ContentType::Paragraph), Some(&7));
    assert_eq!(counts.get(&ContentType::Table), Some(&1));
    assert!(ingestion.chunks.iter().all(|c| c.estimated_items >= 1));
}

#[tokio::test]
async fn chunk_ids_are_sequential_and_pages_tracked() {
    let config = IngestConfig::builder()
        .chunk_size(200)
        .chunk_overlap(20)
        .build()
        .unwrap();
    let ingestion = analyze(Arc::new(ten_page_document()), &config).await.unwrap();

    for (i, chunk) in ingestion.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk.id, i);
        assert_eq!(chunk.chunk.metadata.page_number, chunk.chunk.metadata.page_index + 1);
        assert_eq!(chunk.chunk.char_count, chunk.chunk.text.chars().count());
    }
    // The long page no longer fits one chunk.
    let long_page = ingestion
        .chunks
        .iter()
        .filter(|c| c.chunk.metadata.page_index == 8)
        .count();
    assert!(long_page >= 2);
}

#[tokio::test]
async fn slides_follow_classification() {
    let ingestion = analyze(Arc::new(ten_page_document()), &IngestConfig::default())
        .await
        .unwrap();
    let slides = ingestion.slides();

    assert_eq!(slides.len(), ingestion.chunks.len());
    for (i, slide) in slides.iter().enumerate() {
        assert_eq!(slide.slide_number, i + 1);
        assert!(!slide.title.is_empty());
    }
    let table_slide = &slides[2];
    assert!(table_slide.has_data);
    assert!(table_slide.data.contains("| region 0 |"));
    assert!(!slides[0].has_data);
}

#[tokio::test]
async fn hybrid_strategy_is_used_when_configured() {
    let config = IngestConfig::builder()
        .chunk_strategy(ChunkStrategy::Hybrid)
        .build()
        .unwrap();
    let ingestion = analyze(Arc::new(ten_page_document()), &config).await.unwrap();
    assert_eq!(ingestion.chunking_info.strategy, ChunkStrategy::Hybrid);
    assert!(ingestion
        .chunks
        .iter()
        .all(|c| c.chunk.metadata.strategy == ChunkStrategy::Hybrid));
}

#[tokio::test]
async fn chunks_reproduce_page_text() {
    fn squeeze(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    for strategy in [ChunkStrategy::Recursive, ChunkStrategy::Markdown] {
        let config = IngestConfig::builder()
            .chunk_strategy(strategy)
            .chunk_size(60)
            .chunk_overlap(0)
            .build()
            .unwrap();
        let ingestion = analyze(Arc::new(ten_page_document()), &config).await.unwrap();

        for page in &ingestion.pages {
            let joined: String = ingestion
                .chunks
                .iter()
                .filter(|c| c.chunk.metadata.page_index == page.index)
                .map(|c| c.chunk.text.as_str())
                .collect();
            assert_eq!(squeeze(&joined), squeeze(&page.text), "{strategy} page {}", page.index);
        }
    }
}

#[tokio::test]
async fn unknown_strategy_name_falls_back_to_recursive() {
    let config = IngestConfig::builder()
        .chunk_strategy_name("semantic")
        .build()
        .unwrap();
    assert_eq!(config.chunk_strategy, ChunkStrategy::Recursive);
    let token = IngestConfig::builder()
        .chunk_strategy_name("token")
        .chunk_size(800)
        .chunk_overlap(100)
        .build()
        .unwrap();
    assert_eq!(token.chunk_strategy, ChunkStrategy::Token);
}

// ── Structure ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn font_scan_counts_bold_heading_profile() {
    let pages: Vec<PageContent> = (0..10)
        .map(|i| {
            let mut spans = Vec::new();
            for _ in 0..40 {
                spans.push(TypedSpan::new("Helvetica-Bold", 18.0, "Results").bold());
            }
            for _ in 0..50 {
                spans.push(TypedSpan::new("Helvetica", 11.0, "body text"));
            }
            PageContent::from_text(i, format!("Results\nBody text for page {i} of the report.")).with_spans(spans)
        })
        .collect();
    let config = IngestConfig::default();
    assert_eq!(config.font_sample_pages, 5);

    let ingestion = analyze(Arc::new(MemoryDocument::new(pages)), &config).await.unwrap();
    let profiles = &ingestion.structure.font_profiles;
    let bold = profiles.iter().find(|p| p.is_bold()).expect("bold profile");
    assert_eq!(bold.count, 200);
    assert_eq!(bold.size(), 18.0);
    assert!(bold.sample.chars().count() <= 100);

    assert_eq!(profiles[0].count, 250, "body font is the most frequent");
    assert_eq!(ingestion.structure.body_font_size, Some(11.0));
    assert_eq!(ingestion.structure.heading_profiles, 1);
}

/// A document whose page at `bad` cannot be parsed.
struct PartlyUnreadable {
    inner: MemoryDocument,
    bad: usize,
}

impl PageSource for PartlyUnreadable {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn page(&self, index: usize) -> Result<PageContent, Pdf2SlidesError> {
        if index == self.bad {
            return Err(Pdf2SlidesError::PageUnreadable {
                page: index + 1,
                detail: "broken content stream".into(),
            });
        }
        self.inner.page(index)
    }

    fn toc(&self) -> Result<Vec<TocEntry>, Pdf2SlidesError> {
        self.inner.toc()
    }

    fn metadata(&self) -> DocumentMetadata {
        self.inner.metadata()
    }
}

#[test]
fn unreadable_page_is_skipped_not_fatal() {
    let pages: Vec<PageContent> = (0..3)
        .map(|i| {
            PageContent::from_text(i, format!("CHAPTER {i}\nBody words for page {i} follow here."))
                .with_spans(vec![TypedSpan::new("Times", 11.0, "Body words")])
        })
        .collect();
    let doc = PartlyUnreadable {
        inner: MemoryDocument::new(pages),
        bad: 1,
    };

    let profiles = build_font_profiles(&doc, 5).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].count, 2);

    let sections = infer_sections(&doc).unwrap();
    let section_pages: Vec<_> = sections.iter().filter_map(|s| s.page).collect();
    assert!(section_pages.contains(&1));
    assert!(section_pages.contains(&3));
    assert!(!section_pages.contains(&2));

    let spec = ChunkSpec::new(ChunkStrategy::Recursive, 500, 0);
    let chunks = chunk_document(&doc, &spec, false).unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.metadata.page_index != 1));
}

#[tokio::test]
async fn outline_wins_over_inferred_sections() {
    let doc = ten_page_document().with_toc(vec![
        TocEntry {
            level: 1,
            title: "Introduction".into(),
            page: Some(1),
        },
        TocEntry {
            level: 2,
            title: "Background".into(),
            page: Some(2),
        },
    ]);
    let ingestion = analyze(Arc::new(doc), &IngestConfig::default()).await.unwrap();
    let sections = &ingestion.structure.sections;
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[1].source, SectionSource::Toc { level: 2 });
    assert_eq!(sections[1].confidence(), 1.0);
}

#[tokio::test]
async fn headers_are_inferred_without_outline() {
    let doc = MemoryDocument::from_texts([
        "CHAPTER ONE\n\nThe study began in the spring with a small pilot group.",
        "Results:\nMost participants finished the program.",
    ]);
    let ingestion = analyze(Arc::new(doc), &IngestConfig::default()).await.unwrap();
    let titles: Vec<&str> = ingestion
        .structure
        .sections
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert!(titles.contains(&"CHAPTER ONE"));
    assert!(titles.contains(&"Results:"));
    for section in &ingestion.structure.sections {
        let c = section.confidence();
        assert!((0.0..=1.0).contains(&c));
    }
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_document_is_no_content() {
    let err = analyze(Arc::new(MemoryDocument::new(Vec::new())), &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::NoContent { ref cause, .. } if cause.contains("no pages")));
}

#[tokio::test]
async fn blank_pages_are_no_content() {
    let doc = MemoryDocument::from_texts(["", "   \n  ", "\n"]);
    let err = analyze(Arc::new(doc), &IngestConfig::default()).await.unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::NoContent { ref cause, .. } if cause.contains("no extractable text")));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let err = ingest("/definitely/not/here.pdf", &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::FileNotFound { .. }));
}

#[tokio::test]
async fn non_pdf_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hello, this is plain text").unwrap();
    let err = ingest(file.path().to_str().unwrap(), &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::NotAPdf { .. }));
    assert!(err.is_unreadable());

    let err = ingest_from_bytes(b"GIF89a....", &IngestConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::NotAPdf { .. }));
}

#[test]
fn overlap_must_be_smaller_than_size() {
    let err = IngestConfig::builder()
        .chunk_size(100)
        .chunk_overlap(100)
        .build()
        .unwrap_err();
    assert!(matches!(err, Pdf2SlidesError::InvalidConfig(_)));
}

// ── Planning and the store ───────────────────────────────────────────────────

#[tokio::test]
async fn content_analysis_reply_is_parsed_leniently() {
    let ingestion = analyze(Arc::new(ten_page_document()), &IngestConfig::default())
        .await
        .unwrap();
    let reply = r#"Here is the plan:
```json
[
  {"SlideNumber": 1, "Title": "Overview", "Content": ["Scope", "Method"]},
  {"SlideNumber": 2, "Title": "Numbers", "Content": ["Growth"], "HasData": true, "Data": "a,1"},
  {"Title": "Missing number and content"}
]
```"#;
    let enricher = ReplyWith(reply.to_string());
    let slides = plan_slides(&ingestion, Some(&enricher)).await;

    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0].title, "Overview");
    assert!(!slides[0].needs_image);
    assert!(slides[1].has_data);
}

#[tokio::test]
async fn unusable_content_analysis_falls_back_to_chunks() {
    let ingestion = analyze(Arc::new(ten_page_document()), &IngestConfig::default())
        .await
        .unwrap();
    let enricher = ReplyWith("I cannot help with that.".into());
    let slides = plan_slides(&ingestion, Some(&enricher)).await;
    assert_eq!(slides, ingestion.slides());

    let without = plan_slides(&ingestion, None).await;
    assert_eq!(without.len(), ingestion.chunks.len());
}

#[tokio::test]
async fn ingestion_is_recorded_in_store() {
    let ingestion = analyze(Arc::new(ten_page_document()), &IngestConfig::default())
        .await
        .unwrap();
    let store = ResultStore::new();
    record_ingestion(&ingestion, &store).unwrap();

    assert_eq!(
        store.keys(),
        vec![
            keys::CHUNKS,
            keys::DOCUMENT_STRUCTURE,
            keys::PDF_CONTENT,
            keys::PRESENTATION_CHUNKS
        ]
    );
    let pages: Vec<PageContent> = store.get_as(keys::PDF_CONTENT).unwrap();
    assert_eq!(pages.len(), 10);
    let classified: Vec<ClassifiedChunk> = store.get_as(keys::PRESENTATION_CHUNKS).unwrap();
    assert_eq!(classified, ingestion.chunks);
    assert!(store.get(keys::SLIDES).is_err());
}
