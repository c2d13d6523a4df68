use std::sync::Arc;

use async_trait::async_trait;
use time::macros::datetime;

use marcut_config::Config;
use marcut_core::{EntityLabel, Span, SpanSource};
use marcut_docx::{
    Document, DocxError, PartKind, RevisionView, Section, Tag, TextProjector,
};
use marcut_engine::{EngineError, RedactionEngine};
use marcut_providers::{FixedProvider, SpanProvider};

const BODY: [&str; 2] = [
    "Agreement between Jordan Lee and Acme Widgets, Inc. dated today.",
    "Contact jordan@acme.com or Jordan Lee's office.",
];

fn document() -> Document {
    let mut doc = Document::new();
    for line in BODY {
        let p = doc.add_paragraph(doc.body());
        doc.add_run(p, line);
    }
    doc
}

fn projected(doc: &Document, view: RevisionView) -> String {
    TextProjector::new(view).project(doc).text
}

/// Stand-in for a model provider: labels the first mention of each needle
fn model(text: &str, needles: &[(&str, EntityLabel)]) -> Arc<dyn SpanProvider> {
    let spans = needles
        .iter()
        .map(|(needle, label)| {
            let start = text.find(needle).unwrap();
            Span::new(start, start + needle.len(), *label, 0.8, SpanSource::Model, "")
        })
        .collect();
    Arc::new(FixedProvider::new("model", spans))
}

fn engine(config: &Config, provider: Arc<dyn SpanProvider>) -> RedactionEngine {
    let mut engine = RedactionEngine::from_config(config)
        .unwrap()
        .with_timestamp(datetime!(2026-03-04 05:06:07 UTC));
    engine.add_provider(provider);
    engine
}

fn default_model(doc: &Document) -> Arc<dyn SpanProvider> {
    let text = projected(doc, RevisionView::Accepted);
    model(
        &text,
        &[("Jordan Lee", EntityLabel::Name), ("Acme Widgets", EntityLabel::Org)],
    )
}

#[tokio::test]
async fn test_end_to_end_redaction() {
    let mut doc = document();
    let original = projected(&doc, RevisionView::Accepted);
    let mut engine = engine(&Config::default(), default_model(&doc));

    let outcome = engine.redact(&mut doc, None).await.unwrap();

    assert_eq!(
        projected(&doc, RevisionView::Accepted),
        "Agreement between [NAME_1] and [ORG_1] dated today.\nContact [EMAIL_1] or [NAME_1]'s office.\n"
    );
    // The deleted text is still there for review
    assert_eq!(projected(&doc, RevisionView::Rejected), original);

    assert_eq!(outcome.apply.applied, 4);
    assert_eq!(outcome.apply.skipped, 0);
    assert_eq!(outcome.spans.len(), 4);
    assert_eq!(outcome.text_len, original.len());
    assert_eq!(
        outcome.text_hash,
        blake3::hash(original.as_bytes()).to_hex().to_string()
    );

    let ids: Vec<&str> = outcome
        .audit
        .iter()
        .filter_map(|entry| entry.entity_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["NAME_1", "ORG_1", "EMAIL_1", "NAME_1"]);
    assert_eq!(outcome.audit[1].text, "Acme Widgets, Inc.");
    assert_eq!(outcome.audit[3].source, SpanSource::ConsistencyPass);
    assert!(outcome.replacements[3].possessive);
}

#[tokio::test]
async fn test_contact_line_redaction() {
    let mut doc = Document::new();
    let p = doc.add_paragraph(doc.body());
    doc.add_run(p, "Contact John Smith at john@example.com or visit https://example.com.");

    let provider = Arc::new(FixedProvider::new(
        "model",
        vec![Span::new(8, 18, EntityLabel::Name, 0.9, SpanSource::Model, "")],
    ));
    let mut engine = engine(&Config::default(), provider);
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    let ranges: Vec<(usize, usize, EntityLabel)> = outcome
        .spans
        .iter()
        .map(|s| (s.start, s.end, s.label))
        .collect();
    assert_eq!(
        ranges,
        vec![
            (8, 18, EntityLabel::Name),
            (22, 38, EntityLabel::Email),
            (48, 67, EntityLabel::Url),
        ]
    );
    assert_eq!(
        projected(&doc, RevisionView::Accepted),
        "Contact [NAME_1] at [EMAIL_1] or visit [URL_1].\n"
    );
}

#[tokio::test]
async fn test_revision_markup_uses_configured_author() {
    let mut doc = document();
    let config = Config {
        author: "Review Bot".to_string(),
        ..Config::default()
    };
    let mut engine = engine(&config, default_model(&doc));
    engine.redact(&mut doc, None).await.unwrap();

    let xml = doc.document_xml();
    assert!(xml.contains("w:author=\"Review Bot\""));
    assert!(xml.contains("w:date=\"2026-03-04T05:06:07Z\""));
    assert!(xml.contains("<w:delText xml:space=\"preserve\">Jordan Lee</w:delText>"));
    assert!(xml.contains("<w:color w:val=\"FF0000\"/>"));
}

#[tokio::test]
async fn test_headers_redacted_consistently() {
    let mut doc = document();
    let header = doc.add_part(PartKind::Header, "word/header1.xml");
    doc.add_section(Section {
        headers: vec![header],
        footers: Vec::new(),
    });
    let root = doc.part_root(header).unwrap();
    let p = doc.add_paragraph(root);
    doc.add_run(p, "Confidential: Jordan Lee");

    let mut engine = engine(&Config::default(), default_model(&doc));
    engine.redact(&mut doc, None).await.unwrap();

    let text = projected(&doc, RevisionView::Accepted);
    assert!(text.ends_with("Confidential: [NAME_1]\n"));
    assert!(doc.to_xml(root).contains("w:delText"));
}

#[tokio::test]
async fn test_existing_revisions_accepted_first() {
    let mut doc = Document::new();
    let p = doc.add_paragraph(doc.body());
    doc.add_run(p, "Signed by ");
    let ins = doc.append_element(p, Tag::Insertion);
    doc.add_run(ins, "Jordan Lee");
    let del = doc.append_element(p, Tag::Deletion);
    let old = doc.append_element(del, Tag::Run);
    doc.set_run_text(old, "Casey Park", true);

    let provider = model("Signed by Jordan Lee\n", &[("Jordan Lee", EntityLabel::Name)]);
    let mut engine = engine(&Config::default(), provider);
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    assert_eq!(outcome.revisions_accepted.unwrapped, 1);
    assert_eq!(outcome.revisions_accepted.dropped, 1);
    assert_eq!(projected(&doc, RevisionView::Accepted), "Signed by [NAME_1]\n");
    assert_eq!(projected(&doc, RevisionView::Rejected), "Signed by Jordan Lee\n");
}

#[tokio::test]
async fn test_pending_revisions_rejected_when_acceptance_disabled() {
    let mut doc = Document::new();
    let p = doc.add_paragraph(doc.body());
    let ins = doc.append_element(p, Tag::Insertion);
    doc.add_run(ins, "Jordan Lee");
    let before = doc.document_xml();

    let provider = model("Jordan Lee\n", &[("Jordan Lee", EntityLabel::Name)]);
    let mut engine = engine(&Config::default(), provider).accept_existing_revisions(false);
    let result = engine.redact(&mut doc, None).await;

    assert!(matches!(result, Err(EngineError::PendingRevisions)));
    assert_eq!(doc.document_xml(), before);
}

#[tokio::test]
async fn test_missing_body_is_fatal() {
    let mut doc = document();
    let body = doc.body();
    doc.detach(body);

    let mut engine = engine(&Config::default(), default_model(&document()));
    let result = engine.redact(&mut doc, None).await;
    assert!(matches!(
        result,
        Err(EngineError::Document(DocxError::MissingBody))
    ));
}

struct Unavailable;

#[async_trait]
impl SpanProvider for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn spans(&self, _text: &str, _context: Option<&str>) -> anyhow::Result<Vec<Span>> {
        anyhow::bail!("connection refused")
    }
}

#[tokio::test]
async fn test_failed_provider_does_not_stop_redaction() {
    let mut doc = document();
    let mut engine = engine(&Config::default(), Arc::new(Unavailable));
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    // Only the pattern provider contributed
    assert_eq!(outcome.spans.len(), 1);
    assert_eq!(outcome.spans[0].label, EntityLabel::Email);
    let failed = outcome
        .providers
        .iter()
        .find(|r| r.provider == "unavailable")
        .unwrap();
    assert_eq!(failed.spans, 0);
    assert!(failed.error.is_some());
}

#[tokio::test]
async fn test_untracked_replacement() {
    let mut doc = document();
    let config = Config {
        track_changes: false,
        ..Config::default()
    };
    let mut engine = engine(&config, default_model(&doc));
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    assert_eq!(outcome.apply.revisions, 0);
    let deletions = doc
        .descendants(doc.root())
        .filter(|&id| doc.tag(id) == Some(&Tag::Deletion))
        .count();
    assert_eq!(deletions, 0);
    assert_eq!(
        projected(&doc, RevisionView::Rejected),
        projected(&doc, RevisionView::Accepted)
    );
    assert!(projected(&doc, RevisionView::Accepted).starts_with("Agreement between [NAME_1]"));
}

#[tokio::test]
async fn test_exclusion_file_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exclusions.txt");
    std::fs::write(&path, "# house terms\nAcme Widgets\n").unwrap();

    let mut config = Config::default();
    config.exclusions.path = Some(path);

    let mut doc = document();
    let mut engine = engine(&config, default_model(&doc));
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    assert!(outcome.spans.iter().all(|s| s.label != EntityLabel::Org));
    assert_eq!(outcome.consolidation.excluded_pre, 1);
    assert!(projected(&doc, RevisionView::Accepted).contains("Acme Widgets, Inc."));
}

#[tokio::test]
async fn test_unreadable_exclusion_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let mut doc = Document::new();
    let p = doc.add_paragraph(doc.body());
    doc.add_run(p, "Signed by ");
    let ins = doc.append_element(p, Tag::Insertion);
    doc.add_run(ins, "Jordan Lee");

    let provider = model("Signed by Jordan Lee\n", &[("Jordan Lee", EntityLabel::Name)]);
    let mut engine = engine(&Config::default(), provider);
    // A directory cannot be read as an exclusion file
    assert!(engine.exclusions_mut().watch_file(dir.path()).is_err());

    let outcome = engine.redact(&mut doc, None).await.unwrap();
    assert_eq!(outcome.revisions_accepted.unwrapped, 1);
    assert_eq!(projected(&doc, RevisionView::Accepted), "Signed by [NAME_1]\n");
}

#[tokio::test]
async fn test_outcome_serializes() {
    let mut doc = document();
    let mut engine = engine(&Config::default(), default_model(&doc));
    let outcome = engine.redact(&mut doc, None).await.unwrap();

    let json = outcome.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["audit"][0]["label"], "NAME");
    assert_eq!(value["audit"][0]["source"], "model");
    assert_eq!(value["text_hash"].as_str().unwrap().len(), 64);
}
