//! Overlap resolution

use std::cmp::Ordering;

use marcut_core::Span;

/// Priority of `a` over `b`: label rank, then length, then confidence
fn priority(a: &Span, b: &Span) -> Ordering {
    a.label
        .rank()
        .cmp(&b.label.rank())
        .then(a.len().cmp(&b.len()))
        .then(a.confidence.total_cmp(&b.confidence))
}

/// Collapse overlapping spans into their union.
///
/// Spans are swept in `(start, rank desc, length desc, confidence desc, input
/// order)` order. An overlapping candidate extends the open span; when it
/// outranks the open span it also donates its label, entity id and source.
/// The merged confidence is the higher of the two. Coverage never shrinks.
pub fn merge_overlaps(text: &str, spans: Vec<Span>) -> Vec<Span> {
    let mut indexed: Vec<(usize, Span)> = spans.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        a.start
            .cmp(&b.start)
            .then(priority(b, a))
            .then(ia.cmp(ib))
    });

    let mut out: Vec<Span> = Vec::with_capacity(indexed.len());
    for (_, candidate) in indexed {
        match out.last_mut() {
            Some(open) if candidate.start < open.end => {
                let end = open.end.max(candidate.end);
                let confidence = open.confidence.max(candidate.confidence);
                if priority(&candidate, open) == Ordering::Greater {
                    open.label = candidate.label;
                    open.entity_id = candidate.entity_id;
                    open.source = candidate.source;
                }
                open.confidence = confidence;
                if end != open.end {
                    let start = open.start;
                    open.reslice(text, start, end);
                }
            }
            _ => out.push(candidate),
        }
    }
    out
}
