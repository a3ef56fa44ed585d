use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use folio::config::{PagingConfig, PipelineConfig};
use folio::markup::extract_words;
use folio::paging::PageSplitter;
use folio::pipeline::Pipeline;
use folio::sentence_detector::{sentences_of, TokenizerChoice};

/// Synthetic book: chapters of dialogue-heavy paragraphs with light markup
fn synthetic_book(chapters: usize) -> String {
    let paragraph = "\"Where were you, Mr. Grey?\" she asked. He said nothing at first. \
                     The <em>old</em> clock struck nine &amp; the fire burned low. \
                     At last he spoke: \"On the road from St. Albans.\"\n\n";
    let mut book = String::new();
    for chapter in 1..=chapters {
        book.push_str(&format!("CHAPTER {chapter}\n\n"));
        book.push_str(&paragraph.repeat(40));
    }
    book
}

fn bench_paging(c: &mut Criterion) {
    // WHY: page splitting scans the whole document, so regressions show up in throughput
    let book = synthetic_book(20);
    let splitter = PageSplitter::new(PagingConfig::default()).expect("splitter");

    let mut group = c.benchmark_group("paging");
    group.throughput(Throughput::Bytes(book.len() as u64));
    group.sample_size(20);
    group.bench_function("split_pages", |b| {
        b.iter(|| {
            let document = splitter.document(book.as_str());
            black_box(splitter.pages(&document).count())
        });
    });
    group.finish();
}

fn bench_sentences(c: &mut Criterion) {
    let page = synthetic_book(1);

    let mut group = c.benchmark_group("sentences");
    group.throughput(Throughput::Bytes(page.len() as u64));
    group.bench_function("extract_words", |b| b.iter(|| black_box(extract_words(&page))));
    for choice in [TokenizerChoice::Statistical, TokenizerChoice::RuleBased] {
        group.bench_with_input(BenchmarkId::new("tokenize", format!("{choice:?}")), &choice, |b, &choice| {
            b.iter(|| black_box(sentences_of(&page, "en", choice)))
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    // WHY: end-to-end run measures parallel page annotation on the blocking pool
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let book = synthetic_book(20);
    let config = PipelineConfig {
        language_override: Some("en".into()),
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).expect("pipeline");

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(book.len() as u64));
    group.sample_size(10); // WHY: just 10 samples for speed
    group.bench_function("process_document", |b| {
        b.to_async(&rt).iter(|| async { black_box(pipeline.process(&book).await.expect("processed")) });
    });
    group.finish();
}

criterion_group!(benches, bench_paging, bench_sentences, bench_pipeline);
criterion_main!(benches);
