//! Criterion benchmarks for the word-count cache core operations.
//!
//! Run with: `cargo bench`
//!
//! Synthetic vaults keep the numbers reproducible across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use wordcache::reconcile::reconcile;
use wordcache::{count_words, is_excluded, DocumentId, ExclusionConfig, IndexStore, MemorySource};

// ─── Helpers ─────────────────────────────────────────────────────────

/// A note of roughly `words` words with a front matter block.
fn synthetic_note(words: usize) -> String {
    let mut s = String::from("---\ntitle: Bench\ntags: [a, b]\n---\n");
    for i in 0..words {
        s.push_str("word");
        s.push_str(&(i % 97).to_string());
        s.push(if i % 12 == 11 { '\n' } else { ' ' });
    }
    s
}

fn synthetic_vault(docs: usize) -> MemorySource {
    let source = MemorySource::new();
    for i in 0..docs {
        let folder = match i % 10 {
            0 => "Templates",
            1..=3 => "journal",
            _ => "notes",
        };
        source.insert(format!("{}/note_{}.md", folder, i), synthetic_note(200 + i % 300), i as u64);
    }
    source
}

fn md() -> Vec<String> {
    vec!["md".to_string()]
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_count_words(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_words");
    for words in [100usize, 1_000, 10_000] {
        let note = synthetic_note(words);
        group.bench_with_input(BenchmarkId::from_parameter(words), &note, |b, note| {
            b.iter(|| count_words(black_box(note)))
        });
    }
    group.finish();
}

fn bench_is_excluded(c: &mut Criterion) {
    let config = ExclusionConfig {
        excluded_folders: vec!["Templates".into(), ".trash".into(), "Archive/2019".into()],
        excluded_files: vec!["README".into(), "index.md".into()],
    };
    let ids: Vec<DocumentId> = (0..1_000)
        .map(|i| DocumentId::new(format!("notes/sub_{}/note_{}.md", i % 7, i)))
        .collect();

    c.bench_function("is_excluded_1000", |b| {
        b.iter(|| ids.iter().filter(|id| is_excluded(id, black_box(&config))).count())
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(20);

    for docs in [1_000usize, 5_000] {
        let source = synthetic_vault(docs);
        let config = ExclusionConfig::default();

        group.bench_with_input(BenchmarkId::new("cold", docs), &docs, |b, _| {
            b.iter(|| {
                let mut store = IndexStore::new();
                reconcile(&mut store, &source, &config, &md()).unwrap()
            })
        });

        // Every mtime matches: the pass should only stat.
        let mut warm = IndexStore::new();
        reconcile(&mut warm, &source, &config, &md()).unwrap();
        group.bench_with_input(BenchmarkId::new("unchanged", docs), &docs, |b, _| {
            b.iter(|| {
                let mut store = warm.clone();
                reconcile(&mut store, &source, &config, &md()).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_count_words, bench_is_excluded, bench_reconcile);
criterion_main!(benches);
