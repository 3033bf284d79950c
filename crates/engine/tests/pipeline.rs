//! End-to-end build/query pipeline tests over a tiny in-repo corpus.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use embedder::{Device, HashEmbedder};
use engine::{BuildParams, EngineError, IndexBuilder, QueryEngine, QueryOutcome};
use flate2::write::GzEncoder;
use flate2::Compression;
use flat_index::{FlatIndex, SimilaritySearch};
use meta_store::MetaStore;
use tempfile::{tempdir, TempDir};

const CORPUS: &[&str] = &[
    "A\tcats\tcats are mammals",
    "B\tdogs\tdogs are mammals",
    "C\tcars\tcars are vehicles",
];

fn write_corpus(lines: &[&str]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.txt.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::fast());
    for line in lines {
        writeln!(enc, "{line}").unwrap();
    }
    enc.finish().unwrap();
    (dir, path)
}

fn params(dir: &TempDir, input: PathBuf) -> BuildParams {
    BuildParams {
        input,
        index_out: dir.path().join("out.idx"),
        meta_out: dir.path().join("out.meta"),
        batch_size: 2,
        max_docs: 0,
        progress: false,
    }
}

#[test]
fn self_query_ranks_its_own_document_first() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    let report = IndexBuilder::new(&emb).build(&p).unwrap();
    assert_eq!(report.docs, 3);

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    // Query text identical to document B's embedding input.
    let outcome = engine.query(&emb, "dogs dogs are mammals", 3, -1.0).unwrap();

    let QueryOutcome::Ranked(hits) = outcome else {
        panic!("expected ranked hits");
    };
    assert_eq!(hits[0].title, "dogs");
    assert!((hits[0].score - 1.0).abs() < 1e-5, "self-similarity ~ 1.0");
    assert_eq!(hits[0].rank, 1);
    assert!(hits[1].score <= hits[0].score && hits[2].score <= hits[1].score);
}

#[test]
fn min_score_above_everything_yields_no_matches() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p).unwrap();

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    let outcome = engine.query(&emb, "dogs", 5, 1.5).unwrap();
    assert_eq!(outcome, QueryOutcome::NoMatches);
}

#[test]
fn k_zero_is_a_valid_empty_list_not_no_matches() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p).unwrap();

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    let outcome = engine.query(&emb, "dogs", 0, -1.0).unwrap();
    assert_eq!(outcome, QueryOutcome::Ranked(Vec::new()));
}

#[test]
fn small_index_never_fabricates_results() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p).unwrap();

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    let outcome = engine.query(&emb, "mammals", 10, -1.0).unwrap();

    let QueryOutcome::Ranked(hits) = outcome else {
        panic!("expected ranked hits");
    };
    assert!(hits.len() <= 3);
    for (i, hit) in hits.iter().enumerate() {
        assert_eq!(hit.rank, i + 1);
    }
}

#[test]
fn permissive_threshold_returns_exactly_k() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p).unwrap();

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    let outcome = engine.query(&emb, "anything at all", 2, -1.0).unwrap();

    let QueryOutcome::Ranked(hits) = outcome else {
        panic!("expected ranked hits");
    };
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn max_docs_takes_the_first_n_records_in_order() {
    let (dir, input) = write_corpus(&[
        "A\tone\tfirst",
        "B\ttwo\tsecond",
        "C\tthree\tthird",
        "D\tfour\tfourth",
        "E\tfive\tfifth",
    ]);
    let mut p = params(&dir, input);
    p.max_docs = 2;

    let emb = HashEmbedder::new(64, Device::Cpu);
    let report = IndexBuilder::new(&emb).build(&p).unwrap();
    assert_eq!(report.docs, 2);
    assert_eq!(report.dim, 64);

    let index = FlatIndex::load(&p.index_out).unwrap();
    assert_eq!(index.len(), 2);

    let meta = MetaStore::load(&p.meta_out).unwrap();
    assert_eq!(meta.len(), 2);
    assert_eq!(meta.get(core_types::DocId(0)).unwrap().title, "one");
    assert_eq!(meta.get(core_types::DocId(1)).unwrap().title, "two");
}

#[test]
fn rebuilding_the_same_corpus_is_idempotent() {
    let (dir, input) = write_corpus(CORPUS);
    let p1 = params(&dir, input.clone());
    let mut p2 = params(&dir, input);
    p2.index_out = dir.path().join("again.idx");
    p2.meta_out = dir.path().join("again.meta");
    // Different batch size must not change the artifacts either.
    p2.batch_size = 1;

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p1).unwrap();
    IndexBuilder::new(&emb).build(&p2).unwrap();

    assert_eq!(
        FlatIndex::load(&p1.index_out).unwrap(),
        FlatIndex::load(&p2.index_out).unwrap()
    );
    assert_eq!(
        MetaStore::load(&p1.meta_out).unwrap(),
        MetaStore::load(&p2.meta_out).unwrap()
    );
    assert_eq!(
        std::fs::read(&p1.index_out).unwrap(),
        std::fs::read(&p2.index_out).unwrap()
    );
}

#[test]
fn misaligned_pair_is_rejected_before_any_query() {
    let (dir, input) = write_corpus(CORPUS);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    IndexBuilder::new(&emb).build(&p).unwrap();

    // Swap in a metadata blob with a different record count.
    let mut short_meta = MetaStore::new();
    short_meta.push(core_types::Document {
        label: "A".into(),
        title: "only one".into(),
        text: "record".into(),
    });
    short_meta.save(&p.meta_out).unwrap();

    let err = QueryEngine::load(&p.index_out, &p.meta_out).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Consistency { vectors: 3, records: 1 }
    ));
}

#[test]
fn parse_error_aborts_the_build() {
    let (dir, input) = write_corpus(&["A\tok\tfine", "broken line without tabs"]);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    let err = IndexBuilder::new(&emb).build(&p).unwrap_err();
    assert!(matches!(err, EngineError::Corpus(_)));
    // Nothing half-written.
    assert!(!p.index_out.exists());
    assert!(!p.meta_out.exists());
}

#[test]
fn empty_corpus_builds_an_empty_queryable_pair() {
    let (dir, input) = write_corpus(&[]);
    let p = params(&dir, input);

    let emb = HashEmbedder::default();
    let report = IndexBuilder::new(&emb).build(&p).unwrap();
    assert_eq!(report.docs, 0);

    let engine = QueryEngine::load(&p.index_out, &p.meta_out).unwrap();
    assert!(engine.is_empty());
    assert_eq!(
        engine.query(&emb, "anything", 5, -1.0).unwrap(),
        QueryOutcome::NoMatches
    );
}
