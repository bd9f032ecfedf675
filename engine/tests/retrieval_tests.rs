use engine::batch::{number_queries, run_boolean, run_vector, summarize, Query};
use engine::embed::{HashingEmbedder, HashingEmbedderConfig};
use engine::eval::{evaluate, EvalOptions};
use engine::metrics::EvaluationRecord;
use engine::persist::{load_snapshot, save_snapshot, IndexPaths};
use engine::query::parse;
use engine::store::SledStore;
use engine::pipeline::Pipeline;
use engine::{DocId, Document, InvertedIndex, RelevanceJudgments, StandardAnalyzer, VectorIndex};
use tempfile::tempdir;

fn corpus() -> Vec<Document> {
    let rows = [
        ("Library automation", "Automation of library catalogs and circulation."),
        ("Citation indexing", "Citation indexes for scientific literature retrieval."),
        ("Information retrieval", "Evaluation of retrieval systems using precision and recall."),
        ("Library use", "Surveys of library use by scientists."),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (title, content))| Document {
            id: i as DocId + 1,
            title: title.to_string(),
            author: "Anon".into(),
            content: content.to_string(),
            extra: String::new(),
        })
        .collect()
}

fn assert_postings_sorted_and_counted(index: &InvertedIndex) {
    for (_, list) in index.iter() {
        let ids: Vec<DocId> = list.doc_ids().collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(list.iter().all(|p| p.frequency >= 1));
    }
}

#[test]
fn boolean_queries_end_to_end() {
    let index = InvertedIndex::build(&corpus(), &StandardAnalyzer);
    assert_postings_sorted_and_counted(&index);
    // "library" twice in doc 1 (title + content) and doc 4
    let lib = index.postings("librari").unwrap();
    assert_eq!(lib.as_slice()[0].frequency, 2);
    assert_eq!(lib.doc_ids().collect::<Vec<_>>(), vec![1, 4]);

    let node = parse("#and('Library', 'catalogs')").unwrap();
    let hits = evaluate(&node, &index, &StandardAnalyzer, EvalOptions::default()).unwrap().unwrap();
    assert_eq!(hits.iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![1]);

    let judgments: RelevanceJudgments = [(1, 1), (1, 4), (2, 2), (2, 3)].into_iter().collect();
    let queries = number_queries(["#or('library', 'automation')", "#and('retrieval', #not('citation'))"]);
    let outcomes = run_boolean(&queries, &index, &StandardAnalyzer, &judgments, EvalOptions::default());
    // concatenation keeps doc 1 twice
    assert_eq!(outcomes[0].record.result, "1,4,1");
    assert!((outcomes[0].record.recall - 1.0).abs() < 1e-9);
    assert_eq!(outcomes[1].record.result, "3");
    assert!((outcomes[1].record.precision - 1.0).abs() < 1e-9);
    assert!((outcomes[1].record.recall - 0.5).abs() < 1e-9);
}

#[test]
fn metrics_example_from_three_documents() {
    let judgments: RelevanceJudgments = [(1, 1), (1, 2)].into_iter().collect();
    let record = EvaluationRecord::score(1, &[1, 3, 2], judgments.relevant(1));
    assert!((record.precision - 2.0 / 3.0).abs() < 1e-9);
    assert!((record.recall - 1.0).abs() < 1e-9);
    assert!((record.f_measure - 0.8).abs() < 1e-9);
}

#[test]
fn vector_search_ranks_matching_document_first() {
    let docs = corpus();
    let embedder = HashingEmbedder::new(HashingEmbedderConfig::default());
    let vectors = VectorIndex::build(&docs, &embedder).unwrap();
    assert_eq!(vectors.len(), docs.len());

    let judgments: RelevanceJudgments = [(7, 2)].into_iter().collect();
    let queries = vec![Query::new(7, docs[1].content.clone())];
    let outcomes = run_vector(&queries, &vectors, &embedder, &judgments, Some(2));
    let result = outcomes[0].result.as_ref().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.hits[0].doc_id, 2);
    assert!((result.hits[0].score - 1.0).abs() < 1e-5);
    assert!((summarize(&outcomes).map - 1.0).abs() < 1e-9);
}

#[test]
fn snapshot_and_sled_cache_roundtrip() {
    let dir = tempdir().unwrap();
    let store = SledStore::open(dir.path().join("cache")).unwrap();
    let mut pipeline = Pipeline::new(&store, &StandardAnalyzer);
    pipeline.load_documents(false, || Ok(corpus())).unwrap();
    let index = pipeline.build_index(false).unwrap().clone();

    let paths = IndexPaths::new(dir.path().join("snapshot"));
    let meta = save_snapshot(&paths, &index).unwrap();
    assert_eq!(meta.num_docs, 4);
    assert!(time::OffsetDateTime::parse(&meta.created_at, &time::format_description::well_known::Rfc3339).is_ok());
    let (loaded, loaded_meta) = load_snapshot(&paths).unwrap();
    assert_eq!(loaded, index);
    assert_eq!(loaded_meta.num_terms as usize, index.num_terms());
    store.close().unwrap();
}
