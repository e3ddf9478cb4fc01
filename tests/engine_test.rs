mod common;

use assert2::{check, let_assert};
use common::{MALFORMED_DUMP, NUMPY_DUMP, SCIPY_DUMP, engine_with_libraries};
use scidoc_engine::{DocEngine, EngineError, Query, QueryMode, RecordKind};

async fn numpy_engine() -> DocEngine {
    let engine = engine_with_libraries(3600, &["numpy"]);
    engine.ingest("numpy", NUMPY_DUMP).await.unwrap();
    engine
}

/// Exact lookup of an ingested id returns exactly one maximally-scored hit.
#[tokio::test]
async fn exact_lookup_returns_single_scored_hit() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("numpy.array", QueryMode::Exact))
        .await
        .unwrap();

    check!(result.hits.len() == 1);
    check!(result.total_matched == 1);
    check!(result.hits[0].record.id == "numpy.array");
    check!(result.hits[0].score == 1.0);
    check!(result.hits[0].library == "numpy");
    check!(result.generation_served["numpy"] == 1);
}

/// Every id returned in Exact mode resolves via `get` with its kind intact.
#[tokio::test]
async fn exact_hits_resolve_via_get_with_kind_intact() {
    let engine = numpy_engine().await;

    for id in ["numpy.array", "numpy.ndarray", "numpy.guide.broadcasting"] {
        let result = engine.query(&Query::new(id, QueryMode::Exact)).await.unwrap();
        check!(result.hits.len() == 1);

        let fetched = engine.get("numpy", id).await.unwrap();
        check!(fetched.id == result.hits[0].record.id);
        check!(fetched.kind == result.hits[0].record.kind);
    }

    check!(engine.get("numpy", "numpy.ndarray").await.unwrap().kind == RecordKind::Class);
}

#[tokio::test]
async fn exact_lookup_matches_aliases() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("np.array", QueryMode::Exact))
        .await
        .unwrap();

    check!(result.hits.len() == 1);
    check!(result.hits[0].record.id == "numpy.array");
}

#[tokio::test]
async fn exact_miss_offers_suggestions() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("numpy.aray", QueryMode::Exact))
        .await
        .unwrap();

    check!(result.hits.is_empty());
    check!(result.total_matched == 0);
    check!(!result.suggestions.is_empty());
    check!(result.suggestions[0].id == "numpy.array");
}

#[tokio::test]
async fn exact_hit_carries_no_suggestions() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("numpy.array", QueryMode::Exact))
        .await
        .unwrap();

    check!(result.suggestions.is_empty());
}

/// A keyword query with `limit: 1` over records with distinct scores
/// returns only the top-scoring record.
#[tokio::test]
async fn keyword_limit_one_returns_top_hit() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("array", QueryMode::Keyword).with_limit(1))
        .await
        .unwrap();

    check!(result.hits.len() == 1);
    check!(result.hits[0].record.id == "numpy.array");
    // The limit truncates hits, not the match count.
    check!(result.total_matched == 4);
}

/// Full keyword ordering: combined score descending, id ascending on ties.
#[tokio::test]
async fn keyword_results_rank_by_combined_score() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("array", QueryMode::Keyword))
        .await
        .unwrap();

    let ids: Vec<&str> = result.hits.iter().map(|h| h.record.id.as_str()).collect();
    // numpy.array carries the term in summary, tag and signature;
    // ndarray and zeros tie on weight and fall back to id order.
    check!(
        ids == [
            "numpy.array",
            "numpy.ndarray",
            "numpy.zeros",
            "numpy.guide.broadcasting"
        ]
    );
    check!(result.hits[0].score > result.hits[1].score);
    check!(result.hits[1].score == result.hits[2].score);
    check!(result.hits[2].score > result.hits[3].score);
}

#[tokio::test]
async fn empty_query_text_is_invalid() {
    let engine = numpy_engine().await;

    let result = engine.query(&Query::new("", QueryMode::Keyword)).await;
    let_assert!(Err(EngineError::InvalidQuery(_)) = result);
}

#[tokio::test]
async fn limit_above_cap_is_invalid() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("array", QueryMode::Keyword).with_limit(500))
        .await;
    let_assert!(Err(EngineError::InvalidQuery(reason)) = result);
    check!(reason.contains("500"));
}

/// A dump with one malformed fragment still ingests every valid record,
/// reporting the problem as a warning.
#[tokio::test]
async fn malformed_fragment_warns_but_ingests_rest() {
    let engine = engine_with_libraries(3600, &["numpy"]);
    let report = engine.ingest("numpy", MALFORMED_DUMP).await.unwrap();

    check!(report.generation == 1);
    check!(report.warnings.len() == 1);
    check!(report.warnings[0].message.contains("banana"));

    for id in ["numpy.ones", "numpy.empty"] {
        let result = engine.query(&Query::new(id, QueryMode::Exact)).await.unwrap();
        check!(result.hits.len() == 1, "missing record {id}");
    }
}

/// Re-ingesting byte-identical source changes nothing observable through
/// `query`, though the generation number still increments.
#[tokio::test]
async fn reingesting_identical_source_preserves_results() {
    let engine = engine_with_libraries(3600, &["numpy"]);
    let first = engine.ingest("numpy", NUMPY_DUMP).await.unwrap();
    check!(first.warnings.is_empty());

    let query = Query::new("array", QueryMode::Keyword);
    let before = engine.query(&query).await.unwrap();

    let second = engine.ingest("numpy", NUMPY_DUMP).await.unwrap();
    check!(second.generation > first.generation);

    let after = engine.query(&query).await.unwrap();
    check!(after.hits.len() == before.hits.len());
    for (a, b) in after.hits.iter().zip(&before.hits) {
        check!(a.record.id == b.record.id);
        check!(a.score == b.score);
    }
    check!(after.generation_served["numpy"] == second.generation);
}

/// A scope naming an unknown library yields an empty result, not an error.
#[tokio::test]
async fn unknown_scope_library_yields_empty_result() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("array", QueryMode::Keyword).with_scope(["pandas"]))
        .await
        .unwrap();

    check!(result.hits.is_empty());
    check!(result.total_matched == 0);
    check!(result.generation_served.is_empty());
}

/// Two libraries can register the same alias; scope order decides who wins.
#[tokio::test]
async fn scope_order_breaks_ties_between_libraries() {
    let engine = engine_with_libraries(3600, &["numpy", "scipy"]);
    engine.ingest("numpy", NUMPY_DUMP).await.unwrap();
    engine.ingest("scipy", SCIPY_DUMP).await.unwrap();

    let scipy_first = engine
        .query(&Query::new("linalg.solve", QueryMode::Exact).with_scope(["scipy", "numpy"]))
        .await
        .unwrap();
    let libraries: Vec<&str> = scipy_first.hits.iter().map(|h| h.library.as_str()).collect();
    check!(libraries == ["scipy", "numpy"]);

    // Without a scope, libraries are consulted in lexical order.
    let unscoped = engine
        .query(&Query::new("linalg.solve", QueryMode::Exact))
        .await
        .unwrap();
    let libraries: Vec<&str> = unscoped.hits.iter().map(|h| h.library.as_str()).collect();
    check!(libraries == ["numpy", "scipy"]);
}

#[tokio::test]
async fn prefix_scan_orders_by_key_length_then_lexically() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("numpy.", QueryMode::Prefix))
        .await
        .unwrap();

    let ids: Vec<&str> = result.hits.iter().map(|h| h.record.id.as_str()).collect();
    check!(
        ids == [
            "numpy.array",
            "numpy.zeros",
            "numpy.ndarray",
            "numpy.linalg.solve",
            "numpy.guide.broadcasting"
        ]
    );
    check!(result.total_matched == 5);
}

#[tokio::test]
async fn prefix_scan_is_case_insensitive() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("NumPy.Arr", QueryMode::Prefix))
        .await
        .unwrap();

    check!(result.hits.len() == 1);
    check!(result.hits[0].record.id == "numpy.array");
}

#[tokio::test]
async fn keyword_query_of_stop_words_matches_nothing() {
    let engine = numpy_engine().await;

    let result = engine
        .query(&Query::new("the of an", QueryMode::Keyword))
        .await
        .unwrap();

    check!(result.hits.is_empty());
    check!(result.total_matched == 0);
}

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let engine = numpy_engine().await;

    let_assert!(Err(EngineError::NotFound(id)) = engine.get("numpy", "numpy.missing").await);
    check!(id == "numpy.missing");

    // Unknown library behaves the same as an unknown id.
    let_assert!(Err(EngineError::NotFound(_)) = engine.get("pandas", "numpy.array").await);
}

/// Signature and example snippets survive ingestion and come back through
/// query hits field-for-field.
#[tokio::test]
async fn signatures_and_examples_survive_ingestion() {
    let engine = numpy_engine().await;

    let record = engine.get("numpy", "numpy.array").await.unwrap();
    check!(record.signature.as_deref() == Some("numpy.array(object, dtype=None)"));
    check!(record.examples.len() == 1);
    check!(record.examples[0].code == ">>> np.array([1, 2, 3])");
    check!(record.tags.contains("create"));
    let_assert!(Some(source_ref) = record.source_ref.as_ref());
    check!(source_ref.document == "numpy");
}

#[tokio::test]
async fn examples_are_retrievable_on_their_own() {
    let engine = numpy_engine().await;

    let examples = engine.examples("numpy", "numpy.array").await.unwrap();
    check!(examples.len() == 1);
    check!(examples[0].code == ">>> np.array([1, 2, 3])");

    check!(engine.examples("numpy", "numpy.zeros").await.unwrap().is_empty());
    let_assert!(Err(EngineError::NotFound(_)) = engine.examples("numpy", "nope").await);
}
