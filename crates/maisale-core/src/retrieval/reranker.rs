//! Context-boosted reordering of retrieval results

use super::RetrievalResult;
use std::collections::HashMap;

/// Added when a result comes from the conversation being answered
pub const CONVERSATION_BOOST: f64 = 1.0;

/// Added when a result belongs to the user being answered
pub const USER_BOOST: f64 = 0.5;

/// Score of one result: closer is better, same conversation/user is boosted.
/// Boosts are additive.
pub fn rerank_score(result: &RetrievalResult, query_metadata: &HashMap<String, String>) -> f64 {
    let mut score = -result.distance;

    if let Some(conversation_id) = query_metadata.get("conversation_id") {
        if result.metadata.conversation_id.as_ref() == Some(conversation_id) {
            score += CONVERSATION_BOOST;
        }
    }

    if let Some(user_id) = query_metadata.get("user_id") {
        if result.metadata.user_id.as_ref() == Some(user_id) {
            score += USER_BOOST;
        }
    }

    score
}

/// Reorder results by descending boosted score. Ties keep their input order.
pub fn rerank(
    results: Vec<RetrievalResult>,
    query_metadata: &HashMap<String, String>,
) -> Vec<RetrievalResult> {
    if results.len() < 2 {
        return results;
    }

    let mut scored: Vec<(f64, RetrievalResult)> = results
        .into_iter()
        .map(|r| (rerank_score(&r, query_metadata), r))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    tracing::debug!("Reranked {} results", scored.len());
    scored.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ResultMetadata;

    fn make_result(id: &str, distance: f64, conversation_id: &str, user_id: &str) -> RetrievalResult {
        RetrievalResult {
            id: id.to_string(),
            document: format!("doc {}", id),
            metadata: ResultMetadata::for_message(conversation_id, user_id),
            distance,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_conversation_boost_ordering() {
        let results = vec![
            make_result("d05", 0.5, "A", "x"),
            make_result("d01", 0.1, "B", "x"),
            make_result("d03", 0.3, "A", "x"),
        ];
        let q = query(&[("conversation_id", "A")]);

        let scores: Vec<f64> = results.iter().map(|r| rerank_score(r, &q)).collect();
        assert!((scores[0] - 0.5).abs() < 1e-9);
        assert!((scores[1] - -0.1).abs() < 1e-9);
        assert!((scores[2] - 0.7).abs() < 1e-9);

        let ranked = rerank(results, &q);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d03", "d05", "d01"]);
    }

    #[test]
    fn test_boosts_are_additive() {
        let r = make_result("a", 0.2, "A", "U");
        let q = query(&[("conversation_id", "A"), ("user_id", "U")]);
        assert!((rerank_score(&r, &q) - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let results = vec![
            make_result("first", 0.4, "Z", "z"),
            make_result("second", 0.4, "Z", "z"),
            make_result("third", 0.4, "Z", "z"),
        ];
        let ranked = rerank(results, &query(&[("conversation_id", "A")]));
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(rerank(vec![], &HashMap::new()).is_empty());
        let one = rerank(vec![make_result("a", 0.1, "A", "u")], &HashMap::new());
        assert_eq!(one.len(), 1);
    }
}
