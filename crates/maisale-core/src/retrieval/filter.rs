//! Equality filters over snippet metadata

use super::ResultMetadata;
use std::collections::HashMap;

/// Metadata keys the index can be scoped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    ConversationId,
    UserId,
    Source,
}

impl MetadataField {
    pub fn key(self) -> &'static str {
        match self {
            Self::ConversationId => "conversation_id",
            Self::UserId => "user_id",
            Self::Source => "source",
        }
    }

    pub(crate) fn column(self) -> &'static str {
        // Column names match the metadata keys
        self.key()
    }

    fn value_of(self, metadata: &ResultMetadata) -> Option<&str> {
        match self {
            Self::ConversationId => metadata.conversation_id.as_deref(),
            Self::UserId => metadata.user_id.as_deref(),
            Self::Source => metadata.source.as_deref(),
        }
    }
}

/// Filter expression applied to an index query
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    Eq(MetadataField, String),
    And(Vec<MetadataFilter>),
}

impl MetadataFilter {
    /// Build the scoping filter for a turn from its metadata map.
    ///
    /// One present key yields a single equality; both keys yield their AND;
    /// neither yields no filter.
    pub fn from_scope(metadata: &HashMap<String, String>) -> Option<Self> {
        let mut clauses: Vec<MetadataFilter> = [MetadataField::ConversationId, MetadataField::UserId]
            .into_iter()
            .filter_map(|field| {
                metadata
                    .get(field.key())
                    .map(|value| MetadataFilter::Eq(field, value.clone()))
            })
            .collect();

        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(MetadataFilter::And(clauses)),
        }
    }

    /// Evaluate against stored metadata
    pub fn matches(&self, metadata: &ResultMetadata) -> bool {
        match self {
            Self::Eq(field, value) => field.value_of(metadata) == Some(value.as_str()),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(metadata)),
        }
    }

    /// Render as a SQL boolean expression with positional parameters
    pub(crate) fn to_sql(&self, params: &mut Vec<String>) -> String {
        match self {
            Self::Eq(field, value) => {
                params.push(value.clone());
                format!("{} = ?{}", field.column(), params.len())
            }
            Self::And(clauses) if clauses.is_empty() => "1 = 1".to_string(),
            Self::And(clauses) => {
                let parts: Vec<String> = clauses.iter().map(|c| c.to_sql(params)).collect();
                format!("({})", parts.join(" AND "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_both_ids_combine_with_and() {
        let filter =
            MetadataFilter::from_scope(&scope(&[("conversation_id", "c1"), ("user_id", "u1")]))
                .unwrap();
        assert_eq!(
            filter,
            MetadataFilter::And(vec![
                MetadataFilter::Eq(MetadataField::ConversationId, "c1".to_string()),
                MetadataFilter::Eq(MetadataField::UserId, "u1".to_string()),
            ])
        );
    }

    #[test]
    fn test_single_id_is_plain_equality() {
        let filter = MetadataFilter::from_scope(&scope(&[("user_id", "u1")])).unwrap();
        assert_eq!(
            filter,
            MetadataFilter::Eq(MetadataField::UserId, "u1".to_string())
        );

        let filter = MetadataFilter::from_scope(&scope(&[("conversation_id", "c9")])).unwrap();
        assert_eq!(
            filter,
            MetadataFilter::Eq(MetadataField::ConversationId, "c9".to_string())
        );
    }

    #[test]
    fn test_no_scope_no_filter() {
        assert!(MetadataFilter::from_scope(&scope(&[("other", "x")])).is_none());
    }

    #[test]
    fn test_matches_and() {
        let filter =
            MetadataFilter::from_scope(&scope(&[("conversation_id", "c1"), ("user_id", "u1")]))
                .unwrap();
        assert!(filter.matches(&ResultMetadata::for_message("c1", "u1")));
        assert!(!filter.matches(&ResultMetadata::for_message("c1", "u2")));
        assert!(!filter.matches(&ResultMetadata::for_source("doc.md")));
    }

    #[test]
    fn test_to_sql() {
        let filter =
            MetadataFilter::from_scope(&scope(&[("conversation_id", "c1"), ("user_id", "u1")]))
                .unwrap();
        let mut params = Vec::new();
        let sql = filter.to_sql(&mut params);
        assert_eq!(sql, "(conversation_id = ?1 AND user_id = ?2)");
        assert_eq!(params, vec!["c1".to_string(), "u1".to_string()]);
    }
}
