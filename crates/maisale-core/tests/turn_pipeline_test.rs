//! Whole turns through the conversation service
//!
//! Tests:
//! 1. Keyword fallback, scoped retrieval and generation for a price question
//! 2. Clarify loop stops after the attempt ceiling
//! 3. Greeting persisted on conversation start
//! 4. Input validation and unknown conversations
//! 5. Both messages of a turn end up in the vector index
//! 6. Readiness probes
//! 7. Stalled model calls still complete the turn

mod common;

use common::{database, service, ScriptedLlm};
use std::time::Duration;
use maisale_core::chat::{count_clarify_attempts, texts};
use maisale_core::retrieval::{ResultMetadata, VectorEntry};
use maisale_core::{Intent, Language, MaiSaleError, Persona, ResponseKind, Role};
use std::sync::Arc;

fn persona() -> Persona {
    Persona::from_text("Bạn là Mai, trợ lý bán hàng của cửa hàng máy tính.")
}

#[tokio::test]
async fn test_price_question_uses_fallback_and_context() {
    let db = database();
    let llm = Arc::new(
        ScriptedLlm::offline_classifier().with_answer(Some("RTX 4060 hiện có giá 8.990.000đ.")),
    );
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    db.upsert_vectors(
        &[
            VectorEntry {
                id: "earlier".to_string(),
                document: "Khách quan tâm giá card RTX 4060".to_string(),
                metadata: ResultMetadata::for_message(&conversation.id, "u1"),
                embedding: vec![1.0, 1.0, 0.1],
            },
            VectorEntry {
                id: "other-conversation".to_string(),
                document: "Tin nhắn của cuộc trò chuyện khác".to_string(),
                metadata: ResultMetadata::for_message("someone-else", "u1"),
                embedding: vec![0.0, 1.0, 0.1],
            },
        ],
        "keyword",
    )
    .unwrap();

    let reply = svc.post_message(&conversation.id, "giá bao nhiêu").await.unwrap();
    assert_eq!(reply.intent, Intent::Shopping);
    assert_eq!(reply.kind, ResponseKind::Answer);
    assert_eq!(reply.assistant_message.text, "RTX 4060 hiện có giá 8.990.000đ.");
    assert_eq!(reply.assistant_message.metadata, None);

    let prompts = llm.generation_prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.starts_with("Bạn là Mai"));
    assert!(prompt.contains("Context:\nKhách quan tâm giá card RTX 4060"));
    assert!(!prompt.contains("cuộc trò chuyện khác"));
    assert!(prompt.contains(texts::response_instruction(Language::Vi)));
    assert!(prompt.ends_with("user: giá bao nhiêu\nassistant:"));

    let history = svc.history(&conversation.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Role::User);
    assert_eq!(history[1].id, reply.assistant_message.id);
}

#[tokio::test]
async fn test_clarify_loop_terminates() {
    let db = database();
    let llm = Arc::new(
        ScriptedLlm::offline_classifier()
            .with_classifier_reply(r#"{"intent": "unknown", "confidence": 0.1}"#)
            .with_answer(Some("Dạ, em xin tư vấn chung ạ.")),
    );
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    let mut kinds = Vec::new();
    for turn in 0..5 {
        let reply = svc
            .post_message(&conversation.id, &format!("hmm {}", turn))
            .await
            .unwrap();
        kinds.push(reply.kind);
        if reply.kind == ResponseKind::Clarify {
            assert_eq!(reply.assistant_message.text, texts::CLARIFY_VI);
            assert_eq!(
                reply.assistant_message.metadata_str(texts::CLARIFY_MARKER_KEY),
                Some(texts::CLARIFY_MARKER_VALUE)
            );
        }
    }

    assert_eq!(
        kinds,
        vec![
            ResponseKind::Clarify,
            ResponseKind::Clarify,
            ResponseKind::Clarify,
            ResponseKind::Answer,
            ResponseKind::Answer,
        ]
    );
    let history = svc.history(&conversation.id).await.unwrap();
    assert_eq!(count_clarify_attempts(&history, Language::Vi), 3);
    assert_eq!(llm.generation_prompts().len(), 2);
}

#[tokio::test]
async fn test_clarify_counts_legacy_messages_without_marker() {
    let db = database();
    let llm = Arc::new(
        ScriptedLlm::offline_classifier()
            .with_classifier_reply(r#"{"intent": "unknown"}"#)
            .with_answer(Some("Dạ.")),
    );
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    for _ in 0..3 {
        db.create_message(&conversation.id, Role::User, "hmm", None).unwrap();
        db.create_message(&conversation.id, Role::Assistant, texts::CLARIFY_VI, None)
            .unwrap();
    }

    let reply = svc.post_message(&conversation.id, "hmm").await.unwrap();
    assert_eq!(reply.kind, ResponseKind::Answer);
    assert_eq!(reply.intent, Intent::Unknown);
}

#[tokio::test]
async fn test_english_conversation_gets_english_texts() {
    let db = database();
    let llm = Arc::new(ScriptedLlm::offline_classifier().with_answer(None));
    let svc = service(&db, &llm, Persona::default());
    let conversation = svc.create_conversation("u2", None).await.unwrap();

    let reply = svc
        .post_message(&conversation.id, "hello, can you help me with something?")
        .await
        .unwrap();
    assert_eq!(reply.kind, ResponseKind::Clarify);
    assert_eq!(reply.assistant_message.text, texts::CLARIFY_EN);

    let reply = svc
        .post_message(&conversation.id, "what is the price of this gpu?")
        .await
        .unwrap();
    assert_eq!(reply.kind, ResponseKind::Apology);
    assert_eq!(reply.assistant_message.text, texts::APOLOGY_EN);
}

#[tokio::test]
async fn test_greeting_is_first_message() {
    let db = database();
    let llm = Arc::new(ScriptedLlm::offline_classifier());
    let svc = service(
        &db,
        &llm,
        Persona::from_text("Bạn là Mai.\nGreeting: Xin chào! Em là Mai, em giúp gì được ạ?"),
    );

    let conversation = svc
        .create_conversation("u1", Some(serde_json::json!({"channel": "web"})))
        .await
        .unwrap();
    let history = svc.history(&conversation.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender, Role::Assistant);
    assert_eq!(history[0].text, "Xin chào! Em là Mai, em giúp gì được ạ?");
    assert_eq!(history[0].metadata_str("kind"), Some("greeting"));
    assert_eq!(count_clarify_attempts(&history, Language::Vi), 0);
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let db = database();
    let llm = Arc::new(ScriptedLlm::offline_classifier());
    let svc = service(&db, &llm, persona());

    let err = svc.post_message("missing", "xin chào").await.unwrap_err();
    assert!(matches!(err, MaiSaleError::ConversationNotFound(_)));
    let err = svc.history("missing").await.unwrap_err();
    assert!(matches!(err, MaiSaleError::ConversationNotFound(_)));

    let conversation = svc.create_conversation("u1", None).await.unwrap();
    let err = svc.post_message(&conversation.id, "  \n").await.unwrap_err();
    assert!(matches!(err, MaiSaleError::InvalidInput(_)));
    assert_eq!(db.count_messages(&conversation.id).unwrap(), 0);

    let err = svc.create_conversation("", None).await.unwrap_err();
    assert!(matches!(err, MaiSaleError::InvalidInput(_)));
}

#[tokio::test]
async fn test_turn_messages_are_indexed() {
    let db = database();
    let llm = Arc::new(ScriptedLlm::offline_classifier().with_answer(Some("Dạ có ạ.")));
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    let reply = svc
        .post_message(&conversation.id, "card RTX còn hàng không?")
        .await
        .unwrap();
    svc.wait_for_indexing().await;
    assert_eq!(db.count_vectors().unwrap(), 2);

    let filter = maisale_core::MetadataFilter::from_scope(&std::collections::HashMap::from([(
        "conversation_id".to_string(),
        conversation.id.clone(),
    )]));
    let hits = db.query_vectors(&[1.0, 0.0, 0.1], 5, filter.as_ref()).unwrap();
    let user_hit = hits
        .iter()
        .find(|h| h.id == reply.user_message.id)
        .expect("user message indexed");
    assert_eq!(user_hit.metadata.user_id.as_deref(), Some("u1"));
    assert_eq!(
        user_hit.metadata.extra.get("message_id"),
        Some(&serde_json::json!(reply.user_message.id))
    );
    assert!(user_hit.metadata.extra.contains_key("created_at"));
}

#[tokio::test]
async fn test_readiness() {
    let db = database();
    let healthy = Arc::new(ScriptedLlm::offline_classifier());
    let report = service(&db, &healthy, persona()).readiness().await;
    assert!(report.is_ready());

    let broken = Arc::new(ScriptedLlm::offline_classifier().with_answer(None));
    let report = service(&db, &broken, persona()).readiness().await;
    assert!(report.database.ok);
    assert!(!report.model.ok);
    assert!(!report.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_classifier_falls_back_to_keywords() {
    let db = database();
    let llm = Arc::new(
        ScriptedLlm::offline_classifier()
            .with_stalled_classifier()
            .with_answer(Some("RTX 4060 hiện có giá 8.990.000đ.")),
    );
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    let reply = tokio::time::timeout(
        Duration::from_secs(60),
        svc.post_message(&conversation.id, "giá bao nhiêu"),
    )
    .await
    .expect("turn finishes once the classifier call times out")
    .unwrap();

    assert_eq!(reply.intent, Intent::Shopping);
    assert_eq!(reply.kind, ResponseKind::Answer);
    assert_eq!(reply.assistant_message.text, "RTX 4060 hiện có giá 8.990.000đ.");
    assert_eq!(llm.generation_prompts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_answer_gets_timeout_notice() {
    let db = database();
    let llm = Arc::new(ScriptedLlm::offline_classifier().with_stalled_answer());
    let svc = service(&db, &llm, persona());
    let conversation = svc.create_conversation("u1", None).await.unwrap();

    let reply = tokio::time::timeout(
        Duration::from_secs(60),
        svc.post_message(&conversation.id, "giá bao nhiêu"),
    )
    .await
    .expect("turn finishes once generation times out")
    .unwrap();

    assert_eq!(reply.kind, ResponseKind::Timeout);
    assert_eq!(reply.assistant_message.text, texts::TIMEOUT_VI);
    assert_eq!(reply.assistant_message.metadata_str("kind"), Some("timeout"));

    let history = svc.history(&conversation.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text, texts::TIMEOUT_VI);
}
