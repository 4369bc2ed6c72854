//! Reply pipeline: one inbound message in, one reply text out.
//!
//! Flow:
//! 1. Empty text → `InputMissing` (catalog never touched)
//! 2. Restricted rules → redirect (catalog never touched)
//! 3. Catalog fetch → match → compose
//! 4. Zero candidates → small talk, LLM follow-up, or follow-up template
//! 5. Optional LLM rewrite of the composed reply
//!
//! `reply()` never fails: every `ReplyError` maps to a fixed user-safe text.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::catalog::CatalogSource;
use crate::config::ReplyConfig;
use crate::error::ReplyError;
use crate::llm::provider::LlmProvider;
use crate::matcher::Matcher;
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::types::{InboundMessage, Reply, ReplySource};
use crate::responder::{ReplyGenerator, Responder, templates};

/// Product names offered to the LLM as follow-up suggestions.
const FOLLOWUP_EXAMPLES: usize = 3;

pub struct ReplyPipeline {
    catalog: Arc<dyn CatalogSource>,
    matcher: Matcher,
    responder: Responder,
    rules: RulesEngine,
    generator: Option<ReplyGenerator>,
    llm_followup: bool,
    llm_rewrite: bool,
}

impl ReplyPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        matcher: Matcher,
        responder: Responder,
        rules: RulesEngine,
    ) -> Self {
        Self {
            catalog,
            matcher,
            responder,
            rules,
            generator: None,
            llm_followup: false,
            llm_rewrite: false,
        }
    }

    /// Enable LLM phrasing. Either flag may be off.
    pub fn with_generator(mut self, generator: ReplyGenerator, followup: bool, rewrite: bool) -> Self {
        self.generator = Some(generator);
        self.llm_followup = followup;
        self.llm_rewrite = rewrite;
        self
    }

    /// Wire a pipeline from configuration. LLM flags are ignored without a
    /// provider.
    pub fn from_config(
        config: &ReplyConfig,
        catalog: Arc<dyn CatalogSource>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let rules = if config.restricted_filter {
            RulesEngine::default_rules()
        } else {
            RulesEngine::default_rules().without_restricted()
        };

        let pipeline = Self::new(
            catalog,
            Matcher::with_strategy(config.similarity, config.threshold),
            Responder::new(config.max_list),
            rules,
        );

        match llm {
            Some(llm) if config.llm_followup || config.llm_rewrite => pipeline.with_generator(
                ReplyGenerator::new(llm, config.polite_particle.clone()),
                config.llm_followup,
                config.llm_rewrite,
            ),
            _ => pipeline,
        }
    }

    /// Produce the reply text for a message. Never fails.
    pub async fn reply(&self, message: &InboundMessage) -> String {
        match self.try_reply(message).await {
            Ok(reply) => {
                info!(
                    request_id = %message.id,
                    channel = message.channel,
                    source = reply.source.label(),
                    candidates = reply.candidates,
                    "Reply ready"
                );
                reply.text
            }
            Err(err) => {
                match &err {
                    ReplyError::InputMissing => {
                        info!(request_id = %message.id, channel = message.channel, "No message text")
                    }
                    ReplyError::GenerationUnavailable { .. } => warn!(
                        request_id = %message.id,
                        error = %err,
                        "Text generation failed, using rule-based reply"
                    ),
                    _ => error!(request_id = %message.id, error = %err, "Reply failed"),
                }
                err.user_reply()
            }
        }
    }

    /// Produce a reply or the typed reason none could be built.
    pub async fn try_reply(&self, message: &InboundMessage) -> Result<Reply, ReplyError> {
        let text = message.text.trim();
        if text.is_empty() {
            return Err(ReplyError::InputMissing);
        }

        if let Some(hit) = self.rules.check_restricted(text) {
            info!(request_id = %message.id, reason = %hit.reason, "Restricted topic, redirecting");
            return Ok(Reply {
                text: templates::RESTRICTED_REDIRECT.to_string(),
                source: ReplySource::Restricted,
                candidates: 0,
            });
        }

        let entries = self.catalog.fetch_entries().await?;
        let candidates = self.matcher.find(text, &entries);
        debug!(
            request_id = %message.id,
            catalog = self.catalog.name(),
            rows = entries.len(),
            candidates = candidates.len(),
            top_score = candidates.first().map(|c| c.score),
            "Matched catalog"
        );

        if candidates.is_empty() {
            if let Some(canned) = self.rules.small_talk(text) {
                return Ok(Reply {
                    text: canned.to_string(),
                    source: ReplySource::SmallTalk,
                    candidates: 0,
                });
            }

            let composed = self.responder.compose(&[]);
            if let (Some(generator), true) = (&self.generator, self.llm_followup) {
                let examples: Vec<&str> = entries
                    .iter()
                    .map(|e| e.name.as_str())
                    .filter(|name| !name.is_empty())
                    .take(FOLLOWUP_EXAMPLES)
                    .collect();
                return match generator.follow_up(text, &examples).await {
                    Ok(text) => Ok(Reply {
                        text,
                        source: ReplySource::Generated,
                        candidates: 0,
                    }),
                    Err(source) => Err(ReplyError::GenerationUnavailable {
                        fallback: composed.text,
                        source,
                    }),
                };
            }
            return self.finish(text, composed.text, 0).await;
        }

        let composed = self.responder.compose(&candidates);
        self.finish(text, composed.text, candidates.len()).await
    }

    /// Apply the optional rewrite to a composed draft.
    async fn finish(&self, user_text: &str, draft: String, candidates: usize) -> Result<Reply, ReplyError> {
        if draft.trim().is_empty() {
            return Err(ReplyError::Internal("composed reply is empty".to_string()));
        }

        match (&self.generator, self.llm_rewrite) {
            (Some(generator), true) => match generator.rewrite(user_text, &draft).await {
                Ok(text) => Ok(Reply {
                    text,
                    source: ReplySource::Generated,
                    candidates,
                }),
                Err(source) => Err(ReplyError::GenerationUnavailable {
                    fallback: draft,
                    source,
                }),
            },
            _ => Ok(Reply {
                text: draft,
                source: ReplySource::Catalog,
                candidates,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{CatalogEntry, StaticCatalog};
    use crate::error::{CatalogError, LlmError};
    use crate::llm::provider::{CompletionRequest, CompletionResponse};

    /// Catalog that counts fetches.
    struct CountingCatalog {
        inner: StaticCatalog,
        fetches: AtomicUsize,
    }

    impl CountingCatalog {
        fn new(entries: Vec<CatalogEntry>) -> Arc<Self> {
            Arc::new(Self {
                inner: StaticCatalog::new(entries),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for CountingCatalog {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_entries().await
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogSource for FailingCatalog {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
            Err(CatalogError::Request("connection refused to 10.0.0.7".into()))
        }
    }

    struct MockLlm {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            match &self.response {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "429 Too Many Requests".into(),
                }),
            }
        }
    }

    fn plug_catalog() -> Vec<CatalogEntry> {
        vec![CatalogEntry::new(
            "ปลั๊กไฟอัจฉริยะ",
            "https://shop.example/plug",
            "ปลั๊ก,ปลั๊กไฟ",
        )]
    }

    fn pipeline(catalog: Arc<dyn CatalogSource>) -> ReplyPipeline {
        ReplyPipeline::from_config(&ReplyConfig::default(), catalog, None)
    }

    fn llm_pipeline(catalog: Arc<dyn CatalogSource>, response: Option<&str>, followup: bool, rewrite: bool) -> ReplyPipeline {
        let config = ReplyConfig {
            llm_followup: followup,
            llm_rewrite: rewrite,
            ..ReplyConfig::default()
        };
        let llm: Arc<dyn LlmProvider> = Arc::new(MockLlm {
            response: response.map(String::from),
        });
        ReplyPipeline::from_config(&config, catalog, Some(llm))
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage::new("test", text)
    }

    #[tokio::test]
    async fn keyword_hit_returns_single_link_reply() {
        let catalog = CountingCatalog::new(plug_catalog());
        let reply = pipeline(catalog.clone()).try_reply(&msg("สนใจปลั๊กไฟ")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Catalog);
        assert_eq!(reply.candidates, 1);
        assert!(reply.text.contains("ปลั๊กไฟอัจฉริยะ"));
        assert!(reply.text.contains("https://shop.example/plug"));
        assert_eq!(catalog.fetches(), 1);
    }

    #[tokio::test]
    async fn typo_found_by_similarity() {
        let catalog = CountingCatalog::new(plug_catalog());
        let reply = pipeline(catalog).try_reply(&msg("ปลักไฟอัฉรอยะ")).await.unwrap();
        assert_eq!(reply.candidates, 1);
        assert!(reply.text.contains("https://shop.example/plug"));
    }

    #[tokio::test]
    async fn empty_catalog_asks_follow_up() {
        let catalog = CountingCatalog::new(Vec::new());
        let text = pipeline(catalog).reply(&msg("อยากได้ของดีๆ")).await;
        assert!(templates::FOLLOWUP_ASK.contains(&text.as_str()));
    }

    #[tokio::test]
    async fn empty_input_skips_catalog() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = pipeline(catalog.clone());
        assert_eq!(pipeline.reply(&msg("")).await, templates::NO_MESSAGE);
        assert_eq!(pipeline.reply(&msg("   \n")).await, templates::NO_MESSAGE);
        assert_eq!(catalog.fetches(), 0);
    }

    #[tokio::test]
    async fn restricted_topic_redirects_before_catalog() {
        let catalog = CountingCatalog::new(plug_catalog());
        let reply = pipeline(catalog.clone())
            .try_reply(&msg("ปลั๊กไฟราคาเท่าไหร่"))
            .await
            .unwrap();
        assert_eq!(reply.source, ReplySource::Restricted);
        assert_eq!(reply.text, templates::RESTRICTED_REDIRECT);
        assert_eq!(catalog.fetches(), 0);
    }

    #[tokio::test]
    async fn restricted_filter_can_be_disabled() {
        let config = ReplyConfig {
            restricted_filter: false,
            ..ReplyConfig::default()
        };
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = ReplyPipeline::from_config(&config, catalog.clone(), None);
        let reply = pipeline.try_reply(&msg("ปลั๊กไฟราคาเท่าไหร่")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Catalog);
        assert_eq!(catalog.fetches(), 1);
    }

    #[tokio::test]
    async fn small_talk_only_without_candidates() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = pipeline(catalog);

        let greeting = pipeline.try_reply(&msg("สวัสดีครับ")).await.unwrap();
        assert_eq!(greeting.source, ReplySource::SmallTalk);

        let product = pipeline.try_reply(&msg("ok ปลั๊กไฟ")).await.unwrap();
        assert_eq!(product.source, ReplySource::Catalog);
        assert!(product.text.contains("https://shop.example/plug"));
    }

    #[tokio::test]
    async fn ok_inside_word_still_asks_follow_up() {
        let pipeline = pipeline(CountingCatalog::new(plug_catalog()));
        for text in ["notebook", "rice cooker", "facebook"] {
            let reply = pipeline.try_reply(&msg(text)).await.unwrap();
            assert_eq!(reply.source, ReplySource::Catalog, "{text}");
            assert!(templates::FOLLOWUP_ASK.contains(&reply.text.as_str()), "{text}");
        }
    }

    #[tokio::test]
    async fn catalog_failure_is_fixed_reply() {
        let text = pipeline(Arc::new(FailingCatalog)).reply(&msg("ปลั๊กไฟ")).await;
        assert_eq!(text, templates::CATALOG_UNAVAILABLE);
        assert!(!text.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn catalog_failure_is_typed() {
        let err = pipeline(Arc::new(FailingCatalog))
            .try_reply(&msg("ปลั๊กไฟ"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReplyError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn llm_follow_up_used_when_enabled() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = llm_pipeline(catalog, Some("สนใจสินค้าตัวไหนครับ"), true, false);
        let reply = pipeline.try_reply(&msg("มีอะไรแนะนำบ้าง")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Generated);
        assert_eq!(reply.text, "สนใจสินค้าตัวไหนครับ");
    }

    #[tokio::test]
    async fn llm_follow_up_failure_falls_back_to_template() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = llm_pipeline(catalog, None, true, false);
        let err = pipeline.try_reply(&msg("มีอะไรแนะนำบ้าง")).await.unwrap_err();
        assert!(matches!(err, ReplyError::GenerationUnavailable { .. }));

        let text = pipeline.reply(&msg("มีอะไรแนะนำบ้าง")).await;
        assert!(templates::FOLLOWUP_ASK.contains(&text.as_str()));
    }

    #[tokio::test]
    async fn rewrite_applies_to_catalog_reply() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = llm_pipeline(
            catalog,
            Some("ได้เลยนะ ปลั๊กไฟอัจฉริยะ อยู่ที่ https://shop.example/plug"),
            false,
            true,
        );
        let reply = pipeline.try_reply(&msg("สนใจปลั๊กไฟ")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Generated);
        assert!(reply.text.contains("https://shop.example/plug"));
        assert!(reply.text.ends_with("ครับ"));
    }

    #[tokio::test]
    async fn rewrite_failure_keeps_rule_based_reply() {
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = llm_pipeline(catalog, None, false, true);
        let text = pipeline.reply(&msg("สนใจปลั๊กไฟ")).await;
        assert!(text.contains("https://shop.example/plug"));
        assert_ne!(text, templates::APOLOGY);
    }

    #[tokio::test]
    async fn llm_flags_ignored_without_provider() {
        let config = ReplyConfig {
            llm_followup: true,
            llm_rewrite: true,
            ..ReplyConfig::default()
        };
        let catalog = CountingCatalog::new(plug_catalog());
        let pipeline = ReplyPipeline::from_config(&config, catalog, None);
        let reply = pipeline.try_reply(&msg("สนใจปลั๊กไฟ")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Catalog);
    }
}
