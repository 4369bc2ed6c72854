//! LLM phrasing on top of the rule-based replies.
//!
//! Two uses: phrasing the follow-up question when nothing matched, and
//! softening a finished reply. Both outputs go through `polish()`; the
//! rewrite is also rejected when it drops a link the draft contained.

use std::sync::Arc;

use tracing::{debug, warn};

use super::templates::{looks_like_url, urls_in};
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

const FOLLOWUP_MAX_TOKENS: u32 = 160;
const REWRITE_MAX_TOKENS: u32 = 600;
const FOLLOWUP_TEMPERATURE: f32 = 0.7;
const REWRITE_TEMPERATURE: f32 = 0.3;

/// Endings already polite enough to leave alone.
const POLITE_ENDINGS: &[&str] = &["ครับ", "ค่ะ", "คะ", "ครับผม", "นะคะ"];

/// Characters the model sometimes leaks from prompt placeholders.
const STRIP_CHARS: &[char] = &['{', '}', '[', ']'];

/// LLM-backed reply phrasing.
pub struct ReplyGenerator {
    llm: Arc<dyn LlmProvider>,
    particle: String,
}

impl ReplyGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, particle: impl Into<String>) -> Self {
        Self {
            llm,
            particle: particle.into(),
        }
    }

    /// Ask what the customer wants, suggesting a few catalog products.
    pub async fn follow_up(&self, user_text: &str, examples: &[&str]) -> Result<String, LlmError> {
        let system = "You are a friendly sales assistant for an online shop chatting with a \
                      customer. We could not tell which product they want. Reply in the \
                      customer's language (Thai unless they wrote in another language). Be \
                      polite, 1-2 sentences, ask which product they are interested in and \
                      suggest the example products given. Do not invent prices, links or \
                      products. Output only the message text.";

        let example_list = if examples.is_empty() {
            "(none)".to_string()
        } else {
            examples.join(", ")
        };
        let user = format!(
            "Customer message: \"{user_text}\"\nExample products: {example_list}"
        );

        let request = CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
            .with_temperature(FOLLOWUP_TEMPERATURE)
            .with_max_tokens(FOLLOWUP_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let text = polish(&response.content, &self.particle);
        if text.is_empty() {
            return Err(self.invalid("empty follow-up"));
        }
        debug!(model = self.llm.model_name(), "Generated follow-up");
        Ok(text)
    }

    /// Soften a finished reply while keeping names and links verbatim.
    pub async fn rewrite(&self, user_text: &str, draft: &str) -> Result<String, LlmError> {
        let system = "You rewrite chat replies for an online shop. Keep every product name and \
                      every link exactly as written, keep the list structure, and do not add \
                      facts, prices or links. Make the tone warm and natural, keep it short, \
                      use the same language as the draft, and end politely. Output only the \
                      rewritten message.";

        let user = format!("Customer message: \"{user_text}\"\n\nDraft reply:\n{draft}");

        let request = CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
            .with_temperature(REWRITE_TEMPERATURE)
            .with_max_tokens(REWRITE_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let text = polish(&response.content, &self.particle);
        if text.is_empty() {
            return Err(self.invalid("empty rewrite"));
        }

        let missing: Vec<&str> = urls_in(draft)
            .into_iter()
            .filter(|url| !text.contains(url))
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Rewrite dropped links; keeping draft");
            return Err(self.invalid("rewrite dropped links"));
        }

        Ok(text)
    }

    fn invalid(&self, reason: &str) -> LlmError {
        LlmError::InvalidResponse {
            provider: self.llm.model_name().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Strip brace/bracket characters, trim, and make sure the message closes
/// with a polite particle.
pub fn polish(raw: &str, particle: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !STRIP_CHARS.contains(c)).collect();
    let text = cleaned.trim();
    if text.is_empty() || particle.is_empty() {
        return text.to_string();
    }

    let core = text.trim_end_matches(|c: char| !is_word_char(c));
    if core.is_empty() || POLITE_ENDINGS.iter().any(|p| core.ends_with(p)) || core.ends_with(particle) {
        return text.to_string();
    }

    // Appending straight onto a link would corrupt it.
    let last_token = core.split_whitespace().last().unwrap_or_default();
    if looks_like_url(last_token) {
        return format!("{text} {particle}");
    }

    let tail = &text[core.len()..];
    format!("{core}{particle}{tail}")
}

/// Thai tone marks and vowel signs are not alphabetic but belong to the word.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::provider::CompletionResponse;

    /// Mock LLM that returns a fixed response and records prompts.
    struct MockLlm {
        response: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlm {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.user_prompt());
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "down".into(),
                }),
            }
        }
    }

    #[test]
    fn polish_strips_brackets_and_adds_particle() {
        assert_eq!(polish("  {สนใจ} [สินค้า] ไหนดี  ", "ครับ"), "สนใจ สินค้า ไหนดีครับ");
    }

    #[test]
    fn polish_inserts_particle_before_trailing_emoji() {
        assert_eq!(polish("บอกชื่อสินค้าได้เลย 😊", "ครับ"), "บอกชื่อสินค้าได้เลยครับ 😊");
    }

    #[test]
    fn polish_keeps_tone_marks_attached() {
        assert_eq!(polish("ดูได้ที่นี่", "ครับ"), "ดูได้ที่นี่ครับ");
        assert_eq!(polish("ดูได้ที่นี่ 🙏", "ครับ"), "ดูได้ที่นี่ครับ 🙏");
    }

    #[test]
    fn polish_keeps_existing_polite_ending() {
        assert_eq!(polish("ยินดีค่ะ 🙏", "ครับ"), "ยินดีค่ะ 🙏");
        assert_eq!(polish("ได้เลยครับ!", "ครับ"), "ได้เลยครับ!");
    }

    #[test]
    fn polish_never_glues_particle_onto_link() {
        assert_eq!(
            polish("สั่งได้ที่ https://shop.example/p1", "ครับ"),
            "สั่งได้ที่ https://shop.example/p1 ครับ"
        );
        assert_eq!(
            polish("สั่งได้ที่ https://shop.example/", "ครับ"),
            "สั่งได้ที่ https://shop.example/ ครับ"
        );
    }

    #[test]
    fn polish_empty_stays_empty() {
        assert_eq!(polish(" {} ", "ครับ"), "");
    }

    #[tokio::test]
    async fn follow_up_includes_examples_in_prompt() {
        let llm = MockLlm::ok("สนใจสินค้าตัวไหนครับ เช่น ปลั๊กไฟ");
        let generator = ReplyGenerator::new(llm.clone(), "ครับ");
        let text = generator
            .follow_up("อยากได้ของ", &["ปลั๊กไฟ", "หม้อหุงข้าว"])
            .await
            .unwrap();
        assert_eq!(text, "สนใจสินค้าตัวไหนครับ เช่น ปลั๊กไฟครับ");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("ปลั๊กไฟ, หม้อหุงข้าว"));
        assert!(prompts[0].contains("อยากได้ของ"));
    }

    #[tokio::test]
    async fn follow_up_propagates_failure() {
        let generator = ReplyGenerator::new(MockLlm::failing(), "ครับ");
        assert!(generator.follow_up("x", &[]).await.is_err());
    }

    #[tokio::test]
    async fn rewrite_keeps_links() {
        let llm = MockLlm::ok("ได้เลยนะ ปลั๊กไฟอัจฉริยะ สั่งได้ที่ https://s/plug");
        let generator = ReplyGenerator::new(llm, "ครับ");
        let text = generator
            .rewrite("สนใจปลั๊กไฟ", "สั่งซื้อ ปลั๊กไฟอัจฉริยะ ได้ที่นี่ 👉 https://s/plug")
            .await
            .unwrap();
        assert!(text.contains("https://s/plug"));
        assert!(text.ends_with("ครับ"));
    }

    #[tokio::test]
    async fn rewrite_dropping_link_is_rejected() {
        let llm = MockLlm::ok("ได้เลยครับ สนใจสั่งได้เลย");
        let generator = ReplyGenerator::new(llm, "ครับ");
        let result = generator.rewrite("x", "สั่งซื้อ 👉 https://s/plug").await;
        assert!(matches!(result, Err(LlmError::InvalidResponse { .. })));
    }
}
