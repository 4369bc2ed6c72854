//! Pattern rules checked around the catalog lookup.
//!
//! - Restricted topics (price, cash on delivery, ordering in chat) are
//!   answered with a redirect to the purchase link before the catalog is
//!   fetched.
//! - Small talk (greetings, thanks, "ok") gets a canned reply, but only when
//!   nothing in the catalog matched.

use regex::Regex;
use tracing::debug;

/// A restricted-topic rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct RestrictedRule {
    /// Human-readable pattern description.
    pub pattern: String,
    pub regex: Regex,
    /// Why this rule triggers.
    pub reason: String,
}

/// Result of a restricted-rule hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub reason: String,
}

const SMALL_TALK: &[(&str, &str)] = &[
    ("สวัสดี", "สวัสดีครับ 🙏 ยินดีให้บริการครับ บอกชื่อสินค้าที่สนใจได้เลยนะครับ"),
    ("ขอบคุณ", "ยินดีมากครับ 😊 หากต้องการลิงก์สั่งซื้อแจ้งผมได้เลย"),
    ("ขอบใจ", "ยินดีครับผม 🙌 ถ้าต้องการดูสินค้าเพิ่มเติม บอกผมได้เลยครับ"),
    ("โอเค", "โอเคครับ ✨ ถ้ามีคำถามเพิ่ม ทักมาได้เลยครับ"),
    ("ok", "โอเคครับผม 🙌 ต้องการลิงก์สินค้าตัวไหนบอกได้เลยครับ"),
];

pub struct RulesEngine {
    restricted: Vec<RestrictedRule>,
    small_talk: Vec<(Regex, String)>,
}

impl RulesEngine {
    /// Rules engine with the built-in restricted topics and small talk.
    pub fn default_rules() -> Self {
        let restricted = vec![
            RestrictedRule {
                pattern: "price inquiry".into(),
                regex: Regex::new(r"(?i)(ราคา|เท่าไห?ร่|กี่บาท|\bprice\b|how much)")
                    .expect("valid price regex"),
                reason: "price inquiry".into(),
            },
            RestrictedRule {
                pattern: "cash on delivery".into(),
                regex: Regex::new(r"(?i)(เก็บเงินปลายทาง|ปลายทาง|\bcod\b|cash on delivery)")
                    .expect("valid cod regex"),
                reason: "cash on delivery request".into(),
            },
            RestrictedRule {
                pattern: "order in chat".into(),
                regex: Regex::new(r"(?i)(ขอสั่ง|สั่งซื้อ|สั่งเลย|จะสั่ง|โอนเงิน|\border\b)")
                    .expect("valid order regex"),
                reason: "order attempt in chat".into(),
            },
        ];

        Self {
            restricted,
            small_talk: SMALL_TALK
                .iter()
                .map(|(key, reply)| (small_talk_regex(key), reply.to_string()))
                .collect(),
        }
    }

    /// No rules at all.
    pub fn empty() -> Self {
        Self {
            restricted: Vec::new(),
            small_talk: Vec::new(),
        }
    }

    /// Drop the restricted rules, keeping small talk.
    pub fn without_restricted(mut self) -> Self {
        self.restricted.clear();
        self
    }

    /// Add a custom restricted rule.
    pub fn add_restricted(&mut self, pattern: &str, reason: &str) -> Result<(), regex::Error> {
        self.restricted.push(RestrictedRule {
            pattern: pattern.into(),
            regex: Regex::new(pattern)?,
            reason: reason.into(),
        });
        Ok(())
    }

    pub fn check_restricted(&self, text: &str) -> Option<RuleMatch> {
        let rule = self.restricted.iter().find(|r| r.regex.is_match(text))?;
        debug!(rule = %rule.pattern, reason = %rule.reason, "Message matched restricted rule");
        Some(RuleMatch {
            reason: rule.reason.clone(),
        })
    }

    /// Canned reply for small talk, first match in table order.
    pub fn small_talk(&self, text: &str) -> Option<&str> {
        self.small_talk
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, reply)| reply.as_str())
    }
}

/// Latin keys must stand alone ("ok" but not "notebook"). Thai is written
/// without spaces, so Thai keys match anywhere.
fn small_talk_regex(key: &str) -> Regex {
    let escaped = regex::escape(key);
    let pattern = if key.is_ascii() {
        format!(r"(?i)\b{escaped}\b")
    } else {
        format!("(?i){escaped}")
    };
    Regex::new(&pattern).expect("escaped small-talk key is a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_questions_are_restricted() {
        let engine = RulesEngine::default_rules();
        assert!(engine.check_restricted("ปลั๊กไฟราคาเท่าไหร่").is_some());
        assert!(engine.check_restricted("กี่บาทครับ").is_some());
        assert!(engine.check_restricted("How much is the lamp?").is_some());
    }

    #[test]
    fn cod_and_order_are_restricted() {
        let engine = RulesEngine::default_rules();
        let cod = engine.check_restricted("เก็บเงินปลายทางได้ไหม").unwrap();
        assert_eq!(cod.reason, "cash on delivery request");
        let order = engine.check_restricted("ขอสั่ง 2 ชิ้น").unwrap();
        assert_eq!(order.reason, "order attempt in chat");
        assert!(engine.check_restricted("can I pay COD").is_some());
    }

    #[test]
    fn product_questions_pass_through() {
        let engine = RulesEngine::default_rules();
        assert!(engine.check_restricted("สนใจปลั๊กไฟ").is_none());
        assert!(engine.check_restricted("ไฟเซ็นเซอร์").is_none());
        // Word boundaries keep "cod" and "order" from firing inside other words.
        assert!(engine.check_restricted("barcode recorder").is_none());
    }

    #[test]
    fn small_talk_matches_case_insensitively() {
        let engine = RulesEngine::default_rules();
        assert!(engine.small_talk("สวัสดีครับ").unwrap().starts_with("สวัสดีครับ"));
        assert!(engine.small_talk("OK").is_some());
        assert!(engine.small_talk("หม้อหุงข้าว").is_none());
    }

    #[test]
    fn small_talk_ok_needs_word_boundary() {
        let engine = RulesEngine::default_rules();
        assert!(engine.small_talk("notebook").is_none());
        assert!(engine.small_talk("rice cooker").is_none());
        assert!(engine.small_talk("facebook page").is_none());
        assert!(engine.small_talk("ok ครับ").is_some());
        assert!(engine.small_talk("Ok!").is_some());
    }

    #[test]
    fn small_talk_uses_table_order() {
        let engine = RulesEngine::default_rules();
        let reply = engine.small_talk("สวัสดี ขอบคุณ").unwrap();
        assert!(reply.starts_with("สวัสดีครับ"));
    }

    #[test]
    fn without_restricted_keeps_small_talk() {
        let engine = RulesEngine::default_rules().without_restricted();
        assert!(engine.check_restricted("ราคาเท่าไหร่").is_none());
        assert!(engine.small_talk("ขอบคุณ").is_some());
    }

    #[test]
    fn custom_restricted_rule() {
        let mut engine = RulesEngine::empty();
        engine.add_restricted(r"(?i)line\s*id", "contact request").unwrap();
        let hit = engine.check_restricted("ขอ Line ID หน่อย").unwrap();
        assert_eq!(hit.reason, "contact request");
    }

    #[test]
    fn invalid_custom_rule_is_rejected() {
        let mut engine = RulesEngine::empty();
        assert!(engine.add_restricted("(unclosed", "bad").is_err());
    }

    #[test]
    fn empty_engine_passes_everything() {
        let engine = RulesEngine::empty();
        assert!(engine.check_restricted("ราคา").is_none());
        assert!(engine.small_talk("สวัสดี").is_none());
    }
}
