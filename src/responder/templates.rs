//! Fixed reply texts.

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use regex::Regex;

/// Single product whose reply is a purchase link. `{name}`, `{link}`.
pub const SINGLE_LINK: &[&str] = &[
    "ได้เลยครับ 🙌 สั่งซื้อ {name} ได้ที่นี่ 👉 {link}",
    "จัดให้ครับ 😊 {name} สั่งซื้อได้ที่ลิงก์นี้เลยนะครับ 👉 {link}",
    "ขอบคุณที่สนใจ {name} ครับ ✨ สั่งซื้อได้ที่นี่ 👉 {link}",
];

/// Single product whose reply is free-form answer text. `{name}`, `{answer}`.
pub const SINGLE_ANSWER: &[&str] = &[
    "เรื่อง {name} นะครับ 😊\n{answer}",
    "สำหรับ {name} ครับ ✨\n{answer}",
];

/// Single product with an empty reply cell. `{name}`.
pub const SINGLE_NO_REPLY: &str =
    "{name} พร้อมให้บริการครับ 😊 สนใจรายละเอียดเพิ่มเติมบอกผมได้เลยครับ";

pub const MULTI_HEADER: &[&str] = &[
    "📌 เจอหลายสินค้าที่เกี่ยวข้องครับ ลองดูรายการนี้นะครับ 😊",
    "มีหลายตัวเลือกที่น่าสนใจครับ 🙌 เลือกดูได้เลย:",
    "ตรวจสอบให้แล้วครับ พบหลายรายการดังนี้ครับ ✨",
];

/// Group heading for items matched through a keyword. `{term}`.
pub const GROUP_HEADING: &str = "สำหรับคำว่า “{term}” มีตัวเลือกดังนี้:";

/// Group heading for items matched only by similarity.
pub const MISC_HEADING: &str = "รายการที่เกี่ยวข้อง:";

pub const MULTI_CLOSING: &str =
    "ถ้าต้องการตัวไหน พิมพ์ชื่อสินค้ามาได้เลยครับ ผมจะส่งลิงก์ให้อีกครั้ง 😊";

/// Overflow summary. `{total}`, `{shown}`.
pub const OVERFLOW_SUMMARY: &str = "พบสินค้าที่เกี่ยวข้อง {total} รายการ ขอแสดง {shown} รายการที่ตรงที่สุดก่อนนะครับ:";

pub const OVERFLOW_NARROW: &str =
    "รบกวนพิมพ์ชื่อสินค้าให้ละเอียดขึ้นอีกนิด ผมจะหาตัวที่ตรงที่สุดให้ครับ 🙏";

pub const FOLLOWUP_ASK: &[&str] = &[
    "คุณสนใจสินค้าไหนครับ 😊 เช่น ไฟเซ็นเซอร์ หม้อหุงข้าว หรือปลั๊กไฟ?",
    "บอกชื่อสินค้าที่สนใจได้เลยครับ เช่น ปลั๊กติดผนัง หรือ โจ๊กถุงนะครับ 🙏",
    "อยากได้สินค้าอะไรเป็นพิเศษครับ ผมจะหาลิงก์ให้ทันทีครับ 😊",
];

pub const NO_MESSAGE: &str = "⚠️ ไม่พบข้อความจากผู้ใช้";

pub const CATALOG_UNAVAILABLE: &str =
    "ขออภัยครับ ตอนนี้ยังเปิดรายการสินค้าไม่ได้ 🙏 รบกวนพิมพ์ชื่อสินค้าที่สนใจอีกครั้งในอีกสักครู่นะครับ";

pub const APOLOGY: &str = "ขออภัยครับ ระบบขัดข้องชั่วคราว 🙏 รบกวนลองใหม่อีกครั้งนะครับ";

pub const RESTRICTED_REDIRECT: &str = "สอบถามราคา การชำระเงิน และการสั่งซื้อ ทำได้ที่ลิงก์สินค้าเลยครับ 🙏 \
     บอกชื่อสินค้าที่สนใจ ผมจะส่งลิงก์สั่งซื้อให้ทันทีครับ";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?://|www\.)\S+$").expect("valid url regex"));

static URL_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|www\.)\S+").expect("valid url regex"));

/// Whether a reply cell is a bare link rather than answer text.
pub fn looks_like_url(s: &str) -> bool {
    URL_RE.is_match(s.trim())
}

/// Every link that appears anywhere in `text`.
pub fn urls_in(text: &str) -> Vec<&str> {
    URL_IN_TEXT_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Uniformly pick one template.
pub fn pick(choices: &'static [&'static str]) -> &'static str {
    choices.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"));

/// Substitute `{key}` placeholders in one pass; substituted values are not
/// scanned again. Unknown keys are left as written.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(looks_like_url("https://shopee.co.th/product/1"));
        assert!(looks_like_url("  http://x.y  "));
        assert!(looks_like_url("www.lazada.co.th/p"));
        assert!(!looks_like_url("ส่งฟรีทั่วประเทศ https://x.y"));
        assert!(!looks_like_url(""));
    }

    #[test]
    fn urls_found_in_text() {
        let text = "ซื้อ 👉 https://a.example/1 หรือ www.b.example/2";
        assert_eq!(urls_in(text), vec!["https://a.example/1", "www.b.example/2"]);
    }

    #[test]
    fn fill_replaces_all_placeholders() {
        let out = fill("{name} 👉 {link} ({name})", &[("name", "Lamp"), ("link", "https://l")]);
        assert_eq!(out, "Lamp 👉 https://l (Lamp)");
    }

    #[test]
    fn fill_does_not_expand_placeholders_inside_values() {
        let out = fill(
            "{name} 👉 {link}",
            &[("name", "Lamp {link} {answer}"), ("link", "https://l")],
        );
        assert_eq!(out, "Lamp {link} {answer} 👉 https://l");
        assert_eq!(fill("{unknown} {name}", &[("name", "x")]), "{unknown} x");
    }

    #[test]
    fn pick_returns_member() {
        for _ in 0..10 {
            assert!(FOLLOWUP_ASK.contains(&pick(FOLLOWUP_ASK)));
        }
    }
}
