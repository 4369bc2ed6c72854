//! Types shared by the webhook channels and the reply pipeline.

use uuid::Uuid;

/// A customer message as it enters the pipeline.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Per-request id recorded on every log line for this message.
    pub id: Uuid,
    /// Which webhook delivered it ("manychat", "messenger").
    pub channel: &'static str,
    /// Platform sender id, when the payload carries one.
    pub sender: Option<String>,
    pub text: String,
}

impl InboundMessage {
    pub fn new(channel: &'static str, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            sender: None,
            text: text.into(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Restricted-topic redirect.
    Restricted,
    /// Canned small-talk reply.
    SmallTalk,
    /// Built from catalog candidates (or the follow-up templates).
    Catalog,
    /// Phrased by the LLM.
    Generated,
}

impl ReplySource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::SmallTalk => "small_talk",
            Self::Catalog => "catalog",
            Self::Generated => "generated",
        }
    }
}

/// A finished reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// Number of catalog candidates behind the reply.
    pub candidates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_messages_get_distinct_ids() {
        let a = InboundMessage::new("manychat", "สวัสดี");
        let b = InboundMessage::new("manychat", "สวัสดี");
        assert_ne!(a.id, b.id);
        assert!(a.sender.is_none());
    }

    #[test]
    fn sender_is_attached() {
        let msg = InboundMessage::new("messenger", "hi").with_sender("psid-1");
        assert_eq!(msg.sender.as_deref(), Some("psid-1"));
        assert_eq!(ReplySource::SmallTalk.label(), "small_talk");
    }
}
