//! Turns a ranked candidate list into one chat message.
//!
//! | candidates        | reply                                          |
//! |-------------------|------------------------------------------------|
//! | 0                 | follow-up question                             |
//! | 1                 | single-product reply (link, answer, or generic) |
//! | 2 ..= max_list    | grouped list of every candidate                |
//! | > max_list        | top `max_list` by score + ask to narrow down   |

pub mod generator;
pub mod templates;

pub use generator::ReplyGenerator;

use crate::matcher::{Candidate, norm};
use templates::{fill, looks_like_url, pick};

/// Which row of the decision table produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    FollowUp,
    Single,
    List,
    Overflow,
}

/// A composed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub kind: ReplyKind,
    pub text: String,
}

/// Rule-based reply composer.
#[derive(Debug, Clone)]
pub struct Responder {
    max_list: usize,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Responder {
    pub fn new(max_list: usize) -> Self {
        Self {
            max_list: max_list.max(1),
        }
    }

    pub fn max_list(&self) -> usize {
        self.max_list
    }

    pub fn compose(&self, candidates: &[Candidate]) -> Composed {
        match candidates.len() {
            0 => Composed {
                kind: ReplyKind::FollowUp,
                text: pick(templates::FOLLOWUP_ASK).to_string(),
            },
            1 => Composed {
                kind: ReplyKind::Single,
                text: single_reply(&candidates[0]),
            },
            n if n <= self.max_list => Composed {
                kind: ReplyKind::List,
                text: self.grouped_list(candidates),
            },
            _ => Composed {
                kind: ReplyKind::Overflow,
                text: self.overflow_list(candidates),
            },
        }
    }

    /// Items grouped by the keyword that hit; similarity-only items last.
    fn grouped_list(&self, candidates: &[Candidate]) -> String {
        let mut groups: Vec<(Option<String>, Vec<&Candidate>)> = Vec::new();
        for candidate in candidates {
            let key = candidate.matched_term.as_deref().map(norm);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, items)) => items.push(candidate),
                None => groups.push((key, vec![candidate])),
            }
        }
        groups.sort_by_key(|(key, _)| key.is_none());

        let mut lines = vec![pick(templates::MULTI_HEADER).to_string()];
        for (key, items) in &groups {
            match key {
                Some(_) => {
                    let term = items[0].matched_term.as_deref().unwrap_or_default();
                    lines.push(fill(templates::GROUP_HEADING, &[("term", term)]));
                }
                None => lines.push(templates::MISC_HEADING.to_string()),
            }
            lines.extend(items.iter().take(self.max_list).map(|c| bullet(c)));
        }
        lines.push(templates::MULTI_CLOSING.to_string());
        lines.join("\n")
    }

    fn overflow_list(&self, candidates: &[Candidate]) -> String {
        let shown = self.max_list.min(candidates.len());
        let total = candidates.len().to_string();
        let shown_count = shown.to_string();
        let mut lines = vec![
            pick(templates::MULTI_HEADER).to_string(),
            fill(
                templates::OVERFLOW_SUMMARY,
                &[("total", total.as_str()), ("shown", shown_count.as_str())],
            ),
        ];
        lines.extend(candidates.iter().take(shown).map(bullet));
        lines.push(templates::OVERFLOW_NARROW.to_string());
        lines.join("\n")
    }
}

fn single_reply(candidate: &Candidate) -> String {
    let name = candidate.label.as_str();
    let reply = candidate.reply.trim();
    if reply.is_empty() {
        fill(templates::SINGLE_NO_REPLY, &[("name", name)])
    } else if looks_like_url(reply) {
        fill(pick(templates::SINGLE_LINK), &[("name", name), ("link", reply)])
    } else {
        fill(pick(templates::SINGLE_ANSWER), &[("name", name), ("answer", reply)])
    }
}

fn bullet(candidate: &Candidate) -> String {
    let reply = candidate.reply.trim();
    if reply.is_empty() {
        format!("- {}", candidate.label)
    } else if looks_like_url(reply) {
        format!("- {} 👉 {}", candidate.label, reply)
    } else {
        format!("- {}: {}", candidate.label, reply)
    }
}
