//! Structured chat messages.
//!
//! A [`Message`] is an ordered sequence of text and mention segments. The
//! serde form follows the OneBot v11 array format
//! (`{"type": "text", "data": {"text": "..."}}`), and [`Message::from_cq`] /
//! [`Message::to_cq`] convert to and from the CQ-code string form
//! (`hello [CQ:at,qq=123]`).

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::UserId;

static CQ_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[CQ:([A-Za-z_]+)((?:,[^\]]*)?)\]").expect("valid CQ regex"));

/// Who a mention segment highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MentionTarget {
    /// Every member of the group.
    All,
    /// A single user.
    User(UserId),
}

/// Error returned when a mention target string is neither `all` nor a user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMentionError(String);

impl fmt::Display for ParseMentionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mention target: {}", self.0)
    }
}

impl std::error::Error for ParseMentionError {}

impl FromStr for MentionTarget {
    type Err = ParseMentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(MentionTarget::All),
            other => other
                .parse::<UserId>()
                .map(MentionTarget::User)
                .map_err(|_| ParseMentionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for MentionTarget {
    type Error = ParseMentionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MentionTarget> for String {
    fn from(target: MentionTarget) -> Self {
        match target {
            MentionTarget::All => "all".to_string(),
            MentionTarget::User(id) => id.to_string(),
        }
    }
}

/// One segment of a structured message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    Text {
        text: String,
    },
    At {
        #[serde(rename = "qq")]
        target: MentionTarget,
    },
}

/// An ordered sequence of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Vec<Segment>);

impl Message {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A message holding a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        let mut msg = Self::new();
        msg.push_text(text);
        msg
    }

    /// Append text, merging with a trailing text segment.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text { text: last }) = self.0.last_mut() {
            last.push_str(&text);
        } else {
            self.0.push(Segment::Text { text });
        }
    }

    pub fn push_mention(&mut self, target: MentionTarget) {
        self.0.push(Segment::At { target });
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn with_mention(mut self, target: MentionTarget) -> Self {
        self.push_mention(target);
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenation of all text segments; mentions are dropped.
    pub fn extract_plain_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|seg| match seg {
                Segment::Text { text } => Some(text.as_str()),
                Segment::At { .. } => None,
            })
            .collect()
    }

    /// Mention targets in order of appearance.
    pub fn mentions(&self) -> impl Iterator<Item = &MentionTarget> {
        self.0.iter().filter_map(|seg| match seg {
            Segment::At { target } => Some(target),
            Segment::Text { .. } => None,
        })
    }

    /// Remove a leading mention of `user_id` and the whitespace after it.
    /// Returns whether a mention was removed.
    pub fn strip_leading_mention(&mut self, user_id: UserId) -> bool {
        let leading = Segment::At {
            target: MentionTarget::User(user_id),
        };
        if self.0.first() != Some(&leading) {
            return false;
        }
        self.0.remove(0);

        let emptied = match self.0.first_mut() {
            Some(Segment::Text { text }) => {
                let start = text.len() - text.trim_start().len();
                text.drain(..start);
                text.is_empty()
            }
            _ => false,
        };
        if emptied {
            self.0.remove(0);
        }
        true
    }

    /// Parse a CQ-code string. `at` codes become mention segments; any other
    /// CQ code is kept verbatim as text.
    pub fn from_cq(raw: &str) -> Self {
        let mut msg = Self::new();
        let mut cursor = 0;
        for caps in CQ_CODE.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            msg.push_text(unescape(&raw[cursor..whole.start()]));
            cursor = whole.end();

            let mention = if &caps[1] == "at" {
                caps[2]
                    .split(',')
                    .filter_map(|kv| kv.split_once('='))
                    .find(|(k, _)| *k == "qq")
                    .and_then(|(_, v)| v.parse::<MentionTarget>().ok())
            } else {
                None
            };
            match mention {
                Some(target) => msg.push_mention(target),
                None => msg.push_text(whole.as_str()),
            }
        }
        msg.push_text(unescape(&raw[cursor..]));
        msg
    }

    /// Render as a CQ-code string.
    pub fn to_cq(&self) -> String {
        let mut out = String::new();
        for seg in &self.0 {
            match seg {
                Segment::Text { text } => out.push_str(&escape(text)),
                Segment::At { target } => {
                    out.push_str("[CQ:at,qq=");
                    out.push_str(&String::from(*target));
                    out.push(']');
                }
            }
        }
        out
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::text(text)
    }
}

impl Extend<Segment> for Message {
    fn extend<I: IntoIterator<Item = Segment>>(&mut self, iter: I) {
        for seg in iter {
            match seg {
                Segment::Text { text } => self.push_text(text),
                Segment::At { target } => self.push_mention(target),
            }
        }
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut msg = Message::new();
        msg.extend(iter);
        msg
    }
}

/// Human-readable rendering: mentions show as `@id` / `@全体成员`.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.0 {
            match seg {
                Segment::Text { text } => f.write_str(text)?,
                Segment::At {
                    target: MentionTarget::All,
                } => f.write_str("@全体成员")?,
                Segment::At {
                    target: MentionTarget::User(id),
                } => write!(f, "@{id}")?,
            }
        }
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

fn unescape(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}
