//! Command-prefix matching shared by every command surface.

use crate::message::{Message, Segment};

/// Match `message` against a command, accepting any of `prefixes` before any
/// of `names`. On a match, returns the argument message: the command stripped,
/// leading whitespace trimmed, and the remaining segments kept.
///
/// Names ending in an ASCII alphanumeric need a word boundary after them so
/// that `add` does not match `address`.
pub fn strip_command(message: &Message, prefixes: &[String], names: &[&str]) -> Option<Message> {
    let (first, rest) = message.segments().split_first()?;
    let Segment::Text { text } = first else {
        return None;
    };
    let text = text.trim_start();

    let mut ordered: Vec<&str> = prefixes.iter().map(String::as_str).collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.len()));

    for prefix in ordered {
        let Some(after_prefix) = text.strip_prefix(prefix) else {
            continue;
        };
        for name in names {
            let Some(after) = after_prefix.strip_prefix(name) else {
                continue;
            };
            if !has_boundary(name, after) {
                continue;
            }
            let mut args = Message::new();
            args.push_text(after.trim_start());
            args.extend(rest.iter().cloned());
            return Some(args);
        }
    }
    None
}

fn has_boundary(name: &str, after: &str) -> bool {
    let ascii_tail = name
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    !ascii_tail || after.is_empty() || after.starts_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MentionTarget;

    fn prefixes() -> Vec<String> {
        vec!["/".into(), "".into()]
    }

    #[test]
    fn test_strip_with_and_without_prefix() {
        let names = ["设置提醒", "add"];
        let args = strip_command(&Message::text("/设置提醒 09:30 开会"), &prefixes(), &names).unwrap();
        assert_eq!(args.extract_plain_text(), "09:30 开会");

        let args = strip_command(&Message::text("设置提醒09:30"), &prefixes(), &names).unwrap();
        assert_eq!(args.extract_plain_text(), "09:30");
    }

    #[test]
    fn test_ascii_alias_needs_boundary() {
        let names = ["add"];
        assert!(strip_command(&Message::text("address"), &prefixes(), &names).is_none());
        assert!(strip_command(&Message::text("add 9:00 x"), &prefixes(), &names).is_some());
        assert!(strip_command(&Message::text("add"), &prefixes(), &names).is_some());
    }

    #[test]
    fn test_keeps_trailing_segments() {
        let msg = Message::text("add 9:00 ").with_mention(MentionTarget::User(7));
        let args = strip_command(&msg, &prefixes(), &["add"]).unwrap();
        assert_eq!(args.mentions().count(), 1);
    }

    #[test]
    fn test_no_match() {
        assert!(strip_command(&Message::text("hello"), &prefixes(), &["list"]).is_none());
        let only_mention = Message::new().with_mention(MentionTarget::All);
        assert!(strip_command(&only_mention, &prefixes(), &["list"]).is_none());
    }

    #[test]
    fn test_slash_required_when_empty_prefix_absent() {
        let slash_only = vec!["/".to_string()];
        assert!(strip_command(&Message::text("list"), &slash_only, &["list"]).is_none());
        assert!(strip_command(&Message::text("/list"), &slash_only, &["list"]).is_some());
    }
}
