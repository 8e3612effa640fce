//! Turning `设置提醒` arguments into a reminder request.

use once_cell::sync::Lazy;
use regex::Regex;
use riobot_cron::DailyTrigger;
use riobot_types::{MentionTarget, Message};

use crate::error::{ReminderError, Result};
use crate::model::Targets;

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9０-９]{1,2})[:时h]([0-9０-９]{1,2})分?").expect("valid time regex")
});

/// Keyword that addresses every group member.
const ALL_KEYWORD: &str = "全体";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    pub trigger: DailyTrigger,
    pub targets: Targets,
    /// The message text with mentions removed, trimmed.
    pub content: String,
}

/// Parse the arguments of a set-reminder command.
///
/// The first `H:M`, `H时M分` or `HhM` in the text sets the time. Mention
/// segments become targets, and an all-mention or the word `全体` targets
/// everyone.
pub fn parse_request(args: &Message) -> Result<ReminderRequest> {
    let text = args.extract_plain_text();

    let caps = TIME_PATTERN
        .captures(&text)
        .ok_or(ReminderError::InvalidTimeFormat)?;
    let hour = parse_number(&caps[1]).ok_or(ReminderError::InvalidTimeFormat)?;
    let minute = parse_number(&caps[2]).ok_or(ReminderError::InvalidTimeFormat)?;
    let trigger = DailyTrigger::new(hour, minute).map_err(|_| ReminderError::TimeOutOfRange)?;

    let content = text.trim().to_string();
    if content.is_empty() {
        return Err(ReminderError::EmptyContent);
    }

    Ok(ReminderRequest {
        trigger,
        targets: collect_targets(args, &text),
        content,
    })
}

/// Decimal value of ASCII or full-width digits.
fn parse_number(digits: &str) -> Option<u32> {
    digits.chars().try_fold(0u32, |acc, c| {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => return None,
        };
        acc.checked_mul(10)?.checked_add(digit)
    })
}

fn collect_targets(args: &Message, text: &str) -> Targets {
    let mut users = Vec::new();
    let mut all = text.contains(ALL_KEYWORD);
    for target in args.mentions() {
        match target {
            MentionTarget::All => all = true,
            MentionTarget::User(id) if !users.contains(id) => users.push(*id),
            MentionTarget::User(_) => {}
        }
    }
    if all {
        Targets::All
    } else if users.is_empty() {
        Targets::None
    } else {
        Targets::Users(users)
    }
}
