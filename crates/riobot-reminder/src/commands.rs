//! Reminder command names and routing.

use riobot_types::{Message, strip_command};

/// The reminder commands and their accepted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderCommand {
    /// `群提醒 [开启|关闭]`
    Manage,
    /// `设置提醒 <time> [@targets] <content>`
    Set,
    /// `查看提醒`
    List,
    /// `移除提醒 <id>`
    Remove,
}

impl ReminderCommand {
    pub const ALL: [ReminderCommand; 4] = [
        ReminderCommand::Manage,
        ReminderCommand::Set,
        ReminderCommand::List,
        ReminderCommand::Remove,
    ];

    pub fn names(&self) -> &'static [&'static str] {
        match self {
            ReminderCommand::Manage => &["群提醒"],
            ReminderCommand::Set => &["设置提醒", "add"],
            ReminderCommand::List => &["查看提醒", "list"],
            ReminderCommand::Remove => &["移除提醒", "del"],
        }
    }

    /// Match a message against every command. Returns the command and its
    /// arguments.
    pub fn parse(message: &Message, prefixes: &[String]) -> Option<(ReminderCommand, Message)> {
        Self::ALL.into_iter().find_map(|command| {
            strip_command(message, prefixes, command.names()).map(|args| (command, args))
        })
    }
}
