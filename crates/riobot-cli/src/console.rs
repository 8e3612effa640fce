//! Console session: stdin lines become inbound messages, outbound messages
//! print to stdout.

use std::io::{self, Write};

use anyhow::Result;
use async_trait::async_trait;
use riobot_reminder::{ReminderService, Transport};
use riobot_types::{GroupId, InboundMessage, Message, Role, Scope, Sender, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Prints outbound messages instead of sending them.
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_group_message(&self, group_id: GroupId, message: Message) -> Result<()> {
        println!("\n[→ group {group_id}]\n{message}");
        Ok(())
    }

    async fn send_private_message(&self, user_id: UserId, message: Message) -> Result<()> {
        println!("\n[→ user {user_id}]\n{message}");
        Ok(())
    }
}

/// Who the console is speaking as, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSession {
    self_id: UserId,
    group_id: GroupId,
    user_id: UserId,
    role: Role,
    private: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum MetaCommand {
    As { user_id: UserId, role: Role },
    Group(GroupId),
    Private,
    Jobs,
    Quit,
}

impl ConsoleSession {
    pub fn new(self_id: UserId, group_id: GroupId, user_id: UserId, role: Role) -> Self {
        Self {
            self_id,
            group_id,
            user_id,
            role,
            private: false,
        }
    }

    fn scope(&self) -> Scope {
        if self.private {
            Scope::private(self.user_id)
        } else {
            Scope::group(self.group_id)
        }
    }

    fn inbound(&self, raw: &str) -> InboundMessage {
        let sender = if self.private {
            Sender::new(self.user_id)
        } else {
            Sender::new(self.user_id).with_role(self.role)
        };
        InboundMessage {
            scope: self.scope(),
            sender,
            message: Message::from_cq(raw),
            to_me: self.private,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
        .strip_self_mention(self.self_id)
    }

    fn apply(&mut self, command: MetaCommand) {
        match command {
            MetaCommand::As { user_id, role } => {
                self.user_id = user_id;
                self.role = role;
            }
            MetaCommand::Group(group_id) => {
                self.group_id = group_id;
                self.private = false;
            }
            MetaCommand::Private => self.private = true,
            MetaCommand::Jobs | MetaCommand::Quit => {}
        }
    }

    fn prompt(&self) -> String {
        match self.scope() {
            Scope::Group { group_id } => {
                format!("[group {group_id} | {} {:?}] > ", self.user_id, self.role)
            }
            Scope::Private { user_id } => format!("[private {user_id}] > "),
        }
    }
}

fn parse_meta(input: &str) -> Result<MetaCommand, String> {
    let mut words = input.split_whitespace();
    let command = words.next().unwrap_or_default();
    let id_arg = |word: Option<&str>| -> Result<i64, String> {
        let word = word.ok_or_else(|| format!(":{command} needs an id"))?;
        word.parse().map_err(|_| format!("invalid id: {word}"))
    };

    match command {
        "as" => {
            let user_id = id_arg(words.next())?;
            let role = match words.next() {
                Some(role) => role.parse()?,
                None => Role::Member,
            };
            Ok(MetaCommand::As { user_id, role })
        }
        "group" => Ok(MetaCommand::Group(id_arg(words.next())?)),
        "private" => Ok(MetaCommand::Private),
        "jobs" => Ok(MetaCommand::Jobs),
        "quit" | "exit" => Ok(MetaCommand::Quit),
        other => Err(format!(
            "unknown command :{other} (try :as, :group, :private, :jobs, :quit)"
        )),
    }
}

async fn print_jobs(service: &ReminderService) {
    let scheduler = service.scheduler();
    let jobs = scheduler.get_jobs().await;
    if jobs.is_empty() {
        println!("(no scheduled jobs)");
        return;
    }
    for job in jobs {
        let next = scheduler
            .next_run_time(&job.id)
            .await
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}  {}  next: {next}", job.id, job.trigger);
    }
}

/// Read commands from stdin until EOF, `:quit` or Ctrl+C.
pub async fn run_console(service: &ReminderService, mut session: ConsoleSession) -> Result<()> {
    println!("Type a command (e.g. 设置提醒 09:30 早会提醒). Meta commands start with ':'.");
    println!("Ctrl+D or :quit to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", session.prompt());
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            // EOF or Ctrl+C
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(meta) = input.strip_prefix(':') {
            match parse_meta(meta) {
                Ok(MetaCommand::Quit) => break,
                Ok(MetaCommand::Jobs) => print_jobs(service).await,
                Ok(command) => session.apply(command),
                Err(e) => eprintln!("[{e}]"),
            }
            continue;
        }

        match service.handle(&session.inbound(input)).await {
            Some(reply) => println!("{reply}"),
            None => println!("(not a reminder command)"),
        }
    }

    println!("Goodbye!");
    Ok(())
}
