//! Host command file (`cmd{p}.txt`).
//!
//! One command per line. On save the commands also travel to the host as a
//! single message appended to the outbox.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use turnkit_codec::OutboxMessage;
use turnkit_core::{Charset, PlayerId, PlayerSet, TurnResult};

use crate::files::read_optional;

/// Host commands kept in `cmd{p}.txt`, at most one per verb.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandList {
    commands: Vec<String>,
}

impl CommandList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a command file. Missing files and blank lines are ignored.
    pub fn load(path: &Path, charset: &dyn Charset) -> TurnResult<Self> {
        let Some(data) = read_optional(path)? else {
            return Ok(Self::new());
        };
        let text = charset.decode(&data);
        Ok(text.lines().collect())
    }

    /// Write the command file, one command per line.
    pub fn save(&self, path: &Path, charset: &dyn Charset) -> TurnResult<()> {
        let mut text = String::new();
        for command in &self.commands {
            text.push_str(command);
            text.push_str("\r\n");
        }
        fs::write(path, charset.encode(&text)?)?;
        Ok(())
    }

    /// Add a command, replacing an earlier one with the same verb.
    pub fn set(&mut self, command: impl Into<String>) {
        let command = command.into();
        let verb = verb_of(&command).to_owned();
        self.commands.retain(|c| !verb_of(c).eq_ignore_ascii_case(&verb));
        self.commands.push(command);
    }

    /// Drop every command with this verb.
    pub fn remove(&mut self, verb: &str) {
        self.commands.retain(|c| !verb_of(c).eq_ignore_ascii_case(verb));
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when there are no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// The commands as one host-addressed message, if there are any.
    pub fn to_message(&self, sender: PlayerId) -> Option<OutboxMessage> {
        if self.commands.is_empty() {
            return None;
        }
        Some(OutboxMessage {
            sender,
            receivers: PlayerSet::HOST,
            text: self.commands.join("\n"),
        })
    }
}

impl<'a> FromIterator<&'a str> for CommandList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            commands: iter
                .into_iter()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

fn verb_of(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnkit_core::Latin1;

    #[test]
    fn file_roundtrip_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd2.txt");
        fs::write(&path, b"  \r\nallies add 4\r\n\r\nfilter yes\r\n").unwrap();

        let commands = CommandList::load(&path, &Latin1).unwrap();
        assert_eq!(
            commands.iter().collect::<Vec<_>>(),
            vec!["allies add 4", "filter yes"]
        );

        commands.save(&path, &Latin1).unwrap();
        assert_eq!(CommandList::load(&path, &Latin1).unwrap(), commands);
    }

    #[test]
    fn set_replaces_same_verb() {
        let mut commands = CommandList::new();
        commands.set("language english");
        commands.set("filter yes");
        commands.set("Language german");
        assert_eq!(
            commands.iter().collect::<Vec<_>>(),
            vec!["filter yes", "Language german"]
        );
        commands.remove("filter");
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn commands_become_one_host_message() {
        let player = PlayerId::new(2).unwrap();
        assert!(CommandList::new().to_message(player).is_none());

        let commands: CommandList = ["give ship 5 to 3", "remote control 7"].into_iter().collect();
        let message = commands.to_message(player).unwrap();
        assert_eq!(message.receivers, PlayerSet::HOST);
        assert_eq!(message.text, "give ship 5 to 3\nremote control 7");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CommandList::load(&dir.path().join("cmd9.txt"), &Latin1)
            .unwrap()
            .is_empty());
    }
}
