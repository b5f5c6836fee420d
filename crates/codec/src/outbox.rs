//! Outgoing messages and their two file dialects.
//!
//! Format-A (legacy): `i16 count`, `count x {i32 address, i16 length, i16 from,
//! i16 to}`, then bodies. One entry per receiver; receiver 0 is the host.
//!
//! Format-B: `i16 count` + 17 reserved bytes, then per message a valid flag
//! (`'1'`), twelve receiver flags (`'0'`/`'1'`, players 1..=11 then host),
//! `i16 length`, and the body.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use turnkit_core::{Charset, PlayerId, PlayerSet, TurnError, TurnResult, MAX_PLAYERS};

use crate::bytes::{ByteReader, ByteWriter};
use crate::message::{body_length, MAX_MESSAGES};
use crate::record::{read_count, read_exactly};
use crate::section::Dialect;
use crate::text::{decode_message, encode_message};

const FORMAT_B_RESERVED: usize = 17;
const FORMAT_B_FLAGS: usize = 12;
const FORMAT_A_ENTRY: usize = 10;

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Sending player.
    pub sender: PlayerId,
    /// Receiving players and possibly the host.
    pub receivers: PlayerSet,
    /// Message body; lines separated by `
    /// `.
    pub text: String,
}

/// Ordered list of outgoing messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbox {
    messages: Vec<OutboxMessage>,
}

impl Outbox {
    /// Empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: OutboxMessage) {
        self.messages.push(message);
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in order.
    pub fn messages(&self) -> &[OutboxMessage] {
        &self.messages
    }

    /// Remove the message at `index`.
    pub fn remove(&mut self, index: usize) -> OutboxMessage {
        self.messages.remove(index)
    }

    /// Drop every message after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Serialize in the given dialect.
    pub fn encode(&self, dialect: Dialect, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        match dialect {
            Dialect::FormatA => encode_format_a(&self.messages, charset),
            Dialect::FormatB => encode_format_b(&self.messages, charset),
        }
    }

    /// Parse an outbox file. `owner` is the sender for Format-B files, which
    /// do not record one. An empty file is an empty outbox.
    pub fn decode(
        data: &[u8],
        dialect: Dialect,
        owner: PlayerId,
        charset: &dyn Charset,
    ) -> TurnResult<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }
        let messages = match dialect {
            Dialect::FormatA => decode_format_a(data, charset)?,
            Dialect::FormatB => decode_format_b(data, owner, charset)?,
        };
        Ok(Self { messages })
    }
}

fn receiver_codes(receivers: PlayerSet) -> Vec<i16> {
    let mut codes: Vec<i16> = receivers.players().map(|p| i16::from(p.get())).collect();
    if receivers.contains_host() {
        codes.push(0);
    }
    codes
}

fn encode_format_a(messages: &[OutboxMessage], charset: &dyn Charset) -> TurnResult<Vec<u8>> {
    let mut entries: Vec<(i16, i16, Vec<u8>)> = Vec::new();
    for message in messages {
        if message.receivers.is_empty() {
            warn!("dropping outbox message without receivers");
            continue;
        }
        let body = encode_message(&message.text, charset)?;
        for to in receiver_codes(message.receivers) {
            entries.push((i16::from(message.sender.get()), to, body.clone()));
        }
    }
    if entries.len() > MAX_MESSAGES {
        return Err(TurnError::format(format!(
            "outbox expands to {} entries (maximum {MAX_MESSAGES})",
            entries.len()
        )));
    }

    let header_len = 2 + entries.len() * FORMAT_A_ENTRY;
    let mut w = ByteWriter::with_capacity(header_len);
    w.i16(entries.len() as i16);
    let mut address = header_len + 1;
    for (from, to, body) in &entries {
        w.i32(address as i32).i16(body_length(body)?).i16(*from).i16(*to);
        address += body.len();
    }
    for (_, _, body) in &entries {
        w.bytes(body);
    }
    Ok(w.into_inner())
}

fn decode_format_a(data: &[u8], charset: &dyn Charset) -> TurnResult<Vec<OutboxMessage>> {
    let mut cursor = Cursor::new(data);
    let count = read_count(&mut cursor, MAX_MESSAGES, "outbox")?;
    let index = read_exactly(&mut cursor, count * FORMAT_A_ENTRY, "outbox index")?;
    let mut r = ByteReader::new(&index, "outbox index");

    let mut messages: Vec<OutboxMessage> = Vec::new();
    for _ in 0..count {
        let address = r.i32()?;
        let length = r.i16()?;
        let from = PlayerId::try_from(r.i16()?)?;
        let to = r.i16()?;
        if address <= 0 || length < 0 {
            return Err(TurnError::format(format!(
                "invalid outbox entry: address {address}, length {length}"
            )));
        }
        let start = address as usize - 1;
        let end = start + length as usize;
        if end > data.len() {
            return Err(TurnError::too_short("outbox body", end, data.len()));
        }
        let text = decode_message(&data[start..end], charset);

        let mut receivers = PlayerSet::EMPTY;
        match to {
            0 => receivers.insert_host(),
            n => receivers.insert(PlayerId::try_from(n)?),
        }

        // Consecutive copies of one message to different receivers merge back.
        match messages.last_mut() {
            Some(last) if last.sender == from && last.text == text => {
                last.receivers = last.receivers.union(receivers);
            }
            _ => messages.push(OutboxMessage {
                sender: from,
                receivers,
                text,
            }),
        }
    }
    Ok(messages)
}

fn encode_format_b(messages: &[OutboxMessage], charset: &dyn Charset) -> TurnResult<Vec<u8>> {
    let kept: Vec<&OutboxMessage> = messages
        .iter()
        .filter(|m| {
            if m.receivers.is_empty() {
                warn!("dropping outbox message without receivers");
                false
            } else {
                true
            }
        })
        .collect();
    if kept.len() > MAX_MESSAGES {
        return Err(TurnError::format(format!(
            "outbox holds {} messages (maximum {MAX_MESSAGES})",
            kept.len()
        )));
    }

    let mut w = ByteWriter::with_capacity(2 + FORMAT_B_RESERVED);
    w.i16(kept.len() as i16).bytes(&[0u8; FORMAT_B_RESERVED]);
    for message in kept {
        let body = encode_message(&message.text, charset)?;
        let mut flags = [b'0'; FORMAT_B_FLAGS];
        for player in message.receivers.players() {
            flags[usize::from(player.get()) - 1] = b'1';
        }
        if message.receivers.contains_host() {
            flags[FORMAT_B_FLAGS - 1] = b'1';
        }
        w.u8(b'1').bytes(&flags).i16(body_length(&body)?).bytes(&body);
    }
    Ok(w.into_inner())
}

fn decode_format_b(
    data: &[u8],
    owner: PlayerId,
    charset: &dyn Charset,
) -> TurnResult<Vec<OutboxMessage>> {
    let mut r = ByteReader::new(data, "outbox");
    let count = r.i16()?;
    if count < 0 || count as usize > MAX_MESSAGES {
        return Err(TurnError::format(format!("implausible outbox count {count}")));
    }
    r.take(FORMAT_B_RESERVED)?;

    let mut messages = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let valid = r.u8()?;
        let flags: [u8; FORMAT_B_FLAGS] = r.array()?;
        let length = r.i16()?;
        if length < 0 {
            return Err(TurnError::format(format!("negative outbox length {length}")));
        }
        let body = r.take(length as usize)?;
        if valid != b'1' {
            debug!("skipping deleted outbox entry");
            continue;
        }

        let mut receivers = PlayerSet::EMPTY;
        for (index, flag) in flags.iter().enumerate().take(MAX_PLAYERS as usize) {
            if *flag == b'1' {
                if let Some(player) = PlayerId::new(index as u8 + 1) {
                    receivers.insert(player);
                }
            }
        }
        if flags[FORMAT_B_FLAGS - 1] == b'1' {
            receivers.insert_host();
        }
        messages.push(OutboxMessage {
            sender: owner,
            receivers,
            text: decode_message(body, charset),
        });
    }
    Ok(messages)
}
