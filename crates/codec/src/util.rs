//! Auxiliary event stream (`util{p}.dat`).
//!
//! Records are `{u16 kind, u16 size, payload}`. Every known kind has a
//! minimum payload size; trailing fields past the minimum are optional and
//! decoded only when the payload carries them.

use serde::{Deserialize, Serialize};
use tracing::debug;
use turnkit_core::{Charset, PlayerSet, TurnError, TurnResult, MAX_PLAYERS};

use crate::bytes::{ByteReader, ByteWriter};
use crate::text::{decode_fixed, encode_fixed};

/// Kind code that terminates the stream.
pub const END_OF_STREAM: u16 = 13;

/// Minimum and full payload sizes of a known kind.
pub fn payload_bounds(kind: u16) -> Option<(usize, usize)> {
    match kind {
        0 => Some((12, 14)),
        1 => Some((6, 26)),
        2 => Some((8, 28)),
        3 => Some((2, 2)),
        4 => Some((4, 4)),
        5 => Some((52, 102)),
        END_OF_STREAM => Some((0, 0)),
        _ => None,
    }
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtilEvent {
    /// Minefield scanned this turn (kind 0).
    MinefieldScan {
        /// Minefield id.
        id: i16,
        /// X coordinate.
        x: i16,
        /// Y coordinate.
        y: i16,
        /// Laying player.
        owner: i16,
        /// Mine units.
        units: i32,
        /// Only present in newer hosts.
        web: Option<bool>,
    },
    /// Ship exploded (kind 1).
    Explosion {
        /// X coordinate.
        x: i16,
        /// Y coordinate.
        y: i16,
        /// Exploded ship.
        ship_id: i16,
        /// Only present in newer hosts.
        ship_name: Option<String>,
    },
    /// Ship hit mines (kind 2).
    MineHit {
        /// Damaged ship.
        ship_id: i16,
        /// X coordinate.
        x: i16,
        /// Y coordinate.
        y: i16,
        /// Damage taken.
        damage: i16,
        /// Only present in newer hosts.
        ship_name: Option<String>,
    },
    /// Minefield swept or decayed (kind 3).
    MinefieldGone {
        /// Minefield id.
        id: i16,
    },
    /// Alliance offers (kind 4).
    Diplomacy {
        /// Players this player offered an alliance.
        offered_to: PlayerSet,
        /// Players offering an alliance to this player.
        offered_by: PlayerSet,
    },
    /// Game score definition (kind 5).
    Score {
        /// Score name.
        name: String,
        /// Score identifier.
        score_id: i16,
        /// Turns a player must hold the win limit.
        turn_limit: i16,
        /// Score needed to win, -1 for none.
        win_limit: i32,
        /// Per-player values; only present in the full record.
        values: Option<[i32; MAX_PLAYERS as usize]>,
    },
}

impl UtilEvent {
    /// Kind code of this event.
    pub fn kind(&self) -> u16 {
        match self {
            UtilEvent::MinefieldScan { .. } => 0,
            UtilEvent::Explosion { .. } => 1,
            UtilEvent::MineHit { .. } => 2,
            UtilEvent::MinefieldGone { .. } => 3,
            UtilEvent::Diplomacy { .. } => 4,
            UtilEvent::Score { .. } => 5,
        }
    }

    /// Decode the payload of a known kind.
    ///
    /// Returns `Ok(None)` for unknown kinds and for the end marker.
    pub fn decode(kind: u16, payload: &[u8], charset: &dyn Charset) -> TurnResult<Option<Self>> {
        let Some((min, _)) = payload_bounds(kind) else {
            return Ok(None);
        };
        if payload.len() < min {
            return Err(TurnError::too_short("util record", min, payload.len()));
        }
        let mut r = ByteReader::new(payload, "util record");
        let event = match kind {
            0 => UtilEvent::MinefieldScan {
                id: r.i16()?,
                x: r.i16()?,
                y: r.i16()?,
                owner: r.i16()?,
                units: r.i32()?,
                web: optional(&mut r, 2, |r| Ok(r.i16()? != 0))?,
            },
            1 => UtilEvent::Explosion {
                x: r.i16()?,
                y: r.i16()?,
                ship_id: r.i16()?,
                ship_name: optional(&mut r, 20, |r| Ok(decode_fixed(r.take(20)?, charset)))?,
            },
            2 => UtilEvent::MineHit {
                ship_id: r.i16()?,
                x: r.i16()?,
                y: r.i16()?,
                damage: r.i16()?,
                ship_name: optional(&mut r, 20, |r| Ok(decode_fixed(r.take(20)?, charset)))?,
            },
            3 => UtilEvent::MinefieldGone { id: r.i16()? },
            4 => UtilEvent::Diplomacy {
                offered_to: PlayerSet::from_bits(r.u16()?),
                offered_by: PlayerSet::from_bits(r.u16()?),
            },
            5 => UtilEvent::Score {
                name: decode_fixed(r.take(50)?, charset),
                score_id: r.i16()?,
                turn_limit: r.i16()?,
                win_limit: r.i32()?,
                values: optional(&mut r, 4 * MAX_PLAYERS as usize, |r| r.i32_array())?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Encode the full-size payload of this event.
    pub fn encode(&self, charset: &dyn Charset) -> TurnResult<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(32);
        match self {
            UtilEvent::MinefieldScan {
                id,
                x,
                y,
                owner,
                units,
                web,
            } => {
                w.i16_slice(&[*id, *x, *y, *owner]).i32(*units);
                if let Some(web) = web {
                    w.i16(i16::from(*web));
                }
            }
            UtilEvent::Explosion {
                x,
                y,
                ship_id,
                ship_name,
            } => {
                w.i16_slice(&[*x, *y, *ship_id]);
                if let Some(name) = ship_name {
                    w.bytes(&encode_fixed::<20>(name, charset)?);
                }
            }
            UtilEvent::MineHit {
                ship_id,
                x,
                y,
                damage,
                ship_name,
            } => {
                w.i16_slice(&[*ship_id, *x, *y, *damage]);
                if let Some(name) = ship_name {
                    w.bytes(&encode_fixed::<20>(name, charset)?);
                }
            }
            UtilEvent::MinefieldGone { id } => {
                w.i16(*id);
            }
            UtilEvent::Diplomacy {
                offered_to,
                offered_by,
            } => {
                w.u16(offered_to.bits()).u16(offered_by.bits());
            }
            UtilEvent::Score {
                name,
                score_id,
                turn_limit,
                win_limit,
                values,
            } => {
                w.bytes(&encode_fixed::<50>(name, charset)?)
                    .i16(*score_id)
                    .i16(*turn_limit)
                    .i32(*win_limit);
                if let Some(values) = values {
                    w.i32_slice(values);
                }
            }
        }
        Ok(w.into_inner())
    }
}

fn optional<'a, T>(
    r: &mut ByteReader<'a>,
    needed: usize,
    read: impl FnOnce(&mut ByteReader<'a>) -> TurnResult<T>,
) -> TurnResult<Option<T>> {
    if r.remaining() >= needed {
        read(r).map(Some)
    } else {
        Ok(None)
    }
}

/// Decode a whole event stream.
///
/// Unknown kinds are skipped. Decoding stops at the end marker or at the end
/// of the buffer, whichever comes first.
pub fn decode_util_stream(data: &[u8], charset: &dyn Charset) -> TurnResult<Vec<UtilEvent>> {
    let mut r = ByteReader::new(data, "util stream");
    let mut events = Vec::new();
    while r.remaining() > 0 {
        let kind = r.u16()?;
        let size = usize::from(r.u16()?);
        let payload = r.take(size)?;
        if kind == END_OF_STREAM {
            break;
        }
        match UtilEvent::decode(kind, payload, charset)? {
            Some(event) => events.push(event),
            None => debug!(kind, size, "skipping unknown util record"),
        }
    }
    Ok(events)
}

/// Encode events followed by the end marker.
pub fn encode_util_stream(events: &[UtilEvent], charset: &dyn Charset) -> TurnResult<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(64);
    for event in events {
        let payload = event.encode(charset)?;
        w.u16(event.kind()).u16(payload.len() as u16).bytes(&payload);
    }
    w.u16(END_OF_STREAM).u16(0);
    Ok(w.into_inner())
}
