#![warn(missing_docs)]

//! Binary codecs for result files and turn working files.
//!
//! Everything here works on byte buffers or `Read`/`Seek` streams; which
//! files exist on disk is the business of `turnkit-store`.

mod base;
mod bytes;
mod fixup;
mod header;
mod kore;
mod message;
mod outbox;
mod planet;
mod position;
mod record;
mod section;
mod ship;
mod target;
mod text;
mod util;
mod vcr;

pub use base::{BaseRecord, BuildOrder};
pub use bytes::{ByteReader, ByteWriter};
pub use fixup::ShipFixups;
pub use header::{GenFile, PasswordChange, ScoreRow, TurnHeader, GEN_FILE_SIZE, HEADER_SIZE};
pub use kore::{
    Explosion, IonStorm, KoreContents, Minefield, Ufo, KORE_EXPLOSIONS, KORE_MINEFIELDS,
    KORE_PROLOGUE_SIZE, KORE_STORMS, KORE_TARGET_MARKER, KORE_UFOS, KORE_UFO_MARKER,
    SKORE_FIRST_UFO, SKORE_MAX_UFOS, SKORE_PROLOGUE_SIZE,
};
pub use message::{decode_message_file, encode_message_file, read_message_bodies, MAX_MESSAGES};
pub use outbox::{Outbox, OutboxMessage};
pub use planet::{Minerals, PlanetRecord};
pub use position::{ShipPosition, SHIP_POSITION_COUNT, SHIP_POSITION_TABLE_SIZE};
pub use record::{
    build_working_file, decode_all, find_record, parse_working_file, raw_id, read_count,
    read_counted_block, read_exactly, require_size, FixedRecord, IdentifiedRecord, RawBlock,
    SIGNATURE_LEN,
};
pub use section::{
    encode_directory, Dialect, SectionDescriptor, SectionIndex, SectionTable, SectionTag,
    DIRECTORY_SIZE, EXTENDED_DIRECTORY_SIZE,
};
pub use ship::{ShipRecord, Transfer};
pub use target::{toggle_target_encryption, TargetRecord};
pub use text::{decode_fixed, decode_message, encode_fixed, encode_message};
pub use util::{decode_util_stream, encode_util_stream, payload_bounds, UtilEvent, END_OF_STREAM};
pub use vcr::{BattleRecord, Combatant, MAX_BATTLES};

/// Most targets a result file may carry in its target section.
pub const MAX_TARGETS: usize = 999;

/// Most starbases per game.
pub const MAX_BASES: usize = 500;
