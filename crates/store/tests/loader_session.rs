//! Loader tests - load, edit, and save cycles over a working directory.
//!
//! Covers the ownership gate, change detection, outbox dialects, command
//! handling, rollback of temporary outbox entries, and session states.

use std::fs;
use std::path::Path;

use turnkit_codec::{Dialect, Outbox, OutboxMessage};
use turnkit_core::{Ascii, Latin1, ObjectKind, PlayerId, PlayerSet, TurnError};
use turnkit_store::{
    select_loader, DirectoryTurnLoader, ObjectRef, ResultTurnLoader, SessionState, TurnLoader,
    TurnSession, UnpackOptions, WorkingFile,
};
use turnkit_testkit::{sample_base, sample_planet, sample_ship, ResultFileBuilder};

fn player() -> PlayerId {
    PlayerId::new(3).expect("valid player")
}

fn other(n: u8) -> PlayerId {
    PlayerId::new(n).expect("valid player")
}

/// Unpacked directory with one own ship and one foreign ship.
fn unpacked(builder: ResultFileBuilder) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    builder.write_to(dir.path()).expect("write result");
    ResultTurnLoader::new(dir.path(), UnpackOptions::default(), Box::new(Latin1))
        .unpack(player())
        .expect("unpack");
    dir
}

fn standard() -> ResultFileBuilder {
    ResultFileBuilder::new(player(), 20)
        .ship(sample_ship(1, 3))
        .ship(sample_ship(20, 5))
        .planet(sample_planet(44, 3))
        .base(sample_base(44, 3))
}

fn directory_loader(dir: &Path) -> DirectoryTurnLoader {
    DirectoryTurnLoader::new(dir, UnpackOptions::default(), Box::new(Latin1))
}

#[test]
fn unedited_save_changes_nothing() {
    let dir = unpacked(standard());
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");
    assert_eq!(turn.ships.len(), 2);

    let report = loader.save_current_turn(&mut turn).expect("save");
    assert!(report.changed.is_empty(), "{:?}", report.changed);
    // The foreign ship is not written back.
    assert_eq!(report.ships_written, 1);
    let dat = fs::read(WorkingFile::Dat(ObjectKind::Ship).path(dir.path(), player())).expect("dat");
    assert_eq!(&dat[..2], &1u16.to_le_bytes());
    assert_eq!(report.planets_written, 1);
    assert_eq!(report.bases_written, 1);

    // GEN checksums still match the rewritten files.
    let status = loader.get_player_status(player()).expect("status");
    assert!(status.playable);
    let reloaded = loader.load_current_turn(player()).expect("reload");
    assert_eq!(reloaded.ships.len(), 1);
}

#[test]
fn edited_ship_is_reported_changed() {
    let dir = unpacked(standard());
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");

    let ship = turn.ship_mut(1).expect("own ship");
    ship.record.warp = 9;
    ship.modified = true;
    let report = loader.save_current_turn(&mut turn).expect("save");
    assert_eq!(
        report.changed,
        vec![ObjectRef {
            kind: ObjectKind::Ship,
            id: 1
        }]
    );

    let reloaded = loader.load_current_turn(player()).expect("reload");
    assert_eq!(reloaded.ships[0].record.warp, 9);
}

#[test]
fn modifying_a_foreign_ship_is_refused() {
    let dir = unpacked(standard());
    let dat_path = WorkingFile::Dat(ObjectKind::Ship).path(dir.path(), player());
    let before = fs::read(&dat_path).expect("dat");

    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");
    let foreign = turn.ship_mut(20).expect("foreign ship");
    foreign.record.warp = 1;
    foreign.modified = true;

    let err = loader.save_current_turn(&mut turn).unwrap_err();
    assert!(matches!(
        err,
        TurnError::OwnershipViolation {
            kind: ObjectKind::Ship,
            id: 20,
            ..
        }
    ));
    assert_eq!(fs::read(&dat_path).expect("dat"), before);
}

#[test]
fn tampered_dis_fails_gen_checksum() {
    let dir = unpacked(standard());
    let dis_path = WorkingFile::Dis(ObjectKind::Planet).path(dir.path(), player());
    let mut dis = fs::read(&dis_path).expect("dis");
    dis[10] = dis[10].wrapping_add(1);
    fs::write(&dis_path, dis).expect("write dis");

    let mut strict = directory_loader(dir.path());
    assert!(!strict.get_player_status(player()).expect("status").playable);
    let err = strict.load_current_turn(player()).unwrap_err();
    assert!(matches!(err, TurnError::ChecksumMismatch { .. }));

    let mut lenient =
        DirectoryTurnLoader::new(dir.path(), UnpackOptions::lenient(), Box::new(Latin1));
    assert!(lenient.load_current_turn(player()).is_ok());
}

#[test]
fn format_a_outbox_merges_receivers() {
    let dir = unpacked(standard());
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");

    let mut receivers = PlayerSet::single(other(2));
    receivers.insert(other(4));
    receivers.insert_host();
    turn.outbox.push(OutboxMessage {
        sender: player(),
        receivers,
        text: "Peace?\nReply soon".into(),
    });
    let report = loader.save_current_turn(&mut turn).expect("save");
    assert_eq!(report.dialect, Some(Dialect::FormatA));
    assert_eq!(report.outbox_messages, 1);

    // One entry per receiver on disk.
    let raw = fs::read(WorkingFile::Outbox(Dialect::FormatA).path(dir.path(), player()))
        .expect("outbox");
    assert_eq!(&raw[..2], &3i16.to_le_bytes());

    let reloaded = loader.load_current_turn(player()).expect("reload");
    assert_eq!(reloaded.outbox.len(), 1);
    assert_eq!(reloaded.outbox.messages()[0].receivers, receivers);
    assert_eq!(reloaded.outbox.messages()[0].text, "Peace?\nReply soon");
}

#[test]
fn commands_are_appended_only_on_disk() {
    let dir = unpacked(standard());
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");

    turn.commands.set("allies add 4");
    turn.commands.set("give ship 1 to 5");
    let report = loader.save_current_turn(&mut turn).expect("save");
    assert_eq!(report.outbox_messages, 1);
    assert!(turn.outbox.is_empty());

    let raw = fs::read(WorkingFile::Outbox(Dialect::FormatA).path(dir.path(), player()))
        .expect("outbox");
    let on_disk = Outbox::decode(&raw, Dialect::FormatA, player(), &Latin1).expect("decode");
    assert_eq!(on_disk.len(), 1);
    assert!(on_disk.messages()[0].receivers.contains_host());

    let reloaded = loader.load_current_turn(player()).expect("reload");
    assert!(reloaded.outbox.is_empty());
    assert_eq!(reloaded.commands.len(), 2);
}

#[test]
fn failed_save_restores_outbox_and_files() {
    let dir = unpacked(standard());
    let dat_path = WorkingFile::Dat(ObjectKind::Ship).path(dir.path(), player());
    let before = fs::read(&dat_path).expect("dat");

    let mut loader = DirectoryTurnLoader::new(dir.path(), UnpackOptions::default(), Box::new(Ascii));
    let mut turn = loader.load_current_turn(player()).expect("load");
    turn.outbox.push(OutboxMessage {
        sender: player(),
        receivers: PlayerSet::single(other(5)),
        text: "hello".into(),
    });
    turn.commands.set("remote control 20 ¿");
    let ship = turn.ship_mut(1).expect("ship");
    ship.record.warp = 2;
    ship.modified = true;

    let err = loader.save_current_turn(&mut turn).unwrap_err();
    assert!(matches!(err, TurnError::Charset('¿')));
    assert_eq!(turn.outbox.len(), 1);
    assert_eq!(fs::read(&dat_path).expect("dat"), before);
}

#[test]
fn dialect_sticks_to_first_load() {
    let dir = unpacked(standard());
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");
    assert_eq!(loader.remembered_dialect(player()), Some(Dialect::FormatA));

    // A Format-B outbox shows up between load and save.
    let format_b = WorkingFile::Outbox(Dialect::FormatB).path(dir.path(), player());
    fs::write(&format_b, Outbox::new().encode(Dialect::FormatB, &Latin1).expect("encode"))
        .expect("write");

    let report = loader.save_current_turn(&mut turn).expect("save");
    assert_eq!(report.dialect, Some(Dialect::FormatA));
    assert!(!format_b.exists());
    assert!(WorkingFile::Outbox(Dialect::FormatA)
        .path(dir.path(), player())
        .exists());
}

#[test]
fn extended_result_saves_format_b_outbox() {
    let dir = unpacked(standard().extended(1));
    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");
    assert_eq!(turn.dialect, Dialect::FormatB);

    turn.outbox.push(OutboxMessage {
        sender: player(),
        receivers: PlayerSet::single(other(7)),
        text: "Format-B".into(),
    });
    loader.save_current_turn(&mut turn).expect("save");

    let reloaded = loader.load_current_turn(player()).expect("reload");
    assert_eq!(reloaded.outbox.len(), 1);
    assert_eq!(reloaded.outbox.messages()[0].sender, player());
    assert!(!WorkingFile::Outbox(Dialect::FormatA)
        .path(dir.path(), player())
        .exists());
}

#[test]
fn session_tracks_state_across_saves() {
    let dir = unpacked(standard());
    let loader = select_loader(dir.path(), player(), UnpackOptions::default(), Box::new(Latin1))
        .expect("loader");
    let mut session = TurnSession::new(loader, player());
    assert_eq!(session.state(), SessionState::Unloaded);
    assert!(session.edit().is_err());

    session.load().expect("load");
    assert_eq!(session.state(), SessionState::Loaded);

    {
        let turn = session.edit().expect("edit");
        let planet = turn.planet_mut(44).expect("planet");
        planet.record.colonist_tax = 12;
        planet.modified = true;
    }
    assert_eq!(session.state(), SessionState::Dirty);
    assert!(matches!(session.load(), Err(TurnError::InvalidState(_))));

    let report = session.save().expect("save");
    assert_eq!(report.changed.len(), 1);
    assert_eq!(session.state(), SessionState::Saved);

    session.resume();
    assert_eq!(session.state(), SessionState::Loaded);
    let report = session.save().expect("second save");
    assert!(report.changed.is_empty());
}

#[test]
fn result_loader_reports_status_before_unpack() {
    let dir = tempfile::tempdir().expect("tempdir");
    standard().write_to(dir.path()).expect("write result");

    let mut loader = ResultTurnLoader::new(dir.path(), UnpackOptions::default(), Box::new(Latin1));
    let status = loader.get_player_status(player()).expect("status");
    assert!(status.available && status.playable);
    assert!(!status.primary);
    assert_eq!(status.turn, Some(20));

    let turn = loader.load_current_turn(player()).expect("load");
    assert_eq!(turn.turn_number(), 20);
    assert!(loader.get_player_status(player()).expect("status").primary);
    assert!(!loader.get_player_status(other(4)).expect("status").available);
}

#[test]
fn result_loader_keeps_saved_work_on_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    standard().write_to(dir.path()).expect("write result");

    let loader = ResultTurnLoader::new(dir.path(), UnpackOptions::default(), Box::new(Latin1));
    let mut session = TurnSession::new(Box::new(loader), player());
    session.load().expect("load");
    {
        let turn = session.edit().expect("edit");
        let ship = turn.ship_mut(1).expect("own ship");
        ship.record.warp = 7;
        ship.modified = true;
        turn.outbox.push(OutboxMessage {
            sender: player(),
            receivers: PlayerSet::single(other(6)),
            text: "keep this".into(),
        });
        turn.commands.set("filter yes");
    }
    session.save().expect("save");
    session.resume();

    let turn = session.load().expect("reload");
    assert_eq!(turn.ship(1).expect("own ship").record.warp, 7);
    assert_eq!(turn.outbox.len(), 1);
    assert_eq!(turn.outbox.messages()[0].text, "keep this");
    assert_eq!(turn.commands.len(), 1);

    // Saving again still matches the checksums written by the first save.
    let report = session.save().expect("second save");
    assert!(report.changed.is_empty(), "{:?}", report.changed);
}

#[test]
fn result_loader_unpacks_newer_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    standard().write_to(dir.path()).expect("write result");
    let mut loader = ResultTurnLoader::new(dir.path(), UnpackOptions::default(), Box::new(Latin1));
    assert_eq!(loader.load_current_turn(player()).expect("load").turn_number(), 20);

    ResultFileBuilder::new(player(), 21)
        .ship(sample_ship(1, 3))
        .write_to(dir.path())
        .expect("write newer result");
    let turn = loader.load_current_turn(player()).expect("reload");
    assert_eq!(turn.turn_number(), 21);
    assert_eq!(turn.ships.len(), 1);
}

#[test]
fn oversize_message_fails_before_any_write() {
    let dir = unpacked(standard());
    let dat_path = WorkingFile::Dat(ObjectKind::Ship).path(dir.path(), player());
    let outbox_path = WorkingFile::Outbox(Dialect::FormatA).path(dir.path(), player());
    let dat_before = fs::read(&dat_path).expect("dat");
    let outbox_before = fs::read(&outbox_path).expect("outbox");

    let mut loader = directory_loader(dir.path());
    let mut turn = loader.load_current_turn(player()).expect("load");
    turn.outbox.push(OutboxMessage {
        sender: player(),
        receivers: PlayerSet::HOST,
        text: "x".repeat(40_000),
    });
    let ship = turn.ship_mut(1).expect("ship");
    ship.record.warp = 3;
    ship.modified = true;

    let err = loader.save_current_turn(&mut turn).unwrap_err();
    assert!(matches!(err, TurnError::Format(_)), "{err:?}");
    assert_eq!(fs::read(&dat_path).expect("dat"), dat_before);
    assert_eq!(fs::read(&outbox_path).expect("outbox"), outbox_before);
}
