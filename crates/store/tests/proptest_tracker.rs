//! Property tests for the persisted change baseline and command files.

use proptest::prelude::*;
use turnkit_core::{Latin1, ObjectKind, PlayerId};
use turnkit_store::{ChangeTracker, CommandList};

fn kind_strategy() -> impl Strategy<Value = ObjectKind> {
    prop_oneof![
        Just(ObjectKind::Ship),
        Just(ObjectKind::Planet),
        Just(ObjectKind::Base),
    ]
}

proptest! {
    /// Property: a saved tracker reloads with the same value in every slot.
    #[test]
    fn tracker_survives_reload(
        entries in prop::collection::vec((kind_strategy(), -5i16..1005, any::<u32>()), 0..64)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let player = PlayerId::new(6).unwrap();
        let mut tracker = ChangeTracker::new(player);
        for (kind, id, sum) in &entries {
            tracker.set(*kind, *id, *sum);
        }
        tracker.save(dir.path()).unwrap();

        let reloaded = ChangeTracker::load(dir.path(), player).unwrap();
        for (kind, id, _) in &entries {
            prop_assert_eq!(reloaded.get(*kind, *id), tracker.get(*kind, *id));
        }
        prop_assert_eq!(reloaded, tracker);
    }

    /// Property: ids outside a kind's slot range are never recorded.
    #[test]
    fn out_of_range_ids_are_absent(kind in kind_strategy(), sum in 1u32.., id in prop_oneof![i16::MIN..1, 1000i16..]) {
        let mut tracker = ChangeTracker::new(PlayerId::new(1).unwrap());
        tracker.set(kind, id, sum);
        prop_assert_eq!(tracker.get(kind, id), None);
    }

    /// Property: a saved command list reloads unchanged.
    #[test]
    fn command_file_survives_reload(lines in prop::collection::vec("[a-z]{1,8}( [a-z0-9]{1,6}){0,3}", 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd6.txt");
        let mut commands = CommandList::new();
        for line in &lines {
            commands.set(line.as_str());
        }
        commands.save(&path, &Latin1).unwrap();
        let reloaded = CommandList::load(&path, &Latin1).unwrap();
        prop_assert_eq!(
            reloaded.iter().collect::<Vec<_>>(),
            commands.iter().collect::<Vec<_>>()
        );
    }
}
