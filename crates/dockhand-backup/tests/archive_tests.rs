//! Integration tests for volume archiving through both access strategies

mod common;

use common::*;
use dockhand_backup::{ArchiveError, ArchiveName, VolumeArchiver};
use dockhand_core::AccessMode;
use std::fs;

const TREE: &[(&str, &[u8])] = &[
    ("PG_VERSION", b"16\n"),
    ("empty.bin", b""),
    ("base/1/112", b"catalog page"),
    ("base/1/deeper/still/row", b"nested content"),
    ("pg_wal/", b""),
    ("archive_status/.keep", b""),
];

fn archiver(fixture: &Fixture) -> VolumeArchiver {
    let (ctx, _) = fixture.context();
    VolumeArchiver::new(ctx.accessor.clone(), fixture.settings.compression_level)
}

async fn round_trip(mode: AccessMode) {
    let fixture = Fixture::new().with_access_mode(mode);
    let source = fixture.seed_volume("pg", TREE);
    let target = fixture.seed_volume("pg_restored", &[]);
    let archiver = archiver(&fixture);

    let dest = fixture
        .backup_dir()
        .join(ArchiveName::now("pg").file_name());
    let result = archiver.archive("pg", &dest).await.unwrap();
    assert!(dest.is_file());
    assert_eq!(result.size_bytes, fs::metadata(&dest).unwrap().len());

    archiver.restore("pg_restored", &dest).await.unwrap();

    let expected = tree_contents(&source);
    let restored = tree_contents(&target);
    assert_eq!(restored, expected);
    assert!(restored.contains_key("pg_wal"));
    assert_eq!(restored.get("empty.bin"), Some(&Some(Vec::new())));
}

#[tokio::test]
async fn test_round_trip_direct() {
    round_trip(AccessMode::Direct).await;
}

#[tokio::test]
async fn test_round_trip_helper() {
    round_trip(AccessMode::Helper).await;
}

#[tokio::test]
async fn test_helper_archive_restores_through_direct_access() {
    let helper = Fixture::new().with_access_mode(AccessMode::Helper);
    let source = helper.seed_volume("media", TREE);
    let dest = helper.backup_dir().join("media_20240101T000000.tar.gz");
    archiver(&helper).archive("media", &dest).await.unwrap();

    let direct = Fixture::new();
    let target = direct.seed_volume("media", &[]);
    archiver(&direct).restore("media", &dest).await.unwrap();

    assert_eq!(tree_contents(&target), tree_contents(&source));
}

#[tokio::test]
async fn test_helper_removed_after_every_archive() {
    let fixture = Fixture::new().with_access_mode(AccessMode::Helper);
    fixture.seed_volume("pg", TREE);
    let archiver = archiver(&fixture);

    let dest = fixture.backup_dir().join("pg_20240101T000000.tar.gz");
    archiver.archive("pg", &dest).await.unwrap();
    archiver.restore("pg", &dest).await.unwrap();

    assert_eq!(fixture.runtime.created_helpers().len(), 2);
    assert!(fixture.runtime.live_helpers().is_empty());
}

#[tokio::test]
async fn test_copy_failure_tears_down_and_leaves_no_archive() {
    let fixture = Fixture::new().with_access_mode(AccessMode::Helper);
    fixture.seed_volume("pg", TREE);
    fixture.runtime.fail_copy("pg");
    let archiver = archiver(&fixture);

    let dest = fixture.backup_dir().join("pg_20240101T000000.tar.gz");
    let err = archiver.archive("pg", &dest).await.unwrap_err();

    assert!(matches!(err, ArchiveError::Copy { .. }));
    assert!(!dest.exists());
    assert!(fixture.archives_in(fixture.backup_dir()).is_empty());
    assert_eq!(fs::read_dir(fixture.backup_dir()).unwrap().count(), 0);
    assert_eq!(fixture.runtime.created_helpers().len(), 1);
    assert!(fixture.runtime.live_helpers().is_empty());
}

#[tokio::test]
async fn test_helper_create_failure_is_reported_per_volume() {
    let fixture = Fixture::new().with_access_mode(AccessMode::Helper);
    fixture.seed_volume("pg", TREE);
    fixture.runtime.fail_helper_create("pg");

    let dest = fixture.backup_dir().join("pg_20240101T000000.tar.gz");
    let err = archiver(&fixture).archive("pg", &dest).await.unwrap_err();

    assert!(matches!(err, ArchiveError::HelperCreate { ref volume, .. } if volume == "pg"));
    assert!(fixture.runtime.created_helpers().is_empty());
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_restore_overwrites_but_keeps_extra_files() {
    let fixture = Fixture::new();
    fixture.seed_volume("cfg", &[("app.ini", b"level=debug")]);
    let dest = fixture.backup_dir().join("cfg_20240101T000000.tar.gz");
    let archiver = archiver(&fixture);
    archiver.archive("cfg", &dest).await.unwrap();

    let dir = fixture.runtime.data_dir("cfg");
    fs::write(dir.join("app.ini"), "level=trace").unwrap();
    fs::write(dir.join("local.ini"), "mine").unwrap();

    archiver.restore("cfg", &dest).await.unwrap();

    assert_eq!(fs::read_to_string(dir.join("app.ini")).unwrap(), "level=debug");
    assert_eq!(fs::read_to_string(dir.join("local.ini")).unwrap(), "mine");
}
