//! End-to-end indexing cycles against an in-memory news server
//!
//! Each test posts overview rows, runs full cycles and checks what lands in
//! the store: Parts, Binaries, Releases and the NZB files behind them.

mod common;

use common::*;
use std::time::Duration;
use usenet_indexer::categories::taxonomy::{
    MISC_OTHER, MOVIES_HD, PC_ISO, TV, TV_DOCUMENTARY, TV_HD,
};
use usenet_indexer::db::NewRegex;
use usenet_indexer::{Event, ReleaseStatus};

const DOCUMENTARIES: &str = "alt.binaries.documentaries";

#[tokio::test]
async fn segments_arriving_across_cycles_complete_a_release() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);
    let posted = hours_ago(4);

    poster
        .segment(r#"[1/1] - "Show.S01E01.rar" yEnc (1/3)"#, posted)
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.segments, 1);
    assert_eq!(stats.assembly.binaries, 1);
    assert_eq!(stats.promotion.accumulating, 1);
    assert_no_releases(&indexer).await;

    poster
        .segment(r#"[1/1] - "Show.S01E01.rar" yEnc (2/3)"#, posted)
        .await;
    poster
        .segment(r#"[1/1] - "Show.S01E01.rar" yEnc (3/3)"#, posted)
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.segments, 2, "only new articles are scanned");
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.search_name, "Show S01E01");
    assert_eq!(release.completion, 100.0);
    assert_eq!(release.size, 3 * SEGMENT_BYTES as i64);
    assert_eq!(release.status(), ReleaseStatus::Pending);
    assert_nzb_contains(&release, "3.alt.binaries.teevee@fixtures.test");

    // Promoted binaries and their parts leave the working set
    assert_eq!(indexer.db.count_binaries().await.unwrap(), 0);
    assert_eq!(indexer.db.count_parts().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_part_holds_back_the_release_until_it_arrives() {
    let (indexer, _temp_dir, server) = memory_indexer(&[MISC_GROUP]).await;
    let mut poster = Poster::new(&server, MISC_GROUP);
    let posted = hours_ago(4);
    let name = "Some.Movie.2012.720p.BluRay.x264-GRP";

    poster
        .file(&format!(r#"[1/2] - "{}.part1.rar""#, name), 2, posted)
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.promotion.accumulating, 1);
    assert_no_releases(&indexer).await;

    let binary = indexer.db.get_binary(name).await.unwrap().unwrap();
    assert_eq!(binary.total_parts, 2);

    poster
        .file(&format!(r#"[2/2] - "{}.part2.rar""#, name), 2, posted)
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.total_parts, 2);
    assert_eq!(release.archive_count, 2);
    assert_eq!(release.category_id, MOVIES_HD);
}

#[tokio::test]
async fn hashed_name_goes_to_misc_when_archives_are_not_required() {
    let (indexer, _temp_dir, server) =
        memory_indexer_with(&[TEEVEE], |config| config.postprocess.min_archives = 0).await;
    let mut poster = Poster::new(&server, TEEVEE);

    poster
        .segment(
            r#"[a-group] Random (1/1) - "hash1234567890abcdef""#,
            hours_ago(4),
        )
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.name, "hash1234567890abcdef");
    assert_eq!(release.category_id, MISC_OTHER);
    assert_eq!(release.archive_count, 0);
}

#[tokio::test]
async fn archive_volumes_merge_into_one_categorized_release() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);
    let mut events = indexer.subscribe();

    poster
        .volumes(
            "Show.S01E01.720p.HDTV.x264-GRP",
            &[".rar", ".r00", ".r01", ".r02"],
            2,
            hours_ago(4),
        )
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.segments, 8);
    assert_eq!(stats.assembly.parts_assembled, 4);
    assert_eq!(stats.assembly.binaries, 1);
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.name, "Show.S01E01.720p.HDTV.x264-GRP");
    assert_eq!(release.search_name, "Show S01E01 720p HDTV x264-GRP");
    assert_eq!(release.total_parts, 4);
    assert_eq!(release.archive_count, 4);
    assert_eq!(release.file_count, 4);
    assert_eq!(release.size, 8 * SEGMENT_BYTES as i64);
    assert_eq!(release.category_id, TV_HD);

    let (category, parent) = indexer
        .db
        .category_with_parent(release.category_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(category.id, TV_HD);
    assert_eq!(parent.map(|p| p.id), Some(TV));

    let created = drain_events(&mut events)
        .into_iter()
        .find_map(|event| match event {
            Event::ReleaseCreated { id, new, .. } => Some((id, new)),
            _ => None,
        })
        .expect("ReleaseCreated event");
    assert_eq!(created.0.as_str(), release.id);
    assert!(created.1);
}

#[tokio::test]
async fn uncounted_single_file_waits_for_the_grace_period() {
    let (indexer, _temp_dir, server) = memory_indexer(&[MISC_GROUP]).await;
    let mut poster = Poster::new(&server, MISC_GROUP);

    // Posted an hour ago: no part counter, so it may still be a multi-part posting
    poster
        .file(r#""Fresh.Video.2013.rar""#, 2, hours_ago(1))
        .await;
    // Old enough to be taken as a single part
    poster
        .file(r#""Holiday.Video.2013.rar""#, 2, hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.deferred, 1);
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.name, "Holiday.Video.2013");
    assert_eq!(release.total_parts, 1);
    assert_eq!(release.completion, 100.0);

    // The young part stays in the store, unassigned
    assert_eq!(indexer.db.count_parts().await.unwrap(), 1);
    assert!(indexer.db.get_binary("Fresh.Video.2013").await.unwrap().is_none());
}

#[tokio::test]
async fn uncounted_files_of_one_posting_all_reach_the_nzb() {
    let (indexer, _temp_dir, server) = memory_indexer(&[MISC_GROUP]).await;
    let mut poster = Poster::new(&server, MISC_GROUP);

    // Articles 1-2 and 3-4, neither file carries a [i/n] counter
    poster
        .file(r#""Holiday.Video.2013.rar""#, 2, hours_ago(4))
        .await;
    poster
        .file(r#""Holiday.Video.2013.r00""#, 2, hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.parts_assembled, 2);
    assert_eq!(stats.assembly.binaries, 1);
    assert_eq!(stats.promotion.created, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.name, "Holiday.Video.2013");
    assert_eq!(release.file_count, 2);
    assert_eq!(release.archive_count, 2);
    assert_eq!(release.total_parts, 2);
    assert_eq!(release.size, 4 * SEGMENT_BYTES as i64);
    assert_eq!(release.completion, 100.0);
    for article in 1..=4 {
        assert_nzb_contains(&release, &format!("{}.{}@fixtures.test", article, MISC_GROUP));
    }
}

#[tokio::test]
async fn reposted_binary_refreshes_the_existing_release() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);
    let posted = hours_ago(4);
    let name = "Show.S03E07.720p.HDTV.x264-GRP";

    poster.volumes(name, &[".rar", ".r00"], 1, posted).await;
    indexer.run_cycle().await.unwrap();
    let first = single_release(&indexer).await;

    let mut events = indexer.subscribe();
    poster.volumes(name, &[".rar", ".r00"], 1, posted).await;
    let stats = indexer.run_cycle().await.unwrap();

    assert_eq!(stats.promotion.created, 0);
    assert_eq!(stats.promotion.refreshed, 1);

    let second = single_release(&indexer).await;
    assert_eq!(second.id, first.id);
    assert_eq!(second.added, first.added);

    let refreshed = drain_events(&mut events)
        .into_iter()
        .find_map(|event| match event {
            Event::ReleaseCreated { new, .. } => Some(new),
            _ => None,
        });
    assert_eq!(refreshed, Some(false));
}

#[tokio::test]
async fn binary_without_archives_is_discarded() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);
    let mut events = indexer.subscribe();

    poster
        .volumes(
            "Show.S02E02.720p.HDTV.x264-GRP",
            &[".par2", ".nfo"],
            1,
            hours_ago(4),
        )
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.promotion.discarded, 1);
    assert_eq!(stats.promotion.created, 0);
    assert_no_releases(&indexer).await;
    assert_eq!(indexer.db.count_binaries().await.unwrap(), 0);

    let discarded = drain_events(&mut events)
        .into_iter()
        .find_map(|event| match event {
            Event::BinaryDiscarded { name, .. } => Some(name),
            _ => None,
        });
    assert_eq!(discarded.as_deref(), Some("Show.S02E02.720p.HDTV.x264-GRP"));
}

#[tokio::test]
async fn malformed_rule_is_retired_and_assembly_carries_on() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);

    let broken = indexer
        .db
        .insert_regex(&NewRegex {
            group_name: "*",
            pattern: "(?P<name>[",
            ordinal: 1,
            category_id: None,
            description: Some("unterminated class"),
        })
        .await
        .unwrap();
    indexer.reload_rules().await.unwrap();

    poster
        .volumes("Show.S01E05.720p.HDTV.x264-GRP", &[".rar", ".r00"], 1, hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.rules_retired, 1);
    assert_eq!(stats.assembly.parts_assembled, 2);
    assert_eq!(stats.promotion.created, 1);

    let active = indexer.db.active_regexes().await.unwrap();
    assert!(active.iter().all(|rule| rule.id != broken));
    assert!(!active.is_empty(), "the other rules stay active");

    // Reloading drops the disabled rule for good
    indexer.reload_rules().await.unwrap();
    poster
        .volumes("Show.S01E06.720p.HDTV.x264-GRP", &[".rar", ".r00"], 1, hours_ago(4))
        .await;
    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.rules_retired, 0);
    assert_eq!(stats.promotion.created, 1);
}

#[tokio::test]
async fn group_suggestion_outranks_the_global_order() {
    let name = "Life.On.Earth.2009.Documentary.720p.BluRay.x264";

    let (documentaries, _docs_dir, server) = memory_indexer(&[DOCUMENTARIES]).await;
    Poster::new(&server, DOCUMENTARIES)
        .volumes(name, &[".part1.rar"], 1, hours_ago(4))
        .await;
    documentaries.run_cycle().await.unwrap();
    assert_eq!(
        single_release(&documentaries).await.category_id,
        TV_DOCUMENTARY
    );

    let (elsewhere, _misc_dir, server) = memory_indexer(&[MISC_GROUP]).await;
    Poster::new(&server, MISC_GROUP)
        .volumes(name, &[".part1.rar"], 1, hours_ago(4))
        .await;
    elsewhere.run_cycle().await.unwrap();
    assert_eq!(single_release(&elsewhere).await.category_id, MOVIES_HD);
}

#[tokio::test]
async fn tv_hinted_group_wins_over_an_iso_name() {
    let name = "Planet.Earth.Documentary.Collection.ISO";
    let volumes = [".rar", ".r01", ".r02"];

    // Posted anywhere else, the ISO token puts the name in PC
    let (elsewhere, _misc_dir, server) = memory_indexer(&[MISC_GROUP]).await;
    Poster::new(&server, MISC_GROUP)
        .volumes(name, &volumes, 1, hours_ago(4))
        .await;
    elsewhere.run_cycle().await.unwrap();
    assert_eq!(single_release(&elsewhere).await.category_id, PC_ISO);

    let (documentaries, _docs_dir, server) = memory_indexer(&[DOCUMENTARIES]).await;
    Poster::new(&server, DOCUMENTARIES)
        .volumes(name, &volumes, 1, hours_ago(4))
        .await;
    documentaries.run_cycle().await.unwrap();

    let release = single_release(&documentaries).await;
    assert_eq!(release.category_id, TV_DOCUMENTARY);
    assert_eq!(release.archive_count, 3);
    let (_, parent) = documentaries
        .db
        .category_with_parent(release.category_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parent.map(|p| p.id), Some(TV));
}

#[tokio::test]
async fn reloaded_rules_pick_up_previously_unmatched_parts() {
    let (indexer, _temp_dir, server) =
        memory_indexer_with(&[MISC_GROUP], |config| config.postprocess.min_archives = 0).await;
    let mut poster = Poster::new(&server, MISC_GROUP);

    poster
        .segment("[GRP] Odd Posting 2020 [full] yEnc (1/1)", hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.unmatched, 1);
    assert_no_releases(&indexer).await;

    // Without a new rule the part stays out of the queue
    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.parts_seen, 0);

    indexer
        .db
        .insert_regex(&NewRegex {
            group_name: "*",
            pattern: r"^\[GRP\] (?P<name>.+?) \[full\]",
            ordinal: 50,
            category_id: None,
            description: Some("GRP postings"),
        })
        .await
        .unwrap();
    indexer.reload_rules().await.unwrap();

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.assembly.parts_assembled, 1);
    assert_eq!(stats.promotion.created, 1);
    assert_eq!(single_release(&indexer).await.name, "Odd Posting 2020");
}

#[tokio::test]
async fn blacklisted_subjects_never_reach_the_store() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);

    indexer
        .db
        .insert_blacklist(r"^alt\.binaries\.teevee$", "passworded", Some("no passworded posts"))
        .await
        .unwrap();
    let malformed = indexer
        .db
        .insert_blacklist(".*", "(unclosed", None)
        .await
        .unwrap();

    poster
        .segment(r#"[1/1] - "Show.S01E02.PASSWORDED.rar" yEnc (1/1)"#, hours_ago(4))
        .await;
    poster
        .segment(r#"[1/1] - "Show.S01E03.rar" yEnc (1/1)"#, hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.blacklisted, 1);
    assert_eq!(stats.scan.segments, 1);

    let release = single_release(&indexer).await;
    assert_eq!(release.search_name, "Show S01E03");

    let active = indexer.db.active_blacklists().await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(active.iter().all(|rule| rule.id != malformed));
}

#[tokio::test]
async fn failing_block_is_skipped_and_reported() {
    let (indexer, _temp_dir, server) = memory_indexer_with(&[TEEVEE], |config| {
        config.scan.message_scan_limit = 2;
        config.scan.block_retries = 2;
    })
    .await;
    let mut poster = Poster::new(&server, TEEVEE);
    let mut events = indexer.subscribe();

    poster.file(r#"[1/1] - "Lost.Block.rar""#, 2, hours_ago(4)).await;
    poster.file(r#"[1/1] - "Kept.Block.rar""#, 2, hours_ago(4)).await;
    // First request plus two retries, all failing
    server.fail_block(TEEVEE, 1, 3).await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.failed_blocks, 1);
    assert_eq!(stats.failed_groups, 0);
    assert_eq!(stats.promotion.created, 1);
    assert_eq!(single_release(&indexer).await.name, "Kept.Block");

    let skipped = wait_for_event(&mut events, Duration::from_secs(1), |event| {
        matches!(event, Event::BlockSkipped { .. })
    })
    .await;
    match skipped {
        Some(Event::BlockSkipped { group, start, end, .. }) => {
            assert_eq!(group, TEEVEE);
            assert_eq!((start, end), (1, 2));
        }
        other => panic!("expected BlockSkipped, got {:?}", other),
    }

    // The skipped range counts as scanned
    let group = indexer.db.get_group(TEEVEE).await.unwrap().unwrap();
    assert_eq!(group.last_article, Some(4));
}

#[tokio::test]
async fn block_recovering_on_the_last_retry_is_not_skipped() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);

    poster.file(r#"[1/1] - "Retry.Block.rar""#, 2, hours_ago(4)).await;
    // Three failures use up the default retries; the fourth request succeeds
    server.fail_block(TEEVEE, 1, 3).await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.failed_blocks, 0);
    assert_eq!(stats.scan.segments, 2);
    assert_eq!(server.overview_requests().await, 4);
    assert_eq!(single_release(&indexer).await.name, "Retry.Block");
}

#[tokio::test]
async fn store_failure_during_scan_aborts_the_cycle() {
    let (indexer, _temp_dir, server) = memory_indexer(&[TEEVEE]).await;
    let mut poster = Poster::new(&server, TEEVEE);

    poster.file(r#"[1/1] - "Stored.Later.rar""#, 2, hours_ago(4)).await;

    sqlx::query(
        "CREATE TRIGGER reject_parts BEFORE INSERT ON parts \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(indexer.db.pool())
    .await
    .unwrap();

    let err = indexer.run_cycle().await.unwrap_err();
    assert!(err.is_store_failure(), "unexpected error: {err}");
    assert_eq!(err.code(), "database_error");
    assert_eq!(indexer.db.count_binaries().await.unwrap(), 0);

    // Nothing was recorded as scanned, so the next cycle reads the block again
    let group = indexer.db.get_group(TEEVEE).await.unwrap().unwrap();
    assert_eq!(group.last_article, None);

    sqlx::query("DROP TRIGGER reject_parts")
        .execute(indexer.db.pool())
        .await
        .unwrap();

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.segments, 2);
    assert_eq!(stats.failed_groups, 0);
    assert_eq!(stats.promotion.created, 1);
}

#[tokio::test]
async fn backfill_extends_coverage_into_the_past() {
    let (indexer, _temp_dir, server) = memory_indexer_with(&[TEEVEE], |config| {
        config.scan.new_group_scan_days = 1.0;
        config.scan.backfill_days = 10.0;
    })
    .await;
    let mut poster = Poster::new(&server, TEEVEE);

    poster
        .volumes("Old.Show.S01E01.720p.HDTV.x264-GRP", &[".rar"], 1, hours_ago(72))
        .await;
    poster
        .volumes("New.Show.S01E01.720p.HDTV.x264-GRP", &[".rar"], 1, hours_ago(4))
        .await;

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.scan.segments, 1, "the first scan covers one day");
    assert_eq!(single_release(&indexer).await.name, "New.Show.S01E01.720p.HDTV.x264-GRP");

    let backfilled = indexer.backfill().await.unwrap();
    assert_eq!(backfilled.segments, 1);

    let stats = indexer.run_cycle().await.unwrap();
    assert_eq!(stats.promotion.created, 1);
    assert_eq!(indexer.db.count_releases().await.unwrap(), 2);

    let group = indexer.db.get_group(TEEVEE).await.unwrap().unwrap();
    assert_eq!(group.first_article, Some(1));
    assert_eq!(group.last_article, Some(2));
}
