//! 写入网关: 乐观更新、合并写入、顺序、失败不回滚

mod common;

use common::*;
use serde_json::{Value, json};
use shared::document::Collection;
use shared::models::StatusColor;
use tableside::{AppContext, AppError};

fn field<'a>(store: &'a shared::document::Snapshot, id: &str, name: &str) -> Option<&'a Value> {
    store
        .documents
        .iter()
        .find(|d| d.id == id)
        .and_then(|d| d.fields.get(name))
}

#[tokio::test]
async fn assign_is_visible_before_remote_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store().await;
    let ctx = start_local(&store, dir.path()).await;

    let write = ctx.assign_check_to_table("check-7", "table-20");

    // 远程提交之前本地已更新
    let check = ctx.check("check-7").unwrap();
    assert_eq!(check.table_id.as_deref(), Some("table-20"));
    let at_table: Vec<u32> = ctx
        .assigned_checks("table-20")
        .iter()
        .map(|c| c.check_number)
        .collect();
    assert_eq!(at_table, vec![7]);

    let receipt = write.await.unwrap();
    assert_eq!(receipt.writes, 1);
    assert!(receipt.commit_time.is_some());

    let checks = store.snapshot(Collection::Checks);
    assert_eq!(field(&checks, "check-7", "tableId"), Some(&json!("table-20")));
    assert_eq!(field(&checks, "check-7", "updatedByDeviceId"), Some(&json!(DEVICE_ID)));
    assert!(field(&checks, "check-7", "updatedAt").is_some_and(Value::is_string));
    // 合并写入保留其他字段
    assert_eq!(field(&checks, "check-7", "checkNumber"), Some(&json!(7)));

    // 订阅快照回来后仍然一致
    settle(&ctx, &store).await;
    let check = ctx.check("check-7").unwrap();
    assert!(check.updated_at.is_some());
    assert_eq!(check.updated_by_device_id, DEVICE_ID);
}

#[tokio::test]
async fn failed_write_keeps_local_change() {
    let dir = tempfile::tempdir().unwrap();
    let (remote, feeds) = ScriptedRemote::new();
    let ctx = AppContext::start(remote.clone(), options(dir.path())).await;
    deliver(&ctx, &feeds, all_check_docs(), all_table_docs()).await;

    remote.fail_commits(true);
    let result = ctx.assign_check_to_table("check-7", "table-20").await;
    assert!(matches!(result, Err(AppError::Client(_))), "{:?}", result);

    // 不回滚
    assert_eq!(
        ctx.check("check-7").unwrap().table_id.as_deref(),
        Some("table-20")
    );
    // 写入失败不是订阅错误
    assert!(ctx.error().is_none());

    // 下一次快照纠正本地状态
    deliver(&ctx, &feeds, all_check_docs(), all_table_docs()).await;
    assert_eq!(ctx.check("check-7").unwrap().table_id, None);
}

#[tokio::test]
async fn writes_commit_in_issue_order() {
    let dir = tempfile::tempdir().unwrap();
    let (remote, feeds) = ScriptedRemote::new();
    let ctx = AppContext::start(remote.clone(), options(dir.path())).await;
    deliver(&ctx, &feeds, all_check_docs(), all_table_docs()).await;

    let first = ctx.assign_check_to_table("check-7", "table-20");
    let second = ctx.set_check_color("check-7", StatusColor::Green);
    let third = ctx.assign_check_to_table("check-7", "table-21");
    drop(first);
    drop(second);
    third.await.unwrap();

    let commits = remote.commits();
    assert_eq!(commits.len(), 3);
    let fields: Vec<Vec<&str>> = commits
        .iter()
        .map(|batch| {
            batch.writes[0]
                .fields
                .keys()
                .map(String::as_str)
                .filter(|k| *k == "tableId" || *k == "color")
                .collect()
        })
        .collect();
    assert_eq!(fields, vec![vec!["tableId"], vec!["color"], vec!["tableId"]]);
    assert_eq!(
        commits[2].writes[0].fields["tableId"],
        shared::document::FieldValue::set("table-21")
    );
}

#[tokio::test]
async fn clear_all_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store().await;
    let ctx = start_local(&store, dir.path()).await;

    ctx.assign_multiple_checks_to_table(["check-1", "check-2", "check-3"], "table-5")
        .await
        .unwrap();
    ctx.set_check_color("check-2", StatusColor::Purple).await.unwrap();
    ctx.set_table_color("table-5", StatusColor::Green).await.unwrap();

    ctx.clear_all_assignments().await.unwrap();
    settle(&ctx, &store).await;
    let once = ctx.snapshot();

    let receipt = ctx.clear_all_assignments().await.unwrap();
    settle(&ctx, &store).await;
    let twice = ctx.snapshot();

    assert_eq!(receipt.writes, 144);
    let assignments = |state: &shared::models::AppState| {
        state
            .checks
            .iter()
            .map(|c| (c.id.clone(), c.table_id.clone(), c.color))
            .collect::<Vec<_>>()
    };
    assert_eq!(assignments(&once), assignments(&twice));
    assert!(twice.checks.iter().all(|c| c.table_id.is_none() && c.color.is_none()));
    assert!(twice.tables.iter().all(|t| t.color.is_none()));

    let tables = store.snapshot(Collection::Tables);
    assert_eq!(field(&tables, "table-5", "color"), Some(&Value::Null));
}

#[tokio::test]
async fn clear_table_only_touches_its_checks() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store().await;
    let ctx = start_local(&store, dir.path()).await;

    ctx.assign_multiple_checks_to_table(["check-3", "check-9"], "table-5")
        .await
        .unwrap();
    ctx.assign_check_to_table("check-12", "table-6").await.unwrap();
    ctx.set_check_color("check-12", StatusColor::Purple).await.unwrap();
    settle(&ctx, &store).await;
    let before = ctx.snapshot();

    let receipt = ctx.clear_table("table-5").await.unwrap();
    assert_eq!(receipt.writes, 2);
    assert!(ctx.assigned_checks("table-5").is_empty());

    let after = ctx.snapshot();
    for (b, a) in before.checks.iter().zip(after.checks.iter()) {
        if b.table_id.as_deref() != Some("table-5") {
            assert_eq!((&b.table_id, b.color), (&a.table_id, a.color), "{}", b.id);
        }
    }
    let check = ctx.check("check-12").unwrap();
    assert_eq!(check.table_id.as_deref(), Some("table-6"));
    assert_eq!(check.color, Some(StatusColor::Purple));
}

#[tokio::test]
async fn empty_batches_resolve_without_commit() {
    let dir = tempfile::tempdir().unwrap();
    let (remote, feeds) = ScriptedRemote::new();
    let ctx = AppContext::start(remote.clone(), options(dir.path())).await;
    deliver(&ctx, &feeds, all_check_docs(), all_table_docs()).await;

    let write = ctx.clear_table("table-5");
    assert_eq!(write.writes(), 0);
    let receipt = write.await.unwrap();
    assert_eq!(receipt.commit_time, None);

    let none: [&str; 0] = [];
    ctx.assign_multiple_checks_to_table(none, "table-5").await.unwrap();
    assert!(remote.commits().is_empty());
}

#[tokio::test]
async fn colors_merge_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store().await;
    let ctx = start_local(&store, dir.path()).await;

    ctx.assign_check_to_table("check-7", "table-20").await.unwrap();
    ctx.set_check_color("check-7", StatusColor::Purple).await.unwrap();
    let checks = store.snapshot(Collection::Checks);
    assert_eq!(field(&checks, "check-7", "color"), Some(&json!("purple")));
    assert_eq!(field(&checks, "check-7", "tableId"), Some(&json!("table-20")));

    let write = ctx.clear_check_color("check-7");
    assert_eq!(ctx.check("check-7").unwrap().color, None);
    write.await.unwrap();
    let checks = store.snapshot(Collection::Checks);
    assert_eq!(field(&checks, "check-7", "color"), Some(&Value::Null));

    let write = ctx.set_table_color("table-20", StatusColor::Green);
    assert_eq!(ctx.table("table-20").unwrap().color, Some(StatusColor::Green));
    write.await.unwrap();

    let write = ctx.clear_table_color("table-20");
    assert_eq!(ctx.table("table-20").unwrap().color, None);
    write.await.unwrap();

    settle(&ctx, &store).await;
    assert_eq!(ctx.table("table-20").unwrap().color, None);
    assert_eq!(ctx.check("check-7").unwrap().table_id.as_deref(), Some("table-20"));
}

#[tokio::test]
async fn seed_provision_is_idempotent_and_preserves_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store().await;
    let ctx = start_local(&store, dir.path()).await;

    ctx.assign_check_to_table("check-7", "table-20").await.unwrap();
    let receipt = ctx.seed_provision().await.unwrap();
    assert_eq!(receipt.writes, 144);

    let checks = store.snapshot(Collection::Checks);
    assert_eq!(checks.len(), 100);
    assert_eq!(field(&checks, "check-7", "tableId"), Some(&json!("table-20")));
    assert_eq!(store.snapshot(Collection::Tables).len(), 44);
}

#[tokio::test]
async fn writes_reach_other_devices() {
    let store = seeded_store().await;
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = start_local(&store, dir_a.path()).await;
    let b = start_local(&store, dir_b.path()).await;

    a.assign_check_to_table("check-7", "table-20").await.unwrap();
    wait_for(&b, |b| {
        b.check("check-7")
            .is_some_and(|c| c.is_assigned_to("table-20"))
    })
    .await;
}
