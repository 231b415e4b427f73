// Ledger engine behavior: upsert semantics, locking discipline, listings

use crate::common::test_engine;
use inventory_ledger::core::errors::LedgerError;
use inventory_ledger::core::models::{Identity, MovementKind};
use inventory_ledger::store::{LedgerStore, UserStore};

#[tokio::test]
async fn test_receive_unknown_sku_creates_item_and_movement() {
    let (engine, _store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 10, None)
        .await
        .unwrap();
    assert_eq!(item.sku, "SKU-1");
    assert_eq!(item.name, "Widget");
    assert_eq!(item.quantity, 10);

    let items = engine.list_items().await.unwrap();
    assert_eq!(items.len(), 1);

    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement.kind, MovementKind::Receive);
    assert_eq!(movements[0].movement.quantity, 10);
    assert_eq!(movements[0].movement.item_id, item.id);
}

#[tokio::test]
async fn test_receive_known_sku_merges_instead_of_failing() {
    let (engine, _store) = test_engine();

    let first = engine
        .receive_stock("SKU-1", "Widget", 10, None)
        .await
        .unwrap();
    let second = engine
        .receive_stock("SKU-1", "Widget Mk2", 5, None)
        .await
        .unwrap();

    // Same item, incremented quantity, last write wins on the name.
    assert_eq!(second.id, first.id);
    assert_eq!(second.quantity, 15);
    assert_eq!(second.name, "Widget Mk2");

    let items = engine.list_items().await.unwrap();
    assert_eq!(items.len(), 1);

    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements.len(), 2);
}

#[tokio::test]
async fn test_receive_issue_over_issue_scenario() {
    let (engine, _store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 10, None)
        .await
        .unwrap();
    assert_eq!(item.quantity, 10);

    let item = engine.issue_stock(item.id, 3, None).await.unwrap();
    assert_eq!(item.quantity, 7);

    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements[0].movement.kind, MovementKind::Issue);
    assert_eq!(movements[0].movement.quantity, 3);

    let err = engine.issue_stock(item.id, 100, None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock {
            requested: 100,
            available: 7
        }
    ));

    // Failed issue mutated nothing.
    let items = engine.list_items().await.unwrap();
    assert_eq!(items[0].quantity, 7);
    assert_eq!(engine.list_movements(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_quantity_equals_movement_replay() {
    let (engine, _store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 20, None)
        .await
        .unwrap();
    engine.issue_stock(item.id, 4, None).await.unwrap();
    engine
        .receive_stock("SKU-1", "Widget", 7, None)
        .await
        .unwrap();
    engine.issue_stock(item.id, 9, None).await.unwrap();
    // Over-issue must not disturb the replay sum.
    engine.issue_stock(item.id, 1_000, None).await.unwrap_err();

    let items = engine.list_items().await.unwrap();
    let movements = engine.list_movements(None).await.unwrap();

    let replayed: i64 = movements
        .iter()
        .map(|r| match r.movement.kind {
            MovementKind::Receive => r.movement.quantity,
            MovementKind::Issue => -r.movement.quantity,
        })
        .sum();

    assert_eq!(items[0].quantity, replayed);
    assert!(items[0].quantity >= 0);
    assert_eq!(items[0].quantity, 14);
}

#[tokio::test]
async fn test_list_items_ascending_id() {
    let (engine, _store) = test_engine();

    engine.receive_stock("SKU-B", "Bolt", 1, None).await.unwrap();
    engine.receive_stock("SKU-A", "Anvil", 1, None).await.unwrap();
    engine.receive_stock("SKU-C", "Clamp", 1, None).await.unwrap();

    let ids: Vec<i64> = engine.list_items().await.unwrap().iter().map(|i| i.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_list_movements_descending_and_clamped() {
    let (engine, _store) = test_engine();

    for _ in 0..205 {
        engine.receive_stock("SKU-1", "Widget", 1, None).await.unwrap();
    }

    // Default page size.
    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements.len(), 50);

    // Strictly descending ids, most recent first.
    let ids: Vec<i64> = movements.iter().map(|r| r.movement.id).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(ids[0], 205);

    // Clamped at both ends.
    assert_eq!(engine.list_movements(Some(0)).await.unwrap().len(), 1);
    assert_eq!(engine.list_movements(Some(-5)).await.unwrap().len(), 1);
    assert_eq!(engine.list_movements(Some(2)).await.unwrap().len(), 2);
    assert_eq!(engine.list_movements(Some(10_000)).await.unwrap().len(), 200);
}

#[tokio::test]
async fn test_issue_attribution_joins_username() {
    let (engine, store) = test_engine();

    let user = store.create_user("alice", "hash").await.unwrap();
    let identity = Identity {
        id: user.id,
        username: user.username.clone(),
    };

    let item = engine
        .receive_stock("SKU-1", "Widget", 10, None)
        .await
        .unwrap();
    engine.issue_stock(item.id, 2, Some(&identity)).await.unwrap();
    // Anonymous issue is a valid path and carries no user.
    engine.issue_stock(item.id, 1, None).await.unwrap();

    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements.len(), 3);

    // Most recent first: anonymous issue, attributed issue, receive.
    assert_eq!(movements[0].username, None);
    assert_eq!(movements[0].movement.user_id, None);
    assert_eq!(movements[1].username, Some("alice".to_string()));
    assert_eq!(movements[1].movement.user_id, Some(user.id));
    assert_eq!(movements[2].username, None);
    assert_eq!(movements[2].sku, "SKU-1");
}

#[tokio::test]
async fn test_movement_with_absent_user_lists_without_username() {
    let (engine, store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 5, None)
        .await
        .unwrap();

    // A movement whose user no longer exists must still list, minus the name.
    let mut tx = store.begin().await.unwrap();
    tx.insert_movement(item.id, Some(9_999), MovementKind::Issue, 1)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let movements = engine.list_movements(None).await.unwrap();
    assert_eq!(movements[0].movement.user_id, Some(9_999));
    assert_eq!(movements[0].username, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_issues_exactly_one_succeeds() {
    let (engine, _store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 10, None)
        .await
        .unwrap();

    let a = tokio::spawn({
        let engine = engine.clone();
        async move { engine.issue_stock(item.id, 6, None).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        async move { engine.issue_stock(item.id, 6, None).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LedgerError::InsufficientStock { requested: 6, .. })
    )));

    let items = engine.list_items().await.unwrap();
    assert_eq!(items[0].quantity, 4);

    let movements = engine.list_movements(None).await.unwrap();
    let issues: Vec<_> = movements
        .iter()
        .filter(|r| r.movement.kind == MovementKind::Issue)
        .collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].movement.quantity, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_never_oversell() {
    let (engine, _store) = test_engine();

    let item = engine
        .receive_stock("SKU-1", "Widget", 5, None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.issue_stock(item.id, 1, None).await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientStock { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    // Exactly as many issues as the stock could satisfy.
    assert_eq!(successes, 5);
    assert_eq!(insufficient, 15);

    let items = engine.list_items().await.unwrap();
    assert_eq!(items[0].quantity, 0);

    let movements = engine.list_movements(None).await.unwrap();
    let issued: i64 = movements
        .iter()
        .filter(|r| r.movement.kind == MovementKind::Issue)
        .map(|r| r.movement.quantity)
        .sum();
    assert_eq!(issued, 5);
}
