use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use crawlq_core::coordinator::{
    BacklogStore, CoordinatorConfig, ManualClock, PostgresBacklogStore,
    WorkQueueCoordinator, WorkRequest,
};
use crawlq_core::{DomainKey, WorkerId};
use sqlx::PgPool;
use uuid::Uuid;

async fn seed(pool: &PgPool, domain: &str, count: usize) -> Vec<Uuid> {
    let base = Utc::now() - TimeDelta::hours(1);
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO candidate_links (id, url, source, discovered_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(format!("https://{domain}/story/{n}"))
        .bind(domain)
        .bind(base + TimeDelta::seconds(n as i64))
        .execute(pool)
        .await
        .expect("insert candidate");
        ids.push(id);
    }
    ids
}

async fn register_source(pool: &PgPool, host: &str, name: &str) {
    sqlx::query("INSERT INTO sources (host, canonical_name) VALUES ($1, $2)")
        .bind(host)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert source");
}

#[sqlx::test(migrator = "crawlq_core::MIGRATOR")]
async fn verify_accepts_migrated_schema(pool: PgPool) {
    let store = PostgresBacklogStore::new(pool).await;
    assert!(store.is_ok(), "migrated schema should verify: {store:?}");
}

#[sqlx::test(migrations = false)]
async fn verify_rejects_missing_tables(pool: PgPool) {
    let store = PostgresBacklogStore::new_unchecked(pool);
    let err = store.verify().await.expect_err("tables are missing");
    assert!(err.to_string().contains("candidate_links"));
}

#[sqlx::test(migrator = "crawlq_core::MIGRATOR")]
async fn backlog_listing_orders_by_size_then_key(pool: PgPool) {
    seed(&pool, "b.example", 2).await;
    seed(&pool, "a.example", 2).await;
    seed(&pool, "c.example", 4).await;
    let ids = seed(&pool, "d.example", 1).await;
    sqlx::query("UPDATE candidate_links SET status = 'extracted' WHERE id = $1")
        .bind(ids[0])
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresBacklogStore::new_unchecked(pool);
    let backlog = store.domains_with_backlog().await.unwrap();

    let listed: Vec<(&str, i64)> = backlog
        .iter()
        .map(|entry| (entry.domain.as_str(), entry.pending))
        .collect();
    assert_eq!(listed, [("c.example", 4), ("a.example", 2), ("b.example", 2)]);
}

#[sqlx::test(migrator = "crawlq_core::MIGRATOR")]
async fn candidates_interleave_oldest_first(pool: PgPool) {
    register_source(&pool, "a.example", "The A Gazette").await;
    let a = seed(&pool, "a.example", 3).await;
    let b = seed(&pool, "b.example", 3).await;

    let store = PostgresBacklogStore::new_unchecked(pool);
    let items = store
        .claim_candidates(&[DomainKey::from("a.example"), DomainKey::from("b.example")], 4)
        .await
        .unwrap();

    let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(
        ids,
        [a[0].to_string(), b[0].to_string(), a[1].to_string(), b[1].to_string()]
    );
    assert_eq!(items[0].canonical_name, "The A Gazette");
    assert_eq!(items[1].canonical_name, "b.example");
}

#[sqlx::test(migrator = "crawlq_core::MIGRATOR")]
async fn totals_count_pending_rows(pool: PgPool) {
    seed(&pool, "a.example", 3).await;
    let ids = seed(&pool, "b.example", 1).await;
    sqlx::query("UPDATE candidate_links SET status = 'failed' WHERE id = $1")
        .bind(ids[0])
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresBacklogStore::new_unchecked(pool);
    let totals = store.totals().await.unwrap();
    assert_eq!(totals.total_available, 3);
    assert_eq!(totals.domains_available, 1);
}

#[sqlx::test(migrator = "crawlq_core::MIGRATOR")]
async fn coordinator_draws_disjoint_batches_from_postgres(pool: PgPool) {
    for n in 0..6 {
        seed(&pool, &format!("site{n}.example"), 10).await;
    }
    let store = Arc::new(PostgresBacklogStore::new(pool).await.unwrap());
    let clock = ManualClock::new(
        DateTime::from_timestamp(1_750_000_000, 0).expect("valid timestamp"),
    );
    let coordinator = Arc::new(WorkQueueCoordinator::with_clock(
        CoordinatorConfig::default(),
        store,
        Arc::new(clock),
    ));

    let requests = (0..8).map(|n| {
        let coordinator = Arc::clone(&coordinator);
        async move {
            coordinator
                .request_work(WorkRequest {
                    worker_id: WorkerId::from(format!("worker-{n}")),
                    batch_size: 50,
                    max_per_domain: 3,
                })
                .await
        }
    });

    let mut seen = HashSet::new();
    for batch in futures::future::join_all(requests).await {
        for item in batch.expect("batch").items {
            assert!(seen.insert(item.id.clone()), "duplicate item {}", item.id);
        }
    }
    assert_eq!(seen.len(), 6 * 3);
}
