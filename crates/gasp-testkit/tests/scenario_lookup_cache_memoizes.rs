//! Scenario: repeated references resolve once per run
//!
//! GREEN when:
//! - many orders naming the same advertiser and trafficker issue one query
//!   per distinct name;
//! - the order looked up by the line-item stage is reused by the
//!   association stage;
//! - a new pipeline starts with an empty cache.

use gasp_admanager::{endpoints, Pipeline};
use gasp_testkit::{order_row, seeded_fake, test_settings, Campaign};

fn five_orders() -> Campaign {
    Campaign {
        orders: (0..5)
            .map(|i| order_row(i + 2, &format!("Order {i}"), "Acme", "Jo Trafficker"))
            .collect(),
        ..Campaign::default()
    }
}

#[tokio::test]
async fn shared_advertiser_is_queried_once() {
    let fake = seeded_fake();
    let report = Pipeline::new(fake.clone(), test_settings())
        .run(&five_orders().source())
        .await
        .unwrap();

    assert_eq!(report.stage("orders").unwrap().created, 5);
    assert_eq!(fake.queries_to(endpoints::COMPANIES), 1);
    assert_eq!(fake.queries_to(endpoints::USERS), 1);
    // 5 rows x 2 lookups, only the first of each went remote
    assert_eq!(report.remote.cache_hits, 8);
}

#[tokio::test]
async fn order_lookup_is_shared_across_stages() {
    let fake = seeded_fake();
    Pipeline::new(fake.clone(), test_settings())
        .run(&gasp_testkit::sample_campaign().source())
        .await
        .unwrap();

    // line-item stage resolves the order; association stage hits the cache.
    // The only other ORDERS query is the orders stage's batched read.
    assert_eq!(fake.queries_to(endpoints::ORDERS), 2);
}

#[tokio::test]
async fn each_pipeline_starts_cold() {
    let fake = seeded_fake();
    for _ in 0..2 {
        Pipeline::new(fake.clone(), test_settings())
            .run(&five_orders().source())
            .await
            .unwrap();
    }
    assert_eq!(fake.queries_to(endpoints::COMPANIES), 2);
}
