//! Scenario: invalid rows never reach the platform
//!
//! GREEN when:
//! - duplicate order names, dangling references and malformed fields fail
//!   the run before a single remote query or create;
//! - a malformed targeting token handed straight to the line-item stage
//!   (bypassing the validator) is a ConfigurationError naming the column.

use gasp_admanager::sync::sync_lineitems;
use gasp_admanager::{AdManager, Pipeline, SyncError};
use gasp_rows::{RowSourceError, SheetType, ValidationError};
use gasp_testkit::{
    creative_row, lineitem_row, order_row, sample_campaign, seeded_fake, test_settings,
};

async fn run_expect_validation(campaign: gasp_testkit::Campaign) -> ValidationError {
    let fake = seeded_fake();
    let err = Pipeline::new(fake.clone(), test_settings())
        .run(&campaign.source())
        .await
        .unwrap_err();
    assert_eq!(fake.query_count(), 0, "no remote call before validation passes");
    assert_eq!(fake.create_count(), 0);
    match err {
        SyncError::Rows(RowSourceError::Validation(e)) => e,
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn duplicate_order_names_fail_before_any_remote_call() {
    let mut campaign = sample_campaign();
    campaign
        .orders
        .push(order_row(3, "Spring Sale", "Acme", "Jo Trafficker"));

    let err = run_expect_validation(campaign).await;
    assert!(matches!(
        err,
        ValidationError::Duplicate {
            sheet: SheetType::Order,
            line: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn creative_for_unknown_lineitem_fails_validation() {
    let mut campaign = sample_campaign();
    campaign
        .creatives
        .push(creative_row(4, "Spring Sale", "No Such Item", "X", "<x/>"));

    let err = run_expect_validation(campaign).await;
    assert!(matches!(
        err,
        ValidationError::UnknownReference {
            sheet: SheetType::Creative,
            column: "lineitem_name",
            ..
        }
    ));
}

#[tokio::test]
async fn malformed_token_fails_validation() {
    let mut campaign = sample_campaign();
    campaign.lineitems[1] = lineitem_row(
        3,
        "Spring Sale",
        "SS Leaderboard",
        "728x90",
        "0.5",
        "21700000001",
        &["region"],
    );

    let err = run_expect_validation(campaign).await;
    match err {
        ValidationError::InvalidField { line, column, .. } => {
            assert_eq!(line, 3);
            assert_eq!(column, "targetingKeyValue1");
        }
        other => panic!("expected InvalidField, got {other}"),
    }
}

#[tokio::test]
async fn unvalidated_bad_token_is_configuration_error() {
    let fake = seeded_fake();
    fake.insert(
        gasp_testkit::Collection::Orders,
        serde_json::json!({"name": "O", "advertiserId": 1, "traffickerId": 2}),
    );
    let rows = vec![lineitem_row(
        9,
        "O",
        "L",
        "300x250",
        "1",
        "1",
        &["region=US", "device==mobile"],
    )];

    let mut am = AdManager::new(fake.clone());
    let err = sync_lineitems(&mut am, &test_settings(), &rows)
        .await
        .unwrap_err();

    match err {
        SyncError::Configuration(e) => {
            assert_eq!(e.line, 9);
            assert_eq!(e.column, "targetingKeyValue2");
        }
        other => panic!("expected ConfigurationError, got {other}"),
    }
    assert_eq!(fake.create_count(), 0);
}
