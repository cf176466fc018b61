//! Scenario: a remote failure mid-run, then a rerun
//!
//! GREEN when:
//! - a failing create surfaces as SyncError::Remote and stops later stages;
//! - objects created before the failure stay created;
//! - rerunning after the platform recovers creates only what is missing.

use gasp_admanager::{endpoints, Pipeline, RemoteError, SyncError};
use gasp_testkit::{sample_campaign, seeded_fake, test_settings, Collection};

#[tokio::test]
async fn rerun_after_remote_failure_creates_only_the_rest() {
    let fake = seeded_fake();
    let source = sample_campaign().source();

    fake.fail_on(
        endpoints::CREATE_CREATIVES,
        RemoteError::Api {
            status: Some(503),
            message: "backend unavailable".to_string(),
        },
    );
    let err = Pipeline::new(fake.clone(), test_settings())
        .run(&source)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, SyncError::Remote(RemoteError::Api { status: Some(503), .. })),
        "{err}"
    );
    assert_eq!(fake.entities(Collection::Orders).len(), 1);
    assert_eq!(fake.entities(Collection::LineItems).len(), 2);
    assert!(fake.entities(Collection::Creatives).is_empty());
    assert!(fake.creates_to(endpoints::CREATE_ASSOCIATIONS).is_empty());

    fake.clear_failures();
    fake.reset_log();
    let report = Pipeline::new(fake.clone(), test_settings())
        .run(&source)
        .await
        .unwrap();

    assert_eq!(report.stage("orders").unwrap().created, 0);
    assert_eq!(report.stage("lineitems").unwrap().created, 0);
    assert_eq!(report.stage("creatives").unwrap().created, 2);
    assert_eq!(report.stage("associations").unwrap().created, 2);
    assert_eq!(fake.entities(Collection::Orders).len(), 1);
}
