//! gasp-testkit
//!
//! Shared fixtures for scenario tests: an in-memory ad platform
//! ([`FakeAdManager`]) and row builders for the three sheets.

mod fake_admanager;

pub use fake_admanager::{Collection, FakeAdManager, RecordedCreate, RecordedQuery};

use gasp_admanager::SyncSettings;
use gasp_rows::{columns, MemoryRowSource, Row, SheetType};

pub fn order_row(line: usize, name: &str, advertiser: &str, trafficker: &str) -> Row {
    Row::new(
        line,
        [
            (columns::NAME, name),
            (columns::ADVERTISER_NAME, advertiser),
            (columns::TRAFFICKER_NAME, trafficker),
        ],
    )
}

/// Line-item row; `tokens` fill `targetingKeyValue1..` in order.
pub fn lineitem_row(
    line: usize,
    order: &str,
    name: &str,
    sizes: &str,
    cost: &str,
    ad_units: &str,
    tokens: &[&str],
) -> Row {
    let mut cells: Vec<(String, String)> = vec![
        (columns::ORDER_NAME.into(), order.into()),
        (columns::NAME.into(), name.into()),
        (columns::SIZES.into(), sizes.into()),
        (columns::COST_PER_UNIT.into(), cost.into()),
        (columns::TARGETING_UNIT.into(), ad_units.into()),
    ];
    for (i, t) in tokens.iter().enumerate() {
        cells.push((columns::targeting_key_value(i + 1), (*t).into()));
    }
    Row::new(line, cells)
}

pub fn creative_row(line: usize, order: &str, lineitem: &str, name: &str, snippet: &str) -> Row {
    Row::new(
        line,
        [
            (columns::ORDER_NAME, order),
            (columns::LINEITEM_NAME, lineitem),
            (columns::NAME, name),
            (columns::SNIPPET, snippet),
        ],
    )
}

/// Row sets for one scenario.
#[derive(Debug, Clone, Default)]
pub struct Campaign {
    pub orders: Vec<Row>,
    pub lineitems: Vec<Row>,
    pub creatives: Vec<Row>,
}

impl Campaign {
    pub fn source(&self) -> MemoryRowSource {
        MemoryRowSource::new()
            .with_rows(SheetType::Order, self.orders.clone())
            .with_rows(SheetType::LineItem, self.lineitems.clone())
            .with_rows(SheetType::Creative, self.creatives.clone())
    }
}

/// One order with two line items (one negatively targeted) and a creative
/// per line item.
pub fn sample_campaign() -> Campaign {
    Campaign {
        orders: vec![order_row(2, "Spring Sale", "Acme", "Jo Trafficker")],
        lineitems: vec![
            lineitem_row(
                2,
                "Spring Sale",
                "SS Banner",
                "300x250,336x280",
                "1.25",
                "21700000001",
                &["region=US"],
            ),
            lineitem_row(
                3,
                "Spring Sale",
                "SS Leaderboard",
                "728x90",
                "0.5",
                "21700000001,21700000002",
                &["region!=US", "device=mobile"],
            ),
        ],
        creatives: vec![
            creative_row(2, "Spring Sale", "SS Banner", "SS Banner Tag", "<script>banner</script>"),
            creative_row(
                3,
                "Spring Sale",
                "SS Leaderboard",
                "SS Leaderboard Tag",
                "<script>leaderboard</script>",
            ),
        ],
    }
}

/// Platform state `sample_campaign` resolves against.
pub fn seeded_fake() -> FakeAdManager {
    let fake = FakeAdManager::new();
    fake.seed_company("Acme");
    fake.seed_user("Jo Trafficker");
    let region = fake.seed_targeting_key("region");
    fake.seed_targeting_value(region, "US");
    fake.seed_targeting_value(region, "JP");
    let device = fake.seed_targeting_key("device");
    fake.seed_targeting_value(device, "mobile");
    fake
}

/// No pause between chunks, USD, default chunking.
pub fn test_settings() -> SyncSettings {
    SyncSettings::for_tests("USD")
}
