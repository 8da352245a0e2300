//! # Seed Data Generator
//!
//! Creates a demo store and a handful of discount codes for local
//! development of the pricing API.
//!
//! ## Usage
//! ```bash
//! cargo run -p quickshop-db --bin seed
//!
//! # Specify database path
//! cargo run -p quickshop-db --bin seed -- --db ./data/quickshop.db
//! ```
//!
//! ## Generated Codes
//! | Code     | Kind                                          |
//! |----------|-----------------------------------------------|
//! | SAVE10   | 10% off, minimum order 20.00                  |
//! | FIFTY    | 50.00 off, limited to 100 uses                |
//! | SHIPFREE | Free shipping                                 |
//! | B2G1     | Buy 2 get 1 free, same product                |
//! | BULK     | 5% off 5+ items, 10% off 10+ items            |
//! | VIPONLY  | 20% off for VIP customers                     |
//! | WEEKEND  | 15% off on Saturdays and Sundays              |
//! | SPRING23 | Expired                                       |

use std::env;

use anyhow::Context;
use chrono::{TimeZone, Utc};
use quickshop_core::{
    Benefit, BogoOffer, BogoReward, CustomerSegment, DiscountKind, DiscountRule, Money, VolumeTier,
};
use quickshop_db::{Database, DbConfig, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_STORE_ID: &str = "demo-store";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./quickshop.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Quickshop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./quickshop.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening database at {db_path}"))?;

    if db.stores().get_by_id(DEMO_STORE_ID).await?.is_some() {
        warn!(store_id = DEMO_STORE_ID, "Demo store already exists, skipping seed");
        return Ok(());
    }

    let mut store = Store::new("Demo Store", "demo-store");
    store.id = DEMO_STORE_ID.to_string();
    db.stores().insert(&store).await.context("inserting demo store")?;

    let rules = demo_rules();
    let count = rules.len();
    for rule in rules {
        db.discounts()
            .insert(&rule)
            .await
            .with_context(|| format!("inserting discount code {}", rule.code))?;
    }

    info!(store_id = DEMO_STORE_ID, codes = count, "Seed complete");
    println!();
    println!("Try it:");
    println!(
        r#"  curl -s localhost:8080/api/v1/cart/calculate -H 'content-type: application/json' \
    -d '{{"storeId":"{DEMO_STORE_ID}","discountCode":"save10","items":[{{"variantId":"v-1","quantity":2,"unitPrice":1500}}]}}'"#
    );

    db.close().await;
    Ok(())
}

fn demo_rules() -> Vec<DiscountRule> {
    let mut save10 = DiscountRule::new(DEMO_STORE_ID, "SAVE10", DiscountKind::Percentage { bps: 1000 });
    save10.minimum_order_amount = Some(Money::from_minor(2000));

    let mut fifty = DiscountRule::new(
        DEMO_STORE_ID,
        "FIFTY",
        DiscountKind::FixedAmount {
            amount: Money::from_minor(5000),
        },
    );
    fifty.usage_limit = Some(100);

    let shipfree = DiscountRule::new(DEMO_STORE_ID, "SHIPFREE", DiscountKind::FreeShipping);

    let b2g1 = DiscountRule::new(
        DEMO_STORE_ID,
        "B2G1",
        DiscountKind::Bogo(BogoOffer {
            buy_quantity: 2,
            get_quantity: 1,
            reward: BogoReward::Free,
            same_product: true,
        }),
    );

    let bulk = DiscountRule::new(
        DEMO_STORE_ID,
        "BULK",
        DiscountKind::Volume {
            tiers: vec![
                VolumeTier {
                    min_quantity: 5,
                    benefit: Benefit::Percentage { bps: 500 },
                },
                VolumeTier {
                    min_quantity: 10,
                    benefit: Benefit::Percentage { bps: 1000 },
                },
            ],
        },
    );

    let mut vip = DiscountRule::new(DEMO_STORE_ID, "VIPONLY", DiscountKind::Percentage { bps: 2000 });
    vip.customer_segment = Some(CustomerSegment::Vip);

    let mut weekend = DiscountRule::new(DEMO_STORE_ID, "WEEKEND", DiscountKind::Percentage { bps: 1500 });
    weekend.days_of_week = vec![0, 6];

    let mut expired = DiscountRule::new(DEMO_STORE_ID, "SPRING23", DiscountKind::Percentage { bps: 2500 });
    expired.starts_at = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).single();
    expired.ends_at = Utc.with_ymd_and_hms(2023, 5, 31, 23, 59, 59).single();

    vec![save10, fifty, shipfree, b2g1, bulk, vip, weekend, expired]
}
