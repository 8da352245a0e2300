//! # Discount Code Repository
//!
//! Looks up discount rules by store and code, and guards usage redemption.
//!
//! ## Storage Layout
//! ```text
//! discount_codes ──┬── discount_code_products    (applies_to = specific_products)
//!                  ├── discount_code_collections (applies_to = specific_collections)
//!                  └── discount_code_tags        (applies_to = specific_tags)
//!
//! discount_type + percent_bps | amount_minor + bogo columns + volume_tiers JSON  ⇄  DiscountKind
//! ```
//!
//! ## Usage Accounting
//! Pricing never writes. When an order is placed, the order flow calls
//! [`DiscountRepository::redeem`], a single conditional `UPDATE` that both
//! checks and increments `usage_count`. Two concurrent orders can both pass
//! the read-only check in pricing, but only `usage_limit` of them can redeem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use quickshop_core::{
    AppliesTo, Benefit, BogoOffer, BogoReward, CustomerSegment, DiscountKind, DiscountRule,
    DiscountType, Money, VolumeTier,
};

const ENTITY: &str = "DiscountCode";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DiscountCodeRow {
    id: String,
    store_id: String,
    code: String,
    discount_type: String,
    percent_bps: Option<i64>,
    amount_minor: Option<i64>,
    minimum_order_amount: Option<i64>,
    maximum_order_amount: Option<i64>,
    minimum_quantity: Option<i64>,
    maximum_quantity: Option<i64>,
    usage_limit: Option<i64>,
    usage_count: i64,
    applies_to: String,
    customer_segment: Option<String>,
    minimum_orders_count: Option<i64>,
    minimum_lifetime_value: Option<i64>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    days_of_week: Option<String>,
    hour_start: Option<i64>,
    hour_end: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    get_discount_type: Option<String>,
    get_percent_bps: Option<i64>,
    get_amount_minor: Option<i64>,
    applies_to_same_product: bool,
    volume_tiers: Option<String>,
    is_active: bool,
}

/// Stored shape of one volume tier. Percentage tiers carry `percent_bps`,
/// fixed_amount tiers carry `amount_minor`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredVolumeTier {
    quantity: i64,
    discount_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percent_bps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount_minor: Option<i64>,
}

/// Column values that encode a [`DiscountKind`].
#[derive(Debug, Default)]
struct KindColumns {
    discount_type: &'static str,
    percent_bps: Option<i64>,
    amount_minor: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    get_discount_type: Option<&'static str>,
    get_percent_bps: Option<i64>,
    get_amount_minor: Option<i64>,
    applies_to_same_product: bool,
    volume_tiers: Option<String>,
}

fn kind_columns(kind: &DiscountKind) -> DbResult<KindColumns> {
    let columns = match kind {
        DiscountKind::Percentage { bps } => KindColumns {
            percent_bps: Some(*bps as i64),
            ..KindColumns::default()
        },
        DiscountKind::FixedAmount { amount } => KindColumns {
            amount_minor: Some(amount.minor()),
            ..KindColumns::default()
        },
        DiscountKind::FreeShipping => KindColumns::default(),
        DiscountKind::Bogo(offer) => {
            let (get_type, get_bps, get_amount) = match offer.reward {
                BogoReward::Free => ("free", None, None),
                BogoReward::Percentage { bps } => ("percentage", Some(bps as i64), None),
                BogoReward::FixedAmount { amount } => ("fixed_amount", None, Some(amount.minor())),
            };
            KindColumns {
                buy_quantity: Some(offer.buy_quantity as i64),
                get_quantity: Some(offer.get_quantity as i64),
                get_discount_type: Some(get_type),
                get_percent_bps: get_bps,
                get_amount_minor: get_amount,
                applies_to_same_product: offer.same_product,
                ..KindColumns::default()
            }
        }
        DiscountKind::Volume { tiers } => {
            let stored: Vec<StoredVolumeTier> = tiers
                .iter()
                .map(|tier| {
                    let (discount_type, percent_bps, amount_minor) = match tier.benefit {
                        Benefit::Percentage { bps } => ("percentage", Some(bps as i64), None),
                        Benefit::FixedAmount { amount } => {
                            ("fixed_amount", None, Some(amount.minor()))
                        }
                    };
                    StoredVolumeTier {
                        quantity: tier.min_quantity,
                        discount_type: discount_type.to_string(),
                        percent_bps,
                        amount_minor,
                    }
                })
                .collect();
            let json = serde_json::to_string(&stored)
                .map_err(|e| DbError::Internal(format!("encode volume_tiers: {e}")))?;
            KindColumns {
                volume_tiers: Some(json),
                ..KindColumns::default()
            }
        }
    };

    Ok(KindColumns {
        discount_type: kind.discount_type().as_str(),
        applies_to_same_product: match kind {
            DiscountKind::Bogo(offer) => offer.same_product,
            _ => true,
        },
        ..columns
    })
}

fn to_bps(row_id: &str, field: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::invalid_row(ENTITY, row_id, format!("{field} out of range: {value}")))
}

/// BOGO quantities: at least one unit, within `u32`.
fn to_count(row_id: &str, field: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| DbError::invalid_row(ENTITY, row_id, format!("{field} out of range: {value}")))
}

fn to_hour(row_id: &str, field: &str, value: Option<i64>) -> DbResult<Option<u8>> {
    value
        .map(|v| {
            u8::try_from(v)
                .ok()
                .filter(|h| *h <= 24)
                .ok_or_else(|| DbError::invalid_row(ENTITY, row_id, format!("{field} out of range: {v}")))
        })
        .transpose()
}

impl DiscountCodeRow {
    fn required(&self, field: &str, value: Option<i64>) -> DbResult<i64> {
        value.ok_or_else(|| {
            DbError::invalid_row(
                ENTITY,
                &self.id,
                format!("{} rule without {field}", self.discount_type),
            )
        })
    }

    fn kind(&self) -> DbResult<DiscountKind> {
        let discount_type = DiscountType::parse(&self.discount_type).ok_or_else(|| {
            DbError::invalid_row(
                ENTITY,
                &self.id,
                format!("unknown discount_type '{}'", self.discount_type),
            )
        })?;

        let kind = match discount_type {
            DiscountType::Percentage => DiscountKind::Percentage {
                bps: to_bps(
                    &self.id,
                    "percent_bps",
                    self.required("percent_bps", self.percent_bps)?,
                )?,
            },
            DiscountType::FixedAmount => DiscountKind::FixedAmount {
                amount: Money::from_minor(self.required("amount_minor", self.amount_minor)?),
            },
            DiscountType::FreeShipping => DiscountKind::FreeShipping,
            DiscountType::Bogo => {
                let buy = to_count(
                    &self.id,
                    "buy_quantity",
                    self.required("buy_quantity", self.buy_quantity)?,
                )?;
                let get = to_count(
                    &self.id,
                    "get_quantity",
                    self.required("get_quantity", self.get_quantity)?,
                )?;
                let reward = match self.get_discount_type.as_deref().unwrap_or("free") {
                    "free" => BogoReward::Free,
                    "percentage" => BogoReward::Percentage {
                        bps: to_bps(
                            &self.id,
                            "get_percent_bps",
                            self.required("get_percent_bps", self.get_percent_bps)?,
                        )?,
                    },
                    "fixed_amount" => BogoReward::FixedAmount {
                        amount: Money::from_minor(
                            self.required("get_amount_minor", self.get_amount_minor)?,
                        ),
                    },
                    other => {
                        return Err(DbError::invalid_row(
                            ENTITY,
                            &self.id,
                            format!("unknown get_discount_type '{other}'"),
                        ))
                    }
                };
                DiscountKind::Bogo(BogoOffer {
                    buy_quantity: buy,
                    get_quantity: get,
                    reward,
                    same_product: self.applies_to_same_product,
                })
            }
            DiscountType::Volume => {
                let raw = self.volume_tiers.as_deref().unwrap_or("[]");
                let stored: Vec<StoredVolumeTier> = serde_json::from_str(raw).map_err(|e| {
                    DbError::invalid_row(ENTITY, &self.id, format!("volume_tiers: {e}"))
                })?;
                let tiers = stored
                    .into_iter()
                    .map(|tier| {
                        let benefit = match tier.discount_type.as_str() {
                            "percentage" => Benefit::Percentage {
                                bps: to_bps(
                                    &self.id,
                                    "volume_tiers.percent_bps",
                                    self.required("volume_tiers.percent_bps", tier.percent_bps)?,
                                )?,
                            },
                            "fixed_amount" => Benefit::FixedAmount {
                                amount: Money::from_minor(
                                    self.required("volume_tiers.amount_minor", tier.amount_minor)?,
                                ),
                            },
                            other => {
                                return Err(DbError::invalid_row(
                                    ENTITY,
                                    &self.id,
                                    format!("unknown volume tier type '{other}'"),
                                ))
                            }
                        };
                        Ok(VolumeTier {
                            min_quantity: tier.quantity,
                            benefit,
                        })
                    })
                    .collect::<DbResult<Vec<_>>>()?;
                DiscountKind::Volume { tiers }
            }
        };
        Ok(kind)
    }

    fn into_rule(
        self,
        product_ids: Vec<String>,
        collection_ids: Vec<String>,
        tag_names: Vec<String>,
    ) -> DbResult<DiscountRule> {
        let kind = self.kind()?;

        let applies_to = AppliesTo::parse(&self.applies_to).ok_or_else(|| {
            DbError::invalid_row(
                ENTITY,
                &self.id,
                format!("unknown applies_to '{}'", self.applies_to),
            )
        })?;

        let customer_segment = match self.customer_segment.as_deref() {
            None => None,
            Some(raw) => Some(CustomerSegment::parse(raw).ok_or_else(|| {
                DbError::invalid_row(ENTITY, &self.id, format!("unknown customer_segment '{raw}'"))
            })?),
        };

        let days_of_week: Vec<u8> = match self.days_of_week.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                DbError::invalid_row(ENTITY, &self.id, format!("days_of_week: {e}"))
            })?,
        };

        let hour_start = to_hour(&self.id, "hour_start", self.hour_start)?;
        let hour_end = to_hour(&self.id, "hour_end", self.hour_end)?;

        Ok(DiscountRule {
            id: self.id,
            store_id: self.store_id,
            code: self.code,
            kind,
            is_active: self.is_active,
            minimum_order_amount: self.minimum_order_amount.map(Money::from_minor),
            maximum_order_amount: self.maximum_order_amount.map(Money::from_minor),
            minimum_quantity: self.minimum_quantity,
            maximum_quantity: self.maximum_quantity,
            usage_limit: self.usage_limit,
            usage_count: self.usage_count,
            applies_to,
            product_ids,
            collection_ids,
            tag_names,
            customer_segment,
            minimum_orders_count: self.minimum_orders_count,
            minimum_lifetime_value: self.minimum_lifetime_value.map(Money::from_minor),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            days_of_week,
            hour_start,
            hour_end,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for discount codes.
///
/// ```rust,ignore
/// let repo = db.discounts();
/// let rule = repo.find_by_code("store-1", "SAVE10").await?;
/// ```
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Finds a store's rule by code, case-insensitively, with its targets.
    ///
    /// Inactive rules are returned as-is; the calculator reports them as not
    /// found.
    pub async fn find_by_code(&self, store_id: &str, code: &str) -> DbResult<Option<DiscountRule>> {
        debug!(store_id = %store_id, code = %code, "Looking up discount code");

        let row = sqlx::query_as::<_, DiscountCodeRow>(
            r#"
            SELECT
                id, store_id, code, discount_type, percent_bps, amount_minor,
                minimum_order_amount, maximum_order_amount,
                minimum_quantity, maximum_quantity,
                usage_limit, usage_count, applies_to,
                customer_segment, minimum_orders_count, minimum_lifetime_value,
                starts_at, ends_at, days_of_week, hour_start, hour_end,
                buy_quantity, get_quantity, get_discount_type, get_percent_bps, get_amount_minor,
                applies_to_same_product, volume_tiers, is_active
            FROM discount_codes
            WHERE store_id = ?1 AND code = ?2
            "#,
        )
        .bind(store_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(store_id = %store_id, code = %code, "Discount code not found");
            return Ok(None);
        };

        let product_ids = self
            .targets("SELECT product_id FROM discount_code_products WHERE discount_code_id = ?1 ORDER BY product_id", &row.id)
            .await?;
        let collection_ids = self
            .targets("SELECT collection_id FROM discount_code_collections WHERE discount_code_id = ?1 ORDER BY collection_id", &row.id)
            .await?;
        let tag_names = self
            .targets("SELECT tag_name FROM discount_code_tags WHERE discount_code_id = ?1 ORDER BY tag_name", &row.id)
            .await?;

        row.into_rule(product_ids, collection_ids, tag_names).map(Some)
    }

    async fn targets(&self, sql: &str, discount_code_id: &str) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(sql)
            .bind(discount_code_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Inserts a rule and its targets in one transaction. Returns the row id
    /// (generated when `rule.id` is empty). The code is stored upper-cased.
    pub async fn insert(&self, rule: &DiscountRule) -> DbResult<String> {
        let id = if rule.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            rule.id.clone()
        };
        let code = rule.code.trim().to_ascii_uppercase();
        let columns = kind_columns(&rule.kind)?;
        let days_of_week = if rule.days_of_week.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&rule.days_of_week)
                    .map_err(|e| DbError::Internal(format!("encode days_of_week: {e}")))?,
            )
        };
        let now = Utc::now();

        debug!(id = %id, store_id = %rule.store_id, code = %code, "Inserting discount code");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO discount_codes (
                id, store_id, code, discount_type, percent_bps, amount_minor,
                minimum_order_amount, maximum_order_amount,
                minimum_quantity, maximum_quantity,
                usage_limit, usage_count, applies_to,
                customer_segment, minimum_orders_count, minimum_lifetime_value,
                starts_at, ends_at, days_of_week, hour_start, hour_end,
                buy_quantity, get_quantity, get_discount_type, get_percent_bps, get_amount_minor,
                applies_to_same_product, volume_tiers, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21,
                ?22, ?23, ?24, ?25, ?26,
                ?27, ?28, ?29,
                ?30, ?30
            )
            "#,
        )
        .bind(&id)
        .bind(&rule.store_id)
        .bind(&code)
        .bind(columns.discount_type)
        .bind(columns.percent_bps)
        .bind(columns.amount_minor)
        .bind(rule.minimum_order_amount.map(|m| m.minor()))
        .bind(rule.maximum_order_amount.map(|m| m.minor()))
        .bind(rule.minimum_quantity)
        .bind(rule.maximum_quantity)
        .bind(rule.usage_limit)
        .bind(rule.usage_count)
        .bind(rule.applies_to.as_str())
        .bind(rule.customer_segment.map(|s| s.as_str()))
        .bind(rule.minimum_orders_count)
        .bind(rule.minimum_lifetime_value.map(|m| m.minor()))
        .bind(rule.starts_at)
        .bind(rule.ends_at)
        .bind(days_of_week)
        .bind(rule.hour_start.map(i64::from))
        .bind(rule.hour_end.map(i64::from))
        .bind(columns.buy_quantity)
        .bind(columns.get_quantity)
        .bind(columns.get_discount_type)
        .bind(columns.get_percent_bps)
        .bind(columns.get_amount_minor)
        .bind(columns.applies_to_same_product)
        .bind(columns.volume_tiers)
        .bind(rule.is_active)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for product_id in &rule.product_ids {
            sqlx::query("INSERT INTO discount_code_products (discount_code_id, product_id) VALUES (?1, ?2)")
                .bind(&id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }
        for collection_id in &rule.collection_ids {
            sqlx::query("INSERT INTO discount_code_collections (discount_code_id, collection_id) VALUES (?1, ?2)")
                .bind(&id)
                .bind(collection_id)
                .execute(&mut *tx)
                .await?;
        }
        for tag_name in &rule.tag_names {
            sqlx::query("INSERT INTO discount_code_tags (discount_code_id, tag_name) VALUES (?1, ?2)")
                .bind(&id)
                .bind(tag_name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(id = %id, code = %code, kind = columns.discount_type, "Discount code created");
        Ok(id)
    }

    /// Records one use of a code if it is active and under its usage limit.
    ///
    /// Check and increment happen in a single statement, so concurrent
    /// orders can never push `usage_count` past `usage_limit`.
    ///
    /// ## Returns
    /// * `Ok(true)` - Use recorded
    /// * `Ok(false)` - Unknown or inactive code, or limit already reached
    pub async fn redeem(&self, store_id: &str, code: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE discount_codes
            SET usage_count = usage_count + 1,
                updated_at = ?3
            WHERE store_id = ?1
              AND code = ?2
              AND is_active = 1
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(store_id)
        .bind(code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let redeemed = result.rows_affected() == 1;
        if redeemed {
            debug!(store_id = %store_id, code = %code, "Discount code redeemed");
        } else {
            warn!(store_id = %store_id, code = %code, "Discount code redemption refused");
        }
        Ok(redeemed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::store::Store;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Store::new("Test Store", "test-store");
        db.stores().insert(&store).await.unwrap();
        (db, store.id)
    }

    #[tokio::test]
    async fn test_round_trip_percentage_with_restrictions() {
        let (db, store_id) = setup().await;

        let mut rule = DiscountRule::new(&store_id, "summer20", DiscountKind::Percentage { bps: 2000 });
        rule.minimum_order_amount = Some(Money::from_minor(5000));
        rule.usage_limit = Some(100);
        rule.applies_to = AppliesTo::SpecificCollections;
        rule.collection_ids = vec!["summer".to_string(), "beach".to_string()];
        rule.customer_segment = Some(CustomerSegment::Vip);
        rule.starts_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        rule.ends_at = Some(Utc.with_ymd_and_hms(2024, 8, 31, 23, 59, 59).unwrap());
        rule.days_of_week = vec![5, 6];
        rule.hour_start = Some(8);
        rule.hour_end = Some(20);

        let id = db.discounts().insert(&rule).await.unwrap();

        let loaded = db
            .discounts()
            .find_by_code(&store_id, "SUMMER20")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.id, id);
        assert_eq!(loaded.code, "SUMMER20");
        assert_eq!(loaded.kind, DiscountKind::Percentage { bps: 2000 });
        assert_eq!(loaded.minimum_order_amount, Some(Money::from_minor(5000)));
        assert_eq!(loaded.usage_limit, Some(100));
        assert_eq!(loaded.applies_to, AppliesTo::SpecificCollections);
        assert_eq!(loaded.collection_ids, vec!["beach".to_string(), "summer".to_string()]);
        assert_eq!(loaded.customer_segment, Some(CustomerSegment::Vip));
        assert_eq!(loaded.starts_at, rule.starts_at);
        assert_eq!(loaded.ends_at, rule.ends_at);
        assert_eq!(loaded.days_of_week, vec![5, 6]);
        assert_eq!(loaded.hour_start, Some(8));
        assert_eq!(loaded.hour_end, Some(20));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive_and_store_scoped() {
        let (db, store_id) = setup().await;
        db.discounts()
            .insert(&DiscountRule::new(&store_id, "WELCOME", DiscountKind::FreeShipping))
            .await
            .unwrap();

        assert!(db.discounts().find_by_code(&store_id, "welcome").await.unwrap().is_some());
        assert!(db.discounts().find_by_code("other-store", "WELCOME").await.unwrap().is_none());
        assert!(db.discounts().find_by_code(&store_id, "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bogo_and_volume_kinds_round_trip() {
        let (db, store_id) = setup().await;

        let bogo = DiscountKind::Bogo(BogoOffer {
            buy_quantity: 2,
            get_quantity: 1,
            reward: BogoReward::Percentage { bps: 5000 },
            same_product: false,
        });
        let volume = DiscountKind::Volume {
            tiers: vec![
                VolumeTier {
                    min_quantity: 3,
                    benefit: Benefit::Percentage { bps: 500 },
                },
                VolumeTier {
                    min_quantity: 10,
                    benefit: Benefit::FixedAmount {
                        amount: Money::from_minor(2500),
                    },
                },
            ],
        };

        db.discounts()
            .insert(&DiscountRule::new(&store_id, "B2G1", bogo.clone()))
            .await
            .unwrap();
        db.discounts()
            .insert(&DiscountRule::new(&store_id, "BULK", volume.clone()))
            .await
            .unwrap();

        let loaded = db.discounts().find_by_code(&store_id, "B2G1").await.unwrap().unwrap();
        assert_eq!(loaded.kind, bogo);
        let loaded = db.discounts().find_by_code(&store_id, "BULK").await.unwrap().unwrap();
        assert_eq!(loaded.kind, volume);
    }

    #[tokio::test]
    async fn test_duplicate_code_in_store_rejected() {
        let (db, store_id) = setup().await;
        let rule = DiscountRule::new(&store_id, "ONCE", DiscountKind::FreeShipping);
        db.discounts().insert(&rule).await.unwrap();

        let err = db
            .discounts()
            .insert(&DiscountRule::new(&store_id, "once", DiscountKind::FreeShipping))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_rule_for_unknown_store_rejected() {
        let (db, _) = setup().await;
        let err = db
            .discounts()
            .insert(&DiscountRule::new("ghost-store", "X", DiscountKind::FreeShipping))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_redeem_respects_usage_limit() {
        let (db, store_id) = setup().await;
        let mut rule = DiscountRule::new(&store_id, "LIMITED", DiscountKind::Percentage { bps: 1000 });
        rule.usage_limit = Some(2);
        db.discounts().insert(&rule).await.unwrap();

        assert!(db.discounts().redeem(&store_id, "LIMITED").await.unwrap());
        assert!(db.discounts().redeem(&store_id, "limited").await.unwrap());
        assert!(!db.discounts().redeem(&store_id, "LIMITED").await.unwrap());

        let loaded = db.discounts().find_by_code(&store_id, "LIMITED").await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_redeem_never_exceeds_limit() {
        let (db, store_id) = setup().await;
        let mut rule = DiscountRule::new(&store_id, "RACE", DiscountKind::Percentage { bps: 1000 });
        rule.usage_limit = Some(3);
        db.discounts().insert(&rule).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let repo = db.discounts();
            let store_id = store_id.clone();
            handles.push(tokio::spawn(async move { repo.redeem(&store_id, "RACE").await }));
        }

        let mut redeemed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 3);

        let loaded = db.discounts().find_by_code(&store_id, "RACE").await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 3);
    }

    #[tokio::test]
    async fn test_redeem_inactive_or_missing_refused() {
        let (db, store_id) = setup().await;
        let mut rule = DiscountRule::new(&store_id, "OFF", DiscountKind::FreeShipping);
        rule.is_active = false;
        db.discounts().insert(&rule).await.unwrap();

        assert!(!db.discounts().redeem(&store_id, "OFF").await.unwrap());
        assert!(!db.discounts().redeem(&store_id, "MISSING").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_row_reported() {
        let (db, store_id) = setup().await;
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO discount_codes (id, store_id, code, discount_type, volume_tiers, created_at, updated_at)
            VALUES ('dc-bad', ?1, 'BAD', 'volume', 'not json', ?2, ?2)
            "#,
        )
        .bind(&store_id)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.discounts().find_by_code(&store_id, "BAD").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidRow { .. }));
    }

    #[tokio::test]
    async fn test_bogo_quantity_out_of_range_reported() {
        let (db, store_id) = setup().await;
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO discount_codes (id, store_id, code, discount_type, buy_quantity, get_quantity, created_at, updated_at)
            VALUES ('dc-huge', ?1, 'HUGE', 'bogo', 5000000000, 1, ?2, ?2)
            "#,
        )
        .bind(&store_id)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.discounts().find_by_code(&store_id, "HUGE").await.unwrap_err();
        assert!(
            matches!(&err, DbError::InvalidRow { reason, .. } if reason.contains("buy_quantity")),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_bogo_with_zero_buy_quantity_refused() {
        let (db, store_id) = setup().await;
        let free_for_all = DiscountKind::Bogo(BogoOffer {
            buy_quantity: 0,
            get_quantity: 1,
            reward: BogoReward::Free,
            same_product: true,
        });

        let err = db
            .discounts()
            .insert(&DiscountRule::new(&store_id, "FREEBIE", free_for_all))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(msg) if msg.contains("CHECK constraint failed")));
        assert!(db.discounts().find_by_code(&store_id, "FREEBIE").await.unwrap().is_none());
    }

    #[test]
    fn test_to_count_bounds() {
        assert_eq!(to_count("dc-1", "buy_quantity", 1).unwrap(), 1);
        assert!(matches!(
            to_count("dc-1", "buy_quantity", 0),
            Err(DbError::InvalidRow { .. })
        ));
        assert!(to_count("dc-1", "get_quantity", -3).is_err());
        assert!(to_count("dc-1", "get_quantity", i64::from(u32::MAX) + 1).is_err());
    }
}
