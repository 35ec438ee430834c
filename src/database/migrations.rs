use sqlx::SqlitePool;

use crate::config::get_config;

/// Runs every migration (CREATE TABLE IF NOT EXISTS + seed default settings).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: customers
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS customers (
            id          TEXT     PRIMARY KEY,
            email       TEXT     NOT NULL UNIQUE,
            name        TEXT     NOT NULL,
            role        TEXT     NOT NULL DEFAULT 'customer'
                                 CHECK(role IN ('customer', 'admin')),
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: memberships
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS memberships (
            customer_id TEXT     PRIMARY KEY REFERENCES customers(id) ON DELETE CASCADE,
            status      TEXT     NOT NULL CHECK(status IN ('active', 'inactive', 'expired')),
            joined_at   DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: product_variants + prices
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS product_variants (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id  INTEGER NOT NULL,
            title       TEXT    NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // min_quantity NULL = base price; max_quantity NULL = open-ended tier
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS prices (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            variant_id        INTEGER NOT NULL REFERENCES product_variants(id) ON DELETE CASCADE,
            currency_code     TEXT    NOT NULL,
            amount            INTEGER NOT NULL CHECK(amount >= 0),
            min_quantity      INTEGER,
            max_quantity      INTEGER,
            compare_at_amount INTEGER
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_prices_variant_currency ON prices(variant_id, currency_code)",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: carts + line_items
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS carts (
            id              TEXT     PRIMARY KEY,
            customer_id     TEXT     REFERENCES customers(id) ON DELETE SET NULL,
            currency_code   TEXT     NOT NULL,
            status          TEXT     NOT NULL DEFAULT 'active'
                                     CHECK(status IN ('active', 'completed')),
            points_redeemed INTEGER,
            points_discount INTEGER,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_carts_customer ON carts(customer_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS line_items (
            id                TEXT     PRIMARY KEY,
            cart_id           TEXT     NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
            variant_id        INTEGER  NOT NULL REFERENCES product_variants(id),
            product_id        INTEGER  NOT NULL,
            title             TEXT     NOT NULL,
            quantity          INTEGER  NOT NULL CHECK(quantity > 0),
            unit_price        INTEGER  NOT NULL CHECK(unit_price >= 0),
            pricing_kind      TEXT     NOT NULL DEFAULT 'regular'
                              CHECK(pricing_kind IN ('regular', 'pwp', 'bulk', 'variant_discount')),
            pwp_rule_id       INTEGER,
            bulk_min_quantity INTEGER,
            bulk_tier_price   INTEGER,
            original_price    INTEGER,
            created_at        DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_line_items_cart ON line_items(cart_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: cart_discounts (one row per applied coupon / membership promo)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cart_discounts (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            cart_id         TEXT     NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
            kind            TEXT     NOT NULL CHECK(kind IN ('coupon', 'membership_promo')),
            adjustment_code TEXT     NOT NULL,
            source_id       INTEGER  NOT NULL,
            code            TEXT,
            name            TEXT     NOT NULL,
            discount_type   TEXT     NOT NULL CHECK(discount_type IN ('percentage', 'fixed')),
            value           INTEGER  NOT NULL,
            amount          INTEGER  NOT NULL CHECK(amount >= 0),
            currency_code   TEXT     NOT NULL,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(cart_id, kind)
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: coupons
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS coupons (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            code          TEXT     NOT NULL UNIQUE,
            name          TEXT     NOT NULL,
            discount_type TEXT     NOT NULL CHECK(discount_type IN ('percentage', 'fixed')),
            value         INTEGER  NOT NULL CHECK(value > 0),
            starts_at     DATETIME,
            ends_at       DATETIME,
            usage_limit   INTEGER,
            usage_count   INTEGER  NOT NULL DEFAULT 0,
            status        TEXT     NOT NULL DEFAULT 'active'
                                   CHECK(status IN ('active', 'inactive')),
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: pwp_rules
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pwp_rules (
            id                 INTEGER  PRIMARY KEY AUTOINCREMENT,
            name               TEXT     NOT NULL,
            trigger_type       TEXT     NOT NULL CHECK(trigger_type IN ('cart_value', 'product')),
            trigger_cart_value INTEGER,
            trigger_product_id INTEGER,
            reward_variant_id  INTEGER  NOT NULL REFERENCES product_variants(id),
            reward_product_id  INTEGER  NOT NULL,
            reward_price       INTEGER  NOT NULL CHECK(reward_price >= 0),
            status             TEXT     NOT NULL DEFAULT 'active'
                                        CHECK(status IN ('active', 'inactive')),
            created_at         DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: membership_promos
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS membership_promos (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            name          TEXT     NOT NULL,
            discount_type TEXT     NOT NULL CHECK(discount_type IN ('percentage', 'fixed')),
            value         INTEGER  NOT NULL CHECK(value > 0),
            min_purchase  INTEGER  NOT NULL DEFAULT 0,
            start_date    DATETIME,
            end_date      DATETIME,
            status        TEXT     NOT NULL DEFAULT 'active'
                                   CHECK(status IN ('active', 'inactive')),
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_membership_promos_status ON membership_promos(status)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: loyalty_tiers
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS loyalty_tiers (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            name              TEXT    NOT NULL UNIQUE,
            min_points        INTEGER NOT NULL DEFAULT 0 CHECK(min_points >= 0),
            points_multiplier REAL    NOT NULL DEFAULT 1 CHECK(points_multiplier > 0)
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: points_balances + points_transactions (append-only ledger)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS points_balances (
            customer_id    TEXT     PRIMARY KEY REFERENCES customers(id) ON DELETE CASCADE,
            balance        INTEGER  NOT NULL DEFAULT 0 CHECK(balance >= 0),
            total_earned   INTEGER  NOT NULL DEFAULT 0,
            total_redeemed INTEGER  NOT NULL DEFAULT 0,
            updated_at     DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS points_transactions (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            customer_id   TEXT     NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
            kind          TEXT     NOT NULL CHECK(kind IN ('earned', 'redeemed', 'admin_adjustment',
                                                          'return_adjustment', 'cancel_adjustment')),
            points        INTEGER  NOT NULL,
            balance_after INTEGER  NOT NULL CHECK(balance_after >= 0),
            reference_id  TEXT,
            description   TEXT     NOT NULL,
            created_by    TEXT,
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_points_tx_customer ON points_transactions(customer_id)",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: orders
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id              TEXT     PRIMARY KEY,
            cart_id         TEXT     NOT NULL UNIQUE REFERENCES carts(id),
            customer_id     TEXT     REFERENCES customers(id) ON DELETE SET NULL,
            currency_code   TEXT     NOT NULL,
            subtotal        INTEGER  NOT NULL,
            discount_total  INTEGER  NOT NULL DEFAULT 0,
            coupon_id       INTEGER  REFERENCES coupons(id) ON DELETE SET NULL,
            coupon_code     TEXT,
            promo_id        INTEGER  REFERENCES membership_promos(id) ON DELETE SET NULL,
            points_redeemed INTEGER  NOT NULL DEFAULT 0,
            points_discount INTEGER  NOT NULL DEFAULT 0,
            total           INTEGER  NOT NULL CHECK(total >= 0),
            points_earned   INTEGER  NOT NULL DEFAULT 0,
            refunded_amount INTEGER  NOT NULL DEFAULT 0,
            earned_reversed INTEGER  NOT NULL DEFAULT 0,
            redeemed_restored INTEGER NOT NULL DEFAULT 0,
            status          TEXT     NOT NULL DEFAULT 'completed'
                            CHECK(status IN ('completed', 'cancelled', 'returned', 'partially_returned')),
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: settings (key-value store)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // ── Seed loyalty defaults (OR IGNORE = never overwrite admin changes) ──
    let loyalty = &get_config().loyalty;
    let default_settings: Vec<(&str, String)> = vec![
        ("points.is_enabled", if loyalty.enabled { "1" } else { "0" }.to_string()),
        ("points.earn_type", loyalty.earn_type.as_str().to_string()),
        ("points.earn_rate", loyalty.earn_rate.to_string()),
        ("points.redemption_rate", loyalty.redemption_rate.to_string()),
        ("points.min_redeem", loyalty.min_redeem_points.to_string()),
        ("points.max_redeem", loyalty.max_redeem_points.to_string()),
    ];

    for (key, value) in default_settings {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    // ═══════════════════════════════════════
    // TABLE: activity_logs (Audit Trail)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id TEXT,
            action      TEXT    NOT NULL, -- 'COUPON_APPLY', 'POINTS_ADJUST', ...
            description TEXT    NOT NULL,
            metadata    TEXT,             -- JSON string for extra data
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
