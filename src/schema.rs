/// Column-name constants for the dashboard tables.
/// Single source of truth for loading, filtering, aggregation and rendering.

// ── Transaction columns ─────────────────────────────────────────────────────
pub mod transactions {
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const DATE: &str = "date";
    pub const AGE: &str = "age";
    pub const GENDER: &str = "gender";
    pub const LOCATION: &str = "location";
    pub const CATEGORY: &str = "category";
    pub const TOTAL_AMOUNT_AED: &str = "total_amount_aed";
    pub const HAS_LOYALTY_CARD: &str = "has_loyalty_card";
    pub const CARD_TIER: &str = "card_tier";
    pub const POINTS_EARNED: &str = "points_earned";
    pub const POINTS_REDEEMED: &str = "points_redeemed";
    pub const OFFER_APPLIED: &str = "offer_applied";

    pub const REQUIRED: [&str; 12] = [
        TRANSACTION_ID,
        DATE,
        AGE,
        GENDER,
        LOCATION,
        CATEGORY,
        TOTAL_AMOUNT_AED,
        HAS_LOYALTY_CARD,
        CARD_TIER,
        POINTS_EARNED,
        POINTS_REDEEMED,
        OFFER_APPLIED,
    ];
}

// ── Customer columns ────────────────────────────────────────────────────────
pub mod customers {
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const JOIN_DATE: &str = "join_date";

    pub const REQUIRED: [&str; 2] = [CUSTOMER_ID, JOIN_DATE];
}

// ── Ad budget columns ───────────────────────────────────────────────────────
pub mod ad_budget {
    pub const MONTH: &str = "month";
    pub const CATEGORY: &str = "category";
    pub const AD_SPEND_UAE_AED: &str = "ad_spend_uae_aed";

    pub const REQUIRED: [&str; 3] = [MONTH, CATEGORY, AD_SPEND_UAE_AED];
}

// ── Derived / summary columns ───────────────────────────────────────────────
pub mod summary {
    pub const AGE_GROUP: &str = "age_group";
    pub const LABEL: &str = "label";
    pub const SALES: &str = "sales";
    pub const TRANSACTIONS: &str = "transactions";
    pub const AVG_BASKET: &str = "avg_basket";
    pub const TYPE: &str = "type";
    pub const VALUE: &str = "value";
    pub const NUM_TX: &str = "num_tx";
    pub const AVG_AMOUNT: &str = "avg_amount";
}

// ── Age buckets ─────────────────────────────────────────────────────────────
/// Right-closed bins `(lower, upper]` and their labels.
pub mod age_bins {
    pub const BINS: [(i64, i64, &str); 6] = [
        (15, 24, "16-24"),
        (24, 34, "25-34"),
        (34, 44, "35-44"),
        (44, 54, "45-54"),
        (54, 64, "55-64"),
        (64, 100, "65+"),
    ];
}

// ── Loyalty labels ──────────────────────────────────────────────────────────
pub mod loyalty {
    pub const MEMBERS: &str = "Members";
    pub const NON_MEMBERS: &str = "Non-members";
}
