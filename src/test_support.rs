use polars::prelude::*;

use crate::loader::DashboardData;

/// Ten transactions: six members totalling 600 AED, four non-members
/// totalling 400 AED. Ages straddle every bucket edge, including 101.
pub(crate) fn sample_data() -> DashboardData {
    let transactions = df!(
        "transaction_id" => ["T01", "T02", "T03", "T04", "T05", "T06", "T07", "T08", "T09", "T10"],
        "date" => [
            "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-03", "2024-01-05",
            "2024-01-06", "2024-01-07", "2024-01-08", "2024-01-09", "2024-01-10",
        ],
        "age" => [22i64, 24, 25, 35, 45, 60, 70, 100, 101, 30],
        "gender" => [
            "Female", "Male", "Female", "Male", "Female",
            "Male", "Female", "Male", "Female", "Male",
        ],
        "location" => [
            "Dubai", "Abu Dhabi", "Sharjah", "Dubai", "Abu Dhabi",
            "Sharjah", "Dubai", "Abu Dhabi", "Sharjah", "Dubai",
        ],
        "category" => [
            "Grocery", "Electronics", "Grocery", "Fashion", "Electronics",
            "Grocery", "Fashion", "Grocery", "Electronics", "Grocery",
        ],
        "total_amount_aed" => [100.0, 150.0, 50.0, 120.0, 80.0, 100.0, 90.0, 110.0, 150.0, 50.0],
        "has_loyalty_card" => [true, true, true, true, true, true, false, false, false, false],
        "card_tier" => [
            Some("Gold"), Some("Silver"), Some("Bronze"), Some("Gold"), Some("Silver"),
            Some("Bronze"), None, None, None, None,
        ],
        "points_earned" => [100.0, 150.0, 50.0, 120.0, 80.0, 100.0, 0.0, 0.0, 0.0, 0.0],
        "points_redeemed" => [10.0, 0.0, 20.0, 0.0, 30.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        "offer_applied" => [
            "True", "False", "False", "True", "False",
            "False", "True", "False", "False", "True",
        ]
    )
    .unwrap();

    let customers = df!(
        "customer_id" => ["C1", "C2"],
        "join_date" => ["2023-03-01", "2023-04-15"]
    )
    .unwrap();

    let ad_budget = df!(
        "month" => ["2024-02", "2024-01", "2024-01", "2024-02"],
        "category" => ["Grocery", "Grocery", "Electronics", "Electronics"],
        "ad_spend_uae_aed" => [1200.0, 1000.0, 800.0, 900.0]
    )
    .unwrap();

    DashboardData::from_raw_frames(transactions, customers, ad_budget).unwrap()
}
