//! Shared builders for unit tests.

use super::model::FanRecord;

pub fn fan(id: &str, cluster: &str, spend: f64) -> FanRecord {
    FanRecord {
        fan_id: id.to_string(),
        age: 30.0,
        locality: "Madrid".to_string(),
        channel: "app".to_string(),
        app_visits: 10.0,
        social_interactions: 5.0,
        newsletter_click_rate: 0.2,
        total_purchases: 3.0,
        event_participation: 1.0,
        total_spend: spend,
        cluster: cluster.to_string(),
    }
}
