use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const FAN_ID: &str = "fan_id";
pub const CLUSTER: &str = "cluster_marketing";
pub const LOCALITY: &str = "localidad";
pub const CHANNEL: &str = "canal";

pub const AGE: &str = "edad";
pub const APP_VISITS: &str = "visitas_app";
pub const SOCIAL_INTERACTIONS: &str = "interacciones_redes";
pub const NEWSLETTER_CLICK_RATE: &str = "clickrate_newsletter";
pub const TOTAL_PURCHASES: &str = "compras_total";
pub const EVENT_PARTICIPATION: &str = "participacion_eventos";
pub const TOTAL_SPEND: &str = "gasto_total";

/// Numeric fan metrics, in display order.
pub const FAN_METRICS: [&str; 7] = [
    AGE,
    APP_VISITS,
    SOCIAL_INTERACTIONS,
    NEWSLETTER_CLICK_RATE,
    TOTAL_PURCHASES,
    EVENT_PARTICIPATION,
    TOTAL_SPEND,
];

/// Categorical fan columns offered as filters and colour keys.
pub const CATEGORICAL_COLUMNS: [&str; 3] = [CLUSTER, CHANNEL, LOCALITY];

/// Human-readable label for a column name. Unknown names are returned as-is.
pub fn column_label(name: &str) -> &str {
    match name {
        FAN_ID => "Fan",
        CLUSTER => "Cluster",
        LOCALITY => "Locality",
        CHANNEL => "Channel",
        AGE => "Age",
        APP_VISITS => "App visits",
        SOCIAL_INTERACTIONS => "Social interactions",
        NEWSLETTER_CLICK_RATE => "Newsletter click rate",
        TOTAL_PURCHASES => "Total purchases",
        EVENT_PARTICIPATION => "Event participation",
        TOTAL_SPEND => "Total spend (€)",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single attribute looked up by name
// ---------------------------------------------------------------------------

/// A dynamically-typed attribute value.
/// Used as a `BTreeSet` key for filters and colour maps, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Null,
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// The numeric payload, if this is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FanRecord – one row of the fan table
// ---------------------------------------------------------------------------

/// One fan. Every field is required; field names on disk are the Spanish
/// column headers of the marketing export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanRecord {
    #[serde(rename = "fan_id")]
    pub fan_id: String,
    #[serde(rename = "edad")]
    pub age: f64,
    #[serde(rename = "localidad")]
    pub locality: String,
    #[serde(rename = "canal")]
    pub channel: String,
    #[serde(rename = "visitas_app")]
    pub app_visits: f64,
    #[serde(rename = "interacciones_redes")]
    pub social_interactions: f64,
    #[serde(rename = "clickrate_newsletter")]
    pub newsletter_click_rate: f64,
    #[serde(rename = "compras_total")]
    pub total_purchases: f64,
    #[serde(rename = "participacion_eventos")]
    pub event_participation: f64,
    #[serde(rename = "gasto_total")]
    pub total_spend: f64,
    #[serde(rename = "cluster_marketing")]
    pub cluster: String,
}

impl FanRecord {
    /// Value of a numeric metric by column name.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        let v = match name {
            AGE => self.age,
            APP_VISITS => self.app_visits,
            SOCIAL_INTERACTIONS => self.social_interactions,
            NEWSLETTER_CLICK_RATE => self.newsletter_click_rate,
            TOTAL_PURCHASES => self.total_purchases,
            EVENT_PARTICIPATION => self.event_participation,
            TOTAL_SPEND => self.total_spend,
            _ => return None,
        };
        Some(v)
    }

    /// Any attribute by column name; categorical columns answer `Text`.
    pub fn attribute(&self, name: &str) -> Option<CellValue> {
        match name {
            FAN_ID => Some(CellValue::Text(self.fan_id.clone())),
            CLUSTER => Some(CellValue::Text(self.cluster.clone())),
            LOCALITY => Some(CellValue::Text(self.locality.clone())),
            CHANNEL => Some(CellValue::Text(self.channel.clone())),
            other => self.numeric(other).map(CellValue::Number),
        }
    }
}

// ---------------------------------------------------------------------------
// FanDataset – the complete loaded fan table
// ---------------------------------------------------------------------------

/// The full parsed fan table with pre-computed categorical indices.
#[derive(Debug, Clone)]
pub struct FanDataset {
    /// All fans (rows), in file order.
    pub fans: Vec<FanRecord>,
    /// Categorical columns available for filtering and colouring.
    pub column_names: Vec<String>,
    /// For each categorical column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl FanDataset {
    /// Build categorical indices from the loaded fans.
    pub fn from_fans(fans: Vec<FanRecord>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();
        for col in CATEGORICAL_COLUMNS {
            let values = unique_values.entry(col.to_string()).or_default();
            for fan in &fans {
                if let Some(v) = fan.attribute(col) {
                    values.insert(v);
                }
            }
        }
        FanDataset {
            fans,
            column_names: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            unique_values,
        }
    }

    /// Number of fans.
    pub fn len(&self) -> usize {
        self.fans.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.fans.is_empty()
    }

    pub fn find(&self, fan_id: &str) -> Option<&FanRecord> {
        self.fans.iter().find(|f| f.fan_id == fan_id)
    }
}

// ---------------------------------------------------------------------------
// ClusterSummary – one row per marketing cluster
// ---------------------------------------------------------------------------

/// Aggregated metrics for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummaryRow {
    pub cluster: String,
    pub values: BTreeMap<String, f64>,
}

/// The cluster summary table. `metric_names` keeps the file's column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterSummary {
    pub metric_names: Vec<String>,
    pub rows: Vec<ClusterSummaryRow>,
}

impl ClusterSummary {
    pub fn clusters(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.cluster.as_str())
    }

    pub fn row(&self, cluster: &str) -> Option<&ClusterSummaryRow> {
        self.rows.iter().find(|r| r.cluster == cluster)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::fan;

    #[test]
    fn categorical_attributes_are_text() {
        let f = fan("F1", "2", 10.0);
        assert_eq!(f.attribute(CLUSTER), Some(CellValue::Text("2".into())));
        assert_eq!(f.attribute(TOTAL_SPEND), Some(CellValue::Number(10.0)));
        assert_eq!(f.attribute("churn"), None);
        assert_eq!(f.numeric(CHANNEL), None);
    }

    #[test]
    fn cell_values_order_null_first() {
        let mut set = BTreeSet::new();
        set.insert(CellValue::Text("b".into()));
        set.insert(CellValue::Number(2.0));
        set.insert(CellValue::Null);
        set.insert(CellValue::Text("a".into()));
        let ordered: Vec<String> = set.iter().map(|v| v.to_string()).collect();
        assert_eq!(ordered, vec!["<null>", "2", "a", "b"]);
    }

    #[test]
    fn nan_is_not_numeric() {
        assert_eq!(CellValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Text("3".into()).as_f64(), None);
    }

    #[test]
    fn dataset_indexes_categorical_columns() {
        let ds = FanDataset::from_fans(vec![fan("a", "1", 1.0), fan("b", "2", 2.0), fan("c", "1", 3.0)]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.unique_values[CLUSTER].len(), 2);
        assert_eq!(ds.unique_values[CHANNEL].len(), 1);
        assert_eq!(ds.find("b").map(|f| f.total_spend), Some(2.0));
    }
}
