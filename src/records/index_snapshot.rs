use serde_json::Value;

/// Advance/decline counts reported alongside an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breadth {
    pub advances: u32,
    pub declines: u32,
    pub unchanged: u32,
}

/// One row of an index-constituents payload.
///
/// The exchange sends most numbers either as JSON numbers or as strings; anything missing or
/// unparseable reads as zero so a partially populated row still renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constituent {
    pub symbol: String,
    pub priority: i64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub last_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub p_change: f64,
    pub total_traded_volume: f64,
    pub year_high: f64,
    pub year_low: f64,
}

impl Constituent {
    pub fn from_value(row: &Value) -> Self {
        Self {
            symbol: text(row, "symbol"),
            priority: number(row, "priority") as i64,
            open: number(row, "open"),
            day_high: number(row, "dayHigh"),
            day_low: number(row, "dayLow"),
            last_price: number(row, "lastPrice"),
            previous_close: number(row, "previousClose"),
            change: number(row, "change"),
            p_change: number(row, "pChange"),
            total_traded_volume: number(row, "totalTradedVolume"),
            year_high: number(row, "yearHigh"),
            year_low: number(row, "yearLow"),
        }
    }
}

/// Read-side view of a stored `equity-stockIndices` snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    pub name: String,
    pub timestamp: String,
    pub breadth: Breadth,
    pub rows: Vec<Constituent>,
}

impl IndexSnapshot {
    pub fn from_value(payload: &Value) -> Self {
        let advance = &payload["advance"];
        Self {
            name: text(payload, "name"),
            timestamp: text(payload, "timestamp"),
            breadth: Breadth {
                advances: number(advance, "advances") as u32,
                declines: number(advance, "declines") as u32,
                unchanged: number(advance, "unchanged") as u32,
            },
            rows: payload["data"]
                .as_array()
                .map(|rows| rows.iter().map(Constituent::from_value).collect())
                .unwrap_or_default(),
        }
    }

    /// The row describing the index itself; the exchange marks it with a non-zero priority.
    pub fn index_row(&self) -> Option<&Constituent> {
        self.rows.iter().find(|row| row.priority != 0)
    }

    pub fn constituents(&self) -> impl Iterator<Item = &Constituent> {
        self.rows.iter().filter(|row| row.priority == 0)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn text(value: &Value, key: &str) -> String {
    value.get(key).map(value_to_string).unwrap_or_default()
}

fn number(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or_default(),
        _ => 0.0,
    }
}
