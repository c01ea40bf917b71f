use serde::{Deserialize, Serialize};

pub mod frame;
pub use frame::{Cell, Frame, Record};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub team_id: i64,
    pub full_name: String,
    pub abbreviation: String,
    pub nickname: String,
    pub city: String,
    pub state: String,
    pub year_founded: i32,
    pub date_time_processed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub player_id: i64,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_time_processed: String,
}

/// Stats API payload: a list of named result sets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub name: String,
    pub headers: Vec<String>,
    pub row_set: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    pub fn into_frame(self) -> Result<Frame, crate::error::ShapeError> {
        let rows = self
            .row_set
            .iter()
            .map(|row| row.iter().map(Cell::from_json).collect())
            .collect();
        Frame::new(self.headers, rows)
    }
}

/// Warehouse response for a single upsert call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertResponse {
    pub status: u16,
    pub body: String,
}

impl UpsertResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
