use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roster entry served by `GET /teams/{teamId}/players`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub team_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub jersey_number: Option<u32>,
}

impl Player {
    pub fn display_name(&self) -> String {
        match self.jersey_number {
            Some(number) => format!("#{} {} {}", number, self.first_name, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}
