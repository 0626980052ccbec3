//! Raw deserialization types for the HVW JSON endpoint.
//!
//! The endpoint answers every query with a single-element array wrapping one
//! envelope; which parts of the envelope are populated depends on the query.
//! Field names follow the upstream payload verbatim -- these types are a
//! transport detail and never leave the `hvw` module untransformed.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub content: RawContent,
    #[serde(default)]
    pub menu: Option<RawMenu>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContent {
    #[serde(default)]
    pub classes: Vec<RawClass>,
    #[serde(rename = "futureGames", default)]
    pub future_games: Option<RawGameList>,
    #[serde(default)]
    pub score: Vec<RawScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMenu {
    pub dt: Option<RawWeekSelection>,
}

/// The week selector block: every selectable week date plus the one the
/// endpoint currently considers selected.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWeekSelection {
    /// Week date -> display label. Keys are ISO dates, so the BTreeMap order
    /// is chronological.
    pub list: BTreeMap<String, String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawClass {
    #[serde(rename = "gClassID")]
    pub g_class_id: i64,
    #[serde(rename = "gClassSname")]
    pub g_class_sname: String,
    #[serde(rename = "gClassLname")]
    pub g_class_lname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGameList {
    #[serde(default)]
    pub games: Vec<RawGame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    #[serde(rename = "gID")]
    pub g_id: i64,
    #[serde(rename = "gClassID")]
    pub g_class_id: i64,
    #[serde(rename = "gDate")]
    pub g_date: String,
    #[serde(rename = "gTime")]
    pub g_time: String,
    #[serde(rename = "gHomeTeam")]
    pub g_home_team: String,
    #[serde(rename = "gGuestTeam")]
    pub g_guest_team: String,
    /// Goals are reported as strings and blank until the game was played.
    #[serde(rename = "gHomeGoals", default)]
    pub g_home_goals: Option<String>,
    #[serde(rename = "gGuestGoals", default)]
    pub g_guest_goals: Option<String>,
    #[serde(rename = "gGymnasiumTown", default)]
    pub g_gymnasium_town: String,
    #[serde(rename = "gGymnasiumName", default)]
    pub g_gymnasium_name: String,
    #[serde(rename = "gGymnasiumNo", default)]
    pub g_gymnasium_no: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScore {
    #[serde(rename = "tabPos")]
    pub tab_pos: i32,
    #[serde(rename = "tabTeamname")]
    pub tab_teamname: String,
    #[serde(rename = "numWonGames")]
    pub num_won_games: i32,
    #[serde(rename = "numEqualGames")]
    pub num_equal_games: i32,
    #[serde(rename = "numLostGames")]
    pub num_lost_games: i32,
    #[serde(rename = "numPlayedGames")]
    pub num_played_games: i32,
    #[serde(rename = "numGoalsShot")]
    pub num_goals_shot: i32,
    #[serde(rename = "numGoalsGot")]
    pub num_goals_got: i32,
    #[serde(rename = "pointsPlus")]
    pub points_plus: i32,
}
