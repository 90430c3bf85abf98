//! Pack listing.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::Redirect;
use docity_core::DocumentPack;
use serde::Serialize;
use std::collections::BTreeMap;

/// Path of the pack listing.
pub const PACKS_PATH: &str = "/v1/packs";

/// One entry of the pack listing.
#[derive(Debug, Serialize)]
pub struct PackSummary {
    pub name: String,
    pub index_page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub view_path: String,
}

impl From<&DocumentPack> for PackSummary {
    fn from(pack: &DocumentPack) -> Self {
        Self {
            name: pack.name().to_string(),
            index_page: pack.index_page().to_string(),
            description: pack.description().map(str::to_string),
            view_path: pack.view_path(),
        }
    }
}

/// Pack listing response.
#[derive(Debug, Serialize)]
pub struct PacksResponse {
    pub packs: Vec<PackSummary>,
    /// Packs turned down at startup, with reasons.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rejected: BTreeMap<String, Vec<String>>,
}

/// GET /v1/packs
pub async fn list_packs(State(state): State<AppState>) -> Json<PacksResponse> {
    Json(PacksResponse {
        packs: state.registry.iter().map(PackSummary::from).collect(),
        rejected: state.registry.rejected().clone(),
    })
}

/// GET /view and /view/ - there is no page for the bare prefix.
pub async fn view_root() -> Redirect {
    Redirect::to(PACKS_PATH)
}
