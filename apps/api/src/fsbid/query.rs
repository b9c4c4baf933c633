//! Query Converter: TalentMap filter names in, FSBid `request_params.*` names out.

use serde::Deserialize;

use crate::fsbid::clients::tmap_handshake_to_fsbid;
use crate::fsbid_client::QueryParams;

/// Frontend sort tokens for client searches and the FSBid columns they sort on.
/// Tokens not listed here are passed through as-is.
const CLIENT_SORT_FIELDS: &[(&str, &str)] = &[
    ("client_name", "per_last_name"),
    ("client_first_name", "per_first_name"),
    ("client_grade", "per_grade_code"),
    ("client_skill", "per_skill_code"),
    ("client_employee_id", "pert_external_id"),
    ("client_role_code", "rl_cd"),
    ("client_location", "pos_location_code"),
    ("client_handshake", "hs_cd"),
];

/// Client search filters as the frontend names them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSearchParams {
    pub hru_id: Option<String>,
    pub rl_cd: Option<String>,
    pub ad_id: Option<String>,
    pub hs_cd: Option<String>,
    pub ordering: Option<String>,
    pub q: Option<String>,
}

/// Converts TalentMap client search filters into FSBid filters.
/// Absent or blank filters are left out entirely.
pub fn convert_client_query(query: &ClientSearchParams) -> QueryParams {
    let mut params = QueryParams::new();
    params
        .push_opt("request_params.hru_id", present(&query.hru_id))
        .push_opt("request_params.rl_cd", present(&query.rl_cd))
        .push_opt("request_params.ad_id", present(&query.ad_id))
        .push_opt(
            "request_params.hasHandshake",
            present(&query.hs_cd).and_then(handshake_param),
        )
        .push_all(
            "request_params.order_by",
            sorting_values(query.ordering.as_deref()),
        )
        .push_opt("request_params.freeText", present(&query.q));
    params
}

/// Converts a comma-separated frontend ordering (`-` prefix = descending) into
/// FSBid's `<column> <direction>` terms, one per sort key.
pub fn sorting_values(ordering: Option<&str>) -> Vec<String> {
    let Some(ordering) = ordering else {
        return Vec::new();
    };

    ordering
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (field, direction) = match token.strip_prefix('-') {
                Some(field) => (field, "desc"),
                None => (token, "asc"),
            };
            let column = CLIENT_SORT_FIELDS
                .iter()
                .find(|(name, _)| *name == field)
                .map_or(field, |(_, column)| *column);
            format!("{column} {direction}")
        })
        .collect()
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepts the frontend's `true`/`false` as well as raw `Y`/`N`.
fn handshake_param(raw: String) -> Option<String> {
    match raw.as_str() {
        "Y" | "N" => Some(raw),
        other => other
            .parse::<bool>()
            .ok()
            .and_then(|flag| tmap_handshake_to_fsbid(Some(flag)))
            .map(str::to_string),
    }
}
