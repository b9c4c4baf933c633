//! CDO clients: FSBid `CDOClients` records translated into TalentMap clients.

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use crate::fsbid::lookup::{into_records, non_blank_at, text_at};
use crate::fsbid::query::{convert_client_query, ClientSearchParams};
use crate::fsbid_client::{build_url, FsbidClient, QueryParams, UpstreamError};

const CLIENTS_PATH: &str = "CDOClients";

const EMPLOYEE: &str = "employee";
const CURRENT_POSITION: [&str; 3] = [EMPLOYEE, "currentAssignment", "currentPosition"];

/// Separator between skill descriptions in CSV exports.
const CSV_SKILL_SEPARATOR: &str = " , ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub id: Option<String>,
    pub name: String,
    pub perdet_seq_number: Option<String>,
    pub grade: Option<String>,
    pub skills: Vec<Skill>,
    pub employee_id: Option<String>,
    pub role_code: Option<String>,
    pub pos_location_code: Option<String>,
    /// `None` when FSBid sent anything other than `Y`/`N`.
    #[serde(rename = "hasHandshake")]
    pub has_handshake: Option<bool>,
}

/// Flattened client row for spreadsheet exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCsvRecord {
    pub id: Option<String>,
    pub name: String,
    pub grade: Option<String>,
    pub skills: String,
    pub employee_id: Option<String>,
    pub role_code: Option<String>,
    pub pos_location_code: Option<String>,
    #[serde(rename = "hasHandshake")]
    pub has_handshake: Option<bool>,
}

/// Maps FSBid's Y/N handshake code to the frontend's tri-state flag.
pub fn fsbid_handshake_to_tmap(hs: Option<&str>) -> Option<bool> {
    match hs {
        Some("Y") => Some(true),
        Some("N") => Some(false),
        _ => None,
    }
}

/// Maps the frontend's handshake flag back to FSBid's Y/N code.
pub fn tmap_handshake_to_fsbid(hs: Option<bool>) -> Option<&'static str> {
    match hs {
        Some(true) => Some("Y"),
        Some(false) => Some("N"),
        None => None,
    }
}

pub fn fsbid_clients_to_talentmap_clients(data: &Value) -> ClientRecord {
    ClientRecord {
        id: employee_text(data, "pert_external_id"),
        name: client_name(data),
        perdet_seq_number: text_at(data, &["perdet_seq_num"]),
        grade: employee_text(data, "per_grade_code"),
        skills: map_skill_codes(data),
        employee_id: employee_text(data, "pert_external_id"),
        role_code: text_at(data, &["rl_cd"]),
        pos_location_code: position_location(data),
        has_handshake: handshake(data),
    }
}

pub fn fsbid_clients_to_talentmap_clients_for_csv(data: &Value) -> ClientCsvRecord {
    ClientCsvRecord {
        id: employee_text(data, "pert_external_id"),
        name: client_name(data),
        grade: employee_text(data, "per_grade_code"),
        skills: map_skill_codes_for_csv(data).join(CSV_SKILL_SEPARATOR),
        employee_id: employee_text(data, "pert_external_id"),
        role_code: text_at(data, &["rl_cd"]),
        pos_location_code: position_location(data),
        has_handshake: handshake(data),
    }
}

/// Skill fields come as three positional pairs: `per_skill_code`,
/// `per_skill_2_code`, `per_skill_3_code` (each with a `_desc` twin).
const SKILL_FIELD_PREFIXES: [&str; 3] = ["per_skill", "per_skill_2", "per_skill_3"];

fn map_skill_codes(data: &Value) -> Vec<Skill> {
    SKILL_FIELD_PREFIXES
        .iter()
        .filter_map(|prefix| {
            let code_field = format!("{prefix}_code");
            let desc_field = format!("{prefix}_code_desc");
            let code = non_blank_at(data, &[EMPLOYEE, code_field.as_str()])?;
            Some(Skill {
                code,
                description: non_blank_at(data, &[EMPLOYEE, desc_field.as_str()]),
            })
        })
        .collect()
}

fn map_skill_codes_for_csv(data: &Value) -> Vec<String> {
    SKILL_FIELD_PREFIXES
        .iter()
        .filter_map(|prefix| {
            let desc_field = format!("{prefix}_code_desc");
            non_blank_at(data, &[EMPLOYEE, desc_field.as_str()])
        })
        .collect()
}

fn employee_text(data: &Value, field: &str) -> Option<String> {
    text_at(data, &[EMPLOYEE, field])
}

fn client_name(data: &Value) -> String {
    [
        non_blank_at(data, &[EMPLOYEE, "per_first_name"]),
        non_blank_at(data, &[EMPLOYEE, "per_last_name"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

fn position_location(data: &Value) -> Option<String> {
    let mut path = CURRENT_POSITION.to_vec();
    path.push("pos_location_code");
    text_at(data, &path)
}

fn handshake(data: &Value) -> Option<bool> {
    fsbid_handshake_to_tmap(text_at(data, &["hs_cd"]).as_deref())
}

// ────────────────────────────────────────────────────────────────────────────
// Upstream calls
// ────────────────────────────────────────────────────────────────────────────

/// Raw client records visible to the CDO identified by `ad_id`.
async fn fetch_clients(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    ad_id: &str,
    filters: QueryParams,
) -> Result<Vec<Value>, UpstreamError> {
    let mut params = QueryParams::new();
    params.push("request_params.ad_id", ad_id);
    for (key, value) in filters.pairs() {
        params.push(key.as_str(), value.as_str());
    }
    let url = build_url(root, CLIENTS_PATH, &params)?;
    let data = fsbid.call(Method::GET, url, jwt).await?;
    Ok(into_records(data))
}

/// Clients of the calling CDO matching the frontend filters.
pub async fn search_clients(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    ad_id: &str,
    query: &ClientSearchParams,
) -> Result<Vec<ClientRecord>, UpstreamError> {
    let records = fetch_clients(fsbid, root, jwt, ad_id, convert_client_query(query)).await?;
    Ok(records
        .iter()
        .map(fsbid_clients_to_talentmap_clients)
        .collect())
}

/// Same search as [`search_clients`], shaped for the CSV export.
pub async fn search_clients_for_csv(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    ad_id: &str,
    query: &ClientSearchParams,
) -> Result<Vec<ClientCsvRecord>, UpstreamError> {
    let records = fetch_clients(fsbid, root, jwt, ad_id, convert_client_query(query)).await?;
    Ok(records
        .iter()
        .map(fsbid_clients_to_talentmap_clients_for_csv)
        .collect())
}

/// A single client of the calling CDO, or `None` if FSBid has no such client.
pub async fn single_client(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    ad_id: &str,
    perdet_seq_num: &str,
) -> Result<Option<ClientRecord>, UpstreamError> {
    let mut filters = QueryParams::new();
    filters.push("request_params.perdet_seq_num", perdet_seq_num);
    let records = fetch_clients(fsbid, root, jwt, ad_id, filters).await?;
    Ok(records.first().map(fsbid_clients_to_talentmap_clients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "perdet_seq_num": 4,
            "rl_cd": "FS",
            "hs_cd": "Y",
            "employee": {
                "pert_external_id": "6000001",
                "per_first_name": "Jenny",
                "per_last_name": "Townpost",
                "per_grade_code": "08",
                "per_skill_code": "2010",
                "per_skill_code_desc": "MANAGEMENT OFFICER",
                "per_skill_2_code": null,
                "per_skill_3_code": "2880",
                "per_skill_3_code_desc": "CONSULAR",
                "currentAssignment": {
                    "currentPosition": { "pos_location_code": "110010001" }
                }
            }
        })
    }

    #[test]
    fn test_translates_full_record() {
        let client = fsbid_clients_to_talentmap_clients(&full_record());
        assert_eq!(client.id.as_deref(), Some("6000001"));
        assert_eq!(client.name, "Jenny Townpost");
        assert_eq!(client.perdet_seq_number.as_deref(), Some("4"));
        assert_eq!(client.grade.as_deref(), Some("08"));
        assert_eq!(client.employee_id.as_deref(), Some("6000001"));
        assert_eq!(client.role_code.as_deref(), Some("FS"));
        assert_eq!(client.pos_location_code.as_deref(), Some("110010001"));
        assert_eq!(client.has_handshake, Some(true));
    }

    #[test]
    fn test_skills_keep_order_and_drop_missing_codes() {
        let client = fsbid_clients_to_talentmap_clients(&full_record());
        let codes: Vec<&str> = client.skills.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["2010", "2880"]);
        assert_eq!(
            client.skills[1].description.as_deref(),
            Some("CONSULAR")
        );
    }

    #[test]
    fn test_missing_assignment_block_yields_empty_location() {
        let mut record = full_record();
        record["employee"]
            .as_object_mut()
            .unwrap()
            .remove("currentAssignment");
        let client = fsbid_clients_to_talentmap_clients(&record);
        assert_eq!(client.pos_location_code, None);
        assert_eq!(client.grade.as_deref(), Some("08"));
    }

    #[test]
    fn test_missing_employee_block_is_tolerated() {
        let client = fsbid_clients_to_talentmap_clients(&json!({ "perdet_seq_num": "9" }));
        assert_eq!(client.id, None);
        assert_eq!(client.name, "");
        assert!(client.skills.is_empty());
        assert_eq!(client.perdet_seq_number.as_deref(), Some("9"));
        assert_eq!(client.has_handshake, None);
    }

    #[test]
    fn test_csv_variant_joins_descriptions() {
        let client = fsbid_clients_to_talentmap_clients_for_csv(&full_record());
        assert_eq!(client.skills, "MANAGEMENT OFFICER , CONSULAR");
        assert_eq!(client.pos_location_code.as_deref(), Some("110010001"));
    }

    #[test]
    fn test_serializes_handshake_camel_case() {
        let client = fsbid_clients_to_talentmap_clients(&full_record());
        let value = serde_json::to_value(&client).unwrap();
        assert_eq!(value["hasHandshake"], json!(true));
        assert!(value.get("has_handshake").is_none());
    }

    #[test]
    fn test_handshake_mapping_is_total() {
        assert_eq!(fsbid_handshake_to_tmap(Some("Y")), Some(true));
        assert_eq!(fsbid_handshake_to_tmap(Some("N")), Some(false));
        assert_eq!(fsbid_handshake_to_tmap(Some("y")), None);
        assert_eq!(fsbid_handshake_to_tmap(Some("")), None);
        assert_eq!(fsbid_handshake_to_tmap(None), None);
    }

    #[test]
    fn test_handshake_inverse_on_known_values() {
        for flag in [true, false] {
            let code = tmap_handshake_to_fsbid(Some(flag));
            assert_eq!(fsbid_handshake_to_tmap(code), Some(flag));
        }
        assert_eq!(tmap_handshake_to_fsbid(None), None);
    }
}
