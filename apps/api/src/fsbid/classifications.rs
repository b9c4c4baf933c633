//! Bidder classifications (tracking program entries) kept in the TP API.
//!
//! Every operation answers with the bidder's resulting classification list.
//! An upstream failure is reported as `None` after the client has logged it.

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::error;

use crate::fsbid::lookup::{into_records, text_at};
use crate::fsbid_client::{build_url, FsbidClient, QueryParams};

const BIDDERS_PATH: &str = "bidders";

/// Tracking program entry ids from an FSBid `bidders` payload.
pub fn fsbid_classifications_to_tmap(data: Value) -> Vec<String> {
    into_records(data)
        .iter()
        .filter_map(|entry| text_at(entry, &["te_id"]))
        .collect()
}

pub async fn get_client_classification(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    perdet_seq_num: &str,
) -> Option<Vec<String>> {
    let mut params = QueryParams::new();
    params.push("perdet_seq_num", perdet_seq_num);
    classification_call(fsbid, root, Method::GET, jwt, &params).await
}

pub async fn insert_client_classification(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    perdet_seq_num: &str,
    te_ids: &[String],
) -> Option<Vec<String>> {
    let params = change_params(perdet_seq_num, te_ids);
    classification_call(fsbid, root, Method::POST, jwt, &params).await
}

pub async fn delete_client_classification(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    perdet_seq_num: &str,
    te_ids: &[String],
) -> Option<Vec<String>> {
    let params = change_params(perdet_seq_num, te_ids);
    classification_call(fsbid, root, Method::DELETE, jwt, &params).await
}

fn change_params(perdet_seq_num: &str, te_ids: &[String]) -> QueryParams {
    let mut params = QueryParams::new();
    params
        .push_all("te_id", te_ids.iter().map(String::as_str))
        .push("perdet_seq_num", perdet_seq_num);
    params
}

async fn classification_call(
    fsbid: &FsbidClient,
    root: &Url,
    method: Method,
    jwt: &str,
    params: &QueryParams,
) -> Option<Vec<String>> {
    let url = match build_url(root, BIDDERS_PATH, params) {
        Ok(url) => url,
        Err(e) => {
            error!("Classification call skipped: {e}");
            return None;
        }
    };
    fsbid
        .call(method, url, jwt)
        .await
        .ok()
        .map(fsbid_classifications_to_tmap)
}
