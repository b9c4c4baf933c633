//! Bid lists: FSBid `bids` records for a bidder, and the bid mutations.

use std::fmt;

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use crate::fsbid::lookup::{into_records, text_at};
use crate::fsbid_client::{build_url, FsbidClient, QueryParams, UpstreamError};

const BIDS_PATH: &str = "bids";

/// Bid status code FSBid uses for a submitted bid.
const SUBMITTED_STATUS_CODE: &str = "A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Draft,
    Submitted,
    HandshakeOffered,
    Closed,
    Paneled,
    Deleted,
    Unknown,
}

impl BidStatus {
    /// Maps FSBid's `bs_cd`, promoting submitted bids with an offered handshake.
    pub fn from_fsbid(code: Option<&str>, handshake_offered: Option<&str>) -> Self {
        match code {
            Some("W") => BidStatus::Draft,
            Some("A") if handshake_offered == Some("Y") => BidStatus::HandshakeOffered,
            Some("A") => BidStatus::Submitted,
            Some("C") => BidStatus::Closed,
            Some("P") => BidStatus::Paneled,
            Some("D") => BidStatus::Deleted,
            _ => BidStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BidStatus::Draft => "Draft",
            BidStatus::Submitted => "Submitted",
            BidStatus::HandshakeOffered => "Handshake Offered",
            BidStatus::Closed => "Closed",
            BidStatus::Paneled => "Paneled",
            BidStatus::Deleted => "Deleted",
            BidStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidLocation {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidPost {
    pub code: Option<String>,
    pub location: BidLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidPosition {
    pub id: Option<String>,
    pub position_number: Option<String>,
    pub status: Option<String>,
    pub grade: Option<String>,
    pub skill: Option<String>,
    pub bureau: Option<String>,
    pub title: Option<String>,
    pub create_date: Option<String>,
    pub update_date: Option<String>,
    pub post: BidPost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidRecord {
    pub emp_id: Option<String>,
    pub bidcycle: Option<String>,
    pub position: BidPosition,
    pub status: BidStatus,
    pub can_delete: bool,
    pub submitted_date: Option<String>,
    pub handshake_offered_date: Option<String>,
    pub update_date: Option<String>,
}

pub fn fsbid_bid_to_talentmap_bid(data: &Value) -> BidRecord {
    let field = |name: &str| text_at(data, &[name]);
    let status = BidStatus::from_fsbid(
        field("bs_cd").as_deref(),
        field("ubw_hndshk_offrd_flg").as_deref(),
    );

    BidRecord {
        emp_id: field("perdet_seq_num"),
        bidcycle: field("cycle_nm_txt"),
        position: BidPosition {
            id: field("cp_id"),
            position_number: field("pos_num_text"),
            status: field("cp_status"),
            grade: field("pos_grade_code"),
            skill: field("pos_skill_desc"),
            bureau: field("pos_bureau_short_desc"),
            title: field("ptitle"),
            create_date: field("cp_created_dt"),
            update_date: field("cp_updated_dt"),
            post: BidPost {
                code: field("pos_location_code"),
                location: BidLocation {
                    city: field("location_city"),
                    country: field("location_country"),
                },
            },
        },
        status,
        can_delete: status == BidStatus::Draft,
        submitted_date: field("ubw_submit_dt"),
        handshake_offered_date: field("ubw_hndshk_offrd_dt"),
        update_date: field("bid_updated_dt"),
    }
}

/// Deleted bids linger upstream with `bs_cd = D` or `delete_ind = Y`.
fn is_live(data: &Value) -> bool {
    text_at(data, &["bs_cd"]).as_deref() != Some("D")
        && text_at(data, &["delete_ind"]).as_deref() != Some("Y")
}

fn bid_params(emp_id: &str, position_id: Option<&str>) -> QueryParams {
    let mut params = QueryParams::new();
    params
        .push_opt("cp_id", position_id)
        .push("perdet_seq_num", emp_id);
    params
}

/// Live bids of `emp_id`, optionally only those on cycle position `position_id`.
pub async fn user_bids(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    emp_id: &str,
    position_id: Option<&str>,
) -> Result<Vec<BidRecord>, UpstreamError> {
    let url = build_url(root, BIDS_PATH, &bid_params(emp_id, None))?;
    let data = fsbid.call(Method::GET, url, jwt).await?;

    Ok(into_records(data)
        .iter()
        .filter(|bid| is_live(bid))
        .filter(|bid| match position_id {
            Some(id) => text_at(bid, &["cp_id"]).as_deref() == Some(id),
            None => true,
        })
        .map(fsbid_bid_to_talentmap_bid)
        .collect())
}

/// Adds a draft bid on a cycle position.
pub async fn bid_on_position(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    emp_id: &str,
    position_id: &str,
) -> Result<(), UpstreamError> {
    let url = build_url(root, BIDS_PATH, &bid_params(emp_id, Some(position_id)))?;
    fsbid.send(Method::POST, url, jwt).await
}

/// Submits an existing bid (status `A`).
pub async fn submit_bid_on_position(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    emp_id: &str,
    position_id: &str,
) -> Result<(), UpstreamError> {
    let mut params = bid_params(emp_id, Some(position_id));
    params.push("bid_status", SUBMITTED_STATUS_CODE);
    let url = build_url(root, BIDS_PATH, &params)?;
    fsbid.send(Method::PUT, url, jwt).await
}

/// Closes or deletes the bid on a cycle position.
pub async fn remove_bid(
    fsbid: &FsbidClient,
    root: &Url,
    jwt: &str,
    emp_id: &str,
    position_id: &str,
) -> Result<(), UpstreamError> {
    let url = build_url(root, BIDS_PATH, &bid_params(emp_id, Some(position_id)))?;
    fsbid.send(Method::DELETE, url, jwt).await
}
