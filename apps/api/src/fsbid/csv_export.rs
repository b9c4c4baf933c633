//! Spreadsheet exports of client searches and bid lists.
//!
//! Output is Excel-flavoured CSV with a UTF-8 BOM. Code-like columns are
//! written as `="value"` so spreadsheets keep leading zeros.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;

use crate::fsbid::bids::BidRecord;
use crate::fsbid::clients::ClientCsvRecord;

const UTF8_BOM: &str = "\u{feff}";

const CLIENT_HEADERS: [&str; 5] = [
    "Name",
    "Skill",
    "Grade",
    "Employee ID",
    "Position Location Code",
];

const BID_HEADERS: [&str; 9] = [
    "Position",
    "Position Number",
    "Skill",
    "Grade",
    "Bureau",
    "Post City",
    "Post Country",
    "Bid Status",
    "Bid Updated",
];

/// A rendered CSV attachment.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

impl IntoResponse for CsvExport {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

pub fn clients_csv(records: &[ClientCsvRecord], now: NaiveDateTime) -> Result<CsvExport, csv::Error> {
    let rows = records.iter().map(|record| {
        vec![
            record.name.clone(),
            record.skills.clone(),
            as_text(record.grade.as_deref()),
            as_text(record.employee_id.as_deref()),
            as_text(record.pos_location_code.as_deref()),
        ]
    });
    Ok(CsvExport {
        filename: export_filename("clients", now),
        body: render(&CLIENT_HEADERS, rows)?,
    })
}

pub fn bids_csv(records: &[BidRecord], now: NaiveDateTime) -> Result<CsvExport, csv::Error> {
    let rows = records.iter().map(|bid| {
        let position = &bid.position;
        vec![
            position.title.clone().unwrap_or_default(),
            as_text(position.position_number.as_deref()),
            position.skill.clone().unwrap_or_default(),
            as_text(position.grade.as_deref()),
            position.bureau.clone().unwrap_or_default(),
            position.post.location.city.clone().unwrap_or_default(),
            position.post.location.country.clone().unwrap_or_default(),
            bid.status.to_string(),
            bid.update_date.clone().unwrap_or_default(),
        ]
    });
    Ok(CsvExport {
        filename: export_filename("bids", now),
        body: render(&BID_HEADERS, rows)?,
    })
}

fn render<I>(headers: &[&str], rows: I) -> Result<Vec<u8>, csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(UTF8_BOM.as_bytes().to_vec());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Forces spreadsheet apps to treat the value as text.
fn as_text(value: Option<&str>) -> String {
    format!("=\"{}\"", value.unwrap_or_default())
}

fn export_filename(prefix: &str, now: NaiveDateTime) -> String {
    format!("{prefix}_{}.csv", now.format("%Y_%m_%d_%H%M%S"))
}
