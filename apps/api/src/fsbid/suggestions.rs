//! Client suggestions: the initial position search a CDO is offered for a client.
//!
//! The search starts at the client's own grade and skills. When that finds
//! too few open positions it may widen to the next grade up, but only when
//! widening actually surfaces more positions and does not flood the result
//! (unless the exact-grade search found nothing at all).

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fsbid::clients::Skill;
use crate::fsbid::lookup::{into_records, text_at};
use crate::fsbid_client::{build_url, FsbidClient, QueryParams, UpstreamError};

/// Below this many results, try a broader query.
pub const LOW: u64 = 5;
/// A broader query at or above this many results is too broad...
pub const HIGH: u64 = 100;
/// ...unless the exact-grade query found no more than this.
pub const FLOOR: u64 = 0;

/// Next grade "up" for each grade that has one.
const GRADE_LADDER: &[(&str, &str)] = &[
    ("08", "07"),
    ("07", "06"),
    ("06", "05"),
    ("05", "04"),
    ("04", "03"),
    ("02", "01"),
];

const COUNT_PATH: &str = "availablePositionsCount";

pub fn next_grade(grade: &str) -> Option<&'static str> {
    GRADE_LADDER
        .iter()
        .find(|(from, _)| *from == grade)
        .map(|(_, to)| *to)
}

/// Position search filters, named the way the frontend's position search expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionQuery {
    #[serde(rename = "position__grade__code__in", serialize_with = "comma_joined")]
    pub grades: Vec<String>,
    #[serde(rename = "position__skill__code__in", serialize_with = "comma_joined")]
    pub skills: Vec<String>,
}

impl SuggestionQuery {
    pub fn baseline(grade: &str, skills: &[Skill]) -> Self {
        Self {
            grades: Some(grade)
                .filter(|g| !g.trim().is_empty())
                .map(str::to_string)
                .into_iter()
                .collect(),
            skills: skills.iter().map(|s| s.code.clone()).collect(),
        }
    }

    /// Same skills, with `grade` added to the grade filter.
    pub fn with_grade(&self, grade: &str) -> Self {
        let mut broadened = self.clone();
        broadened.grades.push(grade.to_string());
        broadened
    }
}

fn comma_joined<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&values.join(","))
}

/// Counts currently available positions matching a query.
///
/// Carried in `AppState` as `Arc<dyn PositionCounter>`.
#[async_trait]
pub trait PositionCounter: Send + Sync {
    async fn count(&self, query: &SuggestionQuery, jwt: &str) -> Result<u64, UpstreamError>;
}

/// Counts positions through the cycle positions API.
pub struct FsbidPositionCounter {
    fsbid: FsbidClient,
    root: Url,
}

impl FsbidPositionCounter {
    pub fn new(fsbid: FsbidClient, root: Url) -> Self {
        Self { fsbid, root }
    }
}

#[async_trait]
impl PositionCounter for FsbidPositionCounter {
    async fn count(&self, query: &SuggestionQuery, jwt: &str) -> Result<u64, UpstreamError> {
        let mut params = QueryParams::new();
        params
            .push_all("request_params.grades", query.grades.iter().map(String::as_str))
            .push_all("request_params.skills", query.skills.iter().map(String::as_str));
        let url = build_url(&self.root, COUNT_PATH, &params)?;
        let data = self.fsbid.call(Method::GET, url, jwt).await?;
        parse_count(data).ok_or(UpstreamError::MissingData)
    }
}

/// FSBid reports counts as `[{"count(1)": n}]`; some deployments say `count`.
fn parse_count(data: Value) -> Option<u64> {
    let records = into_records(data);
    let first = records.first()?;
    ["count(1)", "count"]
        .iter()
        .find_map(|field| text_at(first, &[*field]))
        .and_then(|raw| raw.parse::<u64>().ok())
}

/// Picks the initial position search for a client of `grade` with `skills`.
///
/// A client without a grade gets the skills-only baseline and no count is
/// requested. A count that cannot be fetched is unusable: the baseline query
/// is kept.
pub async fn suggest(
    counter: &dyn PositionCounter,
    jwt: &str,
    grade: &str,
    skills: &[Skill],
) -> SuggestionQuery {
    let baseline = SuggestionQuery::baseline(grade, skills);
    if grade.trim().is_empty() {
        return baseline;
    }

    let count = match counter.count(&baseline, jwt).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Position count for grade {grade} unavailable, keeping baseline: {e}");
            return baseline;
        }
    };
    debug!("Baseline suggestion for grade {grade} matches {count} positions");

    let Some(next) = next_grade(grade) else {
        return baseline;
    };
    if count >= LOW {
        return baseline;
    }

    let broadened = baseline.with_grade(next);
    let broadened_count = match counter.count(&broadened, jwt).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Broadened position count for grades {grade},{next} unavailable: {e}");
            return baseline;
        }
    };

    if (count <= FLOOR || broadened_count < HIGH) && count != broadened_count {
        info!("Broadening suggestion from grade {grade} to {grade},{next} ({count} -> {broadened_count})");
        broadened
    } else {
        baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers counts from a script and records every query it was asked.
    struct ScriptedCounter {
        answers: Mutex<Vec<Result<u64, UpstreamError>>>,
        seen: Mutex<Vec<SuggestionQuery>>,
    }

    impl ScriptedCounter {
        fn new(answers: Vec<Result<u64, UpstreamError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PositionCounter for ScriptedCounter {
        async fn count(&self, query: &SuggestionQuery, _jwt: &str) -> Result<u64, UpstreamError> {
            self.seen.lock().unwrap().push(query.clone());
            self.answers
                .lock()
                .unwrap()
                .pop()
                .expect("counter called more often than scripted")
        }
    }

    fn skills() -> Vec<Skill> {
        vec![
            Skill {
                code: "2010".to_string(),
                description: Some("MANAGEMENT OFFICER".to_string()),
            },
            Skill {
                code: "2880".to_string(),
                description: None,
            },
        ]
    }

    async fn run(grade: &str, answers: Vec<Result<u64, UpstreamError>>) -> (SuggestionQuery, usize) {
        let counter = ScriptedCounter::new(answers);
        let query = suggest(&counter, "token", grade, &skills()).await;
        (query, counter.calls())
    }

    #[tokio::test]
    async fn test_grade_without_ladder_entry_keeps_baseline() {
        for grade in ["01", "03", "MC", "00"] {
            let (query, calls) = run(grade, vec![Ok(0)]).await;
            assert_eq!(query.grades, vec![grade.to_string()]);
            assert_eq!(calls, 1);
        }
    }

    #[tokio::test]
    async fn test_small_count_broadens_when_result_reasonable() {
        let (query, calls) = run("08", vec![Ok(3), Ok(50)]).await;
        assert_eq!(query.grades, vec!["08", "07"]);
        assert_eq!(query.skills, vec!["2010", "2880"]);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_equal_counts_reject_broadening() {
        let (query, _) = run("08", vec![Ok(3), Ok(3)]).await;
        assert_eq!(query.grades, vec!["08"]);
    }

    #[tokio::test]
    async fn test_zero_count_accepts_huge_broadening() {
        let (query, _) = run("08", vec![Ok(0), Ok(500)]).await;
        assert_eq!(query.grades, vec!["08", "07"]);
    }

    #[tokio::test]
    async fn test_nonzero_count_rejects_huge_broadening() {
        let (query, _) = run("08", vec![Ok(2), Ok(100)]).await;
        assert_eq!(query.grades, vec!["08"]);
    }

    #[tokio::test]
    async fn test_healthy_count_never_broadens() {
        let (query, calls) = run("08", vec![Ok(20)]).await;
        assert_eq!(query.grades, vec!["08"]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_count_of_exactly_low_does_not_broaden() {
        let (query, calls) = run("05", vec![Ok(LOW)]).await;
        assert_eq!(query.grades, vec!["05"]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_failed_baseline_count_keeps_baseline() {
        let (query, calls) = run("08", vec![Err(UpstreamError::MissingData)]).await;
        assert_eq!(query.grades, vec!["08"]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_failed_broadened_count_keeps_baseline() {
        let (query, calls) = run("02", vec![Ok(1), Err(UpstreamError::FailureCode)]).await;
        assert_eq!(query.grades, vec!["02"]);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_second_query_adds_next_grade() {
        let counter = ScriptedCounter::new(vec![Ok(1), Ok(10)]);
        suggest(&counter, "token", "04", &skills()).await;
        let seen = counter.seen.lock().unwrap();
        assert_eq!(seen[0].grades, vec!["04"]);
        assert_eq!(seen[1].grades, vec!["04", "03"]);
        assert_eq!(seen[1].skills, seen[0].skills);
    }

    #[test]
    fn test_query_serializes_frontend_names() {
        let query = SuggestionQuery::baseline("08", &skills()).with_grade("07");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "position__grade__code__in": "08,07",
                "position__skill__code__in": "2010,2880"
            })
        );
    }

    #[tokio::test]
    async fn test_blank_grade_skips_counting() {
        for grade in ["", "  "] {
            let (query, calls) = run(grade, vec![]).await;
            assert_eq!(calls, 0);
            assert_eq!(query.skills, vec!["2010", "2880"]);
        }
    }

    #[test]
    fn test_blank_grade_has_no_grade_filter() {
        let query = SuggestionQuery::baseline("", &[]);
        assert!(query.grades.is_empty());
        assert!(query.skills.is_empty());
    }

    #[test]
    fn test_ladder_lookup() {
        assert_eq!(next_grade("08"), Some("07"));
        assert_eq!(next_grade("02"), Some("01"));
        assert_eq!(next_grade("03"), None);
        assert_eq!(next_grade("01"), None);
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count(json!([{ "count(1)": 12 }])), Some(12));
        assert_eq!(parse_count(json!({ "count": "7" })), Some(7));
        assert_eq!(parse_count(json!([])), None);
        assert_eq!(parse_count(json!([{ "total": 1 }])), None);
    }
}
