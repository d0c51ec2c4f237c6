use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    extractors::{AdminGuard, QueryParams},
    names,
    rejections::{AppError, ResultExt},
    services::report,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(names::REPORT_URL, get(daily_report))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(default)]
    format: ReportFormat,
    date: Option<NaiveDate>,
}

async fn daily_report(
    AdminGuard(user): AdminGuard,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<axum::response::Response, AppError> {
    let day = query.date.unwrap_or_else(|| Utc::now().date_naive());
    tracing::info!("admin {} requested the {:?} report for {day}", user.id, query.format);

    let report = report::daily_report(&state.db, day)
        .await
        .reject("could not build report")?;

    match query.format {
        ReportFormat::Json => Ok(Json(report).into_response()),
        ReportFormat::Csv => {
            let disposition = format!("attachment; filename=\"daily-report-{day}.csv\"");
            Ok((
                [
                    (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (CONTENT_DISPOSITION, disposition),
                ],
                report.to_csv(),
            )
                .into_response())
        }
    }
}
