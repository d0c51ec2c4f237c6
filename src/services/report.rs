use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use color_eyre::Result;
use serde::Serialize;

use crate::db::{Db, ParticipantReportEntry, QuizReportEntry};

pub const QUIZ_HEADER: [&str; 4] = ["Title", "Author", "Question count", "Created At"];
pub const PARTICIPANT_HEADER: [&str; 6] =
    ["E-mail", "Quiz", "Status", "Score", "Answers given", "Created"];

/// Quizzes and participants created on one day.
#[derive(Debug, Serialize)]
pub struct DailyReport {
    pub quizzes: Vec<QuizReportEntry>,
    pub participants: Vec<ParticipantReportEntry>,
}

pub async fn daily_report(db: &Db, day: NaiveDate) -> Result<DailyReport> {
    let quizzes = db.quizzes_created_on(day).await?;
    let participants = db.participants_created_on(day).await?;

    tracing::debug!(
        "report for {day}: {} quizzes, {} participants",
        quizzes.len(),
        participants.len()
    );
    Ok(DailyReport {
        quizzes,
        participants,
    })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl DailyReport {
    /// Section titles, headers and data rows in export order.
    pub fn as_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["Quizzes".to_string()],
            QUIZ_HEADER.iter().map(|h| h.to_string()).collect(),
        ];

        rows.extend(self.quizzes.iter().map(|q| {
            vec![
                q.title.clone(),
                q.author.clone(),
                q.questions_count.to_string(),
                timestamp(&q.created_at),
            ]
        }));

        rows.push(vec![]);
        rows.push(vec!["Participants".to_string()]);
        rows.push(PARTICIPANT_HEADER.iter().map(|h| h.to_string()).collect());

        rows.extend(self.participants.iter().map(|p| {
            vec![
                p.email.clone(),
                p.quiz.clone(),
                p.status.as_str().to_string(),
                p.score.to_string(),
                p.answers_given.to_string(),
                timestamp(&p.created_at),
            ]
        }));

        rows
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in self.as_rows() {
            let line: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
        out
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ParticipantStatus;
    use chrono::TimeZone;

    fn report() -> DailyReport {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        DailyReport {
            quizzes: vec![QuizReportEntry {
                title: "Rust, \"the\" basics".to_string(),
                author: "Ferris".to_string(),
                questions_count: 3,
                created_at: at,
            }],
            participants: vec![ParticipantReportEntry {
                quiz: "Rust, \"the\" basics".to_string(),
                email: "p@example.org".to_string(),
                status: ParticipantStatus::Attempted,
                score: 2,
                answers_given: 2,
                created_at: at,
            }],
        }
    }

    #[test]
    fn csv_has_both_sections() {
        let csv = report().to_csv();
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines[0], "Quizzes");
        assert_eq!(lines[1], "Title,Author,Question count,Created At");
        assert_eq!(
            lines[2],
            "\"Rust, \"\"the\"\" basics\",Ferris,3,2024-05-01T09:30:00Z"
        );
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Participants");
        assert_eq!(lines[5], "E-mail,Quiz,Status,Score,Answers given,Created");
        assert_eq!(
            lines[6],
            "p@example.org,\"Rust, \"\"the\"\" basics\",attempted,2,2,2024-05-01T09:30:00Z"
        );
    }

    #[test]
    fn empty_report_keeps_headers() {
        let empty = DailyReport {
            quizzes: vec![],
            participants: vec![],
        };
        let rows = empty.as_rows();

        assert_eq!(rows.len(), 5);
        assert!(rows[2].is_empty());
    }

    #[test]
    fn json_uses_section_keys() {
        let value = serde_json::to_value(report()).unwrap();

        assert_eq!(value["quizzes"][0]["questions_count"], 3);
        assert_eq!(value["participants"][0]["status"], "attempted");
    }
}
