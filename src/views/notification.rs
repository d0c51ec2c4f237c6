use maud::html;

use crate::{db::ParticipantResult, email::EmailMessage};

use super::email_page;

/// Results email for a participant who completed a quiz.
pub fn results_email(result: &ParticipantResult) -> EmailMessage {
    let subject = format!("Your results for {}", result.quiz_title);

    let html = email_page(
        &subject,
        html! {
            h2 { (result.quiz_title) }
            p {
                "You scored "
                strong { (result.score) " out of " (result.max_score) }
                "."
            }
            table {
                thead {
                    tr { th { "Question" } th { "Your answer" } th { "" } }
                }
                tbody {
                    @for answer in &result.answers {
                        tr {
                            td { (answer.question) }
                            td { (answer.answer) }
                            td { @if answer.correct { "correct" } @else { "wrong" } }
                        }
                    }
                }
            }
        },
    );

    let mut text = format!(
        "{}\n\nYou scored {} out of {}.\n\n",
        result.quiz_title, result.score, result.max_score
    );
    for answer in &result.answers {
        let mark = if answer.correct { "correct" } else { "wrong" };
        text.push_str(&format!("- {}: {} ({mark})\n", answer.question, answer.answer));
    }

    EmailMessage {
        to: result.email.clone(),
        subject,
        html: html.into_string(),
        text,
    }
}
