use maud::html;

use crate::email::EmailMessage;

use super::email_page;

pub fn invitation_email(
    to: &str,
    quiz_title: &str,
    invite_url: &str,
    inviter: Option<&str>,
) -> EmailMessage {
    let site_name = format!("quiz {}", capitalize(quiz_title));
    let subject = format!("You are invited to take the {site_name}");

    let html = email_page(
        &subject,
        html! {
            h2 { "You are invited to take the " (site_name) }
            @if let Some(inviter) = inviter {
                p { (inviter) " would like you to take part." }
            }
            p { "Follow the link below to accept the invitation and start the quiz:" }
            p { a href=(invite_url) { (invite_url) } }
        },
    );

    let mut text = format!("You are invited to take the {site_name}.\n\n");
    if let Some(inviter) = inviter {
        text.push_str(&format!("{inviter} would like you to take part.\n\n"));
    }
    text.push_str(&format!("Accept the invitation: {invite_url}\n"));

    EmailMessage {
        to: to.to_string(),
        subject,
        html: html.into_string(),
        text,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
