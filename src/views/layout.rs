use maud::{html, Markup, DOCTYPE};

use crate::utils;

fn header() -> Markup {
    html! {
        header style="border-bottom: 1px solid #ddd; padding-bottom: 0.5rem;" {
            strong { "Quizhost" }
        }
    }
}

fn footer() -> Markup {
    html! {
        footer style="color: #888; font-size: 0.8rem; margin-top: 2rem;" {
            "Quizhost " (utils::VERSION)
        }
    }
}

/// Full HTML document wrapping an email body.
pub fn email_page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body style="font-family: sans-serif; max-width: 40rem; margin: auto;" {
                (header())
                main { (body) }
                (footer())
            }
        }
    }
}
