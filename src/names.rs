pub const REGISTER_URL: &str = "/register";
pub const LOGIN_URL: &str = "/login";
pub const LOGOUT_URL: &str = "/logout";
pub const REPORT_URL: &str = "/report";

pub const USER_SESSION_COOKIE_NAME: &str = "user_session";
pub const QUIZ_TOKEN_HEADER: &str = "quiz-token";

pub fn accept_invite_url(key: &str) -> String {
    format!("/accept-invite/{key}")
}

pub fn take_quiz_url(slug: &str, key: &str) -> String {
    format!("/quizzes/{slug}?token={key}")
}

// Listing
pub const PAGE_SIZE: i64 = 20;
pub const MAX_INVITEES_PER_REQUEST: usize = 100;

// Authoring limits
pub const MIN_ANSWERS_PER_QUESTION: usize = 2;

pub const INVITATION_KEY_LENGTH: usize = 64;
