mod common;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use quizhost::{config::Config, db::Db, names, router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    db: Db,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let db = common::create_test_db().await;
        let mut config = Config::defaults();
        config.resend_api_key = None;
        config.base_url = "http://quiz.test".to_string();
        let router = router(AppState::new(db.clone(), config));
        Self { db, router }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            req = req.header(
                "cookie",
                format!("{}={}", names::USER_SESSION_COOKIE_NAME, session),
            );
        }
        let body = match body {
            Some(value) => {
                req = req.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(req.body(body).expect("request build should succeed"))
            .await
            .expect("router should respond");

        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, headers, bytes.to_vec())
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = self.request(method, uri, session, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create_quiz(&self, session: &str, title: &str, questions: usize) -> Value {
        let payload = quiz_payload(title, questions);
        let (status, quiz) = self
            .json(Method::POST, "/quizmaker/quizzes", Some(session), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{quiz}");
        quiz
    }
}

fn quiz_payload(title: &str, questions: usize) -> Value {
    let questions: Vec<Value> = (1..=questions)
        .map(|n| {
            json!({
                "question": format!("Question {n}"),
                "answers": [
                    { "answer": format!("Right {n}"), "correct": true },
                    { "answer": format!("Wrong {n}"), "correct": false },
                ],
            })
        })
        .collect();
    json!({ "title": title, "tags": ["geo"], "questions": questions })
}

#[tokio::test]
async fn protected_routes_reject_requests_without_session() {
    let app = TestApp::new().await;

    let cases = [
        (Method::GET, "/quizmaker/quizzes"),
        (Method::GET, "/quizmaker/quizzes/1"),
        (Method::GET, "/quizmaker/quizzes/1/summary"),
        (Method::POST, "/quizmaker/quizzes/1/notify-participants"),
        (Method::GET, "/questions"),
        (Method::GET, "/answers/1"),
        (Method::GET, "/quizzes"),
        (Method::GET, names::REPORT_URL),
    ];

    for (method, uri) in cases {
        let (status, _) = app.json(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "expected UNAUTHORIZED for {uri}");
    }
}

#[tokio::test]
async fn register_login_logout() {
    let app = TestApp::new().await;

    let (status, headers, _) = app
        .request(
            Method::POST,
            names::REGISTER_URL,
            None,
            Some(json!({
                "email": "Author@Example.com",
                "display_name": "Author",
                "password": "password123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("user_session="));

    let (status, body) = app
        .json(
            Method::POST,
            names::REGISTER_URL,
            None,
            Some(json!({
                "email": "author@example.com",
                "display_name": "Author",
                "password": "password123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "user with this email already exists.");

    let (status, body) = app
        .json(
            Method::POST,
            names::LOGIN_URL,
            None,
            Some(json!({ "email": "author@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(Method::GET, "/quizmaker/quizzes", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::POST, names::LOGOUT_URL, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .json(Method::GET, "/quizmaker/quizzes", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_authenticates() {
    let app = TestApp::new().await;
    let (_, token) = common::create_user(&app.db, "author@example.com").await;

    let req = Request::builder()
        .uri("/quizmaker/quizzes")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_with_bearer_token_ends_the_session() {
    let app = TestApp::new().await;
    let (_, token) = common::create_user(&app.db, "author@example.com").await;

    let req = Request::builder()
        .method(Method::POST)
        .uri(names::LOGOUT_URL)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    assert!(app.db.get_user_by_session(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn quiz_creation_validation() {
    let app = TestApp::new().await;
    let (_, session) = common::create_user(&app.db, "author@example.com").await;

    let mut payload = quiz_payload("No correct answer", 1);
    payload["questions"][0]["answers"][0]["correct"] = json!(false);
    let (status, body) = app
        .json(Method::POST, "/quizmaker/quizzes", Some(&session), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["questions[0].answers"][0],
        "Correct answer is not specified"
    );

    let (status, body) = app
        .json(
            Method::POST,
            "/quizmaker/quizzes",
            Some(&session),
            Some(quiz_payload("Too long", 5)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["questions"][0],
        "Ensure this field has no more than 4 elements."
    );

    app.create_quiz(&session, "Capitals", 2).await;
    let (status, body) = app
        .json(
            Method::POST,
            "/quizmaker/quizzes",
            Some(&session),
            Some(quiz_payload("Capitals", 2)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["title"][0], "quiz with this title already exists.");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/quizmaker/quizzes")
        .header("cookie", format!("{}={}", names::USER_SESSION_COOKIE_NAME, session))
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, list) = app
        .json(Method::GET, "/quizmaker/quizzes", Some(&session), None)
        .await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn other_authors_quizzes_are_not_found() {
    let app = TestApp::new().await;
    let (_, author) = common::create_user(&app.db, "author@example.com").await;
    let (_, other) = common::create_user(&app.db, "other@example.com").await;
    let quiz = app.create_quiz(&author, "Capitals", 1).await;
    let id = quiz["id"].as_i64().unwrap();

    let (status, _) = app
        .json(Method::GET, &format!("/quizmaker/quizzes/{id}"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/quizmaker/quizzes/{id}/invite"),
            Some(&other),
            Some(json!({ "emails": ["x@example.com"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invite_accept_and_answer() {
    let app = TestApp::new().await;
    let (_, author) = common::create_user(&app.db, "author@example.com").await;
    let quiz = app.create_quiz(&author, "Capitals", 2).await;
    let id = quiz["id"].as_i64().unwrap();
    let invite_url = format!("/quizmaker/quizzes/{id}/invite");

    let (status, report) = app
        .json(
            Method::POST,
            &invite_url,
            Some(&author),
            Some(json!({ "emails": ["Guest@Example.com", "not-an-email"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["valid"][0]["guest@example.com"], "invited");
    assert_eq!(report["invalid"][0]["not-an-email"], "invalid email");

    let (status, report) = app
        .json(
            Method::POST,
            &invite_url,
            Some(&author),
            Some(json!({ "emails": ["guest@example.com"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(report["invalid"][0]["guest@example.com"], "pending invite");

    let invitation = app
        .db
        .find_invitation(id, "guest@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(invitation.sent.is_some());
    let key = invitation.access_key;

    let accept_url = format!("/accept-invite/{key}");
    let expected = format!("/quizzes/capitals?token={key}");
    for _ in 0..2 {
        let (status, body) = app.json(Method::GET, &accept_url, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quiz"], expected.as_str());
    }

    let (status, report) = app
        .json(
            Method::POST,
            &invite_url,
            Some(&author),
            Some(json!({ "emails": ["guest@example.com"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(report["invalid"][0]["guest@example.com"], "already accepted");

    // participant side, authenticated by the invitation key
    let (status, headers, bytes) = app
        .request(Method::GET, &expected, None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(names::QUIZ_TOKEN_HEADER).unwrap().to_str().unwrap(),
        key.as_str()
    );
    let take: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(take["questions"].as_array().unwrap().len(), 2);
    assert!(take["questions"][0]["answers"][0].get("correct").is_none());

    let questions = quiz["questions"].as_array().unwrap();
    let answer_url = format!("/quizzes/capitals/answer?token={key}");
    let first = json!({
        "question": questions[0]["id"],
        "answer": questions[0]["answers"][0]["id"],
    });

    let (status, progress) = app
        .json(Method::POST, &answer_url, None, Some(first.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(progress["progress"], "50%");

    let (status, body) = app
        .json(Method::POST, &answer_url, None, Some(first))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You have already answered this question");

    let mismatched = json!({
        "question": questions[1]["id"],
        "answer": questions[0]["answers"][1]["id"],
    });
    let (status, body) = app
        .json(Method::POST, &answer_url, None, Some(mismatched))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Wrong answer");

    let second = json!({
        "question": questions[1]["id"],
        "answer": questions[1]["answers"][1]["id"],
    });
    let (status, progress) = app
        .json(Method::POST, &answer_url, None, Some(second.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(progress["progress"], "100%");
    assert_eq!(progress["remaining_questions"], json!([]));

    let (status, body) = app
        .json(Method::POST, &answer_url, None, Some(second))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You have already completed this quiz");

    let (status, participants) = app
        .json(
            Method::GET,
            &format!("/quizmaker/quizzes/{id}/participants"),
            Some(&author),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(participants["results"][0]["score_str"], "1 out of 2");
    assert_eq!(participants["results"][0]["status"], "completed");
}

#[tokio::test]
async fn expired_and_unknown_invitations_are_gone() {
    let app = TestApp::new().await;
    let (author_id, _) = common::create_user(&app.db, "author@example.com").await;
    let quiz_id = match app
        .db
        .create_quiz(&common::sample_quiz("Capitals", 1), author_id)
        .await
        .unwrap()
    {
        quizhost::db::CreateQuizOutcome::Created(id) => id,
        quizhost::db::CreateQuizOutcome::TitleTaken => unreachable!(),
    };

    let key = "e".repeat(64);
    let invitation = app
        .db
        .create_invitation(quiz_id, "late@example.com", &key, None)
        .await
        .unwrap()
        .unwrap();
    app.db
        .mark_invitation_sent(invitation.id, Utc::now() - Duration::days(4))
        .await
        .unwrap();

    let (status, _) = app
        .json(Method::GET, &format!("/accept-invite/{key}"), None, None)
        .await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = app
        .json(Method::GET, "/accept-invite/unknown", None, None)
        .await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn closed_quiz_rejects_invites_and_answers() {
    let app = TestApp::new().await;
    let (_, author) = common::create_user(&app.db, "author@example.com").await;
    let quiz = app.create_quiz(&author, "Capitals", 1).await;
    let id = quiz["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/quizmaker/quizzes/{id}/invite"),
            Some(&author),
            Some(json!({ "emails": ["guest@example.com"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = app
        .db
        .find_invitation(id, "guest@example.com")
        .await
        .unwrap()
        .unwrap()
        .access_key;
    app.json(Method::GET, &format!("/accept-invite/{key}"), None, None)
        .await;

    let status_url = format!("/quizmaker/quizzes/{id}/status");
    let (status, body) = app
        .json(Method::PATCH, &status_url, Some(&author), Some(json!({ "status": "closed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");

    let (status, _) = app
        .json(Method::PATCH, &status_url, Some(&author), Some(json!({ "status": "draft" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/quizmaker/quizzes/{id}/invite"),
            Some(&author),
            Some(json!({ "emails": ["late@example.com"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "This quiz is closed");

    let question = &quiz["questions"][0];
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/quizzes/capitals/answer?token={key}"),
            None,
            Some(json!({ "question": question["id"], "answer": question["answers"][0]["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "This quiz is closed");
}

#[tokio::test]
async fn notify_participants_is_accepted() {
    let app = TestApp::new().await;
    let (_, author) = common::create_user(&app.db, "author@example.com").await;
    let quiz = app.create_quiz(&author, "Capitals", 1).await;
    let id = quiz["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/quizmaker/quizzes/{id}/notify-participants"),
            Some(&author),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn report_requires_admin() {
    let app = TestApp::new().await;
    let (_, user) = common::create_user(&app.db, "user@example.com").await;
    let (_, admin) = common::create_user(&app.db, "admin@example.com").await;
    app.db.set_admin("admin@example.com").await.unwrap();
    app.create_quiz(&user, "Capitals, Europe", 2).await;

    let (status, _) = app
        .json(Method::GET, "/report?format=csv", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, headers, bytes) = app
        .request(Method::GET, "/report?format=csv", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"daily-report-"));
    let csv = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Quizzes");
    assert_eq!(lines[1], "Title,Author,Question count,Created At");
    assert!(lines[2].starts_with("\"Capitals, Europe\",Test User,2,"));

    let (status, body) = app
        .json(Method::GET, "/report?format=json", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quizzes"].as_array().unwrap().len(), 1);
    assert_eq!(body["participants"], json!([]));

    let (status, _) = app
        .json(Method::GET, "/report?format=xml", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
