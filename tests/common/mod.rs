#![allow(dead_code)]

use quizhost::db::Db;
use quizhost::models::{NewAnswer, NewQuestion, NewQuiz};

pub async fn create_test_db() -> Db {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("quizhost_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());
    Db::new(&url).await.expect("failed to create test database")
}

/// Register a user and open a session for them.
pub async fn create_user(db: &Db, email: &str) -> (i64, String) {
    let user_id = db
        .create_user(email, "password123", "Test User")
        .await
        .expect("create user");
    let token = db.create_user_session(user_id).await.expect("create session");
    (user_id, token)
}

fn question(n: usize, score: u32) -> NewQuestion {
    NewQuestion {
        question: format!("Question {n}"),
        score,
        answers: vec![
            NewAnswer {
                answer: format!("Right {n}"),
                correct: true,
            },
            NewAnswer {
                answer: format!("Wrong {n}"),
                correct: false,
            },
        ],
    }
}

/// A quiz of `questions` questions; question `n` scores `n` points and its
/// first answer is the correct one.
pub fn sample_quiz(title: &str, questions: usize) -> NewQuiz {
    NewQuiz {
        title: title.to_string(),
        description: Some("A quiz for tests".to_string()),
        tags: vec!["test".to_string()],
        questions: (1..=questions).map(|n| question(n, n as u32)).collect(),
    }
}
