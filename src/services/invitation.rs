use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;
use validator::ValidateEmail;

use crate::db::{AcceptInvitation, AuthUser, Db, Invitation, InvitationState, QuizRecord, QuizStatus};
use crate::email::{EmailSender, ResendEmailSender};
use crate::{names, utils, views};

// ---------------------------------------------------------------------------
// InvitationRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait InvitationRepository: Send + Sync {
    fn find_invitation(
        &self,
        quiz_id: i64,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    fn find_invitation_by_key(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    fn create_invitation(
        &self,
        quiz_id: i64,
        email: &str,
        key: &str,
        inviter_id: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    fn reissue_invitation(
        &self,
        invitation_id: i64,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Invitation>> + Send;

    fn mark_invitation_sent(
        &self,
        invitation_id: i64,
        sent: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Option<i64>,
    ) -> impl std::future::Future<Output = Result<AcceptInvitation>> + Send;
}

impl InvitationRepository for Db {
    async fn find_invitation(&self, quiz_id: i64, email: &str) -> Result<Option<Invitation>> {
        Db::find_invitation(self, quiz_id, email).await
    }

    async fn find_invitation_by_key(&self, key: &str) -> Result<Option<Invitation>> {
        Db::find_invitation_by_key(self, key).await
    }

    async fn create_invitation(
        &self,
        quiz_id: i64,
        email: &str,
        key: &str,
        inviter_id: Option<i64>,
    ) -> Result<Option<Invitation>> {
        Db::create_invitation(self, quiz_id, email, key, inviter_id).await
    }

    async fn reissue_invitation(&self, invitation_id: i64, key: &str) -> Result<Invitation> {
        Db::reissue_invitation(self, invitation_id, key).await
    }

    async fn mark_invitation_sent(&self, invitation_id: i64, sent: DateTime<Utc>) -> Result<()> {
        Db::mark_invitation_sent(self, invitation_id, sent).await
    }

    async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Option<i64>,
    ) -> Result<AcceptInvitation> {
        Db::accept_invitation(self, invitation, user_id).await
    }
}

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("quiz is closed")]
    QuizClosed,
    /// Some invitations could not be mailed; the report says which.
    #[error("Mail service is temporarily unavailable")]
    MailUnavailable(InviteReport),
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

pub const INVITED: &str = "invited";
pub const INVALID_EMAIL: &str = "invalid email";
pub const PENDING_INVITE: &str = "pending invite";
pub const ALREADY_ACCEPTED: &str = "already accepted";
pub const NOT_SENT: &str = "could not be sent";

/// Per-email result of an invite request.
#[derive(Debug, Default, Serialize)]
pub struct InviteReport {
    pub valid: Vec<BTreeMap<String, &'static str>>,
    pub invalid: Vec<BTreeMap<String, &'static str>>,
}

impl InviteReport {
    fn valid(&mut self, email: String) {
        self.valid.push(BTreeMap::from([(email, INVITED)]));
    }

    fn invalid(&mut self, email: String, reason: &'static str) {
        self.invalid.push(BTreeMap::from([(email, reason)]));
    }

    pub fn any_invited(&self) -> bool {
        !self.valid.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Link the participant follows to take the quiz.
    Quiz(String),
    /// Unknown key or expired invitation.
    Gone,
    ParticipantExists,
}

// ---------------------------------------------------------------------------
// InvitationService
// ---------------------------------------------------------------------------

pub struct InvitationService<R: InvitationRepository = Db, E: EmailSender = ResendEmailSender> {
    repo: R,
    email: E,
    base_url: String,
    expiry_days: i64,
}

impl<R: InvitationRepository + Clone, E: EmailSender + Clone> Clone for InvitationService<R, E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            email: self.email.clone(),
            base_url: self.base_url.clone(),
            expiry_days: self.expiry_days,
        }
    }
}

impl<R: InvitationRepository, E: EmailSender> InvitationService<R, E> {
    pub fn new(repo: R, email: E, base_url: String, expiry_days: i64) -> Self {
        Self {
            repo,
            email,
            base_url: base_url.trim_end_matches('/').to_string(),
            expiry_days,
        }
    }

    pub fn expiry_days(&self) -> i64 {
        self.expiry_days
    }

    pub async fn invite(
        &self,
        quiz: &QuizRecord,
        emails: &[String],
        inviter: &AuthUser,
    ) -> Result<InviteReport, InvitationError> {
        if quiz.status == QuizStatus::Closed {
            return Err(InvitationError::QuizClosed);
        }

        let mut report = InviteReport::default();
        let mut mail_failed = false;

        for raw in emails {
            let email = utils::normalize_email(raw);
            if !email.validate_email() {
                report.invalid(raw.trim().to_string(), INVALID_EMAIL);
                continue;
            }

            let key = utils::random_key(names::INVITATION_KEY_LENGTH);
            let existing = self.repo.find_invitation(quiz.id, &email).await?;

            let invitation = match existing {
                Some(invitation) => match invitation.state(Utc::now(), self.expiry_days) {
                    InvitationState::Accepted => {
                        report.invalid(email, ALREADY_ACCEPTED);
                        continue;
                    }
                    InvitationState::Sent => {
                        report.invalid(email, PENDING_INVITE);
                        continue;
                    }
                    // Never mailed, or mailed too long ago: new key, send again.
                    state @ (InvitationState::Created | InvitationState::Expired) => {
                        tracing::info!("re-issuing {state:?} invitation for {email}");
                        self.repo.reissue_invitation(invitation.id, &key).await?
                    }
                },
                None => match self
                    .repo
                    .create_invitation(quiz.id, &email, &key, Some(inviter.id))
                    .await?
                {
                    Some(invitation) => invitation,
                    None => {
                        report.invalid(email, PENDING_INVITE);
                        continue;
                    }
                },
            };

            if self.send_invitation(&invitation, inviter).await? {
                report.valid(email);
            } else {
                mail_failed = true;
                report.invalid(email, NOT_SENT);
            }
        }

        if mail_failed {
            return Err(InvitationError::MailUnavailable(report));
        }
        Ok(report)
    }

    async fn send_invitation(
        &self,
        invitation: &Invitation,
        inviter: &AuthUser,
    ) -> Result<bool> {
        let invite_url = format!(
            "{}{}",
            self.base_url,
            names::accept_invite_url(&invitation.access_key)
        );
        let message = views::invitation::invitation_email(
            &invitation.email,
            &invitation.quiz_title,
            &invite_url,
            Some(&inviter.display_name),
        );

        if let Err(e) = self.email.send(&message).await {
            tracing::error!("failed to send invitation to {}: {e}", invitation.email);
            return Ok(false);
        }

        self.repo
            .mark_invitation_sent(invitation.id, Utc::now())
            .await?;
        Ok(true)
    }

    pub async fn accept(&self, key: &str, user: Option<&AuthUser>) -> Result<AcceptOutcome> {
        let Some(invitation) = self.repo.find_invitation_by_key(key).await? else {
            return Ok(AcceptOutcome::Gone);
        };

        let quiz_url = names::take_quiz_url(&invitation.quiz_slug, &invitation.access_key);

        match invitation.state(Utc::now(), self.expiry_days) {
            InvitationState::Accepted => return Ok(AcceptOutcome::Quiz(quiz_url)),
            InvitationState::Expired => {
                tracing::info!("invitation {} has expired", invitation.id);
                return Ok(AcceptOutcome::Gone);
            }
            InvitationState::Created | InvitationState::Sent => {}
        }

        match self
            .repo
            .accept_invitation(&invitation, user.map(|u| u.id))
            .await?
        {
            AcceptInvitation::Accepted | AcceptInvitation::AlreadyAccepted => {
                Ok(AcceptOutcome::Quiz(quiz_url))
            }
            AcceptInvitation::ParticipantExists => Ok(AcceptOutcome::ParticipantExists),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::email::MockEmailSender;

    fn inviter() -> AuthUser {
        AuthUser {
            id: 7,
            email: "author@example.com".to_string(),
            display_name: "Author".to_string(),
            is_admin: false,
        }
    }

    fn quiz(status: QuizStatus) -> QuizRecord {
        QuizRecord {
            id: 1,
            author_id: 7,
            title: "Capitals".to_string(),
            description: None,
            slug: "capitals".to_string(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invitation(email: &str, accepted: bool, sent: Option<DateTime<Utc>>) -> Invitation {
        Invitation {
            id: 3,
            quiz_id: 1,
            quiz_title: "Capitals".to_string(),
            quiz_slug: "capitals".to_string(),
            email: email.to_string(),
            access_key: "k".repeat(64),
            accepted,
            inviter_id: Some(7),
            sent,
            created_at: Utc::now(),
        }
    }

    fn mock_email_ok() -> MockEmailSender {
        let mut mock = MockEmailSender::new();
        mock.expect_send().returning(|_| Box::pin(async { Ok(()) }));
        mock
    }

    fn mock_email_fail() -> MockEmailSender {
        let mut mock = MockEmailSender::new();
        mock.expect_send()
            .returning(|_| Box::pin(async { Err(color_eyre::eyre::eyre!("send failed")) }));
        mock
    }

    fn service(
        repo: MockInvitationRepository,
        email: MockEmailSender,
    ) -> InvitationService<MockInvitationRepository, MockEmailSender> {
        InvitationService::new(repo, email, "http://localhost/".to_string(), 3)
    }

    // ----- invite tests -----

    #[tokio::test]
    async fn invite_new_email_creates_and_sends() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        repo.expect_create_invitation()
            .withf(|quiz_id, email, key, inviter| {
                *quiz_id == 1 && email == "guest@example.com" && key.len() == 64 && *inviter == Some(7)
            })
            .returning(|_, email, _, _| {
                let inv = invitation(email, false, None);
                Box::pin(async move { Ok(Some(inv)) })
            });
        repo.expect_mark_invitation_sent()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut email = MockEmailSender::new();
        email
            .expect_send()
            .withf(|m| m.to == "guest@example.com" && m.text.contains("http://localhost/accept-invite/"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let svc = service(repo, email);
        let report = svc
            .invite(&quiz(QuizStatus::Published), &[" Guest@Example.com ".to_string()], &inviter())
            .await
            .unwrap();

        assert!(report.any_invited());
        assert_eq!(report.valid[0].get("guest@example.com"), Some(&INVITED));
        assert!(report.invalid.is_empty());
    }

    #[tokio::test]
    async fn invite_reports_invalid_pending_and_accepted() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation().returning(|_, email| {
            let inv = match email {
                "pending@example.com" => Some(invitation(email, false, Some(Utc::now()))),
                "done@example.com" => Some(invitation(email, true, Some(Utc::now()))),
                _ => None,
            };
            Box::pin(async move { Ok(inv) })
        });

        let svc = service(repo, MockEmailSender::new());
        let report = svc
            .invite(
                &quiz(QuizStatus::Published),
                &[
                    "nope".to_string(),
                    "pending@example.com".to_string(),
                    "done@example.com".to_string(),
                ],
                &inviter(),
            )
            .await
            .unwrap();

        assert!(!report.any_invited());
        assert_eq!(report.invalid[0].get("nope"), Some(&INVALID_EMAIL));
        assert_eq!(report.invalid[1].get("pending@example.com"), Some(&PENDING_INVITE));
        assert_eq!(report.invalid[2].get("done@example.com"), Some(&ALREADY_ACCEPTED));
    }

    #[tokio::test]
    async fn invite_reissues_expired_invitation() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation().returning(|_, email| {
            let inv = invitation(email, false, Some(Utc::now() - chrono::Duration::days(4)));
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_reissue_invitation()
            .withf(|id, key| *id == 3 && key.len() == 64)
            .times(1)
            .returning(|_, _| {
                let inv = invitation("old@example.com", false, None);
                Box::pin(async move { Ok(inv) })
            });
        repo.expect_create_invitation().never();
        repo.expect_mark_invitation_sent()
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let svc = service(repo, mock_email_ok());
        let report = svc
            .invite(&quiz(QuizStatus::Draft), &["old@example.com".to_string()], &inviter())
            .await
            .unwrap();

        assert_eq!(report.valid[0].get("old@example.com"), Some(&INVITED));
    }

    #[tokio::test]
    async fn invite_mail_failure_is_mail_unavailable() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        repo.expect_create_invitation().returning(|_, email, _, _| {
            let inv = invitation(email, false, None);
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_mark_invitation_sent().never();

        let svc = service(repo, mock_email_fail());
        let result = svc
            .invite(&quiz(QuizStatus::Published), &["guest@example.com".to_string()], &inviter())
            .await;

        let report = match result {
            Err(InvitationError::MailUnavailable(report)) => report,
            other => panic!("expected MailUnavailable, got {other:?}"),
        };
        assert!(report.valid.is_empty());
        assert_eq!(report.invalid[0].get("guest@example.com"), Some(&NOT_SENT));
    }

    #[tokio::test]
    async fn invite_mail_failure_keeps_the_rest_of_the_batch() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        repo.expect_create_invitation().returning(|_, email, _, _| {
            let inv = invitation(email, false, None);
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_mark_invitation_sent()
            .times(2)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut email = MockEmailSender::new();
        email.expect_send().times(3).returning(|m| {
            let bounce = m.to == "bounce@example.com";
            Box::pin(async move {
                if bounce {
                    Err(color_eyre::eyre::eyre!("send failed"))
                } else {
                    Ok(())
                }
            })
        });

        let svc = service(repo, email);
        let result = svc
            .invite(
                &quiz(QuizStatus::Published),
                &[
                    "first@example.com".to_string(),
                    "bounce@example.com".to_string(),
                    "last@example.com".to_string(),
                ],
                &inviter(),
            )
            .await;

        let report = match result {
            Err(InvitationError::MailUnavailable(report)) => report,
            other => panic!("expected MailUnavailable, got {other:?}"),
        };
        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.valid[0].get("first@example.com"), Some(&INVITED));
        assert_eq!(report.valid[1].get("last@example.com"), Some(&INVITED));
        assert_eq!(report.invalid[0].get("bounce@example.com"), Some(&NOT_SENT));
    }

    #[tokio::test]
    async fn invite_reissues_invitation_that_was_never_sent() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation().returning(|_, email| {
            let inv = invitation(email, false, None);
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_reissue_invitation()
            .times(1)
            .returning(|_, _| {
                let inv = invitation("guest@example.com", false, None);
                Box::pin(async move { Ok(inv) })
            });
        repo.expect_create_invitation().never();
        repo.expect_mark_invitation_sent()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let svc = service(repo, mock_email_ok());
        let report = svc
            .invite(&quiz(QuizStatus::Published), &["guest@example.com".to_string()], &inviter())
            .await
            .unwrap();

        assert_eq!(report.valid[0].get("guest@example.com"), Some(&INVITED));
        assert!(report.invalid.is_empty());
    }

    #[tokio::test]
    async fn invite_into_closed_quiz_is_rejected() {
        let svc = service(MockInvitationRepository::new(), MockEmailSender::new());
        let result = svc
            .invite(&quiz(QuizStatus::Closed), &["guest@example.com".to_string()], &inviter())
            .await;

        assert!(matches!(result, Err(InvitationError::QuizClosed)));
    }

    // ----- accept tests -----

    #[tokio::test]
    async fn accept_unknown_key_is_gone() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation_by_key()
            .returning(|_| Box::pin(async { Ok(None) }));

        let svc = service(repo, MockEmailSender::new());
        assert_eq!(svc.accept("missing", None).await.unwrap(), AcceptOutcome::Gone);
    }

    #[tokio::test]
    async fn accept_expired_invitation_is_gone() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation_by_key().returning(|_| {
            let inv = invitation("a@example.com", false, Some(Utc::now() - chrono::Duration::days(3)));
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_accept_invitation().never();

        let svc = service(repo, MockEmailSender::new());
        assert_eq!(svc.accept("key", None).await.unwrap(), AcceptOutcome::Gone);
    }

    #[tokio::test]
    async fn accept_already_accepted_returns_quiz_link() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation_by_key().returning(|_| {
            let inv = invitation("a@example.com", true, Some(Utc::now() - chrono::Duration::days(30)));
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_accept_invitation().never();

        let svc = service(repo, MockEmailSender::new());
        let outcome = svc.accept("key", None).await.unwrap();

        assert_eq!(
            outcome,
            AcceptOutcome::Quiz(format!("/quizzes/capitals?token={}", "k".repeat(64)))
        );
    }

    #[tokio::test]
    async fn accept_links_logged_in_user() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation_by_key().returning(|_| {
            let inv = invitation("a@example.com", false, Some(Utc::now()));
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_accept_invitation()
            .withf(|_, user_id| *user_id == Some(7))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(AcceptInvitation::Accepted) }));

        let svc = service(repo, MockEmailSender::new());
        let outcome = svc.accept("key", Some(&inviter())).await.unwrap();

        assert!(matches!(outcome, AcceptOutcome::Quiz(_)));
    }

    #[tokio::test]
    async fn accept_duplicate_participant_is_reported() {
        let mut repo = MockInvitationRepository::new();
        repo.expect_find_invitation_by_key().returning(|_| {
            let inv = invitation("a@example.com", false, None);
            Box::pin(async move { Ok(Some(inv)) })
        });
        repo.expect_accept_invitation()
            .returning(|_, _| Box::pin(async { Ok(AcceptInvitation::ParticipantExists) }));

        let svc = service(repo, MockEmailSender::new());
        assert_eq!(
            svc.accept("key", None).await.unwrap(),
            AcceptOutcome::ParticipantExists
        );
    }
}
