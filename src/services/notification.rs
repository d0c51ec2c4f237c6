use color_eyre::Result;

use crate::db::{Db, ParticipantResult};
use crate::email::{EmailSender, ResendEmailSender};
use crate::views;

#[cfg_attr(test, mockall::automock)]
pub trait NotificationRepository: Send + Sync {
    fn completed_unnotified(
        &self,
        quiz_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ParticipantResult>>> + Send;

    fn claim_notification(
        &self,
        participant_id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn release_notification(
        &self,
        participant_id: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl NotificationRepository for Db {
    async fn completed_unnotified(&self, quiz_id: i64) -> Result<Vec<ParticipantResult>> {
        Db::completed_unnotified(self, quiz_id).await
    }

    async fn claim_notification(&self, participant_id: i64) -> Result<bool> {
        Db::claim_notification(self, participant_id).await
    }

    async fn release_notification(&self, participant_id: i64) -> Result<()> {
        Db::release_notification(self, participant_id).await
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub sent: usize,
    pub failed: usize,
    /// Claimed by a concurrent run before this one got to them.
    pub skipped: usize,
}

pub struct NotificationService<R: NotificationRepository = Db, E: EmailSender = ResendEmailSender> {
    repo: R,
    email: E,
}

impl<R: NotificationRepository + Clone, E: EmailSender + Clone> Clone for NotificationService<R, E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            email: self.email.clone(),
        }
    }
}

impl<R: NotificationRepository, E: EmailSender> NotificationService<R, E> {
    pub fn new(repo: R, email: E) -> Self {
        Self { repo, email }
    }

    /// Email results to every completed participant of the quiz that has not
    /// been notified yet.
    #[tracing::instrument(skip(self))]
    pub async fn notify_participants(&self, quiz_id: i64) -> Result<NotifyReport> {
        let pending = self.repo.completed_unnotified(quiz_id).await?;
        let mut report = NotifyReport::default();

        for result in pending {
            if !self.repo.claim_notification(result.id).await? {
                report.skipped += 1;
                continue;
            }

            let message = views::notification::results_email(&result);
            match self.email.send(&message).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::error!("failed to notify participant {}: {e}", result.id);
                    if let Err(e) = self.repo.release_notification(result.id).await {
                        tracing::error!("could not release participant {}: {e}", result.id);
                    }
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "quiz={quiz_id} notified: sent={}, failed={}, skipped={}",
            report.sent,
            report.failed,
            report.skipped
        );
        Ok(report)
    }
}
