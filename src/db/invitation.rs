use chrono::{DateTime, Utc};
use color_eyre::{eyre::OptionExt, Result};

use super::models::{Invitation, Page, ParticipantStatus};
use super::{is_unique_violation, Db};
use crate::names;

pub enum AcceptInvitation {
    Accepted,
    AlreadyAccepted,
    /// A participant for this (email, quiz) already exists; nothing was changed.
    ParticipantExists,
}

const INVITATION_SELECT: &str = r#"
    SELECT i.id, i.quiz_id, q.title AS quiz_title, q.slug AS quiz_slug, i.email,
           i.access_key, i.accepted, i.inviter_id, i.sent, i.created_at
    FROM quiz_invitations i
    JOIN quizzes q ON q.id = i.quiz_id
"#;

impl Db {
    pub async fn find_invitation(&self, quiz_id: i64, email: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "{INVITATION_SELECT} WHERE i.quiz_id = $1 AND i.email = $2"
        ))
        .bind(quiz_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    pub async fn find_invitation_by_key(&self, key: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "{INVITATION_SELECT} WHERE i.access_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    /// Returns `None` when another request created the same (quiz, email) first.
    pub async fn create_invitation(
        &self,
        quiz_id: i64,
        email: &str,
        key: &str,
        inviter_id: Option<i64>,
    ) -> Result<Option<Invitation>> {
        let inserted = sqlx::query(
            "INSERT INTO quiz_invitations (quiz_id, email, access_key, inviter_id, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(quiz_id)
        .bind(email)
        .bind(key)
        .bind(inviter_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("invitation for {email} to quiz={quiz_id} already exists");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("invitation created for {email} to quiz={quiz_id}");
        self.find_invitation_by_key(key).await
    }

    /// Give an expired invitation a fresh key and put it back in the created state.
    pub async fn reissue_invitation(&self, invitation_id: i64, key: &str) -> Result<Invitation> {
        sqlx::query(
            "UPDATE quiz_invitations SET access_key = $1, sent = NULL, created_at = $2 WHERE id = $3 AND accepted = 0",
        )
        .bind(key)
        .bind(Utc::now())
        .bind(invitation_id)
        .execute(&self.pool)
        .await?;

        tracing::info!("invitation {invitation_id} re-issued");
        self.find_invitation_by_key(key)
            .await?
            .ok_or_eyre("re-issued invitation not found")
    }

    pub async fn mark_invitation_sent(&self, invitation_id: i64, sent: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE quiz_invitations SET sent = $1 WHERE id = $2")
            .bind(sent)
            .bind(invitation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark the invitation accepted and create its participant in one transaction.
    pub async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Option<i64>,
    ) -> Result<AcceptInvitation> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE quiz_invitations SET accepted = 1 WHERE id = $1 AND accepted = 0",
        )
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(AcceptInvitation::AlreadyAccepted);
        }

        let user_id = match user_id {
            Some(id) => Some(id),
            None => {
                sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
                    .bind(&invitation.email)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO quiz_participants (quiz_id, user_id, email, status, access_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invitation.quiz_id)
        .bind(user_id)
        .bind(&invitation.email)
        .bind(ParticipantStatus::Accepted)
        .bind(&invitation.access_key)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(
                    "participant {} already takes part in quiz={}",
                    invitation.email,
                    invitation.quiz_id
                );
                return Ok(AcceptInvitation::ParticipantExists);
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;

        tracing::info!(
            "invitation {} accepted by {}",
            invitation.id,
            invitation.email
        );
        Ok(AcceptInvitation::Accepted)
    }

    pub async fn invitations_for_quiz(&self, quiz_id: i64, page: i64) -> Result<Page<Invitation>> {
        let page = super::clamp_page(page);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_invitations WHERE quiz_id = $1")
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?;

        let results = sqlx::query_as::<_, Invitation>(&format!(
            "{INVITATION_SELECT} WHERE i.quiz_id = $1 ORDER BY i.id LIMIT $2 OFFSET $3"
        ))
        .bind(quiz_id)
        .bind(names::PAGE_SIZE)
        .bind((page - 1) * names::PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            count,
            page,
            results,
        })
    }
}
