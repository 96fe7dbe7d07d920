//! PostgreSQL implementation of the storage traits.

use std::sync::Arc;

use async_trait::async_trait;
use chat_common::SnowflakeGenerator;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::error::StoreError;
use crate::models::message::{ChatMessage, MessageWithAuthor, NewChatMessage};
use crate::models::user::{Author, ChatUser, ChatUserRow, UserRole};

use super::pool::DbPool;
use super::schema::{chat_channels, chat_messages, chat_users};
use super::store::{IdentitySource, MessageStore};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    snowflake: Arc<SnowflakeGenerator>,
}

impl PgStore {
    pub fn new(pool: DbPool, snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, snowflake }
    }
}

#[async_trait]
impl IdentitySource for PgStore {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<ChatUser>, StoreError> {
        let mut conn = self.pool.get().await?;

        let row: Option<ChatUserRow> = diesel_async::RunQueryDsl::get_result(
            chat_users::table
                .find(user_id)
                .select(ChatUserRow::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(row.map(ChatUser::from))
    }

    async fn set_online(
        &self,
        user_id: &str,
        online: bool,
        last_seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        diesel_async::RunQueryDsl::execute(
            diesel::update(chat_users::table.find(user_id)).set((
                chat_users::is_online.eq(online),
                chat_users::last_seen_at.eq(Some(last_seen_at)),
            )),
            &mut conn,
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn channel_exists(&self, channel_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;

        let exists: bool = diesel_async::RunQueryDsl::get_result(
            diesel::select(diesel::dsl::exists(chat_channels::table.find(channel_id))),
            &mut conn,
        )
        .await?;

        Ok(exists)
    }

    async fn insert_message(
        &self,
        channel_id: &str,
        user_id: &str,
        content: &str,
        reply_to_id: Option<&str>,
    ) -> Result<ChatMessage, StoreError> {
        let mut conn = self.pool.get().await?;
        let id = self.snowflake.generate().to_string();

        let message: ChatMessage = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(chat_messages::table)
                .values(NewChatMessage {
                    id: &id,
                    channel_id,
                    user_id,
                    content,
                    reply_to_id,
                    created_at: Utc::now(),
                })
                .returning(ChatMessage::as_returning()),
            &mut conn,
        )
        .await?;

        Ok(message)
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageWithAuthor>, StoreError> {
        let mut conn = self.pool.get().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<(ChatMessage, Option<(String, String, String)>)> =
            diesel_async::RunQueryDsl::load(
                chat_messages::table
                    .left_join(chat_users::table.on(chat_users::id.eq(chat_messages::user_id)))
                    .filter(chat_messages::channel_id.eq(channel_id))
                    .order((chat_messages::created_at.desc(), chat_messages::id.desc()))
                    .limit(limit)
                    .select((
                        ChatMessage::as_select(),
                        (
                            chat_users::display_name,
                            chat_users::avatar_color,
                            chat_users::role,
                        )
                            .nullable(),
                    )),
                &mut conn,
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(message, author)| MessageWithAuthor {
                message,
                author: author.map(|(display_name, avatar_color, role)| Author {
                    display_name,
                    avatar_color,
                    role: UserRole::from_db(&role),
                }),
            })
            .collect())
    }
}
