// src/store/conversation.rs
use sqlx::PgPool;

use crate::models::chat::{ChatHistoryEntry, MemoryMessage, SessionPreview};
use crate::normalize::QueryAnswer;
use crate::store::StoreError;

/// Persistence over chat sessions, history, and memory. Every operation that
/// touches an existing session takes the requesting user id and refuses with
/// `AccessDenied` when it does not match the owner.
pub struct ConversationStore {
    db_pool: PgPool,
}

impl ConversationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Sessions for a user, newest first, each carrying the chronologically
    /// first exchange of the conversation as its preview.
    pub async fn list_sessions(&self, user_id: i32) -> Result<Vec<SessionPreview>, StoreError> {
        let sessions = sqlx::query_as::<_, SessionPreview>(
            "SELECT s.chat_id, s.chat_name, s.favorite, s.created_at, h.query, h.answer
             FROM chat_sessions s
             LEFT JOIN LATERAL (
                 SELECT query, answer FROM chat_history
                 WHERE chat_history.chat_id = s.chat_id
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1
             ) h ON TRUE
             WHERE s.user_id = $1
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(sessions)
    }

    pub async fn get_history(
        &self,
        chat_id: &str,
        user_id: i32,
    ) -> Result<Vec<ChatHistoryEntry>, StoreError> {
        self.verify_owner(chat_id, user_id).await?;

        let entries = sqlx::query_as::<_, ChatHistoryEntry>(
            "SELECT id, chat_id, query, answer, pdf_references, online_images, online_videos,
                    online_links, related_queries, products, created_at
             FROM chat_history
             WHERE chat_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }

    /// Idempotent insert; an existing session keeps its original name.
    pub async fn ensure_session(
        &self,
        chat_id: &str,
        chat_name: &str,
        user_id: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO chat_sessions (chat_id, chat_name, user_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .bind(chat_name)
        .bind(user_id)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    /// Appends one exchange with its side channels. Prior entries are never
    /// touched.
    pub async fn append_history(
        &self,
        chat_id: &str,
        user_id: i32,
        query: &str,
        answer: &QueryAnswer,
    ) -> Result<(), StoreError> {
        self.verify_owner(chat_id, user_id).await?;

        sqlx::query(
            "INSERT INTO chat_history
             (chat_id, user_id, query, answer, pdf_references, online_images, online_videos,
              online_links, related_queries, products)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(query)
        .bind(&answer.answer)
        .bind(sqlx::types::Json(&answer.pdf_references))
        .bind(sqlx::types::Json(&answer.online_images))
        .bind(sqlx::types::Json(&answer.online_videos))
        .bind(sqlx::types::Json(&answer.online_links))
        .bind(sqlx::types::Json(&answer.related_queries))
        .bind(sqlx::types::Json(&answer.products))
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    /// The session's memory window, or empty when none has been stored yet.
    pub async fn get_memory(&self, chat_id: &str) -> Result<Vec<MemoryMessage>, StoreError> {
        let memory = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT memory FROM chat_memory WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.db_pool)
        .await?;

        match memory {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    /// Create-if-absent, else full replace.
    pub async fn put_memory(
        &self,
        chat_id: &str,
        messages: &[MemoryMessage],
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO chat_memory (chat_id, memory)
             VALUES ($1, $2)
             ON CONFLICT (chat_id) DO UPDATE
             SET memory = EXCLUDED.memory, updated_at = NOW()",
        )
        .bind(chat_id)
        .bind(sqlx::types::Json(messages))
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    pub async fn set_favorite(
        &self,
        chat_id: &str,
        user_id: i32,
        favorite: bool,
    ) -> Result<(), StoreError> {
        self.verify_owner(chat_id, user_id).await?;

        sqlx::query("UPDATE chat_sessions SET favorite = $1 WHERE chat_id = $2")
            .bind(favorite)
            .bind(chat_id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    pub async fn rename_session(
        &self,
        chat_id: &str,
        user_id: i32,
        chat_name: &str,
    ) -> Result<(), StoreError> {
        self.verify_owner(chat_id, user_id).await?;

        sqlx::query("UPDATE chat_sessions SET chat_name = $1 WHERE chat_id = $2")
            .bind(chat_name)
            .bind(chat_id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    /// Removes memory, history, then the session row in one transaction.
    /// Ownership violations delete nothing.
    pub async fn delete_session(&self, chat_id: &str, user_id: i32) -> Result<(), StoreError> {
        self.verify_owner(chat_id, user_id).await?;

        let mut tx = self.db_pool.begin().await?;

        sqlx::query("DELETE FROM chat_memory WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_history WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_sessions WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn verify_owner(&self, chat_id: &str, user_id: i32) -> Result<(), StoreError> {
        let owner = sqlx::query_scalar::<_, i32>(
            "SELECT user_id FROM chat_sessions WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.db_pool)
        .await?;

        match owner {
            None => Err(StoreError::NotFound("chat session")),
            Some(owner) if owner != user_id => {
                tracing::warn!(
                    "user {} attempted to access chat {} owned by user {}",
                    user_id,
                    chat_id,
                    owner
                );
                Err(StoreError::AccessDenied)
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::append_exchange;
    use crate::normalize::normalize_query_response;
    use serde_json::json;

    async fn create_user(pool: &PgPool, username: &str) -> i32 {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, 'x') RETURNING id",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .fetch_one(pool)
        .await
        .expect("failed to create test user")
    }

    fn answer(text: &str) -> QueryAnswer {
        normalize_query_response(json!({"answer": text}), "test query")
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ensure_session_is_idempotent_and_first_name_wins(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool.clone());

        store.ensure_session("chat-1", "First Name", user).await.unwrap();
        store.ensure_session("chat-1", "Second Name", user).await.unwrap();

        let sessions = store.list_sessions(user).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].chat_name, "First Name");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn history_is_returned_in_conversation_order(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool.clone());
        store.ensure_session("chat-1", "Chat", user).await.unwrap();

        for i in 0..3 {
            store
                .append_history("chat-1", user, &format!("q{}", i), &answer(&format!("a{}", i)))
                .await
                .unwrap();
        }

        let history = store.get_history("chat-1", user).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].query, "q0");
        assert_eq!(history[2].answer, "a2");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ownership_is_enforced_on_reads_writes_and_deletes(pool: PgPool) {
        let alice = create_user(&pool, "alice").await;
        let bob = create_user(&pool, "bob").await;
        let store = ConversationStore::new(pool.clone());

        store.ensure_session("chat-1", "Alice's Chat", alice).await.unwrap();
        store.append_history("chat-1", alice, "q", &answer("a")).await.unwrap();

        assert!(matches!(
            store.get_history("chat-1", bob).await,
            Err(StoreError::AccessDenied)
        ));
        assert!(matches!(
            store.set_favorite("chat-1", bob, true).await,
            Err(StoreError::AccessDenied)
        ));
        assert!(matches!(
            store.append_history("chat-1", bob, "q", &answer("a")).await,
            Err(StoreError::AccessDenied)
        ));
        assert!(matches!(
            store.delete_session("chat-1", bob).await,
            Err(StoreError::AccessDenied)
        ));

        // Nothing was modified or deleted by the refused operations.
        let sessions = store.list_sessions(alice).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].favorite);
        assert_eq!(store.get_history("chat-1", alice).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_session_reports_not_found(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool);

        assert!(matches!(
            store.get_history("missing", user).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_session("missing", user).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_a_session_cascades_to_history_and_memory(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool.clone());

        store.ensure_session("chat-1", "Chat", user).await.unwrap();
        store.append_history("chat-1", user, "q1", &answer("a1")).await.unwrap();
        store.append_history("chat-1", user, "q2", &answer("a2")).await.unwrap();
        store
            .put_memory("chat-1", &[MemoryMessage::user("q1"), MemoryMessage::assistant("a1")])
            .await
            .unwrap();

        store.delete_session("chat-1", user).await.unwrap();

        assert!(matches!(
            store.get_history("chat-1", user).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get_memory("chat-1").await.unwrap().is_empty());

        let history_rows = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_history WHERE chat_id = 'chat-1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(history_rows, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn memory_upsert_replaces_and_stays_bounded(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool);
        store.ensure_session("chat-1", "Chat", user).await.unwrap();

        assert!(store.get_memory("chat-1").await.unwrap().is_empty());

        let mut memory = Vec::new();
        for i in 0..12 {
            append_exchange(&mut memory, &format!("q{}", i), &format!("a{}", i));
            store.put_memory("chat-1", &memory).await.unwrap();
        }

        let stored = store.get_memory("chat-1").await.unwrap();
        assert_eq!(stored.len(), crate::models::chat::MEMORY_LIMIT);
        assert_eq!(stored[0].content, "q2");
        assert_eq!(stored.last().unwrap().content, "a11");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn sessions_list_newest_first_with_first_exchange_preview(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool);

        store.ensure_session("chat-old", "Old", user).await.unwrap();
        store.append_history("chat-old", user, "first q", &answer("first a")).await.unwrap();
        store.append_history("chat-old", user, "second q", &answer("second a")).await.unwrap();

        store.ensure_session("chat-new", "New", user).await.unwrap();

        let sessions = store.list_sessions(user).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].chat_id, "chat-new");
        assert!(sessions[0].query.is_none());
        assert_eq!(sessions[1].query.as_deref(), Some("first q"));
        assert_eq!(sessions[1].answer.as_deref(), Some("first a"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn favorite_flag_toggles_and_rename_applies(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        let store = ConversationStore::new(pool);
        store.ensure_session("chat-1", "Chat", user).await.unwrap();

        store.set_favorite("chat-1", user, true).await.unwrap();
        store.rename_session("chat-1", user, "Renamed").await.unwrap();

        let sessions = store.list_sessions(user).await.unwrap();
        assert!(sessions[0].favorite);
        assert_eq!(sessions[0].chat_name, "Renamed");
    }
}
