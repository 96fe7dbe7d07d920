//! History replay for connections that join or switch into a channel.

use crate::db::store::MessageStore;
use crate::error::StoreError;

use super::events::MessageView;

/// Number of recent messages replayed on join or channel switch.
pub const HISTORY_LIMIT: usize = 50;

/// Load the most recent messages of a channel, oldest first.
pub async fn load_history(
    store: &dyn MessageStore,
    channel_id: &str,
) -> Result<Vec<MessageView>, StoreError> {
    let mut recent = store.recent_messages(channel_id, HISTORY_LIMIT).await?;
    recent.reverse();
    // Stable, so equal timestamps keep the store's tie-break order.
    recent.sort_by_key(|m| m.message.created_at);
    Ok(recent.into_iter().map(MessageView::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::gateway::events::UNKNOWN_AUTHOR_NAME;
    use crate::models::channel::ChatChannel;
    use crate::models::user::{ChatUser, UserRole};

    async fn store_with_messages(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_channel(ChatChannel::new("general", "general", "Community"));
        store.insert_channel(ChatChannel::new("random", "random", "Lounge"));
        store.insert_user(ChatUser::new("u1", "ada", "Ada", "#ff0000", UserRole::Member));
        for i in 0..count {
            store
                .insert_message("general", "u1", &format!("m{i}"), None)
                .await
                .unwrap();
        }
        store
    }

    fn contents(history: &[MessageView]) -> Vec<String> {
        history.iter().map(|m| m.content.clone()).collect()
    }

    #[tokio::test]
    async fn returns_last_fifty_oldest_first() {
        let store = store_with_messages(60).await;

        let history = load_history(&store, "general").await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.first().unwrap().content, "m10");
        assert_eq!(history.last().unwrap().content, "m59");
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let store = store_with_messages(7).await;

        let first = load_history(&store, "general").await.unwrap();
        let second = load_history(&store, "general").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(contents(&first), vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6"]);
    }

    #[tokio::test]
    async fn empty_channel_has_empty_history() {
        let store = store_with_messages(3).await;
        assert!(load_history(&store, "random").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_authors_do_not_fail_replay() {
        let store = store_with_messages(2).await;
        store.remove_user("u1");

        let history = load_history(&store, "general").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.username == UNKNOWN_AUTHOR_NAME));
    }
}
