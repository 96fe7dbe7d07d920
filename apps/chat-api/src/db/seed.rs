use crate::models::channel::ChatChannel;
use crate::models::user::{ChatUser, UserRole};

use super::memory::MemoryStore;

/// Channels every fresh deployment starts with. Mirrored by the initial SQL migration.
pub fn default_channels() -> Vec<ChatChannel> {
    vec![
        ChatChannel::new("general", "general", "Community").default_channel(),
        ChatChannel::new("introductions", "introductions", "Community"),
        ChatChannel::new("off-topic", "off-topic", "Lounge"),
    ]
}

/// Seed the default channels. Idempotent: existing ids are left alone.
/// Returns how many channels were added.
pub fn seed_default_channels(store: &MemoryStore) -> usize {
    default_channels()
        .into_iter()
        .filter(|channel| store.insert_channel(channel.clone()))
        .count()
}

/// Accounts for local development, where no identity service is attached.
pub fn demo_users() -> Vec<ChatUser> {
    vec![
        ChatUser::new("demo-ada", "ada", "Ada", "#e11d48", UserRole::Member),
        ChatUser::new("demo-grace", "grace", "Grace", "#2563eb", UserRole::Admin),
        ChatUser::new("demo-bot", "helper", "Helper Bot", "#16a34a", UserRole::Bot),
    ]
}

/// Seed the demo users, skipping ids already present. Returns the ids added.
pub fn seed_demo_users(store: &MemoryStore) -> Vec<String> {
    demo_users()
        .into_iter()
        .filter(|user| store.user(&user.id).is_none())
        .map(|user| {
            let id = user.id.clone();
            store.insert_user(user);
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(seed_default_channels(&store), 3);
        assert_eq!(seed_default_channels(&store), 0);

        let channels = store.channels();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].id, "general");
        assert!(channels[0].is_default);
    }

    #[test]
    fn demo_users_are_seeded_once_and_keep_existing_profiles() {
        let store = MemoryStore::new();
        let mut renamed = ChatUser::new("demo-ada", "ada", "Ada L.", "#000000", UserRole::Member);
        renamed.is_online = true;
        store.insert_user(renamed);

        let added = seed_demo_users(&store);
        assert_eq!(added, vec!["demo-grace".to_string(), "demo-bot".to_string()]);
        assert!(seed_demo_users(&store).is_empty());

        let ada = store.user("demo-ada").unwrap();
        assert_eq!(ada.display_name, "Ada L.");
        assert!(ada.is_online);
        assert_eq!(store.user("demo-grace").unwrap().role, UserRole::Admin);
    }
}
