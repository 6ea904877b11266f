//! Friend-gated direct messaging and the conversation aggregator.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use waymark_shared::Viewer;
use waymark_store::Message;

use crate::error::{CoreError, Result};
use crate::SharedDatabase;

pub struct MessagingService {
    db: SharedDatabase,
}

impl MessagingService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Send a message to a friend. Messages are immutable once created;
    /// there is no edit or delete.
    pub async fn send_message(
        &self,
        viewer: &Viewer,
        recipient_id: Uuid,
        content: String,
    ) -> Result<Message> {
        if !viewer.is_friend(recipient_id) {
            return Err(CoreError::Forbidden(
                "can only message friends".to_string(),
            ));
        }

        let recipient = {
            let db = self.db.lock().await;
            db.get_user(recipient_id)
                .map_err(CoreError::missing("recipient"))?
        };

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: viewer.id,
            sender_username: viewer.username.clone(),
            recipient_id,
            recipient_username: recipient.username,
            content,
            created_at: Utc::now(),
        };

        {
            let db = self.db.lock().await;
            db.insert_message(&message)?;
        }
        Ok(message)
    }

    /// The full two-way thread with a friend, oldest first.
    pub async fn get_thread(&self, viewer: &Viewer, peer_id: Uuid) -> Result<Vec<Message>> {
        if !viewer.is_friend(peer_id) {
            return Err(CoreError::Forbidden(
                "can only view messages with friends".to_string(),
            ));
        }

        let db = self.db.lock().await;
        Ok(db.list_thread(viewer.id, peer_id)?)
    }

    /// One record per distinct message peer: the most recent message
    /// exchanged with that peer, in either direction. Unordered across
    /// peers. This is a last-message-per-peer view, not a full thread list.
    pub async fn list_conversations(&self, viewer: &Viewer) -> Result<Vec<Message>> {
        let messages = {
            let db = self.db.lock().await;
            db.list_messages_involving(viewer.id)?
        };

        // Input is newest-first, so the first message seen per peer wins.
        let mut latest: HashMap<Uuid, Message> = HashMap::new();
        for message in messages {
            let peer = message.peer_of(viewer.id);
            latest.entry(peer).or_insert(message);
        }
        Ok(latest.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{DateTime, Duration};
    use tokio::sync::Mutex;

    use waymark_store::{Database, User};

    use super::*;

    fn test_db() -> SharedDatabase {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    async fn insert_user(db: &SharedDatabase, name: &str, friends: &[Uuid]) -> Viewer {
        let user = User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: None,
            profile_photo: None,
            is_guest: false,
            friends: friends.iter().copied().collect(),
            friend_requests: BTreeSet::new(),
            created_at: Utc::now(),
        };
        db.lock().await.insert_user(&user).unwrap();
        Viewer {
            id: user.id,
            username: user.username,
            friends: user.friends,
            friend_requests: BTreeSet::new(),
            is_guest: false,
        }
    }

    fn raw_message(
        sender: &Viewer,
        recipient: &Viewer,
        content: &str,
        at: DateTime<Utc>,
    ) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            sender_username: sender.username.clone(),
            recipient_id: recipient.id,
            recipient_username: recipient.username.clone(),
            content: content.to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn messaging_requires_friendship() {
        let db = test_db();
        let service = MessagingService::new(db.clone());
        let stranger = insert_user(&db, "stranger", &[]).await;
        let target = insert_user(&db, "target", &[]).await;

        let err = service
            .send_message(&stranger, target.id, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = service.get_thread(&stranger, target.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn send_and_thread_round_trip() {
        let db = test_db();
        let service = MessagingService::new(db.clone());
        let b_id = Uuid::new_v4();
        let a = insert_user(&db, "a", &[b_id]).await;
        // b's row must exist under the pre-chosen id for recipient lookup.
        let b = {
            let user = User {
                id: b_id,
                username: "b".to_string(),
                email: "b@example.com".to_string(),
                password_hash: None,
                profile_photo: None,
                is_guest: false,
                friends: BTreeSet::from([a.id]),
                friend_requests: BTreeSet::new(),
                created_at: Utc::now(),
            };
            db.lock().await.insert_user(&user).unwrap();
            Viewer {
                id: user.id,
                username: user.username,
                friends: user.friends,
                friend_requests: BTreeSet::new(),
                is_guest: false,
            }
        };

        let sent = service
            .send_message(&a, b.id, "hello b".to_string())
            .await
            .unwrap();
        assert_eq!(sent.recipient_username, "b");

        let thread = service.get_thread(&b, a.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].content, "hello b");
    }

    #[tokio::test]
    async fn message_to_missing_recipient_is_not_found() {
        let db = test_db();
        let service = MessagingService::new(db.clone());
        let ghost = Uuid::new_v4();
        let a = insert_user(&db, "a", &[ghost]).await;

        let err = service
            .send_message(&a, ghost, "anyone there?".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn conversations_keep_latest_message_per_peer() {
        let db = test_db();
        let service = MessagingService::new(db.clone());
        let a = insert_user(&db, "a", &[]).await;
        let b = insert_user(&db, "b", &[]).await;
        let c = insert_user(&db, "c", &[]).await;
        let t0 = Utc::now();

        // A→B at t1, B→A at t2 > t1, B→C at t3: A's view has exactly one
        // record, for peer B, carrying the t2 message, and none for C.
        let t1 = raw_message(&a, &b, "first", t0);
        let t2 = raw_message(&b, &a, "second", t0 + Duration::seconds(10));
        let t3 = raw_message(&b, &c, "other thread", t0 + Duration::seconds(20));
        for m in [&t1, &t2, &t3] {
            db.lock().await.insert_message(m).unwrap();
        }

        let conversations = service.list_conversations(&a).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].content, "second");
        assert_eq!(conversations[0].peer_of(a.id), b.id);
    }

    #[tokio::test]
    async fn conversations_cover_multiple_peers() {
        let db = test_db();
        let service = MessagingService::new(db.clone());
        let a = insert_user(&db, "a", &[]).await;
        let b = insert_user(&db, "b", &[]).await;
        let c = insert_user(&db, "c", &[]).await;
        let t0 = Utc::now();

        for m in [
            &raw_message(&a, &b, "to b", t0),
            &raw_message(&c, &a, "from c", t0 + Duration::seconds(5)),
        ] {
            db.lock().await.insert_message(m).unwrap();
        }

        let mut peers: Vec<Uuid> = service
            .list_conversations(&a)
            .await
            .unwrap()
            .iter()
            .map(|m| m.peer_of(a.id))
            .collect();
        peers.sort();
        let mut expected = vec![b.id, c.id];
        expected.sort();
        assert_eq!(peers, expected);
    }
}
