use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::enums::MessageRole;
use crate::models::{Conversation, Message};

const MAX_TITLE_CHARS: usize = 50;
const EMPTY_TITLE: &str = "Nueva conversación";

/// Persisted message log consumed by the turn processor.
pub trait ConversationLog {
    /// Create a conversation for `user_id`, titled from `seed_text`.
    fn create_conversation(&self, user_id: i64, seed_text: &str) -> Result<Uuid, DatabaseError>;

    fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError>;

    /// Messages in insertion order.
    fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, DatabaseError>;

    fn set_title(&self, conversation_id: Uuid, title: &str) -> Result<(), DatabaseError>;

    /// User who owns the conversation, `None` when it does not exist.
    fn conversation_owner(&self, conversation_id: Uuid) -> Result<Option<i64>, DatabaseError>;
}

/// Manages conversation lifecycle and message persistence.
pub struct ConversationManager<'a> {
    conn: &'a Connection,
}

impl<'a> ConversationManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn ensure_conversation_exists(&self, id: Uuid) -> Result<(), DatabaseError> {
        if repository::get_conversation(self.conn, &id)?.is_none() {
            return Err(DatabaseError::NotFound {
                entity_type: "Conversation".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

impl ConversationLog for ConversationManager<'_> {
    fn create_conversation(&self, user_id: i64, seed_text: &str) -> Result<Uuid, DatabaseError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            started_at: Local::now().naive_local(),
            title: Some(generate_title(seed_text)),
        };
        repository::insert_conversation(self.conn, &conversation)?;
        Ok(conversation.id)
    }

    fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError> {
        self.ensure_conversation_exists(conversation_id)?;

        let msg = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            timestamp: Local::now().naive_local(),
        };
        repository::insert_message(self.conn, &msg)
    }

    fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, DatabaseError> {
        self.ensure_conversation_exists(conversation_id)?;
        repository::get_messages_by_conversation(self.conn, &conversation_id)
    }

    fn set_title(&self, conversation_id: Uuid, title: &str) -> Result<(), DatabaseError> {
        repository::update_conversation_title(self.conn, &conversation_id, title)
    }

    fn conversation_owner(&self, conversation_id: Uuid) -> Result<Option<i64>, DatabaseError> {
        Ok(repository::get_conversation(self.conn, &conversation_id)?.map(|c| c.user_id))
    }
}

/// Generate a conversation title from the first user message.
/// Truncates at 50 characters with "..." if longer, handling UTF-8 correctly.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return EMPTY_TITLE.to_string();
    }

    match trimmed.char_indices().nth(MAX_TITLE_CHARS) {
        Some((boundary, _)) => format!("{}...", trimmed[..boundary].trim_end()),
        None => trimmed.to_string(),
    }
}

/// Title shown once a turn has detected symptoms: "Consulta: a, b, c".
pub fn symptom_title(symptoms: &[String]) -> String {
    let listed: Vec<&str> = symptoms.iter().take(3).map(String::as_str).collect();
    generate_title(&format!("Consulta: {}", listed.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn test_manager() -> (Connection, Uuid) {
        let conn = open_memory_database().unwrap();
        let manager = ConversationManager::new(&conn);
        let conv_id = manager.create_conversation(7, "Me duele la cabeza").unwrap();
        (conn, conv_id)
    }

    #[test]
    fn create_conversation_titles_from_seed() {
        let (conn, conv_id) = test_manager();
        let conv = repository::get_conversation(&conn, &conv_id).unwrap().unwrap();
        assert_eq!(conv.user_id, 7);
        assert_eq!(conv.title.as_deref(), Some("Me duele la cabeza"));
    }

    #[test]
    fn append_and_retrieve_messages_in_order() {
        let (conn, conv_id) = test_manager();
        let manager = ConversationManager::new(&conn);

        manager.append_message(conv_id, MessageRole::User, "hola").unwrap();
        manager
            .append_message(conv_id, MessageRole::Assistant, "¡Hola! ¿Cómo te sientes hoy?")
            .unwrap();
        manager.append_message(conv_id, MessageRole::User, "tengo tos").unwrap();

        let history = manager.get_messages(conv_id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[2].content, "tengo tos");
    }

    #[test]
    fn message_to_nonexistent_conversation_fails() {
        let conn = open_memory_database().unwrap();
        let manager = ConversationManager::new(&conn);

        let result = manager.append_message(Uuid::new_v4(), MessageRole::User, "hola");
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn set_title_replaces_seed_title() {
        let (conn, conv_id) = test_manager();
        let manager = ConversationManager::new(&conn);
        manager.set_title(conv_id, "Consulta: tos").unwrap();

        let conv = repository::get_conversation(&conn, &conv_id).unwrap().unwrap();
        assert_eq!(conv.title.as_deref(), Some("Consulta: tos"));
    }

    #[test]
    fn conversation_owner_reports_creator() {
        let (conn, conv_id) = test_manager();
        let manager = ConversationManager::new(&conn);
        assert_eq!(manager.conversation_owner(conv_id).unwrap(), Some(7));
        assert_eq!(manager.conversation_owner(Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn empty_conversation_returns_empty_history() {
        let (conn, conv_id) = test_manager();
        let manager = ConversationManager::new(&conn);
        assert!(manager.get_messages(conv_id).unwrap().is_empty());
    }

    // ── Title generation ──

    #[test]
    fn generate_title_short_message() {
        assert_eq!(generate_title("Tengo fiebre"), "Tengo fiebre");
    }

    #[test]
    fn generate_title_exactly_50_chars() {
        let msg = "A".repeat(50);
        assert_eq!(generate_title(&msg), msg);
    }

    #[test]
    fn generate_title_long_message_truncated() {
        let msg = "A".repeat(80);
        let title = generate_title(&msg);
        assert_eq!(title, format!("{}...", "A".repeat(50)));
    }

    #[test]
    fn generate_title_unicode_safe() {
        let msg = "ñ".repeat(60);
        let title = generate_title(&msg);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn generate_title_empty_message() {
        assert_eq!(generate_title(""), "Nueva conversación");
        assert_eq!(generate_title("   "), "Nueva conversación");
    }

    #[test]
    fn symptom_title_lists_first_three() {
        let symptoms: Vec<String> = ["tos", "fiebre", "fatiga", "mareos"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(symptom_title(&symptoms), "Consulta: tos, fiebre, fatiga");
    }
}
