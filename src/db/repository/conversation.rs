use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::TIMESTAMP_FORMAT;
use crate::db::DatabaseError;
use crate::models::enums::MessageRole;
use crate::models::{Conversation, Message};

pub fn insert_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversations (id, user_id, started_at, title) VALUES (?1, ?2, ?3, ?4)",
        params![
            conv.id.to_string(),
            conv.user_id,
            conv.started_at.format(TIMESTAMP_FORMAT).to_string(),
            conv.title,
        ],
    )?;
    Ok(())
}

pub fn get_conversation(conn: &Connection, id: &Uuid) -> Result<Option<Conversation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, user_id, started_at, title FROM conversations WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(Conversation {
                id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
                user_id: row.get(1)?,
                started_at: NaiveDateTime::parse_from_str(
                    &row.get::<_, String>(2)?,
                    TIMESTAMP_FORMAT,
                )
                .unwrap_or_default(),
                title: row.get(3)?,
            })
        },
    );

    match result {
        Ok(conv) => Ok(Some(conv)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_conversation_title(
    conn: &Connection,
    id: &Uuid,
    title: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE conversations SET title = ?1 WHERE id = ?2",
        params![title, id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Conversation".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, content, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.role.as_str(),
            msg.content,
            msg.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Messages of a conversation in append order.
pub fn get_messages_by_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, content, timestamp
         FROM messages WHERE conversation_id = ?1 ORDER BY rowid ASC",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
        Ok(MessageRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            timestamp: row.get(4)?,
        })
    })?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    timestamp: String,
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: Uuid::parse_str(&row.id)?,
        conversation_id: Uuid::parse_str(&row.conversation_id)?,
        role: MessageRole::from_str(&row.role)?,
        content: row.content,
        timestamp: NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .unwrap_or_default(),
    })
}
