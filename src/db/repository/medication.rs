use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::MedicationAdvice;

/// Create the medication or reuse the existing one with the same name.
pub fn upsert_medication(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<i64, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::RejectedEntry("medication name is empty".into()));
    }
    conn.execute(
        "INSERT INTO medications (name, description) VALUES (?1, ?2)
         ON CONFLICT(name) DO NOTHING",
        params![name, description],
    )?;
    conn.query_row(
        "SELECT id FROM medications WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .map_err(DatabaseError::from)
}

pub fn insert_recommendation(
    conn: &Connection,
    medication_id: i64,
    disease_id: i64,
    dose: &str,
    duration: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medication_recommendations (medication_id, disease_id, dose, duration)
         VALUES (?1, ?2, ?3, ?4)",
        params![medication_id, disease_id, dose, duration],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent recommendation for a disease; taught advice supersedes seeded advice.
pub fn get_recommendation_for_disease(
    conn: &Connection,
    disease_id: i64,
) -> Result<Option<MedicationAdvice>, DatabaseError> {
    let advice = conn
        .query_row(
            "SELECT m.name, r.dose, r.duration
             FROM medication_recommendations r
             JOIN medications m ON m.id = r.medication_id
             WHERE r.disease_id = ?1
             ORDER BY r.id DESC LIMIT 1",
            params![disease_id],
            |row| {
                Ok(MedicationAdvice {
                    name: row.get(0)?,
                    dose: row.get(1)?,
                    duration: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(advice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn seeded_recommendation_for_flu() {
        let conn = open_memory_database().unwrap();
        let advice = get_recommendation_for_disease(&conn, 2).unwrap().unwrap();
        assert_eq!(advice.name, "Paracetamol");
        assert_eq!(advice.dose, "500 mg cada 8 horas");
        assert_eq!(advice.duration, "3-5 días");
    }

    #[test]
    fn generic_disease_has_no_recommendation() {
        let conn = open_memory_database().unwrap();
        assert!(get_recommendation_for_disease(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn newest_recommendation_wins() {
        let conn = open_memory_database().unwrap();
        let med = upsert_medication(&conn, "Oseltamivir", Some("Antiviral")).unwrap();
        insert_recommendation(&conn, med, 2, "75 mg cada 12 horas", "5 días").unwrap();

        let advice = get_recommendation_for_disease(&conn, 2).unwrap().unwrap();
        assert_eq!(advice.name, "Oseltamivir");
    }

    #[test]
    fn upsert_medication_is_case_insensitive() {
        let conn = open_memory_database().unwrap();
        let a = upsert_medication(&conn, "paracetamol", None).unwrap();
        assert_eq!(a, 1);
    }
}
