use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::KnowledgeSource;
use crate::models::{Disease, SymptomRule};

// ═══════════════════════════════════════════
// Symptoms & synonyms
// ═══════════════════════════════════════════

/// Resolve a canonical symptom name to its id (case-insensitive).
pub fn find_symptom_id(conn: &Connection, name: &str) -> Result<Option<i64>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM symptoms WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Canonical symptoms whose synonym phrase occurs inside `normalized_text`.
/// Ordered by symptom id so repeated lookups are stable.
pub fn find_symptoms_by_synonym(
    conn: &Connection,
    normalized_text: &str,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.name FROM symptoms s
         WHERE EXISTS (
             SELECT 1 FROM symptom_synonyms ss
             WHERE ss.symptom_id = s.id AND instr(?1, lower(ss.phrase)) > 0
         )
         ORDER BY s.id ASC",
    )?;
    let rows = stmt.query_map(params![normalized_text], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Insert a symptom if no symptom with that name exists. Returns its id either way.
pub fn upsert_symptom(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO symptoms (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    find_symptom_id(conn, name)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Symptom".into(),
        id: name.into(),
    })
}

pub fn insert_synonym(conn: &Connection, symptom_id: i64, phrase: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO symptom_synonyms (symptom_id, phrase) VALUES (?1, ?2)
         ON CONFLICT(symptom_id, phrase) DO NOTHING",
        params![symptom_id, phrase],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════
// Inference rules
// ═══════════════════════════════════════════

/// All weighted disease contributions of one symptom, by ascending disease id.
pub fn get_rules_for_symptom(
    conn: &Connection,
    symptom_id: i64,
) -> Result<Vec<SymptomRule>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT symptom_id, disease_id, weight FROM inference_rules
         WHERE symptom_id = ?1 ORDER BY disease_id ASC",
    )?;
    let rows = stmt.query_map(params![symptom_id], |row| {
        Ok(SymptomRule {
            symptom_id: row.get(0)?,
            disease_id: row.get(1)?,
            weight: row.get(2)?,
        })
    })?;

    let mut rules = Vec::new();
    for row in rows {
        rules.push(row?);
    }
    Ok(rules)
}

pub fn upsert_rule(conn: &Connection, rule: &SymptomRule) -> Result<(), DatabaseError> {
    if rule.weight <= 0.0 {
        return Err(DatabaseError::RejectedEntry(format!(
            "rule weight must be positive, got {}",
            rule.weight
        )));
    }
    conn.execute(
        "INSERT INTO inference_rules (symptom_id, disease_id, weight) VALUES (?1, ?2, ?3)
         ON CONFLICT(symptom_id, disease_id) DO UPDATE SET weight = excluded.weight",
        params![rule.symptom_id, rule.disease_id, rule.weight],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════
// Diseases
// ═══════════════════════════════════════════

pub fn get_disease(conn: &Connection, id: i64) -> Result<Option<Disease>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, description, source FROM diseases WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, description, source)| {
        Ok(Disease {
            id,
            name,
            description,
            source: KnowledgeSource::from_str(&source)?,
        })
    })
    .transpose()
}

/// Case-insensitive lookup of a disease id by name.
pub fn find_disease_id(conn: &Connection, name: &str) -> Result<Option<i64>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM diseases WHERE name = ?1",
            params![name.trim()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Create the disease or reuse the existing one with the same name.
///
/// A concurrent insert of the same name resolves to the existing row. An
/// existing non-empty description is never overwritten.
pub fn upsert_disease(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    source: KnowledgeSource,
) -> Result<i64, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::RejectedEntry("disease name is empty".into()));
    }
    conn.execute(
        "INSERT INTO diseases (name, description, source) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET
             description = COALESCE(NULLIF(diseases.description, ''), excluded.description)",
        params![name, description, source.as_str()],
    )?;
    find_disease_id(conn, name)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Disease".into(),
        id: name.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn seeded_symptom_resolves_case_insensitively() {
        let conn = open_memory_database().unwrap();
        assert_eq!(find_symptom_id(&conn, "fiebre").unwrap(), Some(1));
        assert_eq!(find_symptom_id(&conn, "FIEBRE").unwrap(), Some(1));
        assert_eq!(find_symptom_id(&conn, "hipo").unwrap(), None);
    }

    #[test]
    fn synonym_lookup_matches_substrings() {
        let conn = open_memory_database().unwrap();
        let found = find_symptoms_by_synonym(&conn, "ando con mocos y jaqueca").unwrap();
        assert_eq!(found, vec!["dolor de cabeza", "congestion nasal"]);
    }

    #[test]
    fn synonym_lookup_without_match_is_empty() {
        let conn = open_memory_database().unwrap();
        assert!(find_symptoms_by_synonym(&conn, "me pica el codo").unwrap().is_empty());
    }

    #[test]
    fn rules_ordered_by_disease() {
        let conn = open_memory_database().unwrap();
        let rules = get_rules_for_symptom(&conn, 3).unwrap();
        let diseases: Vec<i64> = rules.iter().map(|r| r.disease_id).collect();
        assert_eq!(diseases, vec![2, 3]);
    }

    #[test]
    fn upsert_disease_reuses_existing_row_ignoring_case() {
        let conn = open_memory_database().unwrap();
        let first = upsert_disease(&conn, "Dengue", Some("Aprendida"), KnowledgeSource::Taught).unwrap();
        let second = upsert_disease(&conn, "dengue", None, KnowledgeSource::Taught).unwrap();
        assert_eq!(first, second);

        let disease = get_disease(&conn, first).unwrap().unwrap();
        assert_eq!(disease.name, "Dengue");
        assert_eq!(disease.description.as_deref(), Some("Aprendida"));
        assert_eq!(disease.source, KnowledgeSource::Taught);
    }

    #[test]
    fn upsert_disease_fills_missing_description_only() {
        let conn = open_memory_database().unwrap();
        let id = upsert_disease(&conn, "Varicela", None, KnowledgeSource::Taught).unwrap();
        upsert_disease(&conn, "Varicela", Some("Infección viral"), KnowledgeSource::Encyclopedia).unwrap();
        upsert_disease(&conn, "Varicela", Some("Otra"), KnowledgeSource::Encyclopedia).unwrap();

        let disease = get_disease(&conn, id).unwrap().unwrap();
        assert_eq!(disease.description.as_deref(), Some("Infección viral"));
    }

    #[test]
    fn empty_disease_name_rejected() {
        let conn = open_memory_database().unwrap();
        assert!(upsert_disease(&conn, "   ", None, KnowledgeSource::Taught).is_err());
    }

    #[test]
    fn rule_weight_must_be_positive() {
        let conn = open_memory_database().unwrap();
        let rule = SymptomRule { symptom_id: 1, disease_id: 2, weight: 0.0 };
        assert!(upsert_rule(&conn, &rule).is_err());
    }

    #[test]
    fn learned_symptom_synonym_and_rule_are_found() {
        let conn = open_memory_database().unwrap();
        let disease = upsert_disease(&conn, "Dengue", None, KnowledgeSource::Taught).unwrap();
        let symptom = upsert_symptom(&conn, "puntos rojos en la piel").unwrap();
        insert_synonym(&conn, symptom, "puntos rojos en la piel").unwrap();
        upsert_rule(&conn, &SymptomRule { symptom_id: symptom, disease_id: disease, weight: 0.6 }).unwrap();

        let found = find_symptoms_by_synonym(&conn, "me salieron puntos rojos en la piel").unwrap();
        assert_eq!(found, vec!["puntos rojos en la piel"]);
        let rules = get_rules_for_symptom(&conn, symptom).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].disease_id, disease);
    }
}
