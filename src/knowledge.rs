use rusqlite::Connection;

use crate::db::{repository, DatabaseError};
use crate::models::enums::KnowledgeSource;
use crate::models::{Disease, MedicationAdvice, SymptomRule};

/// Symptom, rule, disease and medication lookups used by the dialogue core.
pub trait KnowledgeBase {
    /// Canonical symptoms whose synonym phrases occur in `normalized_text`.
    fn lookup_symptom_synonyms(&self, normalized_text: &str) -> Result<Vec<String>, DatabaseError>;

    fn resolve_symptom_id(&self, canonical_symptom: &str) -> Result<Option<i64>, DatabaseError>;

    fn lookup_disease_rules(&self, symptom_id: i64) -> Result<Vec<SymptomRule>, DatabaseError>;

    fn disease(&self, disease_id: i64) -> Result<Option<Disease>, DatabaseError>;

    fn find_disease_id(&self, name: &str) -> Result<Option<i64>, DatabaseError>;

    /// Create or reuse a disease by case-insensitive name.
    fn upsert_disease(
        &self,
        name: &str,
        description: Option<&str>,
        source: KnowledgeSource,
    ) -> Result<i64, DatabaseError>;

    /// Create or reuse the medication and attach a new recommendation to `disease_id`.
    fn upsert_medication_and_rule(
        &self,
        name: &str,
        description: Option<&str>,
        disease_id: i64,
        dose: &str,
        duration: &str,
    ) -> Result<(), DatabaseError>;

    fn medication_for_disease(&self, disease_id: i64) -> Result<Option<MedicationAdvice>, DatabaseError>;

    fn medication_for_disease_name(&self, name: &str) -> Result<Option<MedicationAdvice>, DatabaseError> {
        match self.find_disease_id(name)? {
            Some(id) => self.medication_for_disease(id),
            None => Ok(None),
        }
    }

    /// Register `phrase` as a symptom with itself as synonym, pointing at `disease_id`.
    fn learn_symptom_phrase(&self, phrase: &str, disease_id: i64, weight: f64) -> Result<(), DatabaseError>;
}

/// SQLite-backed knowledge base.
pub struct SqliteKnowledgeBase<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteKnowledgeBase<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl KnowledgeBase for SqliteKnowledgeBase<'_> {
    fn lookup_symptom_synonyms(&self, normalized_text: &str) -> Result<Vec<String>, DatabaseError> {
        repository::find_symptoms_by_synonym(self.conn, normalized_text)
    }

    fn resolve_symptom_id(&self, canonical_symptom: &str) -> Result<Option<i64>, DatabaseError> {
        repository::find_symptom_id(self.conn, canonical_symptom)
    }

    fn lookup_disease_rules(&self, symptom_id: i64) -> Result<Vec<SymptomRule>, DatabaseError> {
        repository::get_rules_for_symptom(self.conn, symptom_id)
    }

    fn disease(&self, disease_id: i64) -> Result<Option<Disease>, DatabaseError> {
        repository::get_disease(self.conn, disease_id)
    }

    fn find_disease_id(&self, name: &str) -> Result<Option<i64>, DatabaseError> {
        repository::find_disease_id(self.conn, name.trim())
    }

    fn upsert_disease(
        &self,
        name: &str,
        description: Option<&str>,
        source: KnowledgeSource,
    ) -> Result<i64, DatabaseError> {
        repository::upsert_disease(self.conn, name, description, source)
    }

    fn upsert_medication_and_rule(
        &self,
        name: &str,
        description: Option<&str>,
        disease_id: i64,
        dose: &str,
        duration: &str,
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let medication_id = repository::upsert_medication(&tx, name, description)?;
        repository::insert_recommendation(&tx, medication_id, disease_id, dose, duration)?;
        tx.commit()?;
        Ok(())
    }

    fn medication_for_disease(&self, disease_id: i64) -> Result<Option<MedicationAdvice>, DatabaseError> {
        repository::get_recommendation_for_disease(self.conn, disease_id)
    }

    fn learn_symptom_phrase(&self, phrase: &str, disease_id: i64, weight: f64) -> Result<(), DatabaseError> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(DatabaseError::RejectedEntry("symptom phrase is empty".into()));
        }
        let tx = self.conn.unchecked_transaction()?;
        let symptom_id = repository::upsert_symptom(&tx, phrase)?;
        repository::insert_synonym(&tx, symptom_id, phrase)?;
        repository::upsert_rule(
            &tx,
            &SymptomRule {
                symptom_id,
                disease_id,
                weight,
            },
        )?;
        tx.commit()?;
        Ok(())
    }
}
