use serde::{Deserialize, Serialize};

use super::enums::KnowledgeSource;

/// A disease row of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub source: KnowledgeSource,
}

/// Weighted association `symptom -> disease`. Weights are summed by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymptomRule {
    pub symptom_id: i64,
    pub disease_id: i64,
    pub weight: f64,
}

/// Medication recommended for a disease (dose already merged with frequency).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationAdvice {
    pub name: String,
    pub dose: String,
    pub duration: String,
}
