use std::collections::BTreeMap;

use crate::db::DatabaseError;
use crate::knowledge::KnowledgeBase;

/// Outcome of weighted rule scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnosis {
    /// Winning disease id, `None` when no symptom resolved to any rule.
    pub best: Option<i64>,
    /// Summed weight per disease id.
    pub scores: BTreeMap<i64, f64>,
    /// Symptoms that resolved to a known id, in input order.
    pub resolved: Vec<(String, i64)>,
}

impl Diagnosis {
    pub fn resolved_symptoms(&self) -> Vec<String> {
        self.resolved.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Score diseases by summing rule weights over the detected symptoms.
///
/// Unresolved symptoms are skipped. `generic_id` only wins when it is the
/// sole candidate. Ties go to the lowest disease id.
pub fn score(
    symptoms: &[String],
    kb: &dyn KnowledgeBase,
    generic_id: i64,
) -> Result<Diagnosis, DatabaseError> {
    let mut scores: BTreeMap<i64, f64> = BTreeMap::new();
    let mut resolved = Vec::new();

    for symptom in symptoms {
        let Some(symptom_id) = kb.resolve_symptom_id(symptom)? else {
            tracing::debug!(symptom = %symptom, "Symptom has no knowledge-base entry");
            continue;
        };
        resolved.push((symptom.clone(), symptom_id));

        for rule in kb.lookup_disease_rules(symptom_id)? {
            *scores.entry(rule.disease_id).or_insert(0.0) += rule.weight;
        }
    }

    let best = pick_winner(&scores, generic_id);
    Ok(Diagnosis {
        best,
        scores,
        resolved,
    })
}

fn pick_winner(scores: &BTreeMap<i64, f64>, generic_id: i64) -> Option<i64> {
    let mut best: Option<(i64, f64)> = None;
    for (&id, &total) in scores {
        if id == generic_id || total <= 0.0 {
            continue;
        }
        // Strict comparison keeps the first (lowest) id on ties.
        if best.map_or(true, |(_, top)| total > top) {
            best = Some((id, total));
        }
    }

    match best {
        Some((id, _)) => Some(id),
        None => scores
            .get(&generic_id)
            .filter(|total| **total > 0.0)
            .map(|_| generic_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::knowledge::SqliteKnowledgeBase;
    use crate::models::enums::KnowledgeSource;
    use crate::models::{Disease, MedicationAdvice, SymptomRule};
    use std::collections::HashMap;

    /// In-memory rule table: symptom name → (id, rules).
    struct RuleTable {
        symptoms: HashMap<&'static str, i64>,
        rules: Vec<SymptomRule>,
    }

    impl RuleTable {
        fn new(symptoms: &[(&'static str, i64)], rules: &[(i64, i64, f64)]) -> Self {
            Self {
                symptoms: symptoms.iter().copied().collect(),
                rules: rules
                    .iter()
                    .map(|&(symptom_id, disease_id, weight)| SymptomRule {
                        symptom_id,
                        disease_id,
                        weight,
                    })
                    .collect(),
            }
        }
    }

    impl KnowledgeBase for RuleTable {
        fn lookup_symptom_synonyms(&self, _: &str) -> Result<Vec<String>, DatabaseError> {
            Ok(vec![])
        }
        fn resolve_symptom_id(&self, s: &str) -> Result<Option<i64>, DatabaseError> {
            Ok(self.symptoms.get(s).copied())
        }
        fn lookup_disease_rules(&self, id: i64) -> Result<Vec<SymptomRule>, DatabaseError> {
            Ok(self.rules.iter().filter(|r| r.symptom_id == id).copied().collect())
        }
        fn disease(&self, _: i64) -> Result<Option<Disease>, DatabaseError> {
            Ok(None)
        }
        fn find_disease_id(&self, _: &str) -> Result<Option<i64>, DatabaseError> {
            Ok(None)
        }
        fn upsert_disease(&self, _: &str, _: Option<&str>, _: KnowledgeSource) -> Result<i64, DatabaseError> {
            Ok(0)
        }
        fn upsert_medication_and_rule(
            &self,
            _: &str,
            _: Option<&str>,
            _: i64,
            _: &str,
            _: &str,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
        fn medication_for_disease(&self, _: i64) -> Result<Option<MedicationAdvice>, DatabaseError> {
            Ok(None)
        }
        fn learn_symptom_phrase(&self, _: &str, _: i64, _: f64) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn summed_weight_beats_single_strong_hit() {
        let kb = RuleTable::new(
            &[("s1", 1), ("s2", 2), ("s3", 3)],
            &[(1, 10, 0.8), (2, 10, 0.7), (3, 20, 1.2)],
        );
        let diagnosis = score(&names(&["s1", "s2", "s3"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(10));
        assert!((diagnosis.scores[&10] - 1.5).abs() < 1e-9);
        assert!((diagnosis.scores[&20] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn generic_excluded_while_other_candidates_score() {
        let kb = RuleTable::new(&[("s1", 1)], &[(1, 1, 5.0), (1, 7, 0.1)]);
        let diagnosis = score(&names(&["s1"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(7));
    }

    #[test]
    fn generic_selected_when_sole_candidate() {
        let kb = RuleTable::new(&[("s1", 1)], &[(1, 1, 0.3)]);
        let diagnosis = score(&names(&["s1"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(1));
    }

    #[test]
    fn ties_go_to_lowest_disease_id() {
        let kb = RuleTable::new(&[("s1", 1), ("s2", 2)], &[(1, 9, 1.0), (2, 4, 1.0)]);
        let diagnosis = score(&names(&["s1", "s2"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(4));
    }

    #[test]
    fn unresolved_symptoms_are_skipped() {
        let kb = RuleTable::new(&[("s1", 1)], &[(1, 3, 0.5)]);
        let diagnosis = score(&names(&["nope", "s1"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(3));
        assert_eq!(diagnosis.resolved, vec![("s1".to_string(), 1)]);
    }

    #[test]
    fn no_rules_means_no_match() {
        let kb = RuleTable::new(&[], &[]);
        let diagnosis = score(&names(&["s1"]), &kb, 1).unwrap();
        assert_eq!(diagnosis, Diagnosis::default());
    }

    #[test]
    fn seeded_knowledge_diagnoses_gastroenteritis() {
        let conn = open_memory_database().unwrap();
        let kb = SqliteKnowledgeBase::new(&conn);
        let diagnosis = score(&names(&["diarrea", "vomitos", "nauseas"]), &kb, 1).unwrap();
        let disease = kb.disease(diagnosis.best.unwrap()).unwrap().unwrap();
        assert_eq!(disease.name, "Gastroenteritis");
    }

    #[test]
    fn seeded_fatigue_alone_prefers_specific_disease() {
        let conn = open_memory_database().unwrap();
        let kb = SqliteKnowledgeBase::new(&conn);
        // fatiga → generic 0.5, gripe 0.4: the generic row is excluded.
        let diagnosis = score(&names(&["fatiga"]), &kb, 1).unwrap();
        assert_eq!(diagnosis.best, Some(2));
    }
}
