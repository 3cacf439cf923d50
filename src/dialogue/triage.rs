use std::sync::LazyLock;

use regex::Regex;

use super::extraction::{fever_tag, parse_bare_temperature, FEVER, FEVER_THRESHOLD_C};
use super::normalize;

/// Fixed interview, asked in order.
pub const TRIAGE_QUESTIONS: [&str; 6] = [
    "¿Has medido tu temperatura recientemente? Si es así, ¿cuál fue?",
    "¿Tienes tos, dolor de garganta o dificultad respiratoria?",
    "¿Sientes dolor en alguna zona específica? (cabeza, garganta, pecho, abdomen)",
    "¿Has tenido náuseas, vómitos o diarrea?",
    "¿Desde hace cuánto tiempo te sientes así? (por ejemplo: 2 días)",
    "Finalmente, en una escala del 1 al 10, ¿qué tan severo consideras tu malestar general?",
];

/// Vague-malaise phrases (normalized, exact match) that open the interview.
pub const TRIAGE_TRIGGERS: &[&str] = &[
    "mas o menos",
    "masomenos",
    "ahi vamos",
    "regular",
    "no muy bien",
    "me siento mal",
    "mal",
    "peor",
    "no bien",
    "no estoy bien",
    "no me siento bien",
];

const AFFIRMATIVE_WORDS: &[&str] = &["si", "claro", "sip", "afirmativo"];
const NEGATION_WORDS: &[&str] = &["no", "ni", "sin", "nada"];

static CLAUSE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;.]|\bpero\b|\by\b").expect("Invalid triage regex"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(dias?|horas?|semanas?|meses|mes)\b").expect("Invalid triage regex")
});
static SEVERITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(10|[1-9])\b").expect("Invalid triage regex"));

/// Answers collected during the interview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriageAnswers {
    pub temperature: Option<f64>,
    pub fever: bool,
    pub cough: bool,
    pub sore_throat: bool,
    pub headache: bool,
    pub abdominal_pain: bool,
    pub chest_pain: bool,
    pub nausea: bool,
    pub vomiting: bool,
    pub diarrhea: bool,
    pub duration: Option<String>,
    /// 1..=10
    pub severity: Option<u8>,
}

impl TriageAnswers {
    /// Labels of the presence flags that are set, for prompt context.
    pub fn reported_flags(&self) -> Vec<&'static str> {
        [
            (self.fever, "fiebre"),
            (self.cough, "tos"),
            (self.sore_throat, "dolor de garganta"),
            (self.headache, "dolor de cabeza"),
            (self.abdominal_pain, "dolor abdominal"),
            (self.chest_pain, "dolor en el pecho"),
            (self.nausea, "nauseas"),
            (self.vomiting, "vomitos"),
            (self.diarrhea, "diarrea"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// What the interview needs after an answer has been recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum TriageProgress {
    /// Ask question `step` (0-based) next.
    Ask { step: usize, prompt: String },
    Finished,
}

/// True when the normalized message should open the interview.
pub fn is_trigger(normalized: &str) -> bool {
    normalized.is_empty() || TRIAGE_TRIGGERS.contains(&normalized)
}

/// Question `step` with its "N/6" progress prefix.
pub fn question_prompt(step: usize) -> String {
    let question = TRIAGE_QUESTIONS.get(step).copied().unwrap_or_default();
    format!("{}/{}: {}", step + 1, TRIAGE_QUESTIONS.len(), question)
}

/// Record the answer to question `step` and report what comes next.
pub fn advance(step: usize, raw: &str, answers: &mut TriageAnswers) -> TriageProgress {
    interpret_answer(step, raw, answers);
    let next = step + 1;
    if next < TRIAGE_QUESTIONS.len() {
        TriageProgress::Ask {
            step: next,
            prompt: question_prompt(next),
        }
    } else {
        TriageProgress::Finished
    }
}

/// Parse a free-text answer to question `step` into `answers`.
pub fn interpret_answer(step: usize, raw: &str, answers: &mut TriageAnswers) {
    let t = normalize(raw);
    let yes = is_affirmative(&t);

    match step {
        0 => {
            if let Some(temp) = parse_bare_temperature(&t) {
                answers.temperature = Some(temp);
            }
            answers.fever = match answers.temperature {
                Some(temp) => temp >= FEVER_THRESHOLD_C,
                None => yes || mentions(&t, "fiebre") || mentions(&t, "calentura"),
            };
        }
        1 => {
            answers.cough |= yes || mentions(&t, "tos");
            answers.sore_throat |= yes || mentions(&t, "garganta");
        }
        2 => {
            answers.headache |= mentions(&t, "cabeza");
            answers.sore_throat |= mentions(&t, "garganta");
            answers.abdominal_pain |= ["abdomen", "estomago", "barriga", "panza"]
                .iter()
                .any(|zone| mentions(&t, zone));
            answers.chest_pain |= mentions(&t, "pecho");
        }
        3 => {
            answers.nausea |= yes || mentions(&t, "nausea");
            answers.vomiting |= yes || mentions(&t, "vomit");
            answers.diarrhea |= yes || mentions(&t, "diarrea");
        }
        4 => {
            answers.duration = match DURATION.captures(&t) {
                Some(caps) => Some(format!("{} {}", &caps[1], &caps[2])),
                None if !raw.trim().is_empty() => Some(raw.trim().to_string()),
                None => None,
            };
        }
        5 => {
            answers.severity = SEVERITY
                .captures(&t)
                .and_then(|caps| caps[1].parse::<u8>().ok());
        }
        _ => {}
    }
}

/// Canonical symptoms implied by a completed interview.
pub fn derive_symptoms(answers: &TriageAnswers) -> Vec<String> {
    let mut symptoms = Vec::new();

    // A measured reading decides between "fiebre" and "fiebre alta".
    match answers.temperature {
        Some(temp) => symptoms.extend(fever_tag(temp).map(str::to_string)),
        None if answers.fever => symptoms.push(FEVER.to_string()),
        None => {}
    }

    for label in answers.reported_flags() {
        if label != FEVER {
            symptoms.push(label.to_string());
        }
    }
    symptoms
}

/// A clause says "yes" when it has an affirmative word and no negation word.
fn is_affirmative(normalized: &str) -> bool {
    clauses(normalized).any(|clause| {
        let words: Vec<&str> = clause.split_whitespace().collect();
        let negated = words.iter().any(|w| NEGATION_WORDS.contains(w));
        !negated && words.iter().any(|w| AFFIRMATIVE_WORDS.contains(w))
    })
}

/// `keyword` appears in some clause that is not negated ("no", "ni", "sin" before it).
fn mentions(normalized: &str, keyword: &str) -> bool {
    clauses(normalized).any(|clause| {
        let Some(pos) = clause.find(keyword) else {
            return false;
        };
        let before: Vec<&str> = clause[..pos].split_whitespace().collect();
        let leading_negation = before.first().is_some_and(|w| NEGATION_WORDS.contains(w));
        let adjacent_negation = before.last().is_some_and(|w| NEGATION_WORDS.contains(w));
        !(leading_negation || adjacent_negation)
    })
}

fn clauses(normalized: &str) -> impl Iterator<Item = &str> {
    CLAUSE_SPLIT
        .split(normalized)
        .map(str::trim)
        .filter(|c| !c.is_empty())
}
