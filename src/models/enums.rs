use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

str_enum!(KnowledgeSource {
    Seed => "seed",
    Taught => "taught",
    Encyclopedia => "encyclopedia",
});

str_enum!(Emotion {
    AcutePain => "dolor_agudo",
    Anxiety => "ansiedad",
    Malaise => "malestar",
    Relief => "alivio",
});

str_enum!(UrgencyLevel {
    Emergency => "emergencia",
    High => "alto",
    Medium => "medio",
    Low => "bajo",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn message_role_round_trips_through_str() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            assert_eq!(MessageRole::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum_error() {
        let err = MessageRole::from_str("agente").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
        assert!(err.to_string().contains("MessageRole"));
    }

    #[test]
    fn urgency_and_emotion_labels_are_spanish() {
        assert_eq!(UrgencyLevel::High.as_str(), "alto");
        assert_eq!(UrgencyLevel::from_str("emergencia").unwrap(), UrgencyLevel::Emergency);
        assert_eq!(Emotion::AcutePain.as_str(), "dolor_agudo");
        assert!(Emotion::from_str("tristeza").is_err());
    }
}
