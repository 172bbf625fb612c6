//! Core types for the exercise catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier of an external vocabulary entity (term, example, definition).
///
/// Serialized as a number. Accepted both as a number and as a numeric string,
/// since JSON object keys are always strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub i64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TermId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Serialize for TermId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for TermId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TermIdVisitor;

        impl Visitor<'_> for TermIdVisitor {
            type Value = TermId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer id or a string holding one")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TermId, E> {
                Ok(TermId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TermId, E> {
                i64::try_from(v)
                    .map(TermId)
                    .map_err(|_| E::custom(format!("id {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TermId, E> {
                v.trim()
                    .parse::<i64>()
                    .map(TermId)
                    .map_err(|_| E::custom(format!("invalid id {v:?}")))
            }
        }

        deserializer.deserialize_any(TermIdVisitor)
    }
}

/// Language an exercise is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "zh-CN")]
    ChineseSimplified,
    #[serde(rename = "zh-TW")]
    ChineseTraditional,
    #[serde(rename = "en-US")]
    EnglishUsa,
    #[serde(rename = "en-GB")]
    EnglishUk,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "pl")]
    Polish,
    #[serde(rename = "pt-BR")]
    PortugueseBrazil,
    #[serde(rename = "pt-PT")]
    PortuguesePortugal,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "es-419")]
    SpanishLatam,
    #[serde(rename = "sv")]
    Swedish,
    #[serde(rename = "tr")]
    Turkish,
    #[serde(rename = "nl")]
    Dutch,
}

impl Language {
    /// BCP 47 tag, as stored and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::ChineseSimplified => "zh-CN",
            Self::ChineseTraditional => "zh-TW",
            Self::EnglishUsa => "en-US",
            Self::EnglishUk => "en-GB",
            Self::French => "fr",
            Self::German => "de",
            Self::Italian => "it",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::Polish => "pl",
            Self::PortugueseBrazil => "pt-BR",
            Self::PortuguesePortugal => "pt-PT",
            Self::Russian => "ru",
            Self::Spanish => "es",
            Self::SpanishLatam => "es-419",
            Self::Swedish => "sv",
            Self::Turkish => "tr",
            Self::Dutch => "nl",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown language: {s}"))
    }
}

/// CEFR proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A1" => Ok(Self::A1),
            "A2" => Ok(Self::A2),
            "B1" => Ok(Self::B1),
            "B2" => Ok(Self::B2),
            "C1" => Ok(Self::C1),
            "C2" => Ok(Self::C2),
            _ => Err(format!("unknown level: {s}")),
        }
    }
}

/// The eleven exercise kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    OrderSentence,
    ListenTerm,
    ListenTermMchoice,
    ListenSentence,
    SpeakTerm,
    SpeakSentence,
    TermSentenceMchoice,
    TermDefinitionMchoice,
    TermImageMchoice,
    TermImageTextMchoice,
    TermConnection,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 11] = [
        Self::OrderSentence,
        Self::ListenTerm,
        Self::ListenTermMchoice,
        Self::ListenSentence,
        Self::SpeakTerm,
        Self::SpeakSentence,
        Self::TermSentenceMchoice,
        Self::TermDefinitionMchoice,
        Self::TermImageMchoice,
        Self::TermImageTextMchoice,
        Self::TermConnection,
    ];

    /// Wire tag, also used as the URL segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderSentence => "order-sentence",
            Self::ListenTerm => "listen-term",
            Self::ListenTermMchoice => "listen-term-mchoice",
            Self::ListenSentence => "listen-sentence",
            Self::SpeakTerm => "speak-term",
            Self::SpeakSentence => "speak-sentence",
            Self::TermSentenceMchoice => "term-sentence-mchoice",
            Self::TermDefinitionMchoice => "term-definition-mchoice",
            Self::TermImageMchoice => "term-image-mchoice",
            Self::TermImageTextMchoice => "term-image-text-mchoice",
            Self::TermConnection => "term-connection",
        }
    }

    /// Kinds graded from recorded audio instead of a structured answer.
    pub fn is_speech(self) -> bool {
        matches!(self, Self::SpeakTerm | Self::SpeakSentence)
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown exercise kind: {s}"))
    }
}

/// Choices keyed by the vocabulary id they stand for.
pub type ChoiceSource = BTreeMap<TermId, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSentence {
    pub sentence: Vec<String>,
    #[serde(default)]
    pub distractors: Vec<String>,
}

/// Shared by ListenTerm and ListenSentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listen {
    pub audio_url: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenTermMChoice {
    pub audio_url: String,
    pub content: String,
    pub distractors: ChoiceSource,
}

/// Shared by SpeakTerm and SpeakSentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speak {
    pub audio_url: String,
    pub phonetic: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSentenceMChoice {
    pub sentence: String,
    pub answer: String,
    pub distractors: ChoiceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinitionMChoice {
    pub content: String,
    pub answer: String,
    pub term_definition_id: TermId,
    pub distractors: ChoiceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermImageMChoice {
    pub image_url: String,
    pub audio_url: String,
    pub distractors: ChoiceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermImageTextMChoice {
    pub image_url: String,
    pub answer: String,
    pub distractors: ChoiceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermConnection {
    pub content: String,
    pub connections: ChoiceSource,
    pub distractors: ChoiceSource,
}

/// Kind-specific payload. The `kind` tag travels with the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExerciseBody {
    OrderSentence(OrderSentence),
    ListenTerm(Listen),
    ListenTermMchoice(ListenTermMChoice),
    ListenSentence(Listen),
    SpeakTerm(Speak),
    SpeakSentence(Speak),
    TermSentenceMchoice(TermSentenceMChoice),
    TermDefinitionMchoice(TermDefinitionMChoice),
    TermImageMchoice(TermImageMChoice),
    TermImageTextMchoice(TermImageTextMChoice),
    TermConnection(TermConnection),
}

impl ExerciseBody {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            Self::OrderSentence(_) => ExerciseKind::OrderSentence,
            Self::ListenTerm(_) => ExerciseKind::ListenTerm,
            Self::ListenTermMchoice(_) => ExerciseKind::ListenTermMchoice,
            Self::ListenSentence(_) => ExerciseKind::ListenSentence,
            Self::SpeakTerm(_) => ExerciseKind::SpeakTerm,
            Self::SpeakSentence(_) => ExerciseKind::SpeakSentence,
            Self::TermSentenceMchoice(_) => ExerciseKind::TermSentenceMchoice,
            Self::TermDefinitionMchoice(_) => ExerciseKind::TermDefinitionMchoice,
            Self::TermImageMchoice(_) => ExerciseKind::TermImageMchoice,
            Self::TermImageTextMchoice(_) => ExerciseKind::TermImageTextMchoice,
            Self::TermConnection(_) => ExerciseKind::TermConnection,
        }
    }
}

/// A stored exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub language: Language,
    /// Term or example this exercise was generated from.
    pub term_reference: TermId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub random_score: f64,
    #[serde(flatten)]
    pub body: ExerciseBody,
}

impl Exercise {
    pub fn kind(&self) -> ExerciseKind {
        self.body.kind()
    }
}
