//! Artifact kinds and their expected shapes
//!
//! Each study artifact has one system prompt and one JSON schema. The
//! normalizer never enforces the schema; [`ArtifactKind::check_shape`] and
//! the typed views below are for callers that want to.

use crate::normalize::JsonMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SUMMARY_PROMPT: &str = r#"
Generate a concise summary of the provided document. The output must be a JSON object containing the summary as an HTML string, conforming to the provided schema.

**Content & HTML Rules:**
1. The summary must accurately reflect the key information in the document.
2. Generate semantic HTML for the summary content.
3. Apply the following CSS classes EXACTLY as specified to their corresponding HTML tags:
    - '<h1>': class="text-4xl"
    - '<ul>': class="list-disc pl-8 list-outside"
    - '<ol>': class="list-decimal pl-8 list-outside"
    - '<code>': class="bg-base-200"
    - '<hr>': class="border-t border-base-content/25"

**JSON Schema:**
{
  "title": "string",
  "content": "string"
}
"#;

const FLASHCARDS_PROMPT: &str = r#"
Generate a set of at least 10 flashcards based on the file provided.

**Content Rules:**
- Flashcards must be derived solely from the provided document.
- The 'front' of each card must be a key term, name, or concept.
- The 'back' of each card must be its corresponding definition or explanation.

**JSON Schema:**
{
  "title": "string",
  "flashcards": [
    {
      "front": "string",
      "back": "string"
    }
  ]
}
"#;

const QUIZ_PROMPT: &str = r#"
Generate a quiz with at least 10 questions based on the file provided.

**Content Rules:**
- Questions must be derived solely from the provided text.
- For multiple-choice questions, create plausible but incorrect distractor options.
- The correctAnswers array must contain the 0-based index of the correct option.

**JSON Schema:**
{
  "title": "string",
  "quiz_content": [
    {
      "question": "string",
      "description": "string (can be empty)",
      "options": ["string"],
      "correctAnswers": [number]
    }
  ]
}
"#;

/// One of the three generated study materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Summary,
    Flashcards,
    Quiz,
}

impl ArtifactKind {
    /// All kinds, in the order the pipeline generates them.
    pub fn all() -> Vec<Self> {
        vec![Self::Summary, Self::Flashcards, Self::Quiz]
    }

    /// System instruction sent ahead of the document text.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Summary => SUMMARY_PROMPT,
            Self::Flashcards => FLASHCARDS_PROMPT,
            Self::Quiz => QUIZ_PROMPT,
        }
    }

    /// Label used in generation error messages ("Flashcard generation failed").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Flashcards => "Flashcard",
            Self::Quiz => "Quiz",
        }
    }

    /// Result-type tag used in file names and result listings.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Flashcards => "flashcards",
            Self::Quiz => "quiz",
        }
    }

    /// Check a normalized mapping against this kind's schema.
    pub fn check_shape(&self, map: &JsonMap) -> Result<ArtifactShape, ShapeError> {
        let value = serde_json::Value::Object(map.clone());
        let shape = match self {
            Self::Summary => ArtifactShape::Summary(serde_json::from_value(value)?),
            Self::Flashcards => ArtifactShape::Flashcards(serde_json::from_value(value)?),
            Self::Quiz => ArtifactShape::Quiz(serde_json::from_value(value)?),
        };
        Ok(shape)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "flashcards" | "flashcard" => Ok(Self::Flashcards),
            "quiz" => Ok(Self::Quiz),
            other => Err(format!(
                "unknown artifact '{}' (expected summary, flashcards or quiz)",
                other
            )),
        }
    }
}

/// The mapping did not match the artifact schema.
#[derive(Debug, thiserror::Error)]
#[error("output does not match the expected schema: {0}")]
pub struct ShapeError(#[from] serde_json::Error);

/// A summary: a title and an HTML body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    pub title: String,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswers")]
    pub correct_answers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub quiz_content: Vec<QuizQuestion>,
}

/// A normalized mapping read as its artifact type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactShape {
    Summary(Summary),
    Flashcards(FlashcardDeck),
    Quiz(Quiz),
}

impl ArtifactShape {
    pub fn title(&self) -> &str {
        match self {
            Self::Summary(s) => &s.title,
            Self::Flashcards(d) => &d.title,
            Self::Quiz(q) => &q.title,
        }
    }

    /// Number of cards or questions; a summary counts as one item.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Summary(_) => 1,
            Self::Flashcards(d) => d.flashcards.len(),
            Self::Quiz(q) => q.quiz_content.len(),
        }
    }
}
