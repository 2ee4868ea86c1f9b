// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::DEFAULT_PASS_THRESHOLD;

/// A question of an exam, tagged by kind.
///
/// Essay questions carry no correct answer; they are graded manually
/// during review. The wire shape uses the collection's field names
/// (`type`, `correctAnswer`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Question {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        question: String,
        points: i64,
        choices: Vec<String>,
        correct_answer: String,
    },
    #[serde(rename_all = "camelCase")]
    Identification {
        question: String,
        points: i64,
        correct_answer: String,
    },
    Essay { question: String, points: i64 },
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Question::MultipleChoice { question, .. }
            | Question::Identification { question, .. }
            | Question::Essay { question, .. } => question,
        }
    }

    pub fn points(&self) -> i64 {
        match self {
            Question::MultipleChoice { points, .. }
            | Question::Identification { points, .. }
            | Question::Essay { points, .. } => *points,
        }
    }

    pub fn correct_answer(&self) -> Option<&str> {
        match self {
            Question::MultipleChoice { correct_answer, .. }
            | Question::Identification { correct_answer, .. } => Some(correct_answer),
            Question::Essay { .. } => None,
        }
    }

    pub fn is_essay(&self) -> bool {
        matches!(self, Question::Essay { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Question::MultipleChoice { .. } => "multiple-choice",
            Question::Identification { .. } => "identification",
            Question::Essay { .. } => "essay",
        }
    }
}

/// Represents a record in the 'exams' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub questions: Vec<Question>,

    /// Pass percentage for this exam; results fall back to the portal
    /// default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_threshold: Option<f64>,
}

impl Exam {
    pub fn total_points(&self) -> i64 {
        self.questions.iter().map(Question::points).sum()
    }

    pub fn has_essay(&self) -> bool {
        self.questions.iter().any(Question::is_essay)
    }

    /// Point values of the essay questions, in exam order. Essay score
    /// lists are aligned to these positions.
    pub fn essay_points(&self) -> Vec<i64> {
        self.questions
            .iter()
            .filter(|q| q.is_essay())
            .map(Question::points)
            .collect()
    }

    pub fn pass_threshold_or_default(&self) -> f64 {
        self.pass_threshold.unwrap_or(DEFAULT_PASS_THRESHOLD)
    }

    /// Replaces the question at `edit_index`, or appends when no index is
    /// given. The list is not persisted until the exam is saved.
    pub fn upsert_question(
        &mut self,
        question: Question,
        edit_index: Option<usize>,
    ) -> Result<(), String> {
        match edit_index {
            Some(index) => {
                if index >= self.questions.len() {
                    return Err(format!("No question at position {}.", index));
                }
                self.questions[index] = question;
            }
            None => self.questions.push(question),
        }
        Ok(())
    }

    /// Removes the question at `index`, shifting later questions down.
    pub fn remove_question(&mut self, index: usize) -> Result<(), String> {
        if index >= self.questions.len() {
            return Err(format!("No question at position {}.", index));
        }
        self.questions.remove(index);
        Ok(())
    }
}

/// Incoming question payload, validated and normalized into a `Question`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub question: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub points: i64,

    #[serde(default)]
    pub choices: Vec<String>,

    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl QuestionDraft {
    /// Applies the question invariants: non-empty text, positive points,
    /// empty choices filtered out, correct answer present and (for
    /// multiple choice) one of the remaining choices.
    pub fn build(self) -> Result<Question, String> {
        let text = self.question.trim().to_string();
        if text.is_empty() {
            return Err("Please enter a valid question.".to_string());
        }
        if self.points <= 0 {
            return Err("Points must be greater than zero.".to_string());
        }

        match self.kind.as_str() {
            "multiple-choice" => {
                let choices: Vec<String> = self
                    .choices
                    .into_iter()
                    .filter(|choice| !choice.trim().is_empty())
                    .collect();
                if choices.is_empty() {
                    return Err("A multiple-choice question needs at least one choice.".to_string());
                }
                let correct_answer = self.correct_answer.unwrap_or_default();
                if !choices.contains(&correct_answer) {
                    return Err("The correct answer must be one of the choices.".to_string());
                }
                Ok(Question::MultipleChoice {
                    question: text,
                    points: self.points,
                    choices,
                    correct_answer,
                })
            }
            "identification" => {
                let correct_answer = self.correct_answer.unwrap_or_default();
                if correct_answer.trim().is_empty() {
                    return Err("An identification question needs a correct answer.".to_string());
                }
                Ok(Question::Identification {
                    question: text,
                    points: self.points,
                    correct_answer,
                })
            }
            "essay" => Ok(Question::Essay {
                question: text,
                points: self.points,
            }),
            other => Err(format!("Unknown question type '{}'.", other)),
        }
    }
}

/// DTO for creating or overwriting an exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveExamRequest {
    #[validate(custom(function = validate_title))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub questions: Vec<QuestionDraft>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub pass_threshold: Option<f64>,
}

fn validate_title(title: &str) -> Result<(), validator::ValidationError> {
    if title.trim().is_empty() {
        return Err(validator::ValidationError::new("title_required"));
    }
    if title.len() > 200 {
        return Err(validator::ValidationError::new("title_too_long"));
    }
    Ok(())
}

/// DTO for sending a question to a student (excludes the correct answer).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub points: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            question: question.text().to_string(),
            kind: question.kind(),
            points: question.points(),
            choices: match question {
                Question::MultipleChoice { choices, .. } => choices.clone(),
                _ => Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: &str) -> QuestionDraft {
        QuestionDraft {
            question: "What is the capital of France?".to_string(),
            kind: kind.to_string(),
            points: 5,
            choices: vec![
                "Paris".to_string(),
                "".to_string(),
                "Lyon".to_string(),
                "  ".to_string(),
            ],
            correct_answer: Some("Paris".to_string()),
        }
    }

    #[test]
    fn build_filters_empty_choices() {
        let question = draft("multiple-choice").build().unwrap();
        match question {
            Question::MultipleChoice { choices, .. } => {
                assert_eq!(choices, vec!["Paris".to_string(), "Lyon".to_string()]);
            }
            _ => panic!("expected multiple choice"),
        }
    }

    #[test]
    fn build_rejects_blank_question() {
        let mut d = draft("essay");
        d.question = "   ".to_string();
        assert!(d.build().is_err());
    }

    #[test]
    fn build_rejects_non_positive_points() {
        let mut d = draft("identification");
        d.points = 0;
        assert!(d.build().is_err());
    }

    #[test]
    fn build_rejects_correct_answer_outside_choices() {
        let mut d = draft("multiple-choice");
        d.correct_answer = Some("Marseille".to_string());
        assert!(d.build().is_err());
    }

    #[test]
    fn essay_carries_no_correct_answer() {
        let question = draft("essay").build().unwrap();
        assert!(question.correct_answer().is_none());
        assert!(question.is_essay());
    }

    #[test]
    fn upsert_appends_and_replaces() {
        let mut exam = Exam {
            id: String::new(),
            title: "Geography".to_string(),
            description: String::new(),
            questions: Vec::new(),
            pass_threshold: None,
        };

        exam.upsert_question(draft("identification").build().unwrap(), None)
            .unwrap();
        exam.upsert_question(draft("essay").build().unwrap(), None)
            .unwrap();
        assert_eq!(exam.questions.len(), 2);

        exam.upsert_question(draft("multiple-choice").build().unwrap(), Some(0))
            .unwrap();
        assert_eq!(exam.questions.len(), 2);
        assert_eq!(exam.questions[0].kind(), "multiple-choice");

        assert!(exam
            .upsert_question(draft("essay").build().unwrap(), Some(5))
            .is_err());
    }

    #[test]
    fn remove_shifts_later_questions_down() {
        let mut exam = Exam {
            id: String::new(),
            title: "Geography".to_string(),
            description: String::new(),
            questions: vec![
                draft("identification").build().unwrap(),
                draft("essay").build().unwrap(),
            ],
            pass_threshold: None,
        };

        exam.remove_question(0).unwrap();
        assert_eq!(exam.questions.len(), 1);
        assert!(exam.questions[0].is_essay());
        assert!(exam.remove_question(3).is_err());
    }

    #[test]
    fn question_wire_shape_uses_type_tag() {
        let json = r#"{"type":"multiple-choice","question":"Pick blue","points":5,
            "choices":["Blue","Red"],"correctAnswer":"Blue"}"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.kind(), "multiple-choice");
        assert_eq!(question.correct_answer(), Some("Blue"));
    }

    #[test]
    fn essay_points_align_to_exam_order() {
        let exam = Exam {
            id: String::new(),
            title: "Mixed".to_string(),
            description: String::new(),
            questions: vec![
                Question::Identification {
                    question: "Q1".to_string(),
                    points: 5,
                    correct_answer: "A".to_string(),
                },
                Question::Essay {
                    question: "Q2".to_string(),
                    points: 10,
                },
                Question::Essay {
                    question: "Q3".to_string(),
                    points: 20,
                },
            ],
            pass_threshold: None,
        };

        assert_eq!(exam.essay_points(), vec![10, 20]);
        assert_eq!(exam.total_points(), 35);
        assert!(exam.has_essay());
    }
}
