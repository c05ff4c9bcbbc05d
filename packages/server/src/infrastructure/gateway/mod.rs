//! Game-data gateway implementations.
//!
//! - [`HttpGameGateway`]: the external quiz service over HTTP
//! - [`StaticGameGateway`]: question sets loaded from a local JSON file, for
//!   offline runs and tests

pub mod fixture;
pub mod http;

pub use fixture::StaticGameGateway;
pub use http::HttpGameGateway;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{GameDefinition, GameId, GameResults, GatewayError, Question};

/// Game document as served by the quiz service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDocument {
    pub question_text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub answers: Vec<AnswerDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDocument {
    pub answer_text: String,
    /// The service stores booleans as 0/1
    #[serde(deserialize_with = "bool_or_int")]
    pub is_correct: bool,
    #[serde(default)]
    pub order: Option<i64>,
}

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    Ok(match BoolOrInt::deserialize(deserializer)? {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(n) => n != 0,
    })
}

impl GameDocument {
    /// Validate the document into a playable game
    ///
    /// Questions and answers are ordered by their `order` field when present.
    /// Every question needs at least two answers and one marked correct.
    pub fn into_definition(self, game_id: &GameId) -> Result<GameDefinition, GatewayError> {
        let invalid = |reason: String| GatewayError::InvalidQuestionSet {
            game_id: game_id.to_string(),
            reason,
        };

        let mut documents = self.questions;
        documents.sort_by_key(|q| q.order.unwrap_or(i64::MAX));

        let mut questions = Vec::with_capacity(documents.len());
        for (index, mut document) in documents.into_iter().enumerate() {
            document.answers.sort_by_key(|a| a.order.unwrap_or(i64::MAX));
            let correct: Vec<usize> = document
                .answers
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_correct)
                .map(|(i, _)| i)
                .collect();
            let Some(&correct_choice_index) = correct.first() else {
                return Err(invalid(format!("question {index} has no correct answer")));
            };
            if correct.len() > 1 {
                tracing::warn!(
                    "Game '{}' question {} has {} correct answers, using the first",
                    game_id,
                    index,
                    correct.len()
                );
            }
            let question = Question::new(
                document.question_text,
                document.answers.into_iter().map(|a| a.answer_text).collect(),
                document.image_url,
                correct_choice_index,
            )
            .map_err(|e| invalid(format!("question {index}: {e}")))?;
            questions.push(question);
        }

        Ok(GameDefinition {
            game_id: game_id.clone(),
            title: self.title,
            questions,
        })
    }
}

/// Final standings as posted to the quiz service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub game_id: String,
    pub lobby_code: String,
    pub finished_at: i64,
    pub total_questions: usize,
    pub rankings: Vec<RankingDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingDocument {
    pub player_id: String,
    pub player_name: String,
    pub score: u32,
    pub position: usize,
}

impl From<&GameResults> for ResultsDocument {
    fn from(results: &GameResults) -> Self {
        Self {
            game_id: results.game_id.to_string(),
            lobby_code: results.lobby_code.to_string(),
            finished_at: results.finished_at.value(),
            total_questions: results.total_questions,
            rankings: results
                .standings
                .iter()
                .map(|entry| RankingDocument {
                    player_id: entry.player_id.to_string(),
                    player_name: entry.display_name.to_string(),
                    score: entry.score,
                    position: entry.position,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_id() -> GameId {
        GameId::new("g1".to_string()).unwrap()
    }

    #[test]
    fn test_document_into_definition_orders_and_finds_correct_answer() {
        // テスト項目: order 順に並べ替え、0/1 形式の is_correct から正解番号を求める
        // given (前提条件):
        let json = serde_json::json!({
            "id": 1,
            "title": "Math",
            "questions": [
                {"question_text": "second", "order": 2, "answers": [
                    {"answer_text": "a", "is_correct": 0},
                    {"answer_text": "b", "is_correct": 1}
                ]},
                {"question_text": "first", "order": 1, "answers": [
                    {"answer_text": "y", "is_correct": true, "order": 2},
                    {"answer_text": "x", "is_correct": false, "order": 1}
                ]}
            ]
        });
        let document: GameDocument = serde_json::from_value(json).unwrap();

        // when (操作):
        let definition = document.into_definition(&game_id()).unwrap();

        // then (期待する結果):
        assert_eq!(definition.title.as_deref(), Some("Math"));
        assert_eq!(definition.questions.len(), 2);
        assert_eq!(definition.questions[0].text, "first");
        assert_eq!(definition.questions[0].choices, vec!["x", "y"]);
        assert_eq!(definition.questions[0].correct_choice_index, 1);
        assert_eq!(definition.questions[1].correct_choice_index, 1);
    }

    #[test]
    fn test_document_without_correct_answer_is_rejected() {
        // テスト項目: 正解のない問題を含むゲームは InvalidQuestionSet になる
        // given (前提条件):
        let json = serde_json::json!({
            "questions": [
                {"question_text": "?", "answers": [
                    {"answer_text": "a", "is_correct": 0},
                    {"answer_text": "b", "is_correct": 0}
                ]}
            ]
        });
        let document: GameDocument = serde_json::from_value(json).unwrap();

        // when (操作):
        let result = document.into_definition(&game_id());

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(GatewayError::InvalidQuestionSet { .. })
        ));
    }

    #[test]
    fn test_document_with_single_answer_is_rejected() {
        // テスト項目: 選択肢が 1 つしかない問題は InvalidQuestionSet になる
        // given (前提条件):
        let json = serde_json::json!({
            "questions": [
                {"question_text": "?", "answers": [{"answer_text": "a", "is_correct": 1}]}
            ]
        });
        let document: GameDocument = serde_json::from_value(json).unwrap();

        // when (操作):
        let result = document.into_definition(&game_id());

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(GatewayError::InvalidQuestionSet { .. })
        ));
    }
}
