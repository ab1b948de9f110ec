use serde::{Deserialize, Serialize};

use crate::domain::secret::SecretTransferType;

/// Immutable question/round data, populated once at game creation and
/// read-only during play (`game:package:{id}` in the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePackage {
    pub name: String,
    pub rounds: Vec<PackRound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundKind {
    Ordinary,
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRound {
    /// 1-based position within the package.
    pub order: u32,
    pub name: String,
    pub kind: RoundKind,
    pub themes: Vec<Theme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub name: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    Ordinary,
    /// Resolved by an ascending-bid auction before it is revealed.
    Stake {
        /// Cap for bids; engine default applies when absent.
        max_price: Option<i64>,
    },
    /// Answering right is transferred by the picker to another player.
    Secret { transfer: SecretTransferType },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub price: i64,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub text: String,
    pub answer: String,
}

impl GamePackage {
    pub fn round(&self, order: u32) -> Option<&PackRound> {
        self.rounds.iter().find(|r| r.order == order)
    }

    pub fn round_count(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn question(&self, id: i64) -> Option<&Question> {
        self.question_with_theme(id).map(|(_, q)| q)
    }

    pub fn question_with_theme(&self, id: i64) -> Option<(&Theme, &Question)> {
        self.rounds.iter().flat_map(|r| &r.themes).find_map(|t| {
            t.questions
                .iter()
                .find(|q| q.id == id)
                .map(|q| (t, q))
        })
    }
}

impl PackRound {
    pub fn theme(&self, id: i64) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Question ids on this round's board.
    pub fn question_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.themes
            .iter()
            .flat_map(|t| t.questions.iter().map(|q| q.id))
    }
}
