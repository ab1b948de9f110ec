//! Codec idempotence: a persisted GameState must decode back identical,
//! including each optional sub-phase payload.

use time::macros::datetime;
use uuid::Uuid;

use crate::domain::final_round::{FinalAnswer, FinalRoundData, FinalRoundPhase};
use crate::domain::secret::{SecretQuestionData, SecretTransferType};
use crate::domain::stake::{StakeBid, StakeQuestionData};
use crate::domain::state::{AnswerVerdict, AnsweredPlayer, CurrentQuestion, GameState, QuestionState};
use crate::domain::test_fixtures::{started_game, ALICE, BOB, CAROL};

fn roundtrip(state: &GameState) -> GameState {
    let encoded = serde_json::to_string(state).expect("encode");
    serde_json::from_str(&encoded).expect("decode")
}

fn base_state() -> GameState {
    let mut state = GameState::new();
    state.current_round = 1;
    state.current_question = Some(CurrentQuestion {
        question_id: 101,
        theme_id: 10,
        price: 200,
    });
    state.current_turn_player_id = Some(ALICE);
    state.answering_player = Some(BOB);
    state.answered_players.push(AnsweredPlayer {
        player_id: CAROL,
        verdict: AnswerVerdict::Wrong,
        delta: -200,
    });
    state.skipped_players.push(ALICE);
    state.question_players = vec![ALICE, BOB, CAROL];
    state.played_questions = vec![101];
    state
}

#[test]
fn ordinary_state_roundtrips() {
    let mut state = base_state();
    state.question_state = QuestionState::Answering;
    assert_eq!(roundtrip(&state), state);
}

#[test]
fn stake_state_roundtrips() {
    let mut state = base_state();
    state.question_state = QuestionState::Bidding;
    let mut stake = StakeQuestionData::new(BOB, vec![ALICE, BOB, CAROL], 10_000);
    stake.record_bid(BOB, StakeBid::Normal { amount: 200 });
    stake.record_bid(CAROL, StakeBid::AllIn { amount: 400 });
    stake.record_bid(ALICE, StakeBid::Pass);
    state.stake_question_data = Some(stake);
    assert_eq!(roundtrip(&state), state);
}

#[test]
fn secret_state_roundtrips() {
    let mut state = base_state();
    state.question_state = QuestionState::SecretTransfer;
    state.secret_question_data = Some(SecretQuestionData::new(
        ALICE,
        SecretTransferType::Others,
        103,
    ));
    assert_eq!(roundtrip(&state), state);
}

#[test]
fn final_round_state_roundtrips() {
    let mut state = base_state();
    state.question_state = QuestionState::Reviewing;
    let mut data = FinalRoundData::new(vec![ALICE, BOB]);
    data.phase = FinalRoundPhase::Reviewing;
    data.bids.insert(ALICE, 300);
    data.bids.insert(BOB, 1);
    data.eliminated_themes.push(31);
    data.answers.push(FinalAnswer {
        id: Uuid::new_v4(),
        player_id: ALICE,
        text: "alpha".to_string(),
        submitted_at: datetime!(2025-01-10 19:30 UTC),
        is_correct: Some(true),
        auto_loss: false,
    });
    state.final_round_data = Some(data);
    assert_eq!(roundtrip(&state), state);
}

#[test]
fn whole_game_roundtrips() {
    let game = started_game();
    let encoded = serde_json::to_string(&game).expect("encode");
    let decoded: crate::domain::game::Game = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(decoded, game);
}
