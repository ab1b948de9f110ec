use serde::{Deserialize, Serialize};

use crate::domain::game::PlayerId;

/// Who a secret question may be handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretTransferType {
    /// Any eligible player, the picker included.
    Any,
    /// Any eligible player except the picker.
    Others,
}

/// Transfer state for one secret question.
///
/// Created when a secret-type question is picked; cleared when the
/// transferred player finishes answering or leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretQuestionData {
    pub picker_id: PlayerId,
    pub transfer_type: SecretTransferType,
    pub question_id: i64,
    pub transfer_phase: bool,
}

impl SecretQuestionData {
    pub fn new(picker_id: PlayerId, transfer_type: SecretTransferType, question_id: i64) -> Self {
        Self {
            picker_id,
            transfer_type,
            question_id,
            transfer_phase: true,
        }
    }

    /// Whether `target` is a legal recipient under the transfer type.
    pub fn may_receive(&self, target: PlayerId) -> bool {
        match self.transfer_type {
            SecretTransferType::Any => true,
            SecretTransferType::Others => target != self.picker_id,
        }
    }
}
