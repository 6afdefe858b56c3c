use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::deck;
use super::state::{
    CardId, GameConfig, GameEvent, GameState, IntegrityError, PendingTriple, TripleOutcome,
};

/// 点击一张牌。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectCardAction {
    pub card_id: CardId,
}

/// 延迟计时结束后，提交对应的待定判定。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveTripleAction {
    pub pending_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    CardNotFound { card_id: CardId },
    IntegrityViolation { error: IntegrityError },
}

/// 动作执行后的汇总：最新状态快照、事件流、胜利文案与待排期的判定任务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingTriple>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let win = state.win_message.clone();
        if let Some(message) = &win {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { .. }));
            if !has_event {
                events.push(GameEvent::GameWon {
                    message: message.clone(),
                });
            }
        }

        let pending = state.pending.clone();
        Self {
            state,
            events,
            win,
            pending,
        }
    }
}

/// 配对规则引擎。发牌与重开局的随机源由引擎持有，动作在传入的状态上执行。
pub struct RuleEngine {
    rng: SmallRng,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn judge_triple(state: &GameState) -> TripleOutcome {
        let first_icon = state
            .selected
            .first()
            .and_then(|card_id| state.icon_of(card_id));

        let all_same = match first_icon {
            Some(icon) => state
                .selected
                .iter()
                .all(|card_id| state.icon_of(card_id) == Some(icon)),
            None => false,
        };

        if all_same {
            TripleOutcome::Matched
        } else {
            TripleOutcome::Mismatched
        }
    }

    /// 用引擎的随机源发一局新牌。
    pub fn deal(&mut self, config: GameConfig) -> GameState {
        deck::deal_with(config, &mut self.rng)
    }

    pub fn select_card(
        &mut self,
        state: &mut GameState,
        action: SelectCardAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;

        if state.card(&action.card_id).is_none() {
            return Err(RuleError::CardNotFound {
                card_id: action.card_id,
            });
        }

        // 判定进行中或牌已被移除时，点击静默忽略
        if state.selection_full() || state.is_removed(&action.card_id) {
            return Ok(Vec::new());
        }

        state.selected.push(action.card_id.clone());

        let mut events = Vec::new();
        let selected_event = GameEvent::CardSelected {
            card_id: action.card_id,
            selected_count: state.selected.len(),
        };
        state.record_event(selected_event.clone());
        events.push(selected_event);

        if state.selection_full() {
            let outcome = Self::judge_triple(state);
            let pending = state.stage_pending(outcome);
            let staged_event = GameEvent::TripleStaged {
                pending_id: pending.id,
                card_ids: pending.card_ids.clone(),
                resolve_after_ms: pending.resolve_after_ms,
            };
            state.record_event(staged_event.clone());
            events.push(staged_event);
        }

        Ok(events)
    }

    pub fn resolve_triple(
        &mut self,
        state: &mut GameState,
        action: ResolveTripleAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;

        // 编号或代数对不上的定时器属于过期任务，静默丢弃
        let pending = match state.take_pending(action.pending_id) {
            Some(pending) => pending,
            None => return Ok(Vec::new()),
        };

        let mut events = Vec::new();
        match pending.outcome {
            TripleOutcome::Matched => {
                for card_id in &pending.card_ids {
                    state.mark_removed(card_id);
                }
                state.selected.clear();

                let matched_event = GameEvent::TripleMatched {
                    card_ids: pending.card_ids.clone(),
                    removed_count: state.removed.len(),
                };
                state.record_event(matched_event.clone());
                events.push(matched_event);

                // 赢局判定基于更新后的移除集合
                if state.is_cleared() {
                    if let Some(win_event) = state.declare_win() {
                        events.push(win_event);
                    }
                }
            }
            TripleOutcome::Mismatched => {
                state.selected.clear();

                let mismatched_event = GameEvent::TripleMismatched {
                    card_ids: pending.card_ids.clone(),
                };
                state.record_event(mismatched_event.clone());
                events.push(mismatched_event);
            }
        }

        Ok(events)
    }

    pub fn replay(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;

        let deck = deck::generate(&state.config, &mut self.rng);
        state.generation += 1;
        state.deck = deck;
        state.selected.clear();
        state.removed.clear();
        state.pending = None;
        state.win_message = None;

        let mut events = Vec::new();
        let dealt_event = GameEvent::DeckDealt {
            generation: state.generation,
            card_count: state.deck.len(),
        };
        state.record_event(dealt_event.clone());
        events.push(dealt_event);

        Ok(events)
    }

    pub fn check_win(state: &mut GameState) -> Option<String> {
        state.evaluate_win()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
