use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 每轮参与配对判定的卡牌数量。
pub const TRIPLE_SIZE: usize = 3;
/// 卡牌摆放位置的百分比下限。
pub const PLACEMENT_MIN: f64 = 10.0;
/// 卡牌摆放位置的百分比上限。
pub const PLACEMENT_MAX: f64 = 90.0;
/// 随机旋转角度的绝对上限（度）。
pub const ROTATION_LIMIT: f64 = 20.0;

const DEFAULT_REPETITIONS: usize = 6;
const DEFAULT_MATCH_DELAY_MS: u32 = 500;
const DEFAULT_MISMATCH_DELAY_MS: u32 = 1000;
const WIN_MESSAGE: &str = "🎉 Congratulations! You won! 🎉";

/// 卡牌的稳定标识（图案 + 序号），与洗牌后的位置无关。
pub type CardId = String;
/// 牌局代数，每次重开局加一。
pub type Generation = u64;

/// 一张卡牌：图案与唯一标识。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub icon: String,
}

impl Card {
    pub fn new(icon: impl Into<String>, sequence: usize) -> Self {
        let icon = icon.into();
        Self {
            id: format!("{icon}-{sequence}"),
            icon,
        }
    }
}

/// 卡牌在牌桌上的摆放：纵横百分比与旋转角度，发牌时一次性确定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub top: f64,
    pub left: f64,
    pub rotation: f64,
}

/// 带摆放信息的卡牌。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedCard {
    #[serde(flatten)]
    pub card: Card,
    pub position: Position,
}

impl PlacedCard {
    pub fn id(&self) -> &str {
        &self.card.id
    }

    pub fn icon(&self) -> &str {
        &self.card.icon
    }
}

/// 牌局配置：图案集合、每个图案的张数与两种判定延迟。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    #[serde(default = "default_match_delay")]
    pub match_delay_ms: u32,
    #[serde(default = "default_mismatch_delay")]
    pub mismatch_delay_ms: u32,
}

fn default_palette() -> Vec<String> {
    super::deck::DEFAULT_PALETTE.clone()
}

fn default_repetitions() -> usize {
    DEFAULT_REPETITIONS
}

fn default_match_delay() -> u32 {
    DEFAULT_MATCH_DELAY_MS
}

fn default_mismatch_delay() -> u32 {
    DEFAULT_MISMATCH_DELAY_MS
}

impl GameConfig {
    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn deck_size(&self) -> usize {
        self.palette.len() * self.repetitions
    }

    pub fn delay_for(&self, outcome: TripleOutcome) -> u32 {
        match outcome {
            TripleOutcome::Matched => self.match_delay_ms,
            TripleOutcome::Mismatched => self.mismatch_delay_ms,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            repetitions: DEFAULT_REPETITIONS,
            match_delay_ms: DEFAULT_MATCH_DELAY_MS,
            mismatch_delay_ms: DEFAULT_MISMATCH_DELAY_MS,
        }
    }
}

/// 三张卡牌的判定结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripleOutcome {
    Matched,
    Mismatched,
}

/// 等待延迟落地的判定任务，携带代数标记；过期定时器触发时不产生任何效果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingTriple {
    pub id: u64,
    pub generation: Generation,
    pub card_ids: Vec<CardId>,
    pub outcome: TripleOutcome,
    pub resolve_after_ms: u32,
}

/// 牌局事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    DeckDealt {
        generation: Generation,
        card_count: usize,
    },
    CardSelected {
        card_id: CardId,
        selected_count: usize,
    },
    TripleStaged {
        pending_id: u64,
        card_ids: Vec<CardId>,
        resolve_after_ms: u32,
    },
    TripleMatched {
        card_ids: Vec<CardId>,
        removed_count: usize,
    },
    TripleMismatched {
        card_ids: Vec<CardId>,
    },
    GameWon {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DuplicateCardId { card_id: CardId },
    DuplicateRemovedCard { card_id: CardId },
    UnknownSelectedCard { card_id: CardId },
    UnknownRemovedCard { card_id: CardId },
    SelectionOverflow { count: usize },
    PendingSelectionMismatch { pending_id: u64 },
}

/// 渲染层所需的单张卡牌视图：摆放信息加上选中 / 移除标记。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardView {
    #[serde(flatten)]
    pub placed: PlacedCard,
    pub selected: bool,
    pub removed: bool,
}

/// 一帧画面的渲染数据，不含任何行为。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableView {
    pub cards: Vec<CardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_resolve_after_ms: Option<u32>,
}

/// 牌局整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    #[serde(default)]
    pub config: GameConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deck: Vec<PlacedCard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected: Vec<CardId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_message: Option<String>,
    #[serde(default)]
    pub generation: Generation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingTriple>,
    #[serde(default)]
    pub next_pending_id: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: GameConfig, deck: Vec<PlacedCard>) -> Self {
        Self {
            config,
            deck,
            selected: Vec::new(),
            removed: Vec::new(),
            win_message: None,
            generation: 1,
            pending: None,
            next_pending_id: 0,
            event_log: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn card(&self, card_id: &str) -> Option<&PlacedCard> {
        self.deck.iter().find(|placed| placed.id() == card_id)
    }

    pub fn icon_of(&self, card_id: &str) -> Option<&str> {
        self.card(card_id).map(|placed| placed.icon())
    }

    pub fn is_selected(&self, card_id: &str) -> bool {
        self.selected.iter().any(|id| id.as_str() == card_id)
    }

    pub fn is_removed(&self, card_id: &str) -> bool {
        self.removed.iter().any(|id| id.as_str() == card_id)
    }

    pub fn selection_full(&self) -> bool {
        self.selected.len() >= TRIPLE_SIZE
    }

    /// 将卡牌计入移除集合；重复标记不产生第二个条目。
    pub fn mark_removed(&mut self, card_id: &CardId) {
        if !self.is_removed(card_id) {
            self.removed.push(card_id.clone());
        }
    }

    pub fn remaining_count(&self) -> usize {
        self.deck.len().saturating_sub(self.removed.len())
    }

    /// 赢局判定：移除集合逐张覆盖整副牌堆。
    pub fn is_cleared(&self) -> bool {
        !self.deck.is_empty() && self.removed.len() == self.deck.len()
    }

    pub fn is_won(&self) -> bool {
        self.win_message.is_some()
    }

    pub fn declare_win(&mut self) -> Option<GameEvent> {
        if self.win_message.is_some() {
            return None;
        }
        self.win_message = Some(WIN_MESSAGE.to_string());
        let event = GameEvent::GameWon {
            message: WIN_MESSAGE.to_string(),
        };
        self.record_event(event.clone());
        Some(event)
    }

    /// 牌堆清空则宣告胜利，返回当前的胜利文案。
    pub fn evaluate_win(&mut self) -> Option<String> {
        if self.is_cleared() {
            self.declare_win();
        }
        self.win_message.clone()
    }

    /// 把当前凑满的三张登记为待定判定，分配新的任务编号。
    pub fn stage_pending(&mut self, outcome: TripleOutcome) -> PendingTriple {
        self.next_pending_id += 1;
        let pending = PendingTriple {
            id: self.next_pending_id,
            generation: self.generation,
            card_ids: self.selected.clone(),
            outcome,
            resolve_after_ms: self.config.delay_for(outcome),
        };
        self.pending = Some(pending.clone());
        pending
    }

    /// 取出编号与代数都吻合的待定判定；过期任务返回 None。
    pub fn take_pending(&mut self, pending_id: u64) -> Option<PendingTriple> {
        match &self.pending {
            Some(pending) if pending.id == pending_id && pending.generation == self.generation => {
                self.pending.take()
            }
            _ => None,
        }
    }

    pub fn view(&self) -> TableView {
        let cards = self
            .deck
            .iter()
            .map(|placed| CardView {
                placed: placed.clone(),
                selected: self.is_selected(placed.id()),
                removed: self.is_removed(placed.id()),
            })
            .collect();

        TableView {
            cards,
            win_message: self.win_message.clone(),
            pending_resolve_after_ms: self.pending.as_ref().map(|p| p.resolve_after_ms),
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut ids = HashSet::new();
        for placed in &self.deck {
            if !ids.insert(placed.id()) {
                return Err(IntegrityError::DuplicateCardId {
                    card_id: placed.id().to_string(),
                });
            }
        }

        if self.selected.len() > TRIPLE_SIZE {
            return Err(IntegrityError::SelectionOverflow {
                count: self.selected.len(),
            });
        }
        for card_id in &self.selected {
            if !ids.contains(card_id.as_str()) {
                return Err(IntegrityError::UnknownSelectedCard {
                    card_id: card_id.clone(),
                });
            }
        }

        let mut removed_seen = HashSet::new();
        for card_id in &self.removed {
            if !ids.contains(card_id.as_str()) {
                return Err(IntegrityError::UnknownRemovedCard {
                    card_id: card_id.clone(),
                });
            }
            if !removed_seen.insert(card_id.as_str()) {
                return Err(IntegrityError::DuplicateRemovedCard {
                    card_id: card_id.clone(),
                });
            }
        }

        if let Some(pending) = &self.pending {
            // 旧代数的待定任务已失效，不参与一致性对账
            if pending.generation == self.generation
                && (pending.card_ids.len() != TRIPLE_SIZE || pending.card_ids != self.selected)
            {
                return Err(IntegrityError::PendingSelectionMismatch {
                    pending_id: pending.id,
                });
            }
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameConfig::default(), Vec::new())
    }
}
