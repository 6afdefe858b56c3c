//! 游戏核心逻辑模块（牌堆生成、配对判定状态机）。

pub mod deck;
pub mod rules;
pub mod state;

pub use deck::{deal, deal_seeded, generate, DEFAULT_PALETTE};
pub use rules::{
    ResolveTripleAction,
    RuleEngine,
    RuleError,
    RuleResolution,
    SelectCardAction,
};
pub use state::{
    Card,
    CardId,
    CardView,
    GameConfig,
    GameEvent,
    GameState,
    Generation,
    IntegrityError,
    PendingTriple,
    PlacedCard,
    Position,
    TableView,
    TripleOutcome,
    TRIPLE_SIZE,
};
