pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde_json;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use game::{
    deal, deal_seeded, Card, CardId, CardView, GameConfig, GameEvent, GameState, Generation,
    IntegrityError, PendingTriple, PlacedCard, Position, ResolveTripleAction, RuleEngine,
    RuleError, RuleResolution, SelectCardAction, TableView, TripleOutcome, DEFAULT_PALETTE,
    TRIPLE_SIZE,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn make_resolution(state: GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state, events)
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    engine: RuleEngine,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let mut engine = RuleEngine::new();
        let state = if let Some(json) = initial_state_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            engine.deal(GameConfig::default())
        };
        Ok(GameEngine { state, engine })
    }

    /// 固定种子的引擎：同一种子开出同一副牌，便于复现与测试。
    pub fn with_seed(seed: u64) -> GameEngine {
        let mut engine = RuleEngine::with_seed(seed);
        let state = engine.deal(GameConfig::default());
        GameEngine { state, engine }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn select_card_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: SelectCardAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = self
            .engine
            .select_card(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn resolve_triple_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: ResolveTripleAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = self
            .engine
            .resolve_triple(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn play_again(&mut self) -> Result<String, JsValue> {
        let events = self.engine.replay(&mut self.state).map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    /// 当前一帧的渲染数据（卡牌摆放与选中 / 移除标记）。
    pub fn view_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.view()).map_err(serde_to_js_error)
    }

    /// 等待当前待定判定的延迟后在状态副本上落地，返回结算 JSON。
    /// 结果不回写引擎：宿主可用 set_state_json 采纳，或者自己持有定时器
    /// 并在超时后调用 resolve_triple_json。
    pub fn settle_pending(&self) -> Promise {
        let state = self.state.clone();

        future_to_promise(async move {
            let pending = match state.pending.clone() {
                Some(pending) => pending,
                None => {
                    web_sys::console::warn_1(&"settle_pending: no pending triple".into());
                    let json = serde_json::to_string(&make_resolution(state, Vec::new()))
                        .map_err(serde_to_js_error)?;
                    return Ok(JsValue::from_str(&json));
                }
            };

            TimeoutFuture::new(pending.resolve_after_ms).await;

            let mut settled = state;
            let mut engine = RuleEngine::new();
            let events = engine
                .resolve_triple(
                    &mut settled,
                    ResolveTripleAction {
                        pending_id: pending.id,
                    },
                )
                .map_err(to_js_error)?;
            if events.is_empty() {
                web_sys::console::warn_1(&"settle_pending: stale triple discarded".into());
            }

            let json = serde_json::to_string(&make_resolution(settled, events))
                .map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 生成一局默认配置的新牌局，方便前端调试或初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&game::deal(GameConfig::default())).map_err(JsValue::from)
}

/// 将传入的牌局状态进行深拷贝后返回。
#[wasm_bindgen(js_name = "cloneGameState")]
pub fn clone_game_state(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let cloned = state.clone();
    to_value(&cloned).map_err(JsValue::from)
}

/// 按传入配置发一局新牌（缺省字段自动补全）。
#[wasm_bindgen(js_name = "dealDeck")]
pub fn deal_deck(config: JsValue) -> Result<JsValue, JsValue> {
    let config: GameConfig = from_value(config).map_err(JsValue::from)?;
    to_value(&game::deal(config)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "selectCard")]
pub fn select_card(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: SelectCardAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.select_card(&mut state, action) {
        Ok(events) => to_value(&make_resolution(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "resolveTriple")]
pub fn resolve_triple(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: ResolveTripleAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.resolve_triple(&mut state, action) {
        Ok(events) => to_value(&make_resolution(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "playAgain")]
pub fn play_again(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.replay(&mut state) {
        Ok(events) => to_value(&make_resolution(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "checkWin")]
pub fn check_win(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let message = RuleEngine::check_win(&mut state);
    to_value(&message).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// 由状态推导渲染层所需的一帧画面数据。
#[wasm_bindgen(js_name = "tableView")]
pub fn table_view(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&state.view()).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
