#![cfg(target_arch = "wasm32")]

use triple_match::{GameEngine, GameState, RuleResolution, SelectCardAction};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn parse_state(json: &str) -> GameState {
    serde_json::from_str(json).expect("engine state should be valid JSON")
}

fn matching_triple(state: &GameState) -> Vec<String> {
    let icon = state.deck[0].icon().to_string();
    state
        .deck
        .iter()
        .filter(|placed| placed.icon() == icon)
        .take(3)
        .map(|placed| placed.id().to_string())
        .collect()
}

fn select(engine: &mut GameEngine, card_id: &str) -> RuleResolution {
    let action = serde_json::to_string(&SelectCardAction {
        card_id: card_id.to_string(),
    })
    .expect("action should serialize");
    let json = engine
        .select_card_json(&action)
        .expect("selection should succeed");
    serde_json::from_str(&json).expect("resolution should be valid JSON")
}

#[wasm_bindgen_test]
fn engine_deals_a_full_table() {
    let engine = GameEngine::with_seed(11);
    let state = parse_state(&engine.state_json().unwrap());

    assert_eq!(state.deck.len(), 60);
    assert!(state.selected.is_empty());
    assert!(state.removed.is_empty());
    assert!(state.win_message.is_none());
}

#[wasm_bindgen_test]
async fn staged_triple_settles_after_the_delay() {
    let mut engine = GameEngine::with_seed(7);
    let state = parse_state(&engine.state_json().unwrap());
    let triple = matching_triple(&state);

    let mut resolution = None;
    for card_id in &triple {
        resolution = Some(select(&mut engine, card_id));
    }
    let staged = resolution
        .and_then(|resolution| resolution.pending)
        .expect("the third click should stage a triple");
    assert_eq!(staged.resolve_after_ms, 500);

    let settled = JsFuture::from(engine.settle_pending())
        .await
        .expect("settle promise should resolve");
    let resolution: RuleResolution =
        serde_json::from_str(&settled.as_string().expect("promise should carry JSON"))
            .expect("resolution should be valid JSON");

    assert!(resolution.state.selected.is_empty());
    for card_id in &triple {
        assert!(resolution.state.is_removed(card_id));
    }
}

#[wasm_bindgen_test]
fn play_again_resets_the_engine_state() {
    let mut engine = GameEngine::with_seed(3);
    let state = parse_state(&engine.state_json().unwrap());
    select(&mut engine, state.deck[0].id());

    let json = engine.play_again().expect("replay should succeed");
    let resolution: RuleResolution =
        serde_json::from_str(&json).expect("resolution should be valid JSON");

    assert_eq!(resolution.state.generation, 2);
    assert!(resolution.state.selected.is_empty());
    assert!(resolution.state.removed.is_empty());
    assert_eq!(resolution.state.deck.len(), 60);
}
