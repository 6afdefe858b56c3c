use once_cell::sync::Lazy;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::state::{
    Card, GameConfig, GameEvent, GameState, PlacedCard, Position, PLACEMENT_MAX, PLACEMENT_MIN,
    ROTATION_LIMIT,
};

/// 默认图案集合：十种卡通动物。
pub static DEFAULT_PALETTE: Lazy<Vec<String>> = Lazy::new(|| {
    ["🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯"]
        .into_iter()
        .map(|icon| icon.to_string())
        .collect()
});

/// 依据配置生成一副洗好、摆放好的牌堆。随机性完全来自传入的 rng。
pub fn generate(config: &GameConfig, rng: &mut SmallRng) -> Vec<PlacedCard> {
    let mut cards = Vec::with_capacity(config.deck_size());
    for icon in &config.palette {
        for sequence in 0..config.repetitions {
            cards.push(Card::new(icon.clone(), sequence));
        }
    }

    // Fisher-Yates 均匀洗牌
    cards.shuffle(rng);

    cards
        .into_iter()
        .map(|card| PlacedCard {
            card,
            position: random_position(rng),
        })
        .collect()
}

fn random_position(rng: &mut SmallRng) -> Position {
    Position {
        top: rng.gen_range(PLACEMENT_MIN..PLACEMENT_MAX),
        left: rng.gen_range(PLACEMENT_MIN..PLACEMENT_MAX),
        rotation: rng.gen_range(-ROTATION_LIMIT..ROTATION_LIMIT),
    }
}

/// 用系统熵源发一局新牌。
pub fn deal(config: GameConfig) -> GameState {
    let mut rng = SmallRng::from_entropy();
    deal_with(config, &mut rng)
}

/// 用固定种子发牌，便于复现同一副牌。
pub fn deal_seeded(config: GameConfig, seed: u64) -> GameState {
    let mut rng = SmallRng::seed_from_u64(seed);
    deal_with(config, &mut rng)
}

pub(crate) fn deal_with(config: GameConfig, rng: &mut SmallRng) -> GameState {
    let deck = generate(&config, rng);
    let mut state = GameState::new(config, deck);
    let event = GameEvent::DeckDealt {
        generation: state.generation,
        card_count: state.deck.len(),
    };
    state.record_event(event);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn seeded_deck(seed: u64) -> Vec<PlacedCard> {
        let mut rng = SmallRng::seed_from_u64(seed);
        generate(&GameConfig::default(), &mut rng)
    }

    #[test]
    fn deck_has_palette_times_repetitions_cards() {
        let config = GameConfig::default();
        let deck = seeded_deck(1);
        assert_eq!(deck.len(), config.deck_size());
        assert_eq!(deck.len(), 60);
    }

    #[test]
    fn every_icon_appears_exactly_repetitions_times() {
        let config = GameConfig::default();
        let deck = seeded_deck(2);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for placed in &deck {
            *counts.entry(placed.icon()).or_default() += 1;
        }

        assert_eq!(counts.len(), config.palette.len());
        for (icon, count) in counts {
            assert_eq!(count, config.repetitions, "icon {icon} has wrong count");
        }
    }

    #[test]
    fn card_ids_are_unique() {
        let deck = seeded_deck(3);
        let ids: HashSet<&str> = deck.iter().map(|placed| placed.id()).collect();
        assert_eq!(ids.len(), deck.len());
    }

    #[test]
    fn placements_stay_inside_the_ranges() {
        for seed in 0..20 {
            for placed in seeded_deck(seed) {
                let position = placed.position;
                assert!(
                    (PLACEMENT_MIN..PLACEMENT_MAX).contains(&position.top),
                    "top {} out of range",
                    position.top
                );
                assert!(
                    (PLACEMENT_MIN..PLACEMENT_MAX).contains(&position.left),
                    "left {} out of range",
                    position.left
                );
                assert!(
                    (-ROTATION_LIMIT..ROTATION_LIMIT).contains(&position.rotation),
                    "rotation {} out of range",
                    position.rotation
                );
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_deal() {
        let first = deal_seeded(GameConfig::default(), 42);
        let second = deal_seeded(GameConfig::default(), 42);
        assert_eq!(first.deck, second.deck);
    }

    #[test]
    fn different_seeds_change_the_order() {
        let first = seeded_deck(1);
        let second = seeded_deck(2);
        let order = |deck: &[PlacedCard]| -> Vec<String> {
            deck.iter().map(|placed| placed.id().to_string()).collect()
        };
        assert_ne!(order(&first), order(&second));
    }

    #[test]
    fn shuffle_spreads_a_card_across_the_deck() {
        // 统计同一张卡在多次洗牌后的落点，应接近均匀分布
        let samples = 600;
        let deck_size = GameConfig::default().deck_size();
        let mut index_sum = 0usize;
        let mut buckets = [0usize; 6];

        for seed in 0..samples {
            let deck = seeded_deck(seed as u64);
            let index = deck
                .iter()
                .position(|placed| placed.id() == "🐶-0")
                .expect("tracked card should always be dealt");
            index_sum += index;
            buckets[index * buckets.len() / deck_size] += 1;
        }

        let mean = index_sum as f64 / samples as f64;
        let expected = (deck_size as f64 - 1.0) / 2.0;
        assert!(
            (mean - expected).abs() < 4.0,
            "mean shuffled index {mean} drifts from {expected}"
        );

        let expected_per_bucket = samples / buckets.len();
        for (bucket, count) in buckets.iter().enumerate() {
            assert!(
                *count > expected_per_bucket / 2 && *count < expected_per_bucket * 2,
                "bucket {bucket} holds {count} samples, expected about {expected_per_bucket}"
            );
        }
    }

    #[test]
    fn single_icon_mini_deck_is_supported() {
        let config = GameConfig::default()
            .with_palette(vec!["🐶".to_string()])
            .with_repetitions(3);
        let state = deal_seeded(config, 5);

        assert_eq!(state.deck.len(), 3);
        assert_eq!(state.generation, 1);
        assert!(state.selected.is_empty());
        assert!(state.removed.is_empty());
        assert!(state.win_message.is_none());
        assert!(matches!(
            state.event_log.as_slice(),
            [GameEvent::DeckDealt {
                generation: 1,
                card_count: 3,
            }]
        ));
    }
}
