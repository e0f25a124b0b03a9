use crate::engine::Move;
use crate::logic::game::GameState;

fn m(s: &str) -> Move {
    s.parse().unwrap()
}

fn shuffle_knights(game: &mut GameState) {
    for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        assert!(game.execute(m(mv)).is_ok());
    }
}

#[test]
fn test_two_move_oscillation_is_detected() {
    let mut game = GameState::new();

    // 1. Nf3 Nf6 2. Ng1 Ng8: Nf3 would start the loop again
    game.execute(m("g1f3")).unwrap();
    game.execute(m("g8f6")).unwrap();
    game.execute(m("f3g1")).unwrap();
    assert_eq!(game.forbidden_move(), None);

    game.execute(m("f6g8")).unwrap();
    assert_eq!(game.forbidden_move(), Some(m("g1f3")));
}

#[test]
fn test_guard_clears_on_any_other_move() {
    let mut game = GameState::new();
    shuffle_knights(&mut game);
    game.execute(m("e2e4")).unwrap();
    assert_eq!(game.forbidden_move(), None);
}

#[test]
fn test_guard_follows_undo() {
    let mut game = GameState::new();
    shuffle_knights(&mut game);
    game.execute(m("e2e4")).unwrap();
    assert!(game.undo_move());
    assert_eq!(game.forbidden_move(), Some(m("g1f3")));

    assert!(game.undo_move());
    assert_eq!(game.forbidden_move(), None);
}

#[test]
fn test_non_reversing_moves_do_not_trigger() {
    let mut game = GameState::new();
    for mv in ["g1f3", "g8f6", "f3g5", "f6g4"] {
        game.execute(m(mv)).unwrap();
    }
    assert_eq!(game.forbidden_move(), None);
}

#[test]
fn test_engine_excludes_forbidden_move() {
    use crate::engine::config::EngineConfig;
    use crate::engine::search::AlphaBetaEngine;
    use crate::engine::Searcher;
    use std::sync::Arc;

    let mut game = GameState::new();
    shuffle_knights(&mut game);
    let forbidden = game.forbidden_move().unwrap();

    let config = EngineConfig {
        randomize: 0,
        ..EngineConfig::default()
    };
    let mut engine = AlphaBetaEngine::new(Arc::new(config.clone()));
    for depth in 1..=2 {
        let report = engine.best_move(&game, game.turn(), depth);
        assert_ne!(report.best_move(), Some(forbidden));
    }

    // with the guard switched off the move is back in the root list
    let mut lenient = AlphaBetaEngine::new(Arc::new(EngineConfig {
        no_draws: false,
        ..config
    }));
    let report = lenient.best_move(&game, game.turn(), 1);
    assert!(report.best_move().is_some());
}
