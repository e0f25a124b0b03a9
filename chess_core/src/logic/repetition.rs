use crate::engine::Move;
use crate::logic::game::UndoRecord;

/// Detects a two-move back-and-forth at the end of `history` and returns the
/// move that would start the cycle a third time.
///
/// With plies `.. a b a' b'` where `a'` reverses `a` and `b'` reverses `b`,
/// playing `a` again is forbidden.
pub fn forbidden_move(history: &[UndoRecord]) -> Option<Move> {
    let [.., a, b, a_back, b_back] = history else {
        return None;
    };
    let reverses = |later: &UndoRecord, earlier: &UndoRecord| {
        later.as_move() == earlier.as_move().reversed()
    };
    (reverses(a_back, a) && reverses(b_back, b)).then(|| a.as_move())
}
