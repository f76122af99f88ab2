//! Win Evaluation

use serde::{Serialize, Deserialize};

/// Winning side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Crewmates finished their tasks or ejected every impostor.
    Crew,
    /// At least one impostor survived.
    Impostor,
}

/// Decide the winner from current progress and surviving impostors.
///
/// Always recomputed; progress and the alive set change between calls.
pub fn evaluate_winner(progress: u8, impostors_alive: usize) -> Winner {
    if progress >= 100 {
        Winner::Crew
    } else if impostors_alive > 0 {
        Winner::Impostor
    } else {
        Winner::Crew
    }
}

/// Alive-player count at which a round is decided: two plus the impostors dealt.
pub fn end_game_threshold(impostor_count: usize) -> usize {
    2 + impostor_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_progress_beats_surviving_impostor() {
        assert_eq!(evaluate_winner(100, 1), Winner::Crew);
        assert_eq!(evaluate_winner(100, 0), Winner::Crew);
    }

    #[test]
    fn test_surviving_impostor_wins_otherwise() {
        assert_eq!(evaluate_winner(99, 1), Winner::Impostor);
        assert_eq!(evaluate_winner(0, 2), Winner::Impostor);
    }

    #[test]
    fn test_crew_wins_when_impostors_gone() {
        assert_eq!(evaluate_winner(10, 0), Winner::Crew);
    }

    #[test]
    fn test_threshold() {
        assert_eq!(end_game_threshold(1), 3);
        assert_eq!(end_game_threshold(2), 4);
    }
}
