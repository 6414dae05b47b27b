use crate::types::HandicapMethod;

pub const FIRST_PLACE_HANDICAP_MS: i64 = -10;
pub const SECOND_PLACE_HANDICAP_MS: i64 = -5;
pub const LOSERS_HANDICAP_MS: i64 = 5;

fn by_position(position: usize) -> i64 {
    match position {
        0 => FIRST_PLACE_HANDICAP_MS,
        1 => SECOND_PLACE_HANDICAP_MS,
        _ => 0,
    }
}

/// Time adjustment for a player entering a stage.
///
/// `slot` is the player's position within the destination stage and
/// `source_rank` their 0-based placement in the stage they came from.
pub fn assign_handicap(method: HandicapMethod, slot: usize, source_rank: usize) -> i64 {
    match method {
        HandicapMethod::None => 0,
        HandicapMethod::WinnersPure => by_position(source_rank),
        HandicapMethod::WinnersDest => by_position(slot),
        HandicapMethod::WinnersDest2 if source_rank == 0 => by_position(slot),
        HandicapMethod::WinnersDest2 => 0,
        HandicapMethod::Losers => LOSERS_HANDICAP_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods() {
        assert_eq!(assign_handicap(HandicapMethod::None, 0, 0), 0);

        assert_eq!(assign_handicap(HandicapMethod::WinnersPure, 3, 0), -10);
        assert_eq!(assign_handicap(HandicapMethod::WinnersPure, 0, 1), -5);
        assert_eq!(assign_handicap(HandicapMethod::WinnersPure, 0, 2), 0);

        assert_eq!(assign_handicap(HandicapMethod::WinnersDest, 0, 3), -10);
        assert_eq!(assign_handicap(HandicapMethod::WinnersDest, 1, 0), -5);
        assert_eq!(assign_handicap(HandicapMethod::WinnersDest, 2, 0), 0);

        assert_eq!(assign_handicap(HandicapMethod::WinnersDest2, 1, 0), -5);
        assert_eq!(assign_handicap(HandicapMethod::WinnersDest2, 0, 1), 0);

        assert_eq!(assign_handicap(HandicapMethod::Losers, 7, 4), 5);
    }
}
