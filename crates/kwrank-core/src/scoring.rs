//! Opportunity score bands for Search Ads keyword rankings.
//!
//! Each component maps a raw ranking metric onto a small integer band.
//! Lower rank is better; higher popularity is better. The bands are fixed
//! and monotonic, so the total score is a simple sum.

/// Band for position within the genre ranking (1 = best).
#[must_use]
pub fn score_rank_in_genre(rank: i64) -> i64 {
    match rank {
        1..=10 => 3,
        11..=25 => 2,
        26..=50 => 1,
        _ => 0,
    }
}

/// Band for search popularity within the genre (1-100).
#[must_use]
pub fn score_popularity_in_genre(popularity: i64) -> i64 {
    match popularity {
        76..=100 => 3,
        61..=75 => 2,
        50..=60 => 1,
        _ => 0,
    }
}

/// Band for overall search popularity (1-100).
#[must_use]
pub fn score_overall_popularity(popularity: i64) -> i64 {
    match popularity {
        86..=100 => 5,
        71..=85 => 4,
        61..=70 => 3,
        50..=60 => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_bands() {
        assert_eq!(score_rank_in_genre(1), 3);
        assert_eq!(score_rank_in_genre(5), 3);
        assert_eq!(score_rank_in_genre(10), 3);
        assert_eq!(score_rank_in_genre(11), 2);
        assert_eq!(score_rank_in_genre(15), 2);
        assert_eq!(score_rank_in_genre(25), 2);
        assert_eq!(score_rank_in_genre(26), 1);
        assert_eq!(score_rank_in_genre(50), 1);
        assert_eq!(score_rank_in_genre(51), 0);
        assert_eq!(score_rank_in_genre(999), 0);
        assert_eq!(score_rank_in_genre(0), 0);
        assert_eq!(score_rank_in_genre(-3), 0);
    }

    #[test]
    fn genre_popularity_bands() {
        assert_eq!(score_popularity_in_genre(100), 3);
        assert_eq!(score_popularity_in_genre(76), 3);
        assert_eq!(score_popularity_in_genre(75), 2);
        assert_eq!(score_popularity_in_genre(61), 2);
        assert_eq!(score_popularity_in_genre(60), 1);
        assert_eq!(score_popularity_in_genre(50), 1);
        assert_eq!(score_popularity_in_genre(49), 0);
        assert_eq!(score_popularity_in_genre(101), 0);
    }

    #[test]
    fn overall_popularity_bands() {
        assert_eq!(score_overall_popularity(90), 5);
        assert_eq!(score_overall_popularity(86), 5);
        assert_eq!(score_overall_popularity(85), 4);
        assert_eq!(score_overall_popularity(71), 4);
        assert_eq!(score_overall_popularity(70), 3);
        assert_eq!(score_overall_popularity(65), 3);
        assert_eq!(score_overall_popularity(61), 3);
        assert_eq!(score_overall_popularity(60), 2);
        assert_eq!(score_overall_popularity(50), 2);
        assert_eq!(score_overall_popularity(49), 0);
        assert_eq!(score_overall_popularity(10), 0);
    }

    #[test]
    fn bands_are_monotonic() {
        for rank in 1..200 {
            assert!(score_rank_in_genre(rank) >= score_rank_in_genre(rank + 1));
        }
        for pop in 0..100 {
            assert!(score_popularity_in_genre(pop) <= score_popularity_in_genre(pop + 1));
            assert!(score_overall_popularity(pop) <= score_overall_popularity(pop + 1));
        }
    }
}
