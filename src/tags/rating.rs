// Weighted rating classifier
//
// Pure function: accumulates weights over the enriched tag set, then maps the
// score to a rating letter, falling back to the post's categorical rating
// strings when no weighted tag matched.

use std::collections::HashMap;

/// Map a numeric total to the rating letter.
fn rating_from_score(total_score: i64, safe_max: i64, questionable_max: i64) -> char {
    if total_score <= safe_max {
        's'
    } else if total_score <= questionable_max {
        'q'
    } else {
        'e'
    }
}

/// Compute the content-rating letter for an enriched tag set.
///
/// Weights greater than 1 add to the score. A weight of exactly 1 floors the
/// score at 1 when it is still zero: a single low-signal tag registers
/// minimally but does not stack. When no weighted tag matched, the post's
/// categorical ratings decide with priority explicit > questionable/sensitive
/// > general, defaulting to `?`. Legacy `g` normalizes to `s`.
pub fn calculate_rating(
    tags: &[String],
    post_ratings: &[String],
    weights: &HashMap<String, i64>,
    safe_max: i64,
    questionable_max: i64,
) -> char {
    let mut total_score: i64 = 0;
    for tag in tags {
        match weights.get(tag.as_str()) {
            Some(&w) if w > 1 => total_score += w,
            Some(&1) if total_score == 0 => total_score = 1,
            _ => {}
        }
    }

    let letter = if total_score > 0 {
        rating_from_score(total_score, safe_max, questionable_max)
    } else if post_ratings.iter().any(|r| r == "explicit" || r == "e") {
        'e'
    } else if post_ratings
        .iter()
        .any(|r| r == "questionable" || r == "sensitive" || r == "q")
    {
        'q'
    } else if post_ratings.iter().any(|r| r == "general" || r == "s" || r == "g") {
        's'
    } else {
        '?'
    };

    if letter == 'g' {
        's'
    } else {
        letter
    }
}
