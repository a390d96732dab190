//! Train number search and the scroll offset showing the most matches at
//! once.

use crate::layout::PositionedTrain;
use crate::model::TrainId;
use log::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Highlight {
    pub matched: BTreeSet<TrainId>,
    pub dimmed: BTreeSet<TrainId>,
    /// Canvas offset in pixels from 00:00. `None` leaves the scroll
    /// position alone.
    pub scroll_offset: Option<f64>,
    /// Matches inside the chosen window.
    pub max_visible: usize,
}

impl Highlight {
    pub fn is_cleared(&self) -> bool {
        self.matched.is_empty() && self.dimmed.is_empty()
    }
}

/// Comma separated, trimmed, lower-cased tokens with empty ones dropped.
pub fn parse_query(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn is_match(tokens: &[String], arrival: &str, departure: &str) -> bool {
    let arrival = arrival.to_lowercase();
    let departure = departure.to_lowercase();
    tokens.iter().any(|token| {
        (!arrival.is_empty() && arrival.contains(token.as_str()))
            || (!departure.is_empty() && departure.contains(token.as_str()))
    })
}

pub fn highlight(query: &str, positioned: &[PositionedTrain], viewport_width: f64) -> Highlight {
    let tokens = parse_query(query);
    if tokens.is_empty() {
        return Highlight::default();
    }

    let (matched, dimmed): (Vec<&PositionedTrain>, Vec<&PositionedTrain>) = positioned
        .iter()
        .partition(|p| is_match(&tokens, &p.arrival_number, &p.departure_number));

    let (scroll_offset, max_visible) = if matched.is_empty() {
        (None, 0)
    } else {
        let (offset, visible) = optimal_scroll(&matched, viewport_width);
        (Some(offset), visible)
    };

    info!(
        "Search {:?}: {} matches, {} visible at once",
        tokens,
        matched.len(),
        max_visible
    );

    Highlight {
        matched: matched.iter().map(|p| p.id).collect(),
        dimmed: dimmed.iter().map(|p| p.id).collect(),
        scroll_offset,
        max_visible,
    }
}

/// Tries every match as the left edge of the viewport and keeps the one
/// with the most matches whose left edge falls inside. The leftmost
/// candidate wins ties. When the winning window holds every match and the
/// group is narrower than the viewport, the group is centered instead.
/// Returns the offset, never negative, and the number of visible matches.
pub fn optimal_scroll(matched: &[&PositionedTrain], viewport_width: f64) -> (f64, usize) {
    let mut sorted = matched.to_vec();
    sorted.sort_by(|a, b| a.left.total_cmp(&b.left).then(a.id.cmp(&b.id)));

    let mut best_left = 0.0;
    let mut best_count = 0;
    for candidate in sorted.iter() {
        let window_end = candidate.left + viewport_width;
        let count = sorted
            .iter()
            .filter(|t| t.left >= candidate.left && t.left < window_end)
            .count();
        if count > best_count {
            best_count = count;
            best_left = candidate.left;
        }
    }

    if best_count == sorted.len() {
        if let Some(first) = sorted.first() {
            let last_right = sorted
                .iter()
                .map(|t| t.right())
                .fold(f64::NEG_INFINITY, f64::max);
            let span = last_right - first.left;
            if span < viewport_width {
                best_left = first.left - (viewport_width - span) / 2.0;
            }
        }
    }

    (best_left.max(0.0), best_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: TrainId, dep: &str, left: f64) -> PositionedTrain {
        PositionedTrain {
            id,
            arrival_number: String::new(),
            departure_number: dep.to_string(),
            left,
            width: 50.0,
            top: 0.0,
            height: 48.0,
        }
    }

    #[test]
    fn query_parsing() {
        assert_eq!(parse_query(" 123, ,IC45 ,"), vec!["123".to_string(), "ic45".to_string()]);
        assert!(parse_query(" , ,").is_empty());
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn comma_separated_numbers() {
        let trains = vec![at(1, "123", 0.0), at(2, "789", 100.0), at(3, "456", 200.0)];
        let h = highlight("123, 456", &trains, 1000.0);
        assert_eq!(h.matched, [1, 3].iter().copied().collect::<BTreeSet<_>>());
        assert_eq!(h.dimmed, [2].iter().copied().collect::<BTreeSet<_>>());
        assert_eq!(h.max_visible, 2);
    }

    #[test]
    fn substring_and_case_insensitive() {
        let mut t = at(1, "", 0.0);
        t.arrival_number = "IC3201".to_string();
        assert!(is_match(&parse_query("ic32"), &t.arrival_number, &t.departure_number));
        assert!(!is_match(&parse_query("33"), &t.arrival_number, &t.departure_number));
    }

    #[test]
    fn empty_query_clears() {
        let trains = vec![at(1, "123", 0.0)];
        let h = highlight("  ,  ", &trains, 1000.0);
        assert!(h.is_cleared());
        assert_eq!(h.scroll_offset, None);
    }

    #[test]
    fn no_match_dims_everything_without_scrolling() {
        let trains = vec![at(1, "123", 0.0), at(2, "456", 500.0)];
        let h = highlight("999", &trains, 1000.0);
        assert!(h.matched.is_empty());
        assert_eq!(h.dimmed.len(), 2);
        assert_eq!(h.scroll_offset, None);
    }

    #[test]
    fn densest_window_wins() {
        let trains = vec![
            at(1, "10", 0.0),
            at(2, "10", 1000.0),
            at(3, "10", 1100.0),
            at(4, "10", 1200.0),
        ];
        let h = highlight("10", &trains, 400.0);
        assert_eq!(h.scroll_offset, Some(1000.0));
        assert_eq!(h.max_visible, 3);
    }

    #[test]
    fn ties_prefer_earlier_window() {
        let trains = vec![
            at(1, "7", 2000.0),
            at(2, "7", 2100.0),
            at(3, "7", 500.0),
            at(4, "7", 600.0),
        ];
        let h = highlight("7", &trains, 300.0);
        assert_eq!(h.scroll_offset, Some(500.0));
        assert_eq!(h.max_visible, 2);
    }

    #[test]
    fn window_is_half_open() {
        let trains = vec![at(1, "5", 100.0), at(2, "5", 500.0)];
        let (offset, visible) = optimal_scroll(&trains.iter().collect::<Vec<_>>(), 400.0);
        assert_eq!(visible, 1);
        assert_eq!(offset, 100.0);
    }

    #[test]
    fn small_groups_are_centered() {
        let trains = vec![at(1, "5", 1000.0), at(2, "5", 1100.0)];
        // span 1000..1150, centered in 400 pixels
        let h = highlight("5", &trains, 400.0);
        assert_eq!(h.scroll_offset, Some(875.0));

        let near_start = vec![at(1, "5", 100.0), at(2, "5", 200.0)];
        let h = highlight("5", &near_start, 400.0);
        assert_eq!(h.scroll_offset, Some(0.0));
    }

    #[test]
    fn span_uses_the_rightmost_end() {
        // the first train runs past the end of the second one
        let mut long = at(1, "5", 1000.0);
        long.width = 600.0;
        let trains = vec![long, at(2, "5", 1100.0)];
        let h = highlight("5", &trains, 800.0);
        // span 1000..1600 centered in 800 pixels
        assert_eq!(h.scroll_offset, Some(900.0));
        assert_eq!(h.max_visible, 2);
    }

    #[test]
    fn offsets_left_of_the_canvas_clamp_to_zero() {
        let trains = vec![at(1, "5", -300.0), at(2, "5", -200.0), at(3, "6", 50.0)];
        let h = highlight("5", &trains, 1000.0);
        assert_eq!(h.scroll_offset, Some(0.0));
        assert_eq!(h.max_visible, 2);
        assert_eq!(h.dimmed, [3].iter().copied().collect::<BTreeSet<_>>());
    }

    #[test]
    fn early_morning_match_scrolls_back() {
        // 06:00 at 4 px per minute, well before a 09:00 view
        let trains = vec![at(1, "101", 360.0 * 4.0), at(2, "202", 600.0 * 4.0)];
        let h = highlight("101", &trains, 1200.0);
        assert_eq!(h.scroll_offset, Some(1440.0 - (1200.0 - 50.0) / 2.0));
    }

    #[test]
    fn search_is_idempotent() {
        let trains = vec![at(1, "123", 40.0), at(2, "1234", 900.0), at(3, "555", 950.0)];
        let first = highlight("123,555", &trains, 300.0);
        let second = highlight("123,555", &trains, 300.0);
        assert_eq!(first, second);
    }
}
