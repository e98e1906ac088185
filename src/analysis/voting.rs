//! Cross-frame majority voting
//!
//! A single frame is never trusted. The scan's answer is the most frequent
//! price string across all sampled frames, paired with the most frequent
//! product name among frames that found one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

use super::FrameResult;
use crate::vision::classify::extract_price_value;

/// Consolidated reading of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub price: f64,
    pub product_name: Option<String>,
}

/// Most frequent value. Ties go to the value seen first.
pub fn elect_majority<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    // value -> (count, first position)
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

/// Reduce a scan's frame results to one outcome.
///
/// Returns `None` when there are no results or the winning price string
/// carries no parsable number.
pub fn aggregate(results: &[FrameResult]) -> Option<ScanOutcome> {
    let price_text = elect_majority(results.iter().map(|r| r.price.text.as_str()))?;
    let Some(price) = extract_price_value(price_text) else {
        info!("Majority price '{}' is not a parsable price", price_text);
        return None;
    };

    let product_name = elect_majority(results.iter().filter_map(|r| r.product_name.as_deref()))
        .map(str::to_owned);

    let tagged = results.iter().filter(|r| r.price_tag_contour.is_some()).count();
    debug!(
        "Vote over {} frames ({} with a tag outline): price '{}' -> {}, product {:?}",
        results.len(),
        tagged,
        price_text,
        price,
        product_name
    );

    Some(ScanOutcome { price, product_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{Rect, TextFragment, TextResult};
    use std::sync::Arc;

    fn result(price: &str, product: Option<&str>) -> FrameResult {
        FrameResult {
            text: Arc::new(TextResult::default()),
            price: TextFragment::new(0, (640, 480), Rect::new(0, 0, 50, 20), price, 0, Some(0), 0.9),
            product_name: product.map(str::to_owned),
            price_tag_contour: None,
        }
    }

    #[test]
    fn test_elect_majority() {
        assert_eq!(elect_majority(["a", "b", "b", "c"]), Some("b"));
        assert_eq!(elect_majority(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_elect_majority_tie_goes_to_first_seen() {
        assert_eq!(elect_majority(["x", "y", "y", "x", "z"]), Some("x"));
        assert_eq!(elect_majority([3, 1, 2]), Some(3));
    }

    #[test]
    fn test_aggregate_picks_modal_price() {
        let results = vec![
            result("12.99", None),
            result("12.99", Some("Milk")),
            result("12.90", Some("Milk")),
            result("12.99", Some("Mik")),
        ];

        let outcome = aggregate(&results).unwrap();
        assert!((outcome.price - 12.99).abs() < 1e-9);
        assert_eq!(outcome.product_name.as_deref(), Some("Milk"));
    }

    #[test]
    fn test_aggregate_normalizes_separators() {
        let outcome = aggregate(&[result("$3,49", None)]).unwrap();
        assert!((outcome.price - 3.49).abs() < 1e-9);
        assert_eq!(outcome.product_name, None);
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn test_aggregate_unparsable_majority_is_none() {
        // A rebuilt price can carry an empty fraction ("12.")
        let results = vec![result("12.", None), result("12.", None), result("4.99", None)];
        assert_eq!(aggregate(&results), None);
    }
}
