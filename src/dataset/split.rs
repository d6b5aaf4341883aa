//! Order-preserving held-out splits.

use super::DatasetError;

/// Ratio used when the configuration does not set `test_percent`.
pub const DEFAULT_TEST_PERCENT: f64 = 0.2;

/// Which leaf of the dev split a plugin is asked to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitKind {
    Train,
    Test,
}

impl SplitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitKind::Train => "train",
            SplitKind::Test => "test",
        }
    }
}

/// Reject ratios outside `[0, 1]` (and NaN).
pub fn validate_test_percent(test_percent: f64) -> Result<f64, DatasetError> {
    if (0.0..=1.0).contains(&test_percent) {
        Ok(test_percent)
    } else {
        Err(DatasetError::configuration(
            "test_percent",
            format!("{test_percent} is outside [0, 1]"),
        ))
    }
}

/// Number of items held out from `len`: `len * test_percent` rounded half away
/// from zero.
pub fn held_out_count(len: usize, test_percent: f64) -> usize {
    let count = (len as f64 * test_percent).round() as usize;
    count.min(len)
}

/// Split `objects` into `(held_out, remainder)`.
///
/// The first [`held_out_count`] items are held out; both halves keep input
/// order, so the same input order always produces the same partition.
pub fn split<T>(mut objects: Vec<T>, test_percent: f64) -> Result<(Vec<T>, Vec<T>), DatasetError> {
    let test_percent = validate_test_percent(test_percent)?;
    let remainder = objects.split_off(held_out_count(objects.len(), test_percent));
    Ok((objects, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_at_twenty_percent_then_eight() {
        let (held, rest) = split((0..10).collect(), 0.2).unwrap();
        assert_eq!(held, vec![0, 1]);
        assert_eq!(rest, (2..10).collect::<Vec<_>>());

        let (held, rest) = split(rest, 0.2).unwrap();
        assert_eq!(held, vec![2, 3]);
        assert_eq!(rest.len(), 6);
    }

    #[test]
    fn partitions_every_size_within_one_of_target() {
        for len in 0..60usize {
            for step in 0..=20 {
                let ratio = step as f64 / 20.0;
                let input: Vec<usize> = (0..len).collect();
                let (held, rest) = split(input.clone(), ratio).unwrap();
                let mut joined = held.clone();
                joined.extend(&rest);
                assert_eq!(joined, input);
                let target = (len as f64 * ratio).round();
                assert!((held.len() as f64 - target).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn extremes_hold_out_nothing_or_everything() {
        let (held, rest) = split(vec!['a', 'b', 'c'], 0.0).unwrap();
        assert!(held.is_empty());
        assert_eq!(rest.len(), 3);
        let (held, rest) = split(vec!['a', 'b', 'c'], 1.0).unwrap();
        assert_eq!(held.len(), 3);
        assert!(rest.is_empty());
    }

    #[test]
    fn out_of_range_ratio_is_configuration_error() {
        for ratio in [1.5, -0.1, f64::NAN] {
            let err = split(vec![1, 2, 3], ratio).unwrap_err();
            assert!(matches!(err, DatasetError::Configuration { .. }), "{ratio}");
        }
    }
}
