use crate::model::{NEGATIVE, POSITIVE};

/// Binary majority vote. Ties go to the lowest label (0).
pub(crate) fn majority(negative: usize, positive: usize) -> usize {
    if positive > negative { POSITIVE } else { NEGATIVE }
}

/// Count negative and positive votes in a label slice.
pub(crate) fn tally(labels: impl IntoIterator<Item = usize>) -> (usize, usize) {
    labels.into_iter().fold((0, 0), |(neg, pos), l| {
        if l == POSITIVE { (neg, pos + 1) } else { (neg + 1, pos) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_goes_to_negative() {
        assert_eq!(majority(3, 3), NEGATIVE);
    }

    #[test]
    fn clear_majority_wins() {
        assert_eq!(majority(1, 4), POSITIVE);
        assert_eq!(majority(4, 1), NEGATIVE);
    }

    #[test]
    fn tally_counts_each_class() {
        assert_eq!(tally([0, 1, 1, 0, 1]), (2, 3));
    }
}
