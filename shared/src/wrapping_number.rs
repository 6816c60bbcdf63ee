use crate::Frame;

const HALF_RANGE: Frame = 1 << 31;

/// Returns whether or not a wrapping frame is newer than another
/// sequence_greater_than(2,1) will return true
/// sequence_greater_than(1,2) will return false
/// sequence_greater_than(1,1) will return false
pub fn sequence_greater_than(s1: Frame, s2: Frame) -> bool {
    ((s1 > s2) && (s1 - s2 <= HALF_RANGE)) || ((s1 < s2) && (s2 - s1 > HALF_RANGE))
}

/// Returns whether or not a wrapping frame is older than another
/// sequence_less_than(1,2) will return true
/// sequence_less_than(2,1) will return false
/// sequence_less_than(1,1) will return false
pub fn sequence_less_than(s1: Frame, s2: Frame) -> bool {
    sequence_greater_than(s2, s1)
}
