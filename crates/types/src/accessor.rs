use crate::{FieldCoordinate, NonEmptyText};

/// Read-only, coordinate-addressed access to one parsed message.
///
/// Absence is the only outcome for a coordinate that does not exist in the
/// message; implementations never fail on lookup.
pub trait FieldAccessor {
    /// Returns the value at `coordinate`, or `None` when it is missing or blank.
    fn get(&self, coordinate: &FieldCoordinate) -> Option<NonEmptyText>;

    /// Returns how many times `segment` occurs in the message.
    fn repetition_count(&self, segment: &str) -> usize;
}

impl<A: FieldAccessor + ?Sized> FieldAccessor for &A {
    fn get(&self, coordinate: &FieldCoordinate) -> Option<NonEmptyText> {
        (**self).get(coordinate)
    }

    fn repetition_count(&self, segment: &str) -> usize {
        (**self).repetition_count(segment)
    }
}
