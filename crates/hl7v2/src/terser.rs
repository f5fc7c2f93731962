//! Coordinate lookup over a parsed [`Message`].

use crate::Message;
use v2fhir_types::{FieldAccessor, FieldCoordinate, NonEmptyText};

/// The HL7 explicit null. It clears a value downstream, so it never carries data here.
const EXPLICIT_NULL: &str = "\"\"";

impl FieldAccessor for Message {
    fn get(&self, coordinate: &FieldCoordinate) -> Option<NonEmptyText> {
        let segment = self.segment(coordinate.segment(), coordinate.repetition())?;
        let raw = segment.raw_field(coordinate.field())?;

        // MSH-1 and MSH-2 hold the delimiters themselves.
        if segment.name() == "MSH" && coordinate.field() <= 2 {
            return NonEmptyText::from_field(raw);
        }

        let delimiters = self.delimiters();
        let repetition = raw.split(delimiters.repetition).next()?;
        let component = repetition
            .split(delimiters.component)
            .nth(coordinate.component() - 1)?;
        let subcomponent = component.split(delimiters.subcomponent).next()?;

        if subcomponent.trim() == EXPLICIT_NULL {
            return None;
        }

        NonEmptyText::from_field(self.unescape(subcomponent))
    }

    fn repetition_count(&self, segment: &str) -> usize {
        self.segments()
            .iter()
            .filter(|s| s.name() == segment)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADT: &str = "MSH|^~\\&|MEDITECH|COCNV^^COCNV-H|||201908281438||ADT^A01|1|P|2.4\r\
PID|1||G000000852~OLD123|G844|DOE^JOHN^Q||19800101|M|||1 MAIN ST^^BOSTON^MA^02110||555-1234\r\
PV1|1|I|||||1234^SMITH^ALICE|||MED||||||||REG|||||||||||||||||||||||ADM||||||201908281438\r\
NK1|1|DOE^JANE|MTH^MOTHER\r\
NK1|2|DOE^JIM|FTH^FATHER\r\
NTE|1||A\\S\\B&C|\"\"\r";

    fn get(message: &Message, coordinate: &str) -> Option<String> {
        let coordinate = FieldCoordinate::parse(coordinate).expect("valid coordinate");
        message.get(&coordinate).map(NonEmptyText::into_string)
    }

    #[test]
    fn reads_fields_and_components() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "PID-5-1").as_deref(), Some("DOE"));
        assert_eq!(get(&message, "PID-5-2").as_deref(), Some("JOHN"));
        assert_eq!(get(&message, "PID-5-3").as_deref(), Some("Q"));
        assert_eq!(get(&message, "PID-7").as_deref(), Some("19800101"));
        assert_eq!(get(&message, "PV1-7-2").as_deref(), Some("SMITH"));
    }

    #[test]
    fn field_without_component_reads_first_component() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "PID-5").as_deref(), Some("DOE"));
        assert_eq!(get(&message, "MSH-4").as_deref(), Some("COCNV"));
        assert_eq!(get(&message, "MSH-4-3").as_deref(), Some("COCNV-H"));
    }

    #[test]
    fn header_numbering_counts_the_field_separator() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "MSH-1").as_deref(), Some("|"));
        assert_eq!(get(&message, "MSH-2").as_deref(), Some("^~\\&"));
        assert_eq!(get(&message, "MSH-3").as_deref(), Some("MEDITECH"));
        assert_eq!(get(&message, "MSH-9-1").as_deref(), Some("ADT"));
        assert_eq!(get(&message, "MSH-9-2").as_deref(), Some("A01"));
    }

    #[test]
    fn uses_first_field_repetition() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "PID-3").as_deref(), Some("G000000852"));
    }

    #[test]
    fn missing_coordinates_are_absent() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "PID-5-4"), None);
        assert_eq!(get(&message, "PID-2"), None);
        assert_eq!(get(&message, "PID-99"), None);
        assert_eq!(get(&message, "PV2-3"), None);
        assert_eq!(get(&message, "NK1(2)-2-1"), None);
    }

    #[test]
    fn addresses_segment_repetitions() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "NK1-2-2").as_deref(), Some("JANE"));
        assert_eq!(get(&message, "NK1(1)-2-2").as_deref(), Some("JIM"));
        assert_eq!(message.repetition_count("NK1"), 2);
        assert_eq!(message.repetition_count("PV2"), 0);
    }

    #[test]
    fn decodes_escapes_and_drops_explicit_null() {
        let message = Message::parse(ADT).expect("parse message");
        assert_eq!(get(&message, "NTE-3").as_deref(), Some("A^B"));
        assert_eq!(get(&message, "NTE-4"), None);
    }
}
