//! Resource builders.
//!
//! Each builder owns the rule list for one entity and runs it against a
//! [`RuleContext`]. Builders are independent: one that finds its anchor
//! absent reports [`MappingEvent::BuilderSkipped`] and returns `None`, and the
//! mapper carries on with the next.

pub(crate) mod encounter;
pub(crate) mod location;
pub(crate) mod order;
pub(crate) mod patient;
pub(crate) mod practitioner;

use crate::observe::MappingEvent;
use crate::rules::RuleContext;
use std::fmt::Display;

fn skipped(ctx: &RuleContext<'_>, resource: &'static str, anchor: &impl Display) {
    ctx.report(MappingEvent::BuilderSkipped {
        resource,
        anchor: anchor.to_string(),
    });
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Messages shared by builder and mapper tests.

    use crate::observe::RecordingObserver;
    use crate::rules::RuleContext;
    use chrono::FixedOffset;

    pub const ADT_A01: &str = "MSH|^~\\&|MEDITECH|COCNV|RECV|FAC|201908281438||ADT^A01|MSG0001|P|2.4\r\
EVN|A01|201908281438\r\
PID|1||M000123^^^COCNV|U000456|DOE^JOHN^Q||19800101083000|M||W|123 MAIN ST^APT 4^SPRINGFIELD^IL^62701||(555)555-1234|||M||V0001\r\
NK1|1|DOE^JANE|W^WIFE|123 MAIN ST^^SPRINGFIELD^IL^62701|(555)555-9876\r\
NK1|2|DOE^JIM|SON\r\
NK1|3|DOE^JUNE\r\
PV1|1|I|4W^401^A||||1234^SMITH^ANNA|||MED||||||||REG|||||||||||||||||||||||ADM|||201908281438|201908301015\r\
PV2|||CHEST PAIN\r";

    pub const ADT_EXTENDED: &str = "MSH|^~\\&|MEDITECH|MT^^COCNV|RECV|FAC|20190828143805||ADT^A04|MSG0003|P|2.5\r\
PID|1||M000123^^^COCNV|U000456|DOE^JOHN^Q|SMITH^JANE|19800101|F|||123 MAIN ST^^SPRINGFIELD^IL^62701|||||M||V0002|123-45-6789\r\
NK1|1|DOE, JANE|W^WIFE\r\
PV1|1|E|||||1234^SMITH^ANNA|||EMR|||||||||||||||||||||||||||||||ADM IN|||20190828143805|20190830101500\r\
PV2|||CP^CHEST PAIN\r";

    pub const ORM_O01: &str = "MSH|^~\\&|MEDITECH|COCNV|RECV|FAC|201908281438||ORM^O01|MSG0002|P|2.4\r\
PID|1||M000123||DOE^JOHN||19800101|M||||||||||V0001\r\
ORC|NW|ORD100|FILL200||||^^^201908281500||201908281430|||5678^JONES^BOB|||||||||||||IP\r\
OBR|1|ORD100|FILL200|LAB^Laboratory^^CHEM^Chemistry|||201908281500\r\
ZOA|1|ON300||201908281445\r";

    pub fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3_600).expect("valid offset")
    }

    pub fn message(text: &str) -> hl7v2::Message {
        hl7v2::Message::parse(text).expect("fixture parses")
    }

    pub fn context<'a>(
        message: &'a hl7v2::Message,
        observer: &'a RecordingObserver,
        facility: Option<&str>,
    ) -> RuleContext<'a> {
        RuleContext::new(
            message,
            observer,
            facility.map(str::to_owned),
            "https://fhir.experiments.com/System/",
            offset(),
        )
    }
}
