//! Facility location builder.

use super::skipped;
use crate::constants::{BUILDING_PHYSICAL_TYPE, LOCATION_PHYSICAL_TYPE_SYSTEM};
use crate::profile::MappingProfile;
use crate::rules::RuleContext;
use fhir::{CodeableConcept, Coding, Location};

/// Build the facility Location, anchored on the profile's facility coordinate.
///
/// The physical type is always "building"; it is not read from the message.
pub(crate) fn build(profile: &MappingProfile, ctx: &RuleContext<'_>) -> Option<Location> {
    if !profile.location {
        return None;
    }

    let Some(code) = ctx.facility() else {
        // a present but rejected code has already been reported
        if ctx.get(&profile.facility).is_none() {
            skipped(ctx, "Location", &profile.facility);
        }
        return None;
    };

    Some(Location {
        id: Some(code.to_owned()),
        name: None,
        physical_type: Some(CodeableConcept::from_coding(Coding::new(
            LOCATION_PHYSICAL_TYPE_SYSTEM,
            BUILDING_PHYSICAL_TYPE,
        ))),
    })
}
