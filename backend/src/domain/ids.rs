//! Strongly typed identifiers for the enrollment domain.
//!
//! Each identifier wraps a [`Uuid`] so customer, event, program, and
//! enrollment keys cannot be swapped by accident at call sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Construct the identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

define_uuid_id!(
    /// Identifier of a customer who can hold enrollments.
    CustomerId
);
define_uuid_id!(
    /// Identifier of a scheduled event with an optional seat capacity.
    EventId
);
define_uuid_id!(
    /// Identifier of a program grouping one or more events.
    ProgramId
);
define_uuid_id!(
    /// Server-assigned identifier of an enrollment row.
    EnrollmentId
);

/// A capacity-bound resource a customer can enroll into.
///
/// Enrolling into a program means enrolling into every event that currently
/// belongs to it, so both variants resolve to event-level rows in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceId {
    /// A single event.
    Event(EventId),
    /// A program and, transitively, all of its events.
    Program(ProgramId),
}

impl ResourceId {
    /// Human readable label used in user-facing messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Event(_) => "Event",
            Self::Program(_) => "Program",
        }
    }

    /// Access the inner UUID regardless of the resource kind.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        match self {
            Self::Event(id) => id.as_uuid(),
            Self::Program(id) => id.as_uuid(),
        }
    }
}

impl From<EventId> for ResourceId {
    fn from(value: EventId) -> Self {
        Self::Event(value)
    }
}

impl From<ProgramId> for ResourceId {
    fn from(value: ProgramId) -> Self {
        Self::Program(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(id) => write!(f, "event {id}"),
            Self::Program(id) => write!(f, "program {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn identifiers_parse_and_display_round_trip() {
        let raw = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id: EventId = raw.parse().expect("valid uuid");
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    fn identifiers_reject_invalid_input(#[case] raw: &str) {
        assert!(raw.parse::<CustomerId>().is_err());
    }

    #[rstest]
    fn resource_display_names_the_kind() {
        let program = ProgramId::random();
        let resource = ResourceId::from(program);
        assert_eq!(resource.label(), "Program");
        assert_eq!(resource.to_string(), format!("program {program}"));
        assert_eq!(resource.as_uuid(), program.as_uuid());
    }

    #[rstest]
    fn resource_serialises_with_kind_tag() {
        let event = EventId::random();
        let json = serde_json::to_value(ResourceId::Event(event)).expect("serialise");
        assert_eq!(json["kind"], "event");
        assert_eq!(json["id"], event.to_string());
    }
}
