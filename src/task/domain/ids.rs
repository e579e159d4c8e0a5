//! Identifier newtypes for the task domain.
//!
//! Every entity and collaborator reference is wrapped in its own UUID newtype
//! so that a property identifier can never be passed where a task identifier
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a task (work item).
    ///
    /// Ordering follows the lowercase hyphenated string form, so the smaller
    /// identifier of a pair is also the lexicographically smaller one.
    TaskId
);

uuid_identifier!(
    /// Owning tenant of every record handled by the engine.
    TenantId
);

uuid_identifier!(
    /// Property the work takes place at.
    PropertyId
);

uuid_identifier!(
    /// Reservation owned by the reservation subsystem.
    ReservationId
);

uuid_identifier!(
    /// Staff member, manager, or any other acting user.
    UserId
);

uuid_identifier!(
    /// Per-property automation rule.
    AutoRuleId
);

uuid_identifier!(
    /// Recorded scheduling conflict between two tasks.
    ConflictId
);

uuid_identifier!(
    /// Proposed merge between two tasks.
    FusionPairId
);

uuid_identifier!(
    /// Append-only history entry for one task transition.
    HistoryEntryId
);

uuid_identifier!(
    /// Append-only audit row written by the reservation cascade.
    AuditEntryId
);
