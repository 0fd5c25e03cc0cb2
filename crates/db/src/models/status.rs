//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the seeded status name.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl TryFrom<StatusId> for $name {
            type Error = StatusId;

            fn try_from(value: StatusId) -> Result<Self, Self::Error> {
                match value {
                    $( v if v == $val => Ok(Self::$variant), )+
                    other => Err(other),
                }
            }
        }
    };
}

define_status_enum! {
    /// Background job lifecycle status.
    JobStatus {
        Created = 1 => "created",
        Started = 2 => "started",
        Success = 3 => "success",
        Failure = 4 => "failure",
    }
}

impl JobStatus {
    /// Terminal jobs are never mutated again, only deleted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_data() {
        assert_eq!(JobStatus::Created.id(), 1);
        assert_eq!(JobStatus::Started.id(), 2);
        assert_eq!(JobStatus::Success.id(), 3);
        assert_eq!(JobStatus::Failure.id(), 4);
    }

    #[test]
    fn try_from_round_trips_known_ids() {
        for status in [
            JobStatus::Created,
            JobStatus::Started,
            JobStatus::Success,
            JobStatus::Failure,
        ] {
            assert_eq!(JobStatus::try_from(status.id()), Ok(status));
        }
        assert_eq!(JobStatus::try_from(9), Err(9));
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failure.is_terminal());
    }

    #[test]
    fn serializes_as_lowercase_name() {
        assert_eq!(
            serde_json::to_value(JobStatus::Failure).unwrap(),
            serde_json::json!("failure")
        );
        assert_eq!(JobStatus::Started.name(), "started");
    }
}
