use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a string does not name a variant of one of the closed enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed, string-backed enum.
///
/// Every variant maps to exactly one SCREAMING_SNAKE_CASE string, which is
/// used on the wire (serde), in storage (sqlx, behind the `sqlx` feature) and
/// by `FromStr`/`Display`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $value))]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const NAMES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Role of an account.
    pub enum UserType {
        System => "SYSTEM",
        Company => "COMPANY",
        Candidate => "CANDIDATE",
    }
}

string_enum! {
    /// Gulf and MENA countries a company address may be located in (ISO 3166-1 alpha-2).
    pub enum Country {
        Ae => "AE",
        Sa => "SA",
        Qa => "QA",
        Kw => "KW",
        Bh => "BH",
        Om => "OM",
        Eg => "EG",
        Jo => "JO",
        Lb => "LB",
        Iq => "IQ",
        Ma => "MA",
        Tn => "TN",
        Dz => "DZ",
        Ly => "LY",
        Ye => "YE",
        Sd => "SD",
        Ps => "PS",
        Sy => "SY",
    }
}

string_enum! {
    pub enum Industry {
        Technology => "TECHNOLOGY",
        Healthcare => "HEALTHCARE",
        Finance => "FINANCE",
        Education => "EDUCATION",
        Retail => "RETAIL",
        Manufacturing => "MANUFACTURING",
        Construction => "CONSTRUCTION",
        Hospitality => "HOSPITALITY",
        RealEstate => "REAL_ESTATE",
        Energy => "ENERGY",
        Transportation => "TRANSPORTATION",
        Media => "MEDIA",
        Government => "GOVERNMENT",
        Consulting => "CONSULTING",
        Other => "OTHER",
    }
}

string_enum! {
    pub enum Subscription {
        Free => "FREE",
        Pro => "PRO",
        Enterprise => "ENTERPRISE",
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Subscription::Free
    }
}

string_enum! {
    pub enum InvitationStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
        Expired => "EXPIRED",
    }
}

string_enum! {
    pub enum JobType {
        FullTime => "FULL_TIME",
        PartTime => "PART_TIME",
        Contract => "CONTRACT",
        Remote => "REMOTE",
    }
}

string_enum! {
    pub enum JobLevel {
        Entry => "ENTRY",
        Junior => "JUNIOR",
        Mid => "MID",
        Senior => "SENIOR",
        Lead => "LEAD",
        Manager => "MANAGER",
        Director => "DIRECTOR",
        Executive => "EXECUTIVE",
    }
}

string_enum! {
    pub enum WorkType {
        Onsite => "ONSITE",
        Remote => "REMOTE",
        Hybrid => "HYBRID",
    }
}

string_enum! {
    /// Lifecycle of a job posting. `Deleted` is a soft delete: the row is kept.
    pub enum JobStatus {
        Draft => "DRAFT",
        Active => "ACTIVE",
        Paused => "PAUSED",
        Closed => "CLOSED",
        Expired => "EXPIRED",
        Deleted => "DELETED",
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Draft
    }
}

impl JobStatus {
    /// Only active postings are visible to candidates and anonymous callers.
    pub fn is_public(&self) -> bool {
        matches!(self, JobStatus::Active)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, JobStatus::Deleted)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;

        if *self == next || *self == Deleted {
            return false;
        }
        match (self, next) {
            (_, Deleted) => true,
            (Draft, Active) => true,
            (Active, Paused | Closed | Expired) => true,
            (Paused, Active | Closed) => true,
            (Closed | Expired, Active) => true,
            _ => false,
        }
    }
}

string_enum! {
    pub enum QuestionType {
        YesNo => "YES_NO",
        MultipleChoice => "MULTIPLE_CHOICE",
        Text => "TEXT",
        Number => "NUMBER",
    }
}

impl QuestionType {
    pub fn takes_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_serialization() {
        let json = serde_json::to_string(&JobType::FullTime).unwrap();
        assert_eq!(json, "\"FULL_TIME\"");

        let parsed: JobType = serde_json::from_str("\"PART_TIME\"").unwrap();
        assert_eq!(parsed, JobType::PartTime);
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert!(serde_json::from_str::<JobStatus>("\"ARCHIVED\"").is_err());
        assert!(serde_json::from_str::<UserType>("\"system\"").is_err());

        let err = "GOLD".parse::<Subscription>().unwrap_err();
        assert_eq!(err.kind, "Subscription");
        assert_eq!(err.value, "GOLD");
        assert_eq!(err.to_string(), "invalid Subscription value: \"GOLD\"");
    }

    #[test]
    fn test_names_match_variants() {
        assert_eq!(Industry::ALL.len(), Industry::NAMES.len());
        for (variant, name) in Country::ALL.iter().zip(Country::NAMES) {
            assert_eq!(variant.as_str(), *name);
            assert_eq!(name.parse::<Country>().unwrap(), *variant);
        }
        assert_eq!(QuestionType::MultipleChoice.to_string(), "MULTIPLE_CHOICE");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Subscription::default(), Subscription::Free);
        assert_eq!(JobStatus::default(), JobStatus::Draft);
    }

    #[test]
    fn test_job_status_transitions() {
        use JobStatus::*;

        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Active.can_transition_to(Closed));
        assert!(Paused.can_transition_to(Active));
        assert!(Expired.can_transition_to(Active));
        assert!(Closed.can_transition_to(Active));

        assert!(!Draft.can_transition_to(Paused));
        assert!(!Paused.can_transition_to(Expired));
        assert!(!Active.can_transition_to(Draft));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_deleted_is_terminal() {
        for status in JobStatus::ALL {
            if !status.is_deleted() {
                assert!(status.can_transition_to(JobStatus::Deleted));
            }
            assert!(!JobStatus::Deleted.can_transition_to(*status));
        }
    }

    #[test]
    fn test_only_active_is_public() {
        let public: Vec<_> = JobStatus::ALL.iter().filter(|s| s.is_public()).collect();
        assert_eq!(public, vec![&JobStatus::Active]);
    }

    #[test]
    fn test_only_multiple_choice_takes_options() {
        assert!(QuestionType::MultipleChoice.takes_options());
        assert!(!QuestionType::YesNo.takes_options());
        assert!(!QuestionType::Text.takes_options());
        assert!(!QuestionType::Number.takes_options());
    }
}
