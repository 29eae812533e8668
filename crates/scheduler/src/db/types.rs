/// Record types for users, courses, sections and skills
use chrono::{NaiveTime, Weekday};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative role of a user, in descending privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "SU")]
    Supervisor,
    #[serde(rename = "IN")]
    Instructor,
    #[serde(rename = "TA")]
    Ta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionType {
    #[serde(rename = "LEC")]
    Lecture,
    #[serde(rename = "LAB")]
    Lab,
}

/// Day-or-pair-of-days pattern a section recurs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingDays {
    #[serde(rename = "M")]
    Monday,
    #[serde(rename = "T")]
    Tuesday,
    #[serde(rename = "W")]
    Wednesday,
    #[serde(rename = "R")]
    Thursday,
    #[serde(rename = "F")]
    Friday,
    #[serde(rename = "MW")]
    MonWed,
    #[serde(rename = "TR")]
    TueThu,
}

/// Implements code conversion, `Display`, `FromStr` and SQLite conversion
/// for an enum stored as a short text code.
macro_rules! coded_enum {
    ($ty:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn code(&self) -> &'static str {
                match self {
                    $($ty::$variant => $code),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::from_code(s).ok_or_else(|| format!("unknown {} code: {}", stringify!($ty), s))
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.code()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let code = value.as_str()?;
                $ty::from_code(code).ok_or(FromSqlError::InvalidType)
            }
        }
    };
}

coded_enum!(Role {
    Supervisor => "SU",
    Instructor => "IN",
    Ta => "TA",
});

coded_enum!(SectionType {
    Lecture => "LEC",
    Lab => "LAB",
});

coded_enum!(MeetingDays {
    Monday => "M",
    Tuesday => "T",
    Wednesday => "W",
    Thursday => "R",
    Friday => "F",
    MonWed => "MW",
    TueThu => "TR",
});

impl Role {
    /// Supervisors are created with administrator rights.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Supervisor)
    }
}

impl MeetingDays {
    /// Weekdays covered by this pattern.
    pub fn weekdays(&self) -> &'static [Weekday] {
        match self {
            MeetingDays::Monday => &[Weekday::Mon],
            MeetingDays::Tuesday => &[Weekday::Tue],
            MeetingDays::Wednesday => &[Weekday::Wed],
            MeetingDays::Thursday => &[Weekday::Thu],
            MeetingDays::Friday => &[Weekday::Fri],
            MeetingDays::MonWed => &[Weekday::Mon, Weekday::Wed],
            MeetingDays::TueThu => &[Weekday::Tue, Weekday::Thu],
        }
    }
}

/// Optional contact details of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_admin: bool,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub name: String,
    pub dpt: String,
    pub num: String,
    pub description: Option<String>,
    pub term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub section_id: i64,
    pub course_name: String,
    pub section_number: String,
    pub section_type: SectionType,
    /// Assigned staff member, if any
    pub user_id: Option<i64>,
    pub meeting_start: NaiveTime,
    pub meeting_end: NaiveTime,
    pub meeting_days: MeetingDays,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub skill_id: i64,
    pub name: String,
}

/// Arguments for creating a section.
///
/// Required fields are optional here so that a missing argument can be
/// reported as a type error instead of being impossible to express.
#[derive(Debug, Clone, Default)]
pub struct NewSection {
    pub section_number: Option<String>,
    pub course: Option<String>,
    pub meeting_start: Option<NaiveTime>,
    pub meeting_end: Option<NaiveTime>,
    /// Raw meeting pattern code, e.g. "MW"
    pub meeting_days: Option<String>,
    pub section_type: Option<SectionType>,
    pub user_id: Option<i64>,
}

impl NewSection {
    pub fn new(
        section_number: &str,
        course: &str,
        meeting_start: NaiveTime,
        meeting_end: NaiveTime,
        meeting_days: MeetingDays,
    ) -> Self {
        Self {
            section_number: Some(section_number.to_string()),
            course: Some(course.to_string()),
            meeting_start: Some(meeting_start),
            meeting_end: Some(meeting_end),
            meeting_days: Some(meeting_days.code().to_string()),
            section_type: None,
            user_id: None,
        }
    }

    pub fn with_type(mut self, section_type: SectionType) -> Self {
        self.section_type = Some(section_type);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_from_str() {
        for days in MeetingDays::ALL {
            assert_eq!(days.code().parse::<MeetingDays>().ok(), Some(*days));
        }
        assert!("MWF".parse::<MeetingDays>().is_err());
        assert_eq!("LEC".parse::<SectionType>().ok(), Some(SectionType::Lecture));
        assert_eq!(Role::from_code("IN"), Some(Role::Instructor));
    }

    #[test]
    fn test_pair_patterns_cover_two_days() {
        assert_eq!(MeetingDays::MonWed.weekdays(), &[Weekday::Mon, Weekday::Wed]);
        assert_eq!(MeetingDays::Friday.weekdays(), &[Weekday::Fri]);
    }

    #[test]
    fn test_role_serializes_as_code() {
        let json = serde_json::to_string(&Role::Supervisor).unwrap();
        assert_eq!(json, "\"SU\"");
        assert!(Role::Supervisor.is_elevated());
        assert!(!Role::Ta.is_elevated());
    }
}
