//! Construction-time rule checks for users, courses, sections and skills.

use crate::db::{MeetingDays, NewSection, SectionType};
use crate::error::SchedulerError;
use chrono::NaiveTime;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

pub const SECTION_NUMBER_LEN: usize = 3;

/// Lookups the section rules need from the store.
pub trait SectionLookup {
    fn course_exists(&self, name: &str) -> Result<bool, SchedulerError>;
    fn section_number_taken(&self, course: &str, number: &str) -> Result<bool, SchedulerError>;
}

/// A section that passed every rule and can be inserted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSection {
    pub section_number: String,
    pub course: String,
    pub section_type: SectionType,
    pub meeting_start: NaiveTime,
    pub meeting_end: NaiveTime,
    pub meeting_days: MeetingDays,
    pub user_id: Option<i64>,
}

/// Checks an email address and returns it lowercased.
pub fn normalize_email(email: &str) -> Result<String, SchedulerError> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(SchedulerError::Format {
            message: format!("{} is not a valid email address", email),
        });
    }
    Ok(email.to_lowercase())
}

/// Builds a course name from department and number, e.g. "compsci" + "361" -> "COMPSCI361".
pub fn course_name(dpt: &str, num: &str) -> Result<String, SchedulerError> {
    if dpt.is_empty() || num.is_empty() {
        return Err(SchedulerError::type_error(
            "Department and number must be provided to create a Course",
        ));
    }
    Ok(format!("{}{}", dpt, num).to_uppercase())
}

/// Interactive-path check on a requested course code: letters then digits.
pub fn check_course_code(dpt: &str, num: &str) -> Result<(), SchedulerError> {
    let dpt_ok = !dpt.is_empty() && dpt.chars().all(char::is_alphabetic);
    let num_ok = !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    if dpt_ok && num_ok {
        Ok(())
    } else {
        Err(SchedulerError::value_error("Requested course name is invalid."))
    }
}

pub fn skill_name(name: &str) -> Result<&str, SchedulerError> {
    if name.is_empty() {
        return Err(SchedulerError::type_error(
            "Skill name must be provided to create a Skill",
        ));
    }
    Ok(name)
}

/// Parses a form time value such as "11:50".
pub fn parse_meeting_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Applies the section rules in order and returns the validated section.
///
/// Missing arguments are type errors; arguments that are present but break a
/// rule (length, ordering, duplicate number) are value errors.
pub fn validate_section(
    new: &NewSection,
    lookup: &impl SectionLookup,
) -> Result<ValidSection, SchedulerError> {
    let section_number = match new.section_number.as_deref() {
        Some(n) if !n.is_empty() => n,
        _ => {
            return Err(SchedulerError::type_error(
                "Section number must be provided to create a Section",
            ))
        }
    };
    if section_number.chars().count() != SECTION_NUMBER_LEN {
        return Err(SchedulerError::value_error(
            "Section number must be exactly 3 characters long",
        ));
    }

    let course = match new.course.as_deref() {
        Some(c) if lookup.course_exists(c)? => c,
        _ => {
            return Err(SchedulerError::type_error(
                "Course must be provided to create a Section",
            ))
        }
    };

    let meeting_start = new.meeting_start.ok_or_else(|| {
        SchedulerError::type_error("Starting time is required to create a Section")
    })?;
    let meeting_end = new.meeting_end.ok_or_else(|| {
        SchedulerError::type_error("Ending time is required to create a Section")
    })?;

    let meeting_days = new
        .meeting_days
        .as_deref()
        .and_then(MeetingDays::from_code)
        .ok_or_else(|| SchedulerError::type_error("Invalid meeting pattern"))?;

    if meeting_start >= meeting_end {
        return Err(SchedulerError::value_error(
            "A Section meeting cannot end until after it has started",
        ));
    }

    if lookup.section_number_taken(course, section_number)? {
        return Err(SchedulerError::value_error(
            "Two Sections with the same number cannot belong to the same Course",
        ));
    }

    Ok(ValidSection {
        section_number: section_number.to_string(),
        course: course.to_string(),
        section_type: new.section_type.unwrap_or(SectionType::Lecture),
        meeting_start,
        meeting_end,
        meeting_days,
        user_id: new.user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStore {
        courses: Vec<&'static str>,
        taken: Vec<(&'static str, &'static str)>,
    }

    impl SectionLookup for FakeStore {
        fn course_exists(&self, name: &str) -> Result<bool, SchedulerError> {
            Ok(self.courses.contains(&name))
        }

        fn section_number_taken(&self, course: &str, number: &str) -> Result<bool, SchedulerError> {
            Ok(self.taken.iter().any(|(c, n)| *c == course && *n == number))
        }
    }

    fn store() -> FakeStore {
        FakeStore {
            courses: vec!["COMPSCI361"],
            taken: vec![("COMPSCI361", "201")],
        }
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn draft(number: &str) -> NewSection {
        NewSection::new(number, "COMPSCI361", time(10, 0), time(11, 0), MeetingDays::MonWed)
    }

    #[test]
    fn test_email_is_lowercased() {
        assert_eq!(normalize_email("John@UWM.edu").unwrap(), "john@uwm.edu");
    }

    #[test]
    fn test_bad_emails_are_format_errors() {
        for email in ["", "john", "john@uwm", "john@uwm.e", "@uwm.edu", "jo hn@uwm.edu"] {
            assert!(
                matches!(normalize_email(email), Err(SchedulerError::Format { .. })),
                "{email} was accepted"
            );
        }
    }

    #[test]
    fn test_course_name_is_uppercased_concatenation() {
        assert_eq!(course_name("compsci", "361").unwrap(), "COMPSCI361");
        assert_eq!(course_name("MedSci", "101a").unwrap(), "MEDSCI101A");
        assert!(matches!(course_name("", "361"), Err(SchedulerError::Type { .. })));
    }

    #[test]
    fn test_course_code_shape() {
        assert!(check_course_code("COMPSCI", "361").is_ok());
        assert!(check_course_code("COMP SCI", "361").is_err());
        assert!(check_course_code("COMPSCI", "36x").is_err());
        assert!(check_course_code("", "").is_err());
    }

    #[test]
    fn test_valid_section_defaults_to_lecture() {
        let valid = validate_section(&draft("301"), &store()).unwrap();
        assert_eq!(valid.section_type, SectionType::Lecture);
        assert_eq!(valid.meeting_days, MeetingDays::MonWed);
        assert_eq!(valid.course, "COMPSCI361");
    }

    #[test]
    fn test_missing_number_is_type_error() {
        let mut new = draft("301");
        new.section_number = None;
        assert!(matches!(validate_section(&new, &store()), Err(SchedulerError::Type { .. })));
    }

    #[test]
    fn test_wrong_length_number_is_value_error() {
        for number in ["12", "1234"] {
            assert!(matches!(
                validate_section(&draft(number), &store()),
                Err(SchedulerError::Value { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_course_is_type_error() {
        let mut new = draft("301");
        new.course = Some("NOPE100".to_string());
        assert!(matches!(validate_section(&new, &store()), Err(SchedulerError::Type { .. })));
    }

    #[test]
    fn test_missing_times_and_bad_days_are_type_errors() {
        let mut no_start = draft("301");
        no_start.meeting_start = None;
        assert!(matches!(validate_section(&no_start, &store()), Err(SchedulerError::Type { .. })));

        let mut bad_days = draft("301");
        bad_days.meeting_days = Some("MWF".to_string());
        let err = validate_section(&bad_days, &store()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid meeting pattern");
    }

    #[test]
    fn test_start_must_precede_end() {
        let mut equal = draft("301");
        equal.meeting_end = equal.meeting_start;
        assert!(matches!(validate_section(&equal, &store()), Err(SchedulerError::Value { .. })));

        let mut reversed = draft("301");
        reversed.meeting_start = Some(time(12, 0));
        assert!(matches!(validate_section(&reversed, &store()), Err(SchedulerError::Value { .. })));
    }

    #[test]
    fn test_duplicate_number_in_course_is_value_error() {
        let err = validate_section(&draft("201"), &store()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Two Sections with the same number cannot belong to the same Course"
        );
    }

    #[test]
    fn test_rules_are_checked_in_order() {
        // bad length wins over unknown course and reversed times
        let mut new = draft("1234");
        new.course = Some("NOPE100".to_string());
        new.meeting_start = Some(time(12, 0));
        let err = validate_section(&new, &store()).unwrap_err();
        assert_eq!(err.to_string(), "Section number must be exactly 3 characters long");
    }

    #[test]
    fn test_parse_meeting_time() {
        assert_eq!(parse_meeting_time("11:50"), Some(time(11, 50)));
        assert_eq!(parse_meeting_time("noon"), None);
    }
}
