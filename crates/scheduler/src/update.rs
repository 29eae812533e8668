//! Course update batches.
//!
//! One request may add and remove course users, add and remove sections and
//! assign or unassign section staff. Steps run in a fixed order and each one
//! commits on its own: a failed step is reported as a warning and the rest of
//! the batch still applies.

use crate::db::{NewSection, Role, SchedulerDb, SectionType, User};
use crate::error::SchedulerError;
use crate::policy::{self, Action};
use crate::types::Notice;
use crate::validation;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const INVALID_SECTION_REQUEST: &str = "Invalid section request";

/// Fields of an update-course form. Every field is optional; a step runs
/// only when its fields are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    pub add_user: Option<String>,
    pub remove_user: Option<String>,

    pub section_type: Option<String>,
    pub section_number: Option<String>,
    pub section_start: Option<String>,
    pub section_end: Option<String>,
    pub section_days: Option<String>,

    pub remove_section: Option<String>,

    /// Section to assign `to_sec_user` to
    pub to_sec_num: Option<String>,
    pub to_sec_user: Option<String>,

    /// Section to clear the assignee of
    pub from_sec_num: Option<String>,

    pub course_descr: Option<String>,
}

impl CourseUpdate {
    fn wants_new_section(&self) -> bool {
        self.section_type.is_some()
            || self.section_number.is_some()
            || self.section_start.is_some()
            || self.section_end.is_some()
            || self.section_days.is_some()
    }

    fn changes_users(&self) -> bool {
        self.add_user.is_some() || self.remove_user.is_some()
    }

    fn changes_sections(&self) -> bool {
        self.wants_new_section() || self.remove_section.is_some()
    }

    fn changes_assignments(&self) -> bool {
        self.to_sec_num.is_some() || self.from_sec_num.is_some()
    }

    /// Parses the new-section fields. `None` when any of them is missing or
    /// the section type is unknown.
    fn new_section(&self, course: &str) -> Option<NewSection> {
        let section_type: SectionType = self.section_type.as_deref()?.parse().ok()?;
        let number = self.section_number.as_deref()?;
        let start = self.section_start.as_deref()?;
        let end = self.section_end.as_deref()?;
        let days = self.section_days.as_deref()?;

        Some(NewSection {
            section_number: Some(number.to_string()),
            course: Some(course.to_string()),
            meeting_start: validation::parse_meeting_time(start),
            meeting_end: validation::parse_meeting_time(end),
            meeting_days: Some(days.to_string()),
            section_type: Some(section_type),
            user_id: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AddUser,
    RemoveUser,
    AddSection,
    RemoveSection,
    AssignSection,
    UnassignSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// Nothing to do; not an error
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub outcome: Outcome,
}

/// Result of a batch: one outcome per requested step plus the notices to show.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub course: String,
    pub outcomes: Vec<StepOutcome>,
    pub notices: Vec<Notice>,
}

impl UpdateReport {
    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.step == step)
            .map(|o| &o.outcome)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(message) => Some(message.as_str()),
            _ => None,
        })
    }
}

/// Applies an update batch to `course_name` on behalf of `caller`.
///
/// Access is checked for every requested step before the first write; an
/// access failure returns `Err` and changes nothing. After that, step
/// failures only produce warnings.
pub fn apply_course_update(
    db: &SchedulerDb,
    caller: &User,
    course_name: &str,
    request: &CourseUpdate,
) -> Result<UpdateReport, SchedulerError> {
    let course = db.get_course(course_name)?;
    let is_member = db.is_course_member(&course.name, caller.user_id)?;

    policy::authorize(caller, &Action::UpdateCourse { is_member })?;
    if request.changes_users() {
        policy::authorize(caller, &Action::ManageCourseUsers)?;
    }
    if request.changes_sections() {
        policy::authorize(caller, &Action::ManageSections)?;
    }
    if request.changes_assignments() {
        policy::authorize(caller, &Action::AssignSections)?;
    }

    let mut outcomes = Vec::new();
    let mut record = |step: Step, result: Result<Outcome, String>| {
        let outcome = result.unwrap_or_else(Outcome::Failed);
        if let Outcome::Failed(message) = &outcome {
            warn!("Update of {} step {:?} failed: {}", course.name, step, message);
        }
        outcomes.push(StepOutcome { step, outcome });
    };

    if let Some(email) = &request.add_user {
        record(Step::AddUser, add_user(db, &course.name, email));
    }

    if let Some(email) = &request.remove_user {
        record(Step::RemoveUser, remove_user(db, &course.name, email));
    }

    if request.wants_new_section() {
        record(Step::AddSection, add_section(db, &course.name, request));
    }

    if let Some(number) = &request.remove_section {
        record(
            Step::RemoveSection,
            db.delete_section(&course.name, number)
                .map(|_| Outcome::Applied)
                .map_err(|e| e.to_string()),
        );
    }

    if let Some(number) = &request.to_sec_num {
        record(Step::AssignSection, assign_section(db, &course.name, number, request));
    }

    if let Some(number) = &request.from_sec_num {
        record(Step::UnassignSection, unassign_section(db, &course.name, number));
    }

    if let Some(description) = &request.course_descr {
        db.update_course_description(&course.name, Some(description))?;
    }

    let mut notices: Vec<Notice> = outcomes
        .iter()
        .filter_map(|o| match &o.outcome {
            Outcome::Failed(message) => Some(Notice::warning(message.clone())),
            _ => None,
        })
        .collect();
    notices.push(Notice::success(format!("{} has been updated.", course.name)));

    info!(
        "{} updated {} ({} steps, {} warnings)",
        caller.email,
        course.name,
        outcomes.len(),
        notices.len() - 1
    );

    Ok(UpdateReport {
        course: course.name,
        outcomes,
        notices,
    })
}

fn add_user(db: &SchedulerDb, course: &str, email: &str) -> Result<Outcome, String> {
    let user = db.get_user(email).map_err(|e| e.to_string())?;
    db.add_course_user(course, user.user_id)
        .map_err(|e| e.to_string())?;
    Ok(Outcome::Applied)
}

fn remove_user(db: &SchedulerDb, course: &str, email: &str) -> Result<Outcome, String> {
    let user = db.get_user(email).map_err(|e| e.to_string())?;
    db.remove_course_user(course, user.user_id)
        .map_err(|e| e.to_string())?;
    Ok(Outcome::Applied)
}

fn add_section(db: &SchedulerDb, course: &str, request: &CourseUpdate) -> Result<Outcome, String> {
    let new = request
        .new_section(course)
        .ok_or_else(|| INVALID_SECTION_REQUEST.to_string())?;

    match db.create_section(&new) {
        Ok(_) => Ok(Outcome::Applied),
        Err(SchedulerError::Type { .. }) => Err(INVALID_SECTION_REQUEST.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn assign_section(
    db: &SchedulerDb,
    course: &str,
    section_number: &str,
    request: &CourseUpdate,
) -> Result<Outcome, String> {
    let email = match request.to_sec_user.as_deref() {
        Some(email) if !email.is_empty() => email,
        _ => return Err("When assigning user to a section, user must be specified.".to_string()),
    };
    if request.remove_section.as_deref() == Some(section_number) {
        return Err("Cannot assign user to a section that is being removed.".to_string());
    }
    if request
        .remove_user
        .as_deref()
        .is_some_and(|removed| removed.eq_ignore_ascii_case(email))
    {
        return Err(
            "Cannot assign a user to a section if they are being removed from the course."
                .to_string(),
        );
    }

    let section = db
        .get_section(course, section_number)
        .map_err(|e| e.to_string())?;
    let user = db.get_user(email).map_err(|e| e.to_string())?;

    if !db
        .is_course_member(course, user.user_id)
        .map_err(|e| e.to_string())?
    {
        return Err(
            "A user must belong to a course to be assigned to a section of the course.".to_string(),
        );
    }
    if section.section_type == SectionType::Lecture && user.role != Role::Instructor {
        return Err("Only instructors can be assigned to lectures.".to_string());
    }

    db.set_section_user(section.section_id, Some(user.user_id))
        .map_err(|e| e.to_string())?;
    Ok(Outcome::Applied)
}

fn unassign_section(db: &SchedulerDb, course: &str, section_number: &str) -> Result<Outcome, String> {
    match db.get_section(course, section_number) {
        Ok(section) => {
            db.set_section_user(section.section_id, None)
                .map_err(|e| e.to_string())?;
            Ok(Outcome::Applied)
        }
        // removed earlier in the same batch
        Err(SchedulerError::NotFound { .. }) => Ok(Outcome::Skipped),
        Err(e) => Err(e.to_string()),
    }
}
