//! Caller-facing operations.
//!
//! Each operation authorizes the caller first, then mutates the store and
//! returns the notices to show. Input errors the user can fix come back as
//! warning notices; access and lookup failures come back as `Err`.

use crate::db::{ContactInfo, Course, Role, SchedulerDb, Section, Skill, User};
use crate::error::SchedulerError;
use crate::policy::{self, Action};
use crate::types::Notice;
use crate::update::{self, CourseUpdate, UpdateReport};
use crate::validation;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

type Result<T> = std::result::Result<T, SchedulerError>;

/// Verifies an email/password pair and returns the user.
pub fn authenticate(db: &SchedulerDb, email: &str, password: &str) -> Result<User> {
    let user = match db.get_user(email.trim()) {
        Ok(user) => user,
        Err(SchedulerError::NotFound { .. }) => return Err(SchedulerError::InvalidCredentials),
        Err(e) => return Err(e),
    };
    if crate::credentials::verify_password(password, &user.password_hash) {
        Ok(user)
    } else {
        warn!("Failed login for {}", user.email);
        Err(SchedulerError::InvalidCredentials)
    }
}

// ---- courses ----

pub fn list_courses(db: &SchedulerDb, caller: &User) -> Result<Vec<Course>> {
    policy::authorize(caller, &Action::View)?;
    db.list_courses()
}

pub fn create_course(
    db: &SchedulerDb,
    caller: &User,
    dpt: &str,
    num: &str,
    description: Option<&str>,
) -> Result<Notice> {
    policy::authorize(caller, &Action::CreateCourse)?;

    let (dpt, num) = (dpt.trim(), num.trim());
    if let Err(e) = validation::check_course_code(dpt, num) {
        return Ok(Notice::warning(e.to_string()));
    }

    match db.create_course(dpt, num, description, None) {
        Ok(course) => {
            info!("{} created course {}", caller.email, course.name);
            Ok(Notice::success(format!("{} has been added.", course.name)))
        }
        Err(e @ SchedulerError::Integrity { .. }) => Ok(Notice::warning(e.to_string())),
        Err(e) => Err(e),
    }
}

pub fn delete_course(db: &SchedulerDb, caller: &User, name: &str) -> Result<Notice> {
    policy::authorize(caller, &Action::DeleteCourse)?;
    db.delete_course(name)?;
    info!("{} deleted course {}", caller.email, name);
    Ok(Notice::success(format!("{} has been deleted.", name)))
}

/// Everything the update-course form shows.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub sections: Vec<Section>,
    pub users: Vec<User>,
    /// Users that could be added: not supervisors, not already members
    pub candidates: Vec<User>,
}

pub fn course_detail(db: &SchedulerDb, caller: &User, name: &str) -> Result<CourseDetail> {
    let course = db.get_course(name)?;
    let is_member = db.is_course_member(&course.name, caller.user_id)?;
    policy::authorize(caller, &Action::UpdateCourse { is_member })?;

    let sections = db.list_sections(&course.name)?;
    let users = db.course_users(&course.name)?;
    let candidates = db
        .list_users()?
        .into_iter()
        .filter(|u| u.role != Role::Supervisor && !u.is_admin)
        .filter(|u| !users.iter().any(|m| m.user_id == u.user_id))
        .collect();

    Ok(CourseDetail {
        course,
        sections,
        users,
        candidates,
    })
}

pub fn update_course(
    db: &SchedulerDb,
    caller: &User,
    name: &str,
    request: &CourseUpdate,
) -> Result<UpdateReport> {
    update::apply_course_update(db, caller, name, request)
}

// ---- users ----

/// Users shown in the directory (administrators are hidden)
pub fn list_users(db: &SchedulerDb, caller: &User) -> Result<Vec<User>> {
    policy::authorize(caller, &Action::View)?;
    Ok(db.list_users()?.into_iter().filter(|u| !u.is_admin).collect())
}

pub fn create_user(
    db: &SchedulerDb,
    caller: &User,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Notice> {
    policy::authorize(caller, &Action::CreateUser)?;

    let email = email.trim();
    match db.create_user(email, password.trim(), role, &ContactInfo::default()) {
        Ok(user) => {
            info!("{} created user {} ({})", caller.email, user.email, role);
            Ok(Notice::success(format!("{} has been added.", user.email)))
        }
        Err(SchedulerError::Integrity { .. }) => {
            Ok(Notice::warning(format!("{} already exists.", email)))
        }
        Err(SchedulerError::Format { .. }) => {
            Ok(Notice::warning(format!("{} is not a valid email.", email)))
        }
        Err(e) => Err(e),
    }
}

pub fn delete_user(db: &SchedulerDb, caller: &User, email: &str) -> Result<Notice> {
    let email = email.to_lowercase();
    policy::authorize(caller, &Action::DeleteUser { target: &email })?;
    db.delete_user(&email)?;
    info!("{} deleted user {}", caller.email, email);
    Ok(Notice::success(format!("{} has been deleted.", email)))
}

/// A user's profile plus the skills they could still add.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub user: User,
    pub skills: Vec<Skill>,
    pub available_skills: Vec<Skill>,
}

pub fn user_info(db: &SchedulerDb, caller: &User, email: &str) -> Result<UserInfo> {
    let user = db.get_user(email)?;
    policy::authorize(caller, &Action::EditUserInfo { target: &user.email })?;

    let skills = db.skills_for_user(user.user_id)?;
    let available_skills = db
        .list_skills()?
        .into_iter()
        .filter(|s| !skills.iter().any(|held| held.skill_id == s.skill_id))
        .collect();

    Ok(UserInfo {
        user,
        skills,
        available_skills,
    })
}

/// Contact fields plus an optional skill to add and one to remove.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoUpdate {
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(rename = "skill-add", alias = "skill_add")]
    pub skill_add: Option<String>,
    #[serde(rename = "skill-remove", alias = "skill_remove")]
    pub skill_remove: Option<String>,
}

/// Replaces a user's contact info, then applies the skill changes.
/// Contact info is saved even when the skill part fails.
pub fn update_user_info(
    db: &SchedulerDb,
    caller: &User,
    email: &str,
    request: &UserInfoUpdate,
) -> Result<Vec<Notice>> {
    let user = db.get_user(email)?;
    policy::authorize(caller, &Action::EditUserInfo { target: &user.email })?;

    db.update_contact_info(&user.email, &request.contact)?;
    let mut notices = vec![Notice::success("Account info updated.")];

    if let Err(message) = apply_skill_changes(db, &user, request) {
        warn!("Skill update for {} failed: {}", user.email, message);
        notices.push(Notice::warning(message));
    }

    info!("{} updated info of {}", caller.email, user.email);
    Ok(notices)
}

fn apply_skill_changes(
    db: &SchedulerDb,
    user: &User,
    request: &UserInfoUpdate,
) -> std::result::Result<(), String> {
    if let (Some(add), Some(remove)) = (&request.skill_add, &request.skill_remove) {
        if add == remove {
            return Err("Cannot add a skill that is being removed.".to_string());
        }
    }
    if let Some(name) = &request.skill_add {
        let skill = db.get_skill(name).map_err(|e| e.to_string())?;
        db.add_skill_user(skill.skill_id, user.user_id)
            .map_err(|e| e.to_string())?;
    }
    if let Some(name) = &request.skill_remove {
        let skill = db.get_skill(name).map_err(|e| e.to_string())?;
        db.remove_skill_user(skill.skill_id, user.user_id)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

// ---- skills ----

pub fn create_skill(db: &SchedulerDb, caller: &User, name: &str) -> Result<Notice> {
    policy::authorize(caller, &Action::CreateSkill)?;
    match db.create_skill(name.trim()) {
        Ok(skill) => {
            info!("{} created skill {}", caller.email, skill.name);
            Ok(Notice::success(format!("{} has been added.", skill.name)))
        }
        Err(e @ (SchedulerError::Integrity { .. } | SchedulerError::Type { .. })) => {
            Ok(Notice::warning(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

// ---- home ----

/// Sections a user teaches on one weekday, earliest first.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub day: String,
    pub sections: Vec<Section>,
}

const SCHEDULE_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// The caller's weekly assignments grouped by weekday. Supervisors have no
/// assignments and get `None`, as does anyone with nothing assigned.
pub fn weekly_schedule(db: &SchedulerDb, caller: &User) -> Result<Option<Vec<DaySchedule>>> {
    if caller.role == Role::Supervisor {
        return Ok(None);
    }

    let sections = db.sections_for_user(caller.user_id)?;
    if sections.is_empty() {
        return Ok(None);
    }

    let week = SCHEDULE_DAYS
        .iter()
        .map(|day| DaySchedule {
            day: day_name(*day).to_string(),
            sections: sections
                .iter()
                .filter(|s| s.meeting_days.weekdays().contains(day))
                .cloned()
                .collect(),
        })
        .collect();
    Ok(Some(week))
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MeetingDays, NewSection, SectionType};
    use crate::types::NoticeLevel;
    use chrono::NaiveTime;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn setup() -> (SchedulerDb, User, User, User) {
        let db = SchedulerDb::open_in_memory().unwrap();
        let boss = db
            .create_user("boss@uwm.edu", "boss", Role::Supervisor, &ContactInfo::default())
            .unwrap();
        let jill = db
            .create_user("jill@uwm.edu", "jill", Role::Instructor, &ContactInfo::default())
            .unwrap();
        let chris = db
            .create_user("chris@uwm.edu", "chris", Role::Ta, &ContactInfo::default())
            .unwrap();
        (db, boss, jill, chris)
    }

    #[test]
    fn test_authenticate() {
        let (db, _, jill, _) = setup();
        assert_eq!(authenticate(&db, "JILL@uwm.edu", "jill").unwrap(), jill);
        assert_eq!(
            authenticate(&db, "jill@uwm.edu", "wrong").unwrap_err(),
            SchedulerError::InvalidCredentials
        );
        assert_eq!(
            authenticate(&db, "ghost@uwm.edu", "jill").unwrap_err(),
            SchedulerError::InvalidCredentials
        );
    }

    #[test]
    fn test_create_course_notices() {
        let (db, boss, _, _) = setup();
        let added = create_course(&db, &boss, " COMPSCI ", "361", Some("Hard class")).unwrap();
        assert_eq!(added, Notice::success("COMPSCI361 has been added."));

        let dup = create_course(&db, &boss, "compsci", "361", None).unwrap();
        assert_eq!(dup, Notice::warning("COMPSCI361 already exists."));

        let bad = create_course(&db, &boss, "COMP5CI", "361", None).unwrap();
        assert_eq!(bad, Notice::warning("Requested course name is invalid."));
        assert_eq!(db.list_courses().unwrap().len(), 1);
    }

    #[test]
    fn test_course_admin_is_supervisor_only() {
        let (db, boss, jill, chris) = setup();
        for caller in [&jill, &chris] {
            assert_eq!(
                create_course(&db, caller, "COMPSCI", "361", None).unwrap_err(),
                SchedulerError::AccessDenied
            );
        }
        create_course(&db, &boss, "COMPSCI", "361", None).unwrap();
        assert_eq!(
            delete_course(&db, &jill, "COMPSCI361").unwrap_err(),
            SchedulerError::AccessDenied
        );
        assert_eq!(
            delete_course(&db, &boss, "COMPSCI361").unwrap(),
            Notice::success("COMPSCI361 has been deleted.")
        );
        assert_eq!(
            delete_course(&db, &boss, "COMPSCI361").unwrap_err().to_string(),
            "Course not found."
        );
    }

    #[test]
    fn test_course_detail_candidates() {
        let (db, boss, jill, chris) = setup();
        create_course(&db, &boss, "COMPSCI", "361", None).unwrap();
        db.add_course_user("COMPSCI361", jill.user_id).unwrap();

        let detail = course_detail(&db, &boss, "COMPSCI361").unwrap();
        assert_eq!(detail.users, vec![jill.clone()]);
        assert_eq!(detail.candidates, vec![chris.clone()]);

        assert!(course_detail(&db, &jill, "COMPSCI361").is_ok());
        assert_eq!(
            course_detail(&db, &chris, "COMPSCI361").unwrap_err(),
            SchedulerError::AccessDenied
        );
    }

    #[test]
    fn test_create_user_notices() {
        let (db, boss, jill, _) = setup();
        assert_eq!(
            create_user(&db, &boss, "Paul@uwm.edu", "pw", Role::Ta).unwrap(),
            Notice::success("paul@uwm.edu has been added.")
        );
        assert_eq!(
            create_user(&db, &boss, "paul@uwm.edu", "pw", Role::Ta).unwrap(),
            Notice::warning("paul@uwm.edu already exists.")
        );
        assert_eq!(
            create_user(&db, &boss, "paul", "pw", Role::Ta).unwrap(),
            Notice::warning("paul is not a valid email.")
        );
        assert_eq!(
            create_user(&db, &jill, "amy@uwm.edu", "pw", Role::Ta).unwrap_err(),
            SchedulerError::AccessDenied
        );
    }

    #[test]
    fn test_delete_user_rules() {
        let (db, boss, jill, chris) = setup();
        assert_eq!(
            delete_user(&db, &boss, "boss@uwm.edu").unwrap_err(),
            SchedulerError::SelfDelete
        );
        assert_eq!(
            delete_user(&db, &jill, "chris@uwm.edu").unwrap_err(),
            SchedulerError::AccessDenied
        );
        assert_eq!(
            delete_user(&db, &boss, "ghost@uwm.edu").unwrap_err().to_string(),
            "User not found."
        );
        delete_user(&db, &boss, &chris.email).unwrap();
        assert!(db.get_user(&chris.email).is_err());
    }

    #[test]
    fn test_user_directory_hides_admins() {
        let (db, boss, _, _) = setup();
        let emails: Vec<_> = list_users(&db, &boss)
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, ["jill@uwm.edu", "chris@uwm.edu"]);
    }

    #[test]
    fn test_edit_own_info_and_skills() {
        let (db, _, jill, _) = setup();
        db.create_skill("Python").unwrap();
        db.create_skill("C").unwrap();

        let request = UserInfoUpdate {
            contact: ContactInfo {
                first_name: "Jill".to_string(),
                phone_number: "4145551234".to_string(),
                ..ContactInfo::default()
            },
            skill_add: Some("Python".to_string()),
            skill_remove: None,
        };
        let notices = update_user_info(&db, &jill, "jill@uwm.edu", &request).unwrap();
        assert_eq!(notices, vec![Notice::success("Account info updated.")]);

        let info = user_info(&db, &jill, "jill@uwm.edu").unwrap();
        assert_eq!(info.user.contact.first_name, "Jill");
        assert_eq!(info.skills.len(), 1);
        assert_eq!(info.available_skills[0].name, "C");
    }

    #[test]
    fn test_same_skill_added_and_removed() {
        let (db, boss, jill, _) = setup();
        db.create_skill("Python").unwrap();
        let request = UserInfoUpdate {
            contact: ContactInfo {
                city: "Milwaukee".to_string(),
                ..ContactInfo::default()
            },
            skill_add: Some("Python".to_string()),
            skill_remove: Some("Python".to_string()),
        };
        let notices = update_user_info(&db, &boss, "jill@uwm.edu", &request).unwrap();
        assert_eq!(notices[1], Notice::warning("Cannot add a skill that is being removed."));
        assert_eq!(notices[1].level, NoticeLevel::Warning);
        assert_eq!(db.get_user("jill@uwm.edu").unwrap().contact.city, "Milwaukee");
        assert!(db.skills_for_user(jill.user_id).unwrap().is_empty());
    }

    #[test]
    fn test_editing_someone_else_needs_supervisor() {
        let (db, _, jill, chris) = setup();
        assert_eq!(
            update_user_info(&db, &chris, &jill.email, &UserInfoUpdate::default()).unwrap_err(),
            SchedulerError::AccessDenied
        );
        assert_eq!(
            user_info(&db, &jill, "ghost@uwm.edu").unwrap_err().to_string(),
            "User not found."
        );
    }

    #[test]
    fn test_create_skill() {
        let (db, boss, _, chris) = setup();
        assert_eq!(
            create_skill(&db, &boss, "Rust").unwrap(),
            Notice::success("Rust has been added.")
        );
        assert_eq!(
            create_skill(&db, &boss, "Rust").unwrap(),
            Notice::warning("Rust already exists.")
        );
        assert_eq!(
            create_skill(&db, &chris, "Go").unwrap_err(),
            SchedulerError::AccessDenied
        );
    }

    #[test]
    fn test_weekly_schedule_groups_by_day() {
        let (db, boss, jill, chris) = setup();
        db.create_course("COMPSCI", "361", None, None).unwrap();
        let lec = db
            .create_section(
                &NewSection::new("401", "COMPSCI361", time(13, 0), time(13, 50), MeetingDays::MonWed)
                    .with_type(SectionType::Lecture),
            )
            .unwrap();
        let early = db
            .create_section(
                &NewSection::new("402", "COMPSCI361", time(8, 0), time(8, 50), MeetingDays::Monday)
                    .with_type(SectionType::Lecture),
            )
            .unwrap();
        for s in [&lec, &early] {
            db.set_section_user(s.section_id, Some(jill.user_id)).unwrap();
        }

        let week = weekly_schedule(&db, &jill).unwrap().unwrap();
        assert_eq!(week.len(), 5);
        assert_eq!(week[0].day, "Monday");
        let monday: Vec<_> = week[0].sections.iter().map(|s| s.section_number.as_str()).collect();
        assert_eq!(monday, ["402", "401"]);
        assert_eq!(week[2].sections.len(), 1);
        assert!(week[1].sections.is_empty());
        assert!(week[4].sections.is_empty());

        assert!(weekly_schedule(&db, &boss).unwrap().is_none());
        assert!(weekly_schedule(&db, &chris).unwrap().is_none());
    }
}
