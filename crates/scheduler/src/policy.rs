//! Role-based access rules.
//!
//! Every mutation is described as an [`Action`] and checked with
//! [`authorize`] before anything is written.

use crate::db::{Role, User};
use crate::error::SchedulerError;

/// Something a caller wants to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    /// Read-only listings of courses and users.
    View,
    CreateCourse,
    DeleteCourse,
    /// Open or submit the update form of a course.
    UpdateCourse { is_member: bool },
    /// Add or remove users of a course.
    ManageCourseUsers,
    /// Add or remove sections of a course.
    ManageSections,
    /// Assign or unassign section staff.
    AssignSections,
    CreateUser,
    DeleteUser { target: &'a str },
    /// Edit the contact info and skills of `target`.
    EditUserInfo { target: &'a str },
    CreateSkill,
}

/// Returns `Ok(())` when `caller` may perform `action`.
pub fn authorize(caller: &User, action: &Action<'_>) -> Result<(), SchedulerError> {
    let allowed = match (caller.role, action) {
        (_, Action::View) => true,

        (_, Action::DeleteUser { target }) if caller.email == *target => {
            return Err(SchedulerError::SelfDelete);
        }
        (_, Action::EditUserInfo { target }) if caller.email == *target => true,

        (Role::Supervisor, _) => true,

        (Role::Instructor, Action::UpdateCourse { is_member }) => *is_member,
        (Role::Instructor, Action::AssignSections) => true,

        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(SchedulerError::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ContactInfo;

    fn user(email: &str, role: Role) -> User {
        User {
            user_id: 1,
            email: email.to_string(),
            password_hash: String::new(),
            role,
            is_admin: role.is_elevated(),
            contact: ContactInfo::default(),
        }
    }

    const ADMIN_ACTIONS: &[Action<'static>] = &[
        Action::CreateCourse,
        Action::DeleteCourse,
        Action::ManageCourseUsers,
        Action::ManageSections,
        Action::CreateUser,
        Action::DeleteUser { target: "other@uwm.edu" },
        Action::EditUserInfo { target: "other@uwm.edu" },
        Action::CreateSkill,
    ];

    #[test]
    fn test_supervisor_has_full_access() {
        let boss = user("boss@uwm.edu", Role::Supervisor);
        for action in ADMIN_ACTIONS {
            assert!(authorize(&boss, action).is_ok(), "{action:?}");
        }
        assert!(authorize(&boss, &Action::UpdateCourse { is_member: false }).is_ok());
        assert!(authorize(&boss, &Action::AssignSections).is_ok());
    }

    #[test]
    fn test_instructor_updates_only_member_courses() {
        let jill = user("jill@uwm.edu", Role::Instructor);
        assert!(authorize(&jill, &Action::UpdateCourse { is_member: true }).is_ok());
        assert_eq!(
            authorize(&jill, &Action::UpdateCourse { is_member: false }),
            Err(SchedulerError::AccessDenied)
        );
        assert!(authorize(&jill, &Action::AssignSections).is_ok());
        for action in ADMIN_ACTIONS {
            assert_eq!(authorize(&jill, action), Err(SchedulerError::AccessDenied), "{action:?}");
        }
    }

    #[test]
    fn test_ta_may_only_view() {
        let chris = user("chris@uwm.edu", Role::Ta);
        assert!(authorize(&chris, &Action::View).is_ok());
        assert!(authorize(&chris, &Action::UpdateCourse { is_member: true }).is_err());
        assert!(authorize(&chris, &Action::AssignSections).is_err());
        for action in ADMIN_ACTIONS {
            assert!(authorize(&chris, action).is_err(), "{action:?}");
        }
    }

    #[test]
    fn test_nobody_deletes_themselves() {
        let boss = user("boss@uwm.edu", Role::Supervisor);
        assert_eq!(
            authorize(&boss, &Action::DeleteUser { target: "boss@uwm.edu" }),
            Err(SchedulerError::SelfDelete)
        );
    }

    #[test]
    fn test_everyone_edits_own_info() {
        for role in [Role::Supervisor, Role::Instructor, Role::Ta] {
            let me = user("me@uwm.edu", role);
            assert!(authorize(&me, &Action::EditUserInfo { target: "me@uwm.edu" }).is_ok());
        }
    }
}
