/// Database module for users, courses, sections and skills

mod types;

pub use types::{
    ContactInfo, Course, MeetingDays, NewSection, Role, Section, SectionType, Skill, User,
};

use crate::credentials;
use crate::error::{is_unique_violation, SchedulerError};
use crate::validation::{self, SectionLookup};
use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_scheduler.sql");

type Result<T> = std::result::Result<T, SchedulerError>;

const USER_COLUMNS: &str = "user_id, email, password_hash, role, is_admin, first_name, last_name,
     phone_number, address_line1, address_line2, city, state, zipcode";

const SECTION_COLUMNS: &str = "section_id, course_name, section_number, section_type, user_id,
     meeting_start, meeting_end, meeting_days";

/// Display order of sections within a course: lectures first, then by number.
const SECTION_ORDER: &str = "section_type DESC, section_number ASC";

pub struct SchedulerDb {
    db: Mutex<Connection>,
}

impl SchedulerDb {
    /// Opens (or creates) the database at `db_path` and initializes the schema
    pub fn open(db_path: &str) -> Result<Self> {
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- users ----

    /// Validates and stores a new user. The email is lowercased and the
    /// password is stored salted and hashed.
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
        contact: &ContactInfo,
    ) -> Result<User> {
        let email = validation::normalize_email(email)?;
        let password_hash = credentials::hash_password(password);

        let db = self.conn();
        db.execute(
            "INSERT INTO users (
                email, password_hash, role, is_admin, first_name, last_name, phone_number,
                address_line1, address_line2, city, state, zipcode, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))",
            rusqlite::params![
                &email,
                &password_hash,
                role,
                role.is_elevated(),
                &contact.first_name,
                &contact.last_name,
                &contact.phone_number,
                &contact.address_line1,
                &contact.address_line2,
                &contact.city,
                &contact.state,
                &contact.zipcode,
            ],
        )
        .map_err(|e| unique_or(e, &email))?;

        debug!("Inserted user {}", email);

        Ok(User {
            user_id: db.last_insert_rowid(),
            email,
            password_hash,
            role,
            is_admin: role.is_elevated(),
            contact: contact.clone(),
        })
    }

    /// Gets a user by email (case-insensitive)
    pub fn get_user(&self, email: &str) -> Result<User> {
        let db = self.conn();
        db.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            [email.to_lowercase()],
            user_from_row,
        )
        .optional()?
        .ok_or(SchedulerError::NotFound { entity: "User" })
    }

    /// Lists all users ordered by role code, then email
    pub fn list_users(&self) -> Result<Vec<User>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY role, email"
        ))?;
        let users = stmt.query_map([], user_from_row)?;
        Ok(users.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Deletes a user. Sections they staffed are kept with no assignee and
    /// course/skill memberships are dropped.
    pub fn delete_user(&self, email: &str) -> Result<()> {
        let db = self.conn();
        let deleted = db.execute("DELETE FROM users WHERE email = ?", [email.to_lowercase()])?;
        if deleted == 0 {
            return Err(SchedulerError::NotFound { entity: "User" });
        }
        Ok(())
    }

    pub fn update_contact_info(&self, email: &str, contact: &ContactInfo) -> Result<()> {
        let db = self.conn();
        let updated = db.execute(
            "UPDATE users SET first_name = ?1, last_name = ?2, phone_number = ?3,
                address_line1 = ?4, address_line2 = ?5, city = ?6, state = ?7, zipcode = ?8
             WHERE email = ?9",
            (
                &contact.first_name,
                &contact.last_name,
                &contact.phone_number,
                &contact.address_line1,
                &contact.address_line2,
                &contact.city,
                &contact.state,
                &contact.zipcode,
                email.to_lowercase(),
            ),
        )?;
        if updated == 0 {
            return Err(SchedulerError::NotFound { entity: "User" });
        }
        Ok(())
    }

    // ---- courses ----

    /// Stores a new course named by its uppercased department and number.
    /// A duplicate name is an integrity error and nothing is written.
    pub fn create_course(
        &self,
        dpt: &str,
        num: &str,
        description: Option<&str>,
        term: Option<&str>,
    ) -> Result<Course> {
        let name = validation::course_name(dpt, num)?;

        let db = self.conn();
        db.execute(
            "INSERT INTO courses (name, dpt, num, description, term, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            (&name, dpt, num, description, term),
        )
        .map_err(|e| unique_or(e, &name))?;

        debug!("Inserted course {}", name);

        Ok(Course {
            name,
            dpt: dpt.to_string(),
            num: num.to_string(),
            description: description.map(str::to_string),
            term: term.map(str::to_string),
        })
    }

    pub fn get_course(&self, name: &str) -> Result<Course> {
        let db = self.conn();
        db.query_row(
            "SELECT name, dpt, num, description, term FROM courses WHERE name = ?",
            [name],
            course_from_row,
        )
        .optional()?
        .ok_or(SchedulerError::NotFound { entity: "Course" })
    }

    /// Lists all courses ordered by department, then number
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT name, dpt, num, description, term FROM courses ORDER BY dpt, num",
        )?;
        let courses = stmt.query_map([], course_from_row)?;
        Ok(courses.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Deletes a course together with all of its sections
    pub fn delete_course(&self, name: &str) -> Result<()> {
        let db = self.conn();
        let deleted = db.execute("DELETE FROM courses WHERE name = ?", [name])?;
        if deleted == 0 {
            return Err(SchedulerError::NotFound { entity: "Course" });
        }
        Ok(())
    }

    pub fn update_course_description(&self, name: &str, description: Option<&str>) -> Result<()> {
        let db = self.conn();
        let updated = db.execute(
            "UPDATE courses SET description = ?1 WHERE name = ?2",
            (description, name),
        )?;
        if updated == 0 {
            return Err(SchedulerError::NotFound { entity: "Course" });
        }
        Ok(())
    }

    /// Adds a user to a course's member set. Adding an existing member is a no-op.
    pub fn add_course_user(&self, course: &str, user_id: i64) -> Result<()> {
        let db = self.conn();
        db.execute(
            "INSERT OR IGNORE INTO course_users (course_name, user_id) VALUES (?1, ?2)",
            (course, user_id),
        )?;
        Ok(())
    }

    /// Removes a user from a course and unassigns them from every section of
    /// that course, in one transaction.
    pub fn remove_course_user(&self, course: &str, user_id: i64) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM course_users WHERE course_name = ?1 AND user_id = ?2",
            (course, user_id),
        )?;
        let cleared = tx.execute(
            "UPDATE sections SET user_id = NULL WHERE course_name = ?1 AND user_id = ?2",
            (course, user_id),
        )?;
        tx.commit()?;

        debug!("Removed user {} from {} ({} sections cleared)", user_id, course, cleared);
        Ok(())
    }

    pub fn is_course_member(&self, course: &str, user_id: i64) -> Result<bool> {
        let db = self.conn();
        let found: Option<i64> = db
            .query_row(
                "SELECT 1 FROM course_users WHERE course_name = ?1 AND user_id = ?2",
                (course, user_id),
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Members of a course ordered by role code, then email
    pub fn course_users(&self, course: &str) -> Result<Vec<User>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM users u
             JOIN course_users cu ON cu.user_id = u.user_id
             WHERE cu.course_name = ?
             ORDER BY u.role, u.email",
            prefixed(USER_COLUMNS, "u")
        ))?;
        let users = stmt.query_map([course], user_from_row)?;
        Ok(users.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- sections ----

    /// Validates and stores a new section.
    ///
    /// Validation and insert run under the same lock so the duplicate-number
    /// check cannot race another insert.
    pub fn create_section(&self, new: &NewSection) -> Result<Section> {
        let db = self.conn();
        let valid = validation::validate_section(new, &*db)?;

        db.execute(
            "INSERT INTO sections (
                course_name, section_number, section_type, user_id,
                meeting_start, meeting_end, meeting_days, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))",
            (
                &valid.course,
                &valid.section_number,
                valid.section_type,
                valid.user_id,
                valid.meeting_start,
                valid.meeting_end,
                valid.meeting_days,
            ),
        )?;

        debug!("Inserted section {} of {}", valid.section_number, valid.course);

        Ok(Section {
            section_id: db.last_insert_rowid(),
            course_name: valid.course,
            section_number: valid.section_number,
            section_type: valid.section_type,
            user_id: valid.user_id,
            meeting_start: valid.meeting_start,
            meeting_end: valid.meeting_end,
            meeting_days: valid.meeting_days,
        })
    }

    pub fn get_section(&self, course: &str, section_number: &str) -> Result<Section> {
        let db = self.conn();
        db.query_row(
            &format!(
                "SELECT {SECTION_COLUMNS} FROM sections WHERE course_name = ?1 AND section_number = ?2"
            ),
            (course, section_number),
            section_from_row,
        )
        .optional()?
        .ok_or(SchedulerError::NotFound { entity: "Section" })
    }

    /// Sections of a course in display order
    pub fn list_sections(&self, course: &str) -> Result<Vec<Section>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE course_name = ? ORDER BY {SECTION_ORDER}"
        ))?;
        let sections = stmt.query_map([course], section_from_row)?;
        Ok(sections.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Sections assigned to a user across all courses, earliest start first
    pub fn sections_for_user(&self, user_id: i64) -> Result<Vec<Section>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE user_id = ?
             ORDER BY meeting_start, course_name, section_number"
        ))?;
        let sections = stmt.query_map([user_id], section_from_row)?;
        Ok(sections.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_section(&self, course: &str, section_number: &str) -> Result<()> {
        let db = self.conn();
        let deleted = db.execute(
            "DELETE FROM sections WHERE course_name = ?1 AND section_number = ?2",
            (course, section_number),
        )?;
        if deleted == 0 {
            return Err(SchedulerError::NotFound { entity: "Section" });
        }
        Ok(())
    }

    /// Sets or clears the staff member of a section
    pub fn set_section_user(&self, section_id: i64, user_id: Option<i64>) -> Result<()> {
        let db = self.conn();
        let updated = db.execute(
            "UPDATE sections SET user_id = ?1 WHERE section_id = ?2",
            (user_id, section_id),
        )?;
        if updated == 0 {
            return Err(SchedulerError::NotFound { entity: "Section" });
        }
        Ok(())
    }

    // ---- skills ----

    pub fn create_skill(&self, name: &str) -> Result<Skill> {
        let name = validation::skill_name(name)?;

        let db = self.conn();
        db.execute("INSERT INTO skills (name) VALUES (?)", [name])
            .map_err(|e| unique_or(e, name))?;

        Ok(Skill {
            skill_id: db.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub fn get_skill(&self, name: &str) -> Result<Skill> {
        let db = self.conn();
        db.query_row(
            "SELECT skill_id, name FROM skills WHERE name = ?",
            [name],
            skill_from_row,
        )
        .optional()?
        .ok_or(SchedulerError::NotFound { entity: "Skill" })
    }

    /// All skills in alphabetical order
    pub fn list_skills(&self) -> Result<Vec<Skill>> {
        let db = self.conn();
        let mut stmt = db.prepare("SELECT skill_id, name FROM skills ORDER BY name")?;
        let skills = stmt.query_map([], skill_from_row)?;
        Ok(skills.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_skill(&self, name: &str) -> Result<()> {
        let db = self.conn();
        let deleted = db.execute("DELETE FROM skills WHERE name = ?", [name])?;
        if deleted == 0 {
            return Err(SchedulerError::NotFound { entity: "Skill" });
        }
        Ok(())
    }

    pub fn add_skill_user(&self, skill_id: i64, user_id: i64) -> Result<()> {
        let db = self.conn();
        db.execute(
            "INSERT OR IGNORE INTO skill_users (skill_id, user_id) VALUES (?1, ?2)",
            (skill_id, user_id),
        )?;
        Ok(())
    }

    pub fn remove_skill_user(&self, skill_id: i64, user_id: i64) -> Result<()> {
        let db = self.conn();
        db.execute(
            "DELETE FROM skill_users WHERE skill_id = ?1 AND user_id = ?2",
            (skill_id, user_id),
        )?;
        Ok(())
    }

    /// Skills held by a user in alphabetical order
    pub fn skills_for_user(&self, user_id: i64) -> Result<Vec<Skill>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT s.skill_id, s.name FROM skills s
             JOIN skill_users su ON su.skill_id = s.skill_id
             WHERE su.user_id = ?
             ORDER BY s.name",
        )?;
        let skills = stmt.query_map([user_id], skill_from_row)?;
        Ok(skills.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Holders of a skill ordered by email
    pub fn skill_users(&self, skill_id: i64) -> Result<Vec<User>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM users u
             JOIN skill_users su ON su.user_id = u.user_id
             WHERE su.skill_id = ?
             ORDER BY u.email",
            prefixed(USER_COLUMNS, "u")
        ))?;
        let users = stmt.query_map([skill_id], user_from_row)?;
        Ok(users.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SectionLookup for Connection {
    fn course_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .query_row("SELECT 1 FROM courses WHERE name = ?", [name], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn section_number_taken(&self, course: &str, number: &str) -> Result<bool> {
        let found: Option<i64> = self
            .query_row(
                "SELECT 1 FROM sections WHERE course_name = ?1 AND section_number = ?2",
                (course, number),
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Maps a unique-key violation on `key` to an integrity error.
fn unique_or(err: rusqlite::Error, key: &str) -> SchedulerError {
    if is_unique_violation(&err) {
        SchedulerError::integrity(key)
    } else {
        err.into()
    }
}

/// Qualifies a comma-separated column list with a table alias.
fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        is_admin: row.get(4)?,
        contact: ContactInfo {
            first_name: row.get(5)?,
            last_name: row.get(6)?,
            phone_number: row.get(7)?,
            address_line1: row.get(8)?,
            address_line2: row.get(9)?,
            city: row.get(10)?,
            state: row.get(11)?,
            zipcode: row.get(12)?,
        },
    })
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        name: row.get(0)?,
        dpt: row.get(1)?,
        num: row.get(2)?,
        description: row.get(3)?,
        term: row.get(4)?,
    })
}

fn section_from_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        section_id: row.get(0)?,
        course_name: row.get(1)?,
        section_number: row.get(2)?,
        section_type: row.get(3)?,
        user_id: row.get(4)?,
        meeting_start: row.get(5)?,
        meeting_end: row.get(6)?,
        meeting_days: row.get(7)?,
    })
}

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        skill_id: row.get(0)?,
        name: row.get(1)?,
    })
}
