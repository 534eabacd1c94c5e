use serde::Deserialize;

use crate::model::{
    Classroom, DivisionContext, EntryStatus, LectureEntry, Subject, Teacher, TimeSlot, Weekday,
    WeeklyConfig,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures from the entry store. The two `*SlotTaken` variants are the
/// uniqueness backstops: even a caller that skips validation cannot store a
/// teacher or class double-booking.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Teacher '{teacher_id}' already has an entry at {day} {slot}")]
    TeacherSlotTaken {
        teacher_id: String,
        day: Weekday,
        slot: TimeSlot,
    },
    #[error("Class {ctx} already has an entry at {day} {slot}")]
    ClassSlotTaken {
        ctx: DivisionContext,
        day: Weekday,
        slot: TimeSlot,
    },
    #[error("Entry {0} not found")]
    EntryNotFound(u64),
}

// ---------------------------------------------------------------------------
// Query and mutation shapes
// ---------------------------------------------------------------------------

/// Filter over stored entries. Every conflict check in the engine is one of
/// these queries; unset fields match everything.
#[derive(Debug, Default, Clone)]
pub struct EntryFilter<'a> {
    pub teacher_id: Option<&'a str>,
    pub subject_id: Option<&'a str>,
    pub ctx: Option<&'a DivisionContext>,
    pub day: Option<Weekday>,
    pub time_slot: Option<TimeSlot>,
    pub exclude_id: Option<u64>,
}

impl EntryFilter<'_> {
    fn matches(&self, entry: &LectureEntry) -> bool {
        if let Some(id) = self.exclude_id {
            if entry.id == id {
                return false;
            }
        }
        if let Some(tid) = self.teacher_id {
            if entry.teacher_id != tid {
                return false;
            }
        }
        if let Some(sid) = self.subject_id {
            if entry.subject_id != sid {
                return false;
            }
        }
        if let Some(ctx) = self.ctx {
            if entry.ctx != *ctx {
                return false;
            }
        }
        if let Some(day) = self.day {
            if entry.day != day {
                return false;
            }
        }
        if let Some(slot) = self.time_slot {
            if entry.time_slot != slot {
                return false;
            }
        }
        true
    }
}

/// Input shape for creating an entry. The store assigns the id, status and
/// creation timestamp.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[serde(flatten)]
    pub ctx: DivisionContext,
    pub day: Weekday,
    pub time_slot: TimeSlot,
    pub subject_id: String,
    pub teacher_id: String,
    #[serde(default)]
    pub classroom_id: Option<String>,
    #[serde(default)]
    pub created_by: String,
}

/// One JSON document describing everything the engine needs for a run:
/// entity records plus any already-placed entries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub classrooms: Vec<Classroom>,
    pub weekly_configs: Vec<WeeklyConfig>,
    pub entries: Vec<NewEntry>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory entry store backing a single engine run. Entity lists keep
/// dataset order so that priority ties and summaries resolve the same way
/// on every run.
#[derive(Debug, Default)]
pub struct Store {
    teachers: Vec<Teacher>,
    subjects: Vec<Subject>,
    classrooms: Vec<Classroom>,
    configs: Vec<WeeklyConfig>,
    entries: Vec<LectureEntry>,
    next_id: u64,
}

impl Store {
    pub fn new() -> Self {
        Store {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Build a store from a dataset document. Seeded entries go through the
    /// same uniqueness backstops as live creations.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, StoreError> {
        let mut store = Store {
            teachers: dataset.teachers,
            subjects: dataset.subjects,
            classrooms: dataset.classrooms,
            configs: dataset.weekly_configs,
            entries: Vec::new(),
            next_id: 1,
        };
        for entry in dataset.entries {
            store.create(entry)?;
        }
        Ok(store)
    }

    // -----------------------------------------------------------------------
    // Entity lookups
    // -----------------------------------------------------------------------

    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn classroom_for(&self, ctx: &DivisionContext) -> Option<&Classroom> {
        self.classrooms.iter().find(|c| c.ctx == *ctx)
    }

    pub fn insert_teacher(&mut self, teacher: Teacher) {
        self.teachers.push(teacher);
    }

    pub fn insert_subject(&mut self, subject: Subject) {
        self.subjects.push(subject);
    }

    // -----------------------------------------------------------------------
    // Entry queries
    // -----------------------------------------------------------------------

    pub fn find(&self, filter: &EntryFilter) -> Vec<&LectureEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    pub fn find_one(&self, filter: &EntryFilter) -> Option<&LectureEntry> {
        self.entries.iter().find(|e| filter.matches(e))
    }

    pub fn count(&self, filter: &EntryFilter) -> usize {
        self.entries.iter().filter(|e| filter.matches(e)).count()
    }

    pub fn entries(&self) -> &[LectureEntry] {
        &self.entries
    }

    // -----------------------------------------------------------------------
    // Entry mutations
    // -----------------------------------------------------------------------

    /// Store a new entry. Rejects teacher and class double-bookings
    /// regardless of what the caller validated; this is the serializable
    /// uniqueness constraint at the storage boundary.
    pub fn create(&mut self, new: NewEntry) -> Result<u64, StoreError> {
        let teacher_clash = EntryFilter {
            teacher_id: Some(&new.teacher_id),
            day: Some(new.day),
            time_slot: Some(new.time_slot),
            ..Default::default()
        };
        if self.find_one(&teacher_clash).is_some() {
            return Err(StoreError::TeacherSlotTaken {
                teacher_id: new.teacher_id,
                day: new.day,
                slot: new.time_slot,
            });
        }

        let class_clash = EntryFilter {
            ctx: Some(&new.ctx),
            day: Some(new.day),
            time_slot: Some(new.time_slot),
            ..Default::default()
        };
        if self.find_one(&class_clash).is_some() {
            return Err(StoreError::ClassSlotTaken {
                ctx: new.ctx,
                day: new.day,
                slot: new.time_slot,
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LectureEntry {
            id,
            ctx: new.ctx,
            day: new.day,
            time_slot: new.time_slot,
            subject_id: new.subject_id,
            teacher_id: new.teacher_id,
            classroom_id: new.classroom_id,
            status: EntryStatus::Valid,
            created_by: new.created_by,
            created_at: Some(timestamp()),
        });
        Ok(id)
    }

    pub fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::EntryNotFound(id))?;
        self.entries.remove(pos);
        Ok(())
    }

    /// Delete every entry matching the filter; returns how many went.
    pub fn delete_many(&mut self, filter: &EntryFilter) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !filter.matches(e));
        before - self.entries.len()
    }

    // -----------------------------------------------------------------------
    // Weekly configuration
    // -----------------------------------------------------------------------

    pub fn holidays_for(&self, ctx: &DivisionContext) -> Vec<Weekday> {
        self.configs
            .iter()
            .find(|c| c.ctx == *ctx)
            .map(|c| c.holidays.clone())
            .unwrap_or_default()
    }

    /// Mark a day as a holiday for a division. Every entry already placed on
    /// that day in this context is deleted as a side effect; returns the
    /// number of deleted entries.
    pub fn set_holiday(&mut self, ctx: &DivisionContext, day: Weekday) -> usize {
        let deleted = self.delete_many(&EntryFilter {
            ctx: Some(ctx),
            day: Some(day),
            ..Default::default()
        });
        match self.configs.iter_mut().find(|c| c.ctx == *ctx) {
            Some(cfg) => {
                if !cfg.holidays.contains(&day) {
                    cfg.holidays.push(day);
                }
            }
            None => self.configs.push(WeeklyConfig {
                ctx: ctx.clone(),
                holidays: vec![day],
            }),
        }
        deleted
    }

    /// Unmark a holiday. Existing entries are untouched; the day simply
    /// becomes schedulable again.
    pub fn remove_holiday(&mut self, ctx: &DivisionContext, day: Weekday) {
        if let Some(cfg) = self.configs.iter_mut().find(|c| c.ctx == *ctx) {
            cfg.holidays.retain(|d| *d != day);
        }
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DivisionContext {
        DivisionContext {
            program: "Information Technology".to_string(),
            class_name: "FY".to_string(),
            semester: 1,
            division: "A".to_string(),
        }
    }

    fn other_ctx() -> DivisionContext {
        DivisionContext {
            division: "B".to_string(),
            ..ctx()
        }
    }

    fn new_entry(ctx: DivisionContext, day: Weekday, slot: TimeSlot, teacher: &str) -> NewEntry {
        NewEntry {
            ctx,
            day,
            time_slot: slot,
            subject_id: "s1".to_string(),
            teacher_id: teacher.to_string(),
            classroom_id: None,
            created_by: "test".to_string(),
        }
    }

    #[test]
    fn create_assigns_ids_and_valid_status() {
        let mut store = Store::new();
        let id = store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap();
        assert_eq!(id, 1);
        let entry = &store.entries()[0];
        assert_eq!(entry.status, EntryStatus::Valid);
        assert!(entry.created_at.is_some());
    }

    #[test]
    fn teacher_slot_backstop_spans_contexts() {
        let mut store = Store::new();
        store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap();
        // Same teacher, same (day, slot), different division: still rejected.
        let err = store
            .create(new_entry(other_ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::TeacherSlotTaken { .. }));
    }

    #[test]
    fn class_slot_backstop_within_context() {
        let mut store = Store::new();
        store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap();
        let err = store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ClassSlotTaken { .. }));
        // Different slot is fine.
        store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M2, "t2"))
            .unwrap();
    }

    #[test]
    fn delete_and_delete_many() {
        let mut store = Store::new();
        let id = store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap();
        store
            .create(new_entry(ctx(), Weekday::Tuesday, TimeSlot::M1, "t1"))
            .unwrap();
        store.delete(id).unwrap();
        assert!(matches!(
            store.delete(id),
            Err(StoreError::EntryNotFound(_))
        ));

        let c = ctx();
        let deleted = store.delete_many(&EntryFilter {
            ctx: Some(&c),
            ..Default::default()
        });
        assert_eq!(deleted, 1);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn set_holiday_clears_day_and_records_config() {
        let mut store = Store::new();
        store
            .create(new_entry(ctx(), Weekday::Wednesday, TimeSlot::M1, "t1"))
            .unwrap();
        store
            .create(new_entry(ctx(), Weekday::Wednesday, TimeSlot::M2, "t2"))
            .unwrap();
        store
            .create(new_entry(ctx(), Weekday::Thursday, TimeSlot::M1, "t3"))
            .unwrap();

        let c = ctx();
        let deleted = store.set_holiday(&c, Weekday::Wednesday);
        assert_eq!(deleted, 2);
        assert_eq!(store.holidays_for(&c), vec![Weekday::Wednesday]);
        assert_eq!(store.entries().len(), 1);

        // Setting the same holiday twice stays idempotent on the config.
        store.set_holiday(&c, Weekday::Wednesday);
        assert_eq!(store.holidays_for(&c), vec![Weekday::Wednesday]);

        store.remove_holiday(&c, Weekday::Wednesday);
        assert!(store.holidays_for(&c).is_empty());
    }

    #[test]
    fn filter_exclude_id() {
        let mut store = Store::new();
        let id = store
            .create(new_entry(ctx(), Weekday::Monday, TimeSlot::M1, "t1"))
            .unwrap();
        let found = store.find_one(&EntryFilter {
            teacher_id: Some("t1"),
            exclude_id: Some(id),
            ..Default::default()
        });
        assert!(found.is_none());
    }
}
