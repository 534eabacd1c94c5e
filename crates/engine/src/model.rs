use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fixed weekly grid constants
// ---------------------------------------------------------------------------

/// Maximum number of teaching (non-break) lectures allowed on a single day.
pub const MAX_LECTURES_PER_DAY: usize = 6;

/// Maximum times the same subject may appear on one day.
pub const MAX_SUBJECT_PER_DAY: usize = 2;

/// Maximum consecutive periods of the same subject within a day. A run is
/// cut by any break slot; a third consecutive occurrence is rejected.
pub const MAX_CONSECUTIVE_PERIODS: usize = 2;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Working weekday. The week has six teaching days; Sunday never appears.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All working days in week order.
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the eight fixed daily time bands. Two of them (`Lunch` and
/// `Recess`) are break slots and can never hold a lecture.
///
/// Serializes as the literal time band (e.g. `"09:30-10:25"`), which is the
/// representation the surrounding system stores and displays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    #[serde(rename = "09:30-10:25")]
    M1,
    #[serde(rename = "10:25-11:20")]
    M2,
    #[serde(rename = "11:20-12:20")]
    Lunch,
    #[serde(rename = "12:20-13:15")]
    A1,
    #[serde(rename = "13:15-14:10")]
    A2,
    #[serde(rename = "14:10-14:30")]
    Recess,
    #[serde(rename = "14:30-15:25")]
    A3,
    #[serde(rename = "15:25-16:20")]
    A4,
}

impl TimeSlot {
    /// All slots in chronological order. Consecutive-run scans walk this
    /// array, so the order must match the real daily grid.
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::M1,
        TimeSlot::M2,
        TimeSlot::Lunch,
        TimeSlot::A1,
        TimeSlot::A2,
        TimeSlot::Recess,
        TimeSlot::A3,
        TimeSlot::A4,
    ];

    /// Break slots are structural recess time and are never schedulable.
    pub fn is_break(self) -> bool {
        matches!(self, TimeSlot::Lunch | TimeSlot::Recess)
    }

    /// Position within the daily grid (0-based).
    pub fn index(self) -> usize {
        match self {
            TimeSlot::M1 => 0,
            TimeSlot::M2 => 1,
            TimeSlot::Lunch => 2,
            TimeSlot::A1 => 3,
            TimeSlot::A2 => 4,
            TimeSlot::Recess => 5,
            TimeSlot::A3 => 6,
            TimeSlot::A4 => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::M1 => "09:30-10:25",
            TimeSlot::M2 => "10:25-11:20",
            TimeSlot::Lunch => "11:20-12:20",
            TimeSlot::A1 => "12:20-13:15",
            TimeSlot::A2 => "13:15-14:10",
            TimeSlot::Recess => "14:10-14:30",
            TimeSlot::A3 => "14:30-15:25",
            TimeSlot::A4 => "15:25-16:20",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Informational status tag on a stored entry. Entries that pass validation
/// at creation time are always `Valid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Valid,
    Conflict,
}

// ---------------------------------------------------------------------------
// Division context
// ---------------------------------------------------------------------------

/// The scoping key under which capacity and class-slot checks are
/// partitioned. Identical subject/teacher/slot combinations in different
/// contexts never conflict on capacity — only on teacher time, which is a
/// single global resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DivisionContext {
    pub program: String,
    pub class_name: String,
    pub semester: u8,
    pub division: String,
}

impl fmt::Display for DivisionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Sem-{} {}",
            self.program, self.class_name, self.semester, self.division
        )
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// The atomic schedulable unit: one subject taught by one teacher in one
/// division at one (day, slot). The entry set is the single source of truth;
/// all workload and period figures are derived from it by counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureEntry {
    pub id: u64,
    #[serde(flatten)]
    pub ctx: DivisionContext,
    pub day: Weekday,
    pub time_slot: TimeSlot,
    pub subject_id: String,
    pub teacher_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_id: Option<String>,
    pub status: EntryStatus,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A teacher with a weekly teaching capacity. Assigned/remaining hours are
/// never stored here; they are recomputed from the entry set on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub faculty_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub teacher_code: String,
    pub teaching_hours: u32,
}

/// A subject with a weekly period target and at most one assigned teacher.
/// Allotted/remaining periods are recomputed, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub subject_name: String,
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    pub required_periods: u32,
}

/// One room record per division.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    #[serde(flatten)]
    pub ctx: DivisionContext,
    #[serde(default)]
    pub room_number: Option<String>,
}

/// Per-division weekly configuration: which weekdays are holidays. A holiday
/// day must hold zero entries for its division.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyConfig {
    #[serde(flatten)]
    pub ctx: DivisionContext,
    #[serde(default)]
    pub holidays: Vec<Weekday>,
}
