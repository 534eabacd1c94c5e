use serde::Serialize;

use crate::model::DivisionContext;
use crate::store::{EntryFilter, Store};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("Teacher '{0}' not found")]
    TeacherNotFound(String),
    #[error("Subject '{0}' not found")]
    SubjectNotFound(String),
}

// ---------------------------------------------------------------------------
// Computed views
// ---------------------------------------------------------------------------

/// A teacher's load within one division context, derived by counting entries.
/// `remaining_hours` is clamped at zero; over-capacity states show up as
/// `assigned_hours > teaching_hours`, never as a negative remainder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherWorkload {
    pub assigned_hours: u32,
    pub remaining_hours: u32,
    pub teaching_hours: u32,
}

/// A subject's allocation within one division context, same derivation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPeriods {
    pub allotted_periods: u32,
    pub remaining_periods: u32,
    pub required_periods: u32,
}

// ---------------------------------------------------------------------------
// Accountant functions
// ---------------------------------------------------------------------------

/// Compute a teacher's workload for one division context. Always counted
/// fresh from the entry set — there is no stored counter to drift.
pub fn compute_teacher_workload(
    store: &Store,
    teacher_id: &str,
    ctx: &DivisionContext,
) -> Result<TeacherWorkload, WorkloadError> {
    let teacher = store
        .teacher(teacher_id)
        .ok_or_else(|| WorkloadError::TeacherNotFound(teacher_id.to_string()))?;

    let assigned_hours = store.count(&EntryFilter {
        teacher_id: Some(teacher_id),
        ctx: Some(ctx),
        ..Default::default()
    }) as u32;

    Ok(TeacherWorkload {
        assigned_hours,
        remaining_hours: teacher.teaching_hours.saturating_sub(assigned_hours),
        teaching_hours: teacher.teaching_hours,
    })
}

/// Compute a subject's allotted periods for one division context.
pub fn compute_subject_periods(
    store: &Store,
    subject_id: &str,
    ctx: &DivisionContext,
) -> Result<SubjectPeriods, WorkloadError> {
    let subject = store
        .subject(subject_id)
        .ok_or_else(|| WorkloadError::SubjectNotFound(subject_id.to_string()))?;

    let allotted_periods = store.count(&EntryFilter {
        subject_id: Some(subject_id),
        ctx: Some(ctx),
        ..Default::default()
    }) as u32;

    Ok(SubjectPeriods {
        allotted_periods,
        remaining_periods: subject.required_periods.saturating_sub(allotted_periods),
        required_periods: subject.required_periods,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
