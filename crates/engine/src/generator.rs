use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{
    DivisionContext, TimeSlot, Weekday, MAX_CONSECUTIVE_PERIODS, MAX_SUBJECT_PER_DAY,
};
use crate::store::{EntryFilter, NewEntry, Store};
use crate::validator::validate_candidate;
use crate::workload::{compute_subject_periods, compute_teacher_workload, WorkloadError};

// ---------------------------------------------------------------------------
// Error and result types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("No subjects with assigned teachers found")]
    NoEligibleSubjects,
    #[error(transparent)]
    Workload(#[from] WorkloadError),
}

/// Generation mode: `Fill` keeps existing entries and only fills open slots;
/// `Full` rebuilds the division's week from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fill,
    Full,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    /// Teachers whose remaining hours hit zero during this run.
    pub teachers_reached_full_load: Vec<String>,
    /// Subjects whose remaining periods hit zero (target fully met).
    pub subjects_fully_allocated: Vec<String>,
    /// Subjects that got no placement: either no teacher is assigned or no
    /// legal slot could be found for them.
    pub unassigned_subjects: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub generated: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
    pub summary: GenerationSummary,
}

// ---------------------------------------------------------------------------
// Deterministic shuffle
// ---------------------------------------------------------------------------

/// 32-bit string hash (`h = (h << 5) - h + c`, wrapping). Order
/// diversification only, nothing cryptographic.
pub(crate) fn seed_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in s.chars() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Fisher-Yates variant with the swap index derived from the seed instead of
/// a PRNG: `j = (seed + i) % (i + 1)` at each descending step. The same seed
/// always yields the same permutation.
pub(crate) fn hash_shuffle<T: Clone>(items: &[T], seed: &str) -> Vec<T> {
    let mut shuffled = items.to_vec();
    let seed = u64::from(seed_hash(seed));
    for i in (1..shuffled.len()).rev() {
        let j = ((seed + i as u64) % (i as u64 + 1)) as usize;
        shuffled.swap(i, j);
    }
    shuffled
}

// ---------------------------------------------------------------------------
// In-memory trackers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SubjectState {
    subject_id: String,
    subject_name: String,
    teacher_id: String,
    remaining_periods: u32,
    scheduled_count: u32,
    priority: i64,
}

#[derive(Debug)]
struct TeacherState {
    remaining_hours: u32,
    scheduled_count: u32,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Fill a division's weekly grid automatically.
///
/// Slot order is the division-seeded shuffle; within each slot, subjects are
/// tried in priority order (`remaining_periods * 1000 - scheduled_count`,
/// computed once up front). Capacity trackers are refreshed from the store
/// after every commit, so mid-run exhaustion is caught by the zero guards,
/// not by re-sorting.
pub fn auto_generate(
    store: &mut Store,
    ctx: &DivisionContext,
    mode: Mode,
    created_by: &str,
) -> Result<GenerationReport, GenerateError> {
    let holidays = store.holidays_for(ctx);

    // Phase 1: holiday days must be empty, whatever mode we run in.
    for day in &holidays {
        store.delete_many(&EntryFilter {
            ctx: Some(ctx),
            day: Some(*day),
            ..Default::default()
        });
    }

    // Snapshot occupancy before any full-mode clear; Fill uses it to skip
    // taken slots.
    let occupied: HashSet<(Weekday, TimeSlot)> = store
        .find(&EntryFilter {
            ctx: Some(ctx),
            ..Default::default()
        })
        .iter()
        .map(|e| (e.day, e.time_slot))
        .collect();

    if mode == Mode::Full {
        store.delete_many(&EntryFilter {
            ctx: Some(ctx),
            ..Default::default()
        });
    }

    // Phase 2: eligibility. Subjects without an assigned teacher cannot be
    // scheduled and are reported as unassigned at the end.
    let mut teacherless: Vec<String> = Vec::new();
    let mut eligible: Vec<(String, String, String)> = Vec::new();
    for subject in store.subjects() {
        match &subject.teacher_id {
            Some(teacher_id) => eligible.push((
                subject.id.clone(),
                subject.subject_name.clone(),
                teacher_id.clone(),
            )),
            None => teacherless.push(subject.subject_name.clone()),
        }
    }
    if eligible.is_empty() {
        return Err(GenerateError::NoEligibleSubjects);
    }

    // Phase 3: candidate slot pool.
    let mut slots: Vec<(Weekday, TimeSlot)> = Vec::new();
    for day in Weekday::ALL {
        if holidays.contains(&day) {
            continue;
        }
        for slot in TimeSlot::ALL {
            if slot.is_break() {
                continue;
            }
            if mode == Mode::Fill && occupied.contains(&(day, slot)) {
                continue;
            }
            slots.push((day, slot));
        }
    }

    // Phase 4: division-seeded deterministic shuffle.
    let seed = format!(
        "{}-{}-{}-{}",
        ctx.program, ctx.class_name, ctx.semester, ctx.division
    );
    let shuffled = hash_shuffle(&slots, &seed);

    // Phase 5: priorities and availability, computed once.
    let mut subject_states: Vec<SubjectState> = Vec::with_capacity(eligible.len());
    for (subject_id, subject_name, teacher_id) in eligible {
        let periods = compute_subject_periods(store, &subject_id, ctx)?;
        let scheduled = periods.allotted_periods;
        subject_states.push(SubjectState {
            subject_id,
            subject_name,
            teacher_id,
            remaining_periods: periods.remaining_periods,
            scheduled_count: scheduled,
            priority: i64::from(periods.remaining_periods) * 1000 - i64::from(scheduled),
        });
    }
    // Stable sort: ties keep dataset order, so runs are reproducible.
    subject_states.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut teacher_states: HashMap<String, TeacherState> = HashMap::new();
    for teacher in store.teachers() {
        let workload = compute_teacher_workload(store, &teacher.id, ctx)?;
        teacher_states.insert(
            teacher.id.clone(),
            TeacherState {
                remaining_hours: workload.remaining_hours,
                scheduled_count: workload.assigned_hours,
            },
        );
    }

    // Phase 6: greedy placement.
    let mut day_subject_count: HashMap<Weekday, HashMap<String, usize>> = HashMap::new();
    let mut generated = 0usize;
    let mut skipped = 0usize;
    let mut warnings: Vec<String> = Vec::new();

    for (day, slot) in &shuffled {
        let mut allocated = false;

        for i in 0..subject_states.len() {
            if subject_states[i].remaining_periods == 0 {
                continue;
            }
            let subject_id = subject_states[i].subject_id.clone();
            let teacher_id = subject_states[i].teacher_id.clone();

            match teacher_states.get(&teacher_id) {
                Some(t) if t.remaining_hours > 0 => {}
                _ => continue,
            }

            let count_today = day_subject_count
                .get(day)
                .and_then(|m| m.get(&subject_id))
                .copied()
                .unwrap_or(0);
            if count_today >= MAX_SUBJECT_PER_DAY {
                continue;
            }

            if would_exceed_consecutive(store, ctx, *day, *slot, &subject_id) {
                continue;
            }

            let teacher_busy = store
                .find_one(&EntryFilter {
                    teacher_id: Some(&teacher_id),
                    day: Some(*day),
                    time_slot: Some(*slot),
                    ..Default::default()
                })
                .is_some();
            if teacher_busy {
                continue;
            }

            let class_busy = store
                .find_one(&EntryFilter {
                    ctx: Some(ctx),
                    day: Some(*day),
                    time_slot: Some(*slot),
                    ..Default::default()
                })
                .is_some();
            if class_busy {
                continue;
            }

            let verdict =
                validate_candidate(store, ctx, *day, *slot, &subject_id, &teacher_id, None);
            if !verdict.is_valid {
                continue;
            }

            match store.create(NewEntry {
                ctx: ctx.clone(),
                day: *day,
                time_slot: *slot,
                subject_id: subject_id.clone(),
                teacher_id: teacher_id.clone(),
                classroom_id: None,
                created_by: created_by.to_string(),
            }) {
                Ok(_) => {
                    *day_subject_count
                        .entry(*day)
                        .or_default()
                        .entry(subject_id.clone())
                        .or_insert(0) += 1;

                    // Refresh trackers from the store, not by estimation.
                    let periods = compute_subject_periods(store, &subject_id, ctx)?;
                    let workload = compute_teacher_workload(store, &teacher_id, ctx)?;
                    let state = &mut subject_states[i];
                    state.remaining_periods = periods.remaining_periods;
                    state.scheduled_count += 1;
                    if let Some(t) = teacher_states.get_mut(&teacher_id) {
                        t.remaining_hours = workload.remaining_hours;
                        t.scheduled_count += 1;
                    }

                    generated += 1;
                    allocated = true;
                    break;
                }
                Err(e) => {
                    // Uniqueness backstop fired under our feet; recoverable,
                    // try the next subject.
                    warnings.push(format!(
                        "Failed to allocate {} at {} {}: {}",
                        subject_states[i].subject_name, day, slot, e
                    ));
                }
            }
        }

        if !allocated {
            skipped += 1;
        }
    }

    // Phase 7: summary.
    let mut summary = GenerationSummary::default();
    for state in &subject_states {
        if state.remaining_periods == 0 {
            summary.subjects_fully_allocated.push(state.subject_name.clone());
        } else if state.scheduled_count == 0 {
            summary.unassigned_subjects.push(state.subject_name.clone());
        }
    }
    summary.unassigned_subjects.extend(teacherless);
    for teacher in store.teachers() {
        if let Some(state) = teacher_states.get(&teacher.id) {
            if state.remaining_hours == 0 && state.scheduled_count > 0 {
                summary
                    .teachers_reached_full_load
                    .push(teacher.faculty_name.clone());
            }
        }
    }

    Ok(GenerationReport {
        generated,
        skipped,
        warnings,
        summary,
    })
}

/// Would placing `subject_id` at `slot` create a run of more than
/// `MAX_CONSECUTIVE_PERIODS` same-subject periods? Scans outward from the
/// slot in both directions, stopping at break slots and at the first
/// non-matching period. The day's entries are loaded once and scanned in
/// memory.
fn would_exceed_consecutive(
    store: &Store,
    ctx: &DivisionContext,
    day: Weekday,
    slot: TimeSlot,
    subject_id: &str,
) -> bool {
    let same_subject: HashSet<usize> = store
        .find(&EntryFilter {
            ctx: Some(ctx),
            subject_id: Some(subject_id),
            day: Some(day),
            ..Default::default()
        })
        .iter()
        .map(|e| e.time_slot.index())
        .collect();

    let idx = slot.index();
    let mut run = 1usize;

    for i in (0..idx).rev() {
        if TimeSlot::ALL[i].is_break() || !same_subject.contains(&i) {
            break;
        }
        run += 1;
    }
    for i in idx + 1..TimeSlot::ALL.len() {
        if TimeSlot::ALL[i].is_break() || !same_subject.contains(&i) {
            break;
        }
        run += 1;
    }

    run > MAX_CONSECUTIVE_PERIODS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
