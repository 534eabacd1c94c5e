use std::collections::HashMap;

use serde::Serialize;

use crate::model::{
    DivisionContext, LectureEntry, TimeSlot, Weekday, MAX_LECTURES_PER_DAY,
};
use crate::store::{EntryFilter, Store};
use crate::workload::{compute_subject_periods, compute_teacher_workload};

// ---------------------------------------------------------------------------
// Validation result types
// ---------------------------------------------------------------------------

/// Structured verdict for a placement or a whole week. Callers block on
/// `errors` only; `warnings` is a reserved channel that stays empty in every
/// current rule (full capacity is a legitimate state, not a warning).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn finish(errors: Vec<String>, warnings: Vec<String>) -> Self {
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn ok() -> Self {
        ValidationResult::finish(Vec::new(), Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Candidate placement validation
// ---------------------------------------------------------------------------

/// Validate a candidate placement before it is stored.
///
/// Rule order (short-circuits marked *):
/// 0. *Break slots are never schedulable.
/// 1. *Teacher and subject must exist.
/// 2. Teacher must be free at (day, slot) across every division.
/// 3. The class slot must be free within this division.
/// 4. Simulated +1 must not push the teacher past `teaching_hours`.
///    Landing exactly at full capacity is valid and produces no warning.
/// 5. Same for subject periods.
///
/// `exclude_id` lets a caller re-check an entry being moved without the
/// entry colliding with itself.
pub fn validate_candidate(
    store: &Store,
    ctx: &DivisionContext,
    day: Weekday,
    time_slot: TimeSlot,
    subject_id: &str,
    teacher_id: &str,
    exclude_id: Option<u64>,
) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let warnings: Vec<String> = Vec::new();

    if time_slot.is_break() {
        errors.push(format!(
            "Cannot schedule during break time slot: {}",
            time_slot
        ));
        return ValidationResult::finish(errors, warnings);
    }

    let teacher = match store.teacher(teacher_id) {
        Some(t) => t,
        None => {
            errors.push("Teacher not found".to_string());
            return ValidationResult::finish(errors, warnings);
        }
    };
    let subject = match store.subject(subject_id) {
        Some(s) => s,
        None => {
            errors.push("Subject not found".to_string());
            return ValidationResult::finish(errors, warnings);
        }
    };

    // Teacher time is global: any division's entry blocks this slot.
    let teacher_conflict = store.find_one(&EntryFilter {
        teacher_id: Some(teacher_id),
        day: Some(day),
        time_slot: Some(time_slot),
        exclude_id,
        ..Default::default()
    });
    if let Some(conflict) = teacher_conflict {
        errors.push(format!(
            "Teacher {} is already assigned to {} at {} {}",
            teacher.faculty_name,
            subject_label(store, &conflict.subject_id),
            day,
            time_slot
        ));
    }

    let class_conflict = store.find_one(&EntryFilter {
        ctx: Some(ctx),
        day: Some(day),
        time_slot: Some(time_slot),
        exclude_id,
        ..Default::default()
    });
    if let Some(conflict) = class_conflict {
        errors.push(format!(
            "Class {} already has {} scheduled at {} {}",
            ctx,
            subject_label(store, &conflict.subject_id),
            day,
            time_slot
        ));
    }

    // Capacity checks simulate the insert: reject only when one more hour
    // would overshoot. Exactly reaching the cap is fine.
    match compute_teacher_workload(store, teacher_id, ctx) {
        Ok(workload) => {
            if workload.assigned_hours + 1 > workload.teaching_hours {
                errors.push(format!(
                    "Teacher {} workload exceeded for {} - slot cannot be assigned. \
                     Current: {}/{}, adding one more would exceed the limit",
                    teacher.faculty_name, ctx, workload.assigned_hours, workload.teaching_hours
                ));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    match compute_subject_periods(store, subject_id, ctx) {
        Ok(periods) => {
            if periods.allotted_periods + 1 > periods.required_periods {
                errors.push(format!(
                    "Subject {} periods exceeded for {} - slot cannot be assigned. \
                     Current: {}/{}, adding one more would exceed the limit",
                    subject.subject_name, ctx, periods.allotted_periods, periods.required_periods
                ));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    ValidationResult::finish(errors, warnings)
}

// ---------------------------------------------------------------------------
// Existing entry validation
// ---------------------------------------------------------------------------

/// Re-validate an entry that is already stored, against the actual current
/// state rather than a simulated insert: conflicts exclude the entry's own
/// id, and capacity only fails when the context is genuinely over the cap.
/// Break-slot entries pass here; the weekly check reports them day-level.
pub fn validate_existing(store: &Store, entry: &LectureEntry) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let warnings: Vec<String> = Vec::new();

    if entry.time_slot.is_break() {
        return ValidationResult::ok();
    }

    let teacher = match store.teacher(&entry.teacher_id) {
        Some(t) => t,
        None => {
            errors.push(format!(
                "Teacher not found for entry at {} {}",
                entry.day, entry.time_slot
            ));
            return ValidationResult::finish(errors, warnings);
        }
    };
    let subject = match store.subject(&entry.subject_id) {
        Some(s) => s,
        None => {
            errors.push(format!(
                "Subject not found for entry at {} {}",
                entry.day, entry.time_slot
            ));
            return ValidationResult::finish(errors, warnings);
        }
    };

    let teacher_conflicts = store.find(&EntryFilter {
        teacher_id: Some(&entry.teacher_id),
        day: Some(entry.day),
        time_slot: Some(entry.time_slot),
        exclude_id: Some(entry.id),
        ..Default::default()
    });
    if !teacher_conflicts.is_empty() {
        let names: Vec<String> = teacher_conflicts
            .iter()
            .map(|c| subject_label(store, &c.subject_id))
            .collect();
        errors.push(format!(
            "Teacher {} has multiple assignments at {} {}: {}",
            teacher.faculty_name,
            entry.day,
            entry.time_slot,
            names.join(", ")
        ));
    }

    let class_conflicts = store.find(&EntryFilter {
        ctx: Some(&entry.ctx),
        day: Some(entry.day),
        time_slot: Some(entry.time_slot),
        exclude_id: Some(entry.id),
        ..Default::default()
    });
    if !class_conflicts.is_empty() {
        let names: Vec<String> = class_conflicts
            .iter()
            .map(|c| subject_label(store, &c.subject_id))
            .collect();
        errors.push(format!(
            "Class {} has multiple subjects at {} {}: {}",
            entry.ctx,
            entry.day,
            entry.time_slot,
            names.join(", ")
        ));
    }

    match compute_teacher_workload(store, &entry.teacher_id, &entry.ctx) {
        Ok(workload) => {
            if workload.assigned_hours > workload.teaching_hours {
                errors.push(format!(
                    "Teacher {} workload exceeded for {}. Current: {}/{} (exceeds limit)",
                    teacher.faculty_name, entry.ctx, workload.assigned_hours, workload.teaching_hours
                ));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    match compute_subject_periods(store, &entry.subject_id, &entry.ctx) {
        Ok(periods) => {
            if periods.allotted_periods > periods.required_periods {
                errors.push(format!(
                    "Subject {} periods exceeded for {}. Current: {}/{} (exceeds limit)",
                    subject.subject_name, entry.ctx, periods.allotted_periods, periods.required_periods
                ));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    ValidationResult::finish(errors, warnings)
}

// ---------------------------------------------------------------------------
// Division and week validation
// ---------------------------------------------------------------------------

/// Re-validate every stored entry in a division, prefixing findings with the
/// offending entry's position so a human can locate it.
pub fn validate_division(store: &Store, ctx: &DivisionContext) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let entries = store.find(&EntryFilter {
        ctx: Some(ctx),
        ..Default::default()
    });

    for entry in entries {
        let result = validate_existing(store, entry);
        let prefix = format!("Entry {} {} {}", entry.ctx, entry.day, entry.time_slot);
        if !result.is_valid {
            errors.push(format!("{}: {}", prefix, result.errors.join(", ")));
        }
        if !result.warnings.is_empty() {
            warnings.push(format!("{}: {}", prefix, result.warnings.join(", ")));
        }
    }

    ValidationResult::finish(errors, warnings)
}

/// Validate a full week for a division before saving it.
///
/// Day-level policies on top of per-entry checks: holiday days must be
/// empty, non-holiday days may hold at most six teaching lectures, and
/// break slots must hold nothing at all.
pub fn validate_week(
    store: &Store,
    ctx: &DivisionContext,
    holidays: &[Weekday],
) -> ValidationResult {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let entries = store.find(&EntryFilter {
        ctx: Some(ctx),
        ..Default::default()
    });

    let mut by_day: HashMap<Weekday, Vec<&LectureEntry>> = HashMap::new();
    for day in Weekday::ALL {
        by_day.insert(day, Vec::new());
    }
    for entry in entries {
        if let Some(bucket) = by_day.get_mut(&entry.day) {
            bucket.push(entry);
        }
    }

    for day in Weekday::ALL {
        let day_entries = &by_day[&day];
        let is_holiday = holidays.contains(&day);

        if is_holiday {
            if !day_entries.is_empty() {
                errors.push(format!(
                    "Holiday day {} cannot have any timetable allocations",
                    day
                ));
            }
            continue;
        }

        let active = day_entries
            .iter()
            .filter(|e| !e.time_slot.is_break())
            .count();
        if active > MAX_LECTURES_PER_DAY {
            errors.push(format!(
                "{} has {} lectures. Maximum allowed is {} lectures per day",
                day, active, MAX_LECTURES_PER_DAY
            ));
        }

        // Structurally impossible through the validated write path, but the
        // store itself does not forbid it.
        let in_breaks = day_entries
            .iter()
            .filter(|e| e.time_slot.is_break())
            .count();
        if in_breaks > 0 {
            errors.push(format!(
                "{} has {} entry(ies) in break slots. Break slots must remain empty",
                day, in_breaks
            ));
        }
    }

    let per_entry = validate_division(store, ctx);
    errors.extend(per_entry.errors);
    warnings.extend(per_entry.warnings);

    ValidationResult::finish(errors, warnings)
}

fn subject_label(store: &Store, subject_id: &str) -> String {
    store
        .subject(subject_id)
        .map(|s| s.subject_name.clone())
        .unwrap_or_else(|| subject_id.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Subject, Teacher};
    use crate::store::NewEntry;

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
            program: "Cyber Security".to_string(),
            class_name: "SY".to_string(),
            semester: 3,
            division: "B".to_string(),
        }
    }

    fn seed_teacher(store: &mut Store, id: &str, name: &str, hours: u32) {
        store.insert_teacher(Teacher {
            id: id.to_string(),
            faculty_name: name.to_string(),
            department: "IT".to_string(),
            teacher_code: String::new(),
            teaching_hours: hours,
        });
    }

    fn seed_subject(store: &mut Store, id: &str, name: &str, teacher: &str, periods: u32) {
        store.insert_subject(Subject {
            id: id.to_string(),
            subject_name: name.to_string(),
            subject_code: String::new(),
            teacher_id: Some(teacher.to_string()),
            required_periods: periods,
        });
    }

    fn place(
        store: &mut Store,
        ctx: DivisionContext,
        day: Weekday,
        slot: TimeSlot,
        subject: &str,
        teacher: &str,
    ) -> u64 {
        store
            .create(NewEntry {
                ctx,
                day,
                time_slot: slot,
                subject_id: subject.to_string(),
                teacher_id: teacher.to_string(),
                classroom_id: None,
                created_by: "test".to_string(),
            })
            .unwrap()
    }

    #[test]
    fn break_slot_rejected_before_anything_else() {
        // Empty store: even the entity lookups would fail, but the break
        // rule short-circuits first.
        let store = Store::new();
        let result = validate_candidate(
            &store,
            &ctx(),
            Weekday::Monday,
            TimeSlot::Lunch,
            "s1",
            "t1",
            None,
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("break time slot"));
    }

    #[test]
    fn unknown_teacher_and_subject_short_circuit() {
        let mut store = Store::new();
        let result =
            validate_candidate(&store, &ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1", None);
        assert_eq!(result.errors, vec!["Teacher not found".to_string()]);

        seed_teacher(&mut store, "t1", "A. Rao", 4);
        let result =
            validate_candidate(&store, &ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1", None);
        assert_eq!(result.errors, vec!["Subject not found".to_string()]);
    }

    #[test]
    fn teacher_conflict_spans_divisions() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 10);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 5);
        seed_subject(&mut store, "s2", "Networks", "t1", 5);
        place(&mut store, other_ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");

        let result =
            validate_candidate(&store, &ctx(), Weekday::Monday, TimeSlot::M1, "s2", "t1", None);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("already assigned to Data Structures"));
    }

    #[test]
    fn class_slot_conflict_names_occupant() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 10);
        seed_teacher(&mut store, "t2", "B. Shah", 10);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 5);
        seed_subject(&mut store, "s2", "Networks", "t2", 5);
        place(&mut store, ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");

        let result =
            validate_candidate(&store, &ctx(), Weekday::Monday, TimeSlot::M1, "s2", "t2", None);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("already has Data Structures scheduled"));
    }

    #[test]
    fn capacity_boundary_exact_fill_is_valid_overshoot_is_not() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 1);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 1);

        // First placement lands exactly at full capacity: valid, no warning.
        let result =
            validate_candidate(&store, &ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1", None);
        assert!(result.is_valid, "exact fill must be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());

        place(&mut store, ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");

        // Second placement for the same teacher/subject in the same context
        // would overshoot both caps.
        let result =
            validate_candidate(&store, &ctx(), Weekday::Tuesday, TimeSlot::M2, "s1", "t1", None);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("workload exceeded")));
        assert!(result.errors.iter().any(|e| e.contains("periods exceeded")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn exclude_id_lets_an_entry_revalidate_in_place() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 1);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 1);
        let id = place(&mut store, ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");

        let result = validate_candidate(
            &store,
            &ctx(),
            Weekday::Monday,
            TimeSlot::M1,
            "s1",
            "t1",
            Some(id),
        );
        // Its own slot does not conflict, but capacity still simulates +1 on
        // top of the stored entry.
        assert!(!result.errors.iter().any(|e| e.contains("already")));
    }

    #[test]
    fn existing_entry_at_capacity_is_valid() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 1);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 1);
        place(&mut store, ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");

        let entry = store.entries()[0].clone();
        let result = validate_existing(&store, &entry);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn existing_entry_over_capacity_is_flagged() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 1);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 1);
        // Two placements for a 1-hour teacher: the store allows it (different
        // slots), the validator must flag the over-capacity state.
        place(&mut store, ctx(), Weekday::Monday, TimeSlot::M1, "s1", "t1");
        place(&mut store, ctx(), Weekday::Tuesday, TimeSlot::M1, "s1", "t1");

        let entry = store.entries()[0].clone();
        let result = validate_existing(&store, &entry);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("workload exceeded")));
    }

    #[test]
    fn week_flags_holiday_allocations_and_clears_after_holiday_set() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 10);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 5);
        place(&mut store, ctx(), Weekday::Wednesday, TimeSlot::M1, "s1", "t1");
        place(&mut store, ctx(), Weekday::Wednesday, TimeSlot::M2, "s1", "t1");

        let c = ctx();
        let result = validate_week(&store, &c, &[Weekday::Wednesday]);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("Holiday day Wednesday"));

        // Setting the holiday deletes both entries; the week then validates
        // clean for Wednesday.
        let deleted = store.set_holiday(&c, Weekday::Wednesday);
        assert_eq!(deleted, 2);
        let result = validate_week(&store, &c, &store.holidays_for(&c));
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn week_flags_break_slot_entries() {
        let mut store = Store::new();
        seed_teacher(&mut store, "t1", "A. Rao", 10);
        seed_subject(&mut store, "s1", "Data Structures", "t1", 5);
        // The store does not police break slots; only validation does.
        place(&mut store, ctx(), Weekday::Monday, TimeSlot::Lunch, "s1", "t1");

        let result = validate_week(&store, &ctx(), &[]);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("Break slots must remain empty")));
    }
}
