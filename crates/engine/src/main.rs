use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use classtab_engine::generator::{self, GenerationReport, Mode};
use classtab_engine::model::{DivisionContext, LectureEntry, TimeSlot, Weekday};
use classtab_engine::store::{Dataset, EntryFilter, NewEntry, Store};
use classtab_engine::validator::{self, ValidationResult};
use classtab_engine::workload;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Every request carries the full dataset; the engine is request-scoped and
/// holds no state between invocations.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum Request {
    /// Check a candidate placement without storing it.
    #[serde(rename_all = "camelCase")]
    Validate {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        day: Weekday,
        time_slot: TimeSlot,
        subject_id: String,
        teacher_id: String,
        #[serde(default)]
        exclude_id: Option<u64>,
    },
    /// Validate a candidate placement and store it if legal.
    #[serde(rename_all = "camelCase")]
    Add {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        day: Weekday,
        time_slot: TimeSlot,
        subject_id: String,
        teacher_id: String,
        #[serde(default)]
        classroom_id: Option<String>,
        #[serde(default)]
        created_by: String,
    },
    /// Validate a division's whole week against its holiday configuration.
    #[serde(rename_all = "camelCase")]
    ValidateWeek {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
    },
    /// Auto-generate the division's weekly grid.
    #[serde(rename_all = "camelCase")]
    Generate {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        mode: Mode,
        #[serde(default)]
        created_by: String,
    },
    /// Teacher workload view for one division.
    #[serde(rename_all = "camelCase")]
    Workload {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        teacher_id: String,
    },
    /// Subject period view for one division.
    #[serde(rename_all = "camelCase")]
    Periods {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        subject_id: String,
    },
    /// Mark or unmark a weekday as a holiday for one division. Setting a
    /// holiday deletes that day's entries.
    #[serde(rename_all = "camelCase")]
    SetHoliday {
        dataset: Dataset,
        #[serde(flatten)]
        ctx: DivisionContext,
        day: Weekday,
        action: HolidayAction,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HolidayAction {
    Set,
    Remove,
}

#[derive(Debug, Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrResponse {
    ok: bool,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddResponse {
    validation: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<LectureEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    report: GenerationReport,
    entries: Vec<LectureEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetHolidayResponse {
    deleted: usize,
    holidays: Vec<Weekday>,
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn write_ok<T: Serialize>(data: T) {
    let resp = OkResponse { ok: true, data };
    let json = serde_json::to_string(&resp).unwrap_or_else(|e| {
        format!("{{\"ok\":false,\"error\":\"serialization error: {}\"}}", e)
    });
    println!("{}", json);
    let _ = io::stdout().flush();
}

fn write_err(msg: impl std::fmt::Display) -> ! {
    let resp = ErrResponse {
        ok: false,
        error: msg.to_string(),
    };
    let json = serde_json::to_string(&resp).unwrap_or_else(|_| {
        "{\"ok\":false,\"error\":\"double serialization error\"}".to_string()
    });
    println!("{}", json);
    let _ = io::stdout().flush();
    std::process::exit(1);
}

fn load_store(dataset: Dataset) -> Store {
    match Store::from_dataset(dataset) {
        Ok(store) => store,
        Err(e) => write_err(format!("Invalid dataset: {}", e)),
    }
}

fn division_entries(store: &Store, ctx: &DivisionContext) -> Vec<LectureEntry> {
    store
        .find(&EntryFilter {
            ctx: Some(ctx),
            ..Default::default()
        })
        .into_iter()
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    // Read all of stdin
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        write_err(format!("Failed to read stdin: {}", e));
    }

    // Parse request
    let request: Request = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => write_err(format!("Invalid JSON input: {}", e)),
    };

    match request {
        Request::Validate {
            dataset,
            ctx,
            day,
            time_slot,
            subject_id,
            teacher_id,
            exclude_id,
        } => {
            let store = load_store(dataset);
            let result = validator::validate_candidate(
                &store,
                &ctx,
                day,
                time_slot,
                &subject_id,
                &teacher_id,
                exclude_id,
            );
            write_ok(result);
        }
        Request::Add {
            dataset,
            ctx,
            day,
            time_slot,
            subject_id,
            teacher_id,
            classroom_id,
            created_by,
        } => {
            let mut store = load_store(dataset);
            let validation = validator::validate_candidate(
                &store,
                &ctx,
                day,
                time_slot,
                &subject_id,
                &teacher_id,
                None,
            );
            if !validation.is_valid {
                write_ok(AddResponse {
                    validation,
                    entry: None,
                });
                return;
            }
            // Default the room to the division's record when none was given.
            let classroom_id =
                classroom_id.or_else(|| store.classroom_for(&ctx).map(|c| c.id.clone()));
            let created = store.create(NewEntry {
                ctx,
                day,
                time_slot,
                subject_id,
                teacher_id,
                classroom_id,
                created_by,
            });
            match created {
                Ok(id) => {
                    let entry = store.entries().iter().find(|e| e.id == id).cloned();
                    write_ok(AddResponse { validation, entry });
                }
                Err(e) => write_err(e),
            }
        }
        Request::ValidateWeek { dataset, ctx } => {
            let store = load_store(dataset);
            let holidays = store.holidays_for(&ctx);
            let result = validator::validate_week(&store, &ctx, &holidays);
            write_ok(result);
        }
        Request::Generate {
            dataset,
            ctx,
            mode,
            created_by,
        } => {
            let mut store = load_store(dataset);
            match generator::auto_generate(&mut store, &ctx, mode, &created_by) {
                Ok(report) => {
                    let entries = division_entries(&store, &ctx);
                    write_ok(GenerateResponse { report, entries });
                }
                Err(e) => write_err(e),
            }
        }
        Request::Workload {
            dataset,
            ctx,
            teacher_id,
        } => {
            let store = load_store(dataset);
            match workload::compute_teacher_workload(&store, &teacher_id, &ctx) {
                Ok(w) => write_ok(w),
                Err(e) => write_err(e),
            }
        }
        Request::Periods {
            dataset,
            ctx,
            subject_id,
        } => {
            let store = load_store(dataset);
            match workload::compute_subject_periods(&store, &subject_id, &ctx) {
                Ok(p) => write_ok(p),
                Err(e) => write_err(e),
            }
        }
        Request::SetHoliday {
            dataset,
            ctx,
            day,
            action,
        } => {
            let mut store = load_store(dataset);
            let deleted = match action {
                HolidayAction::Set => store.set_holiday(&ctx, day),
                HolidayAction::Remove => {
                    store.remove_holiday(&ctx, day);
                    0
                }
            };
            write_ok(SetHolidayResponse {
                deleted,
                holidays: store.holidays_for(&ctx),
            });
        }
    }
}
