use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::picker::SpinSettings;
use crate::sync::DEFAULT_SEED_CLASSES;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Dashboard,
    Picker,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(Self::Dashboard),
            "picker" => Some(Self::Picker),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Dashboard => "setup.dashboard",
            Self::Picker => "setup.picker",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Dashboard => json!({
            "defaultAssignmentPoints": 100,
            "defaultExamMaxScore": 100,
            "seedClasses": DEFAULT_SEED_CLASSES
        }),
        SetupSection::Picker => json!({
            "defaultSampleSize": 1,
            "minSpins": 5,
            "maxSpins": 10
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_name_list(v: &Value, key: &str, max_items: usize) -> Result<Vec<String>, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array of strings", key))?;
    if arr.is_empty() || arr.len() > max_items {
        return Err(format!("{} must have 1..={} entries", key, max_items));
    }
    arr.iter()
        .map(|item| {
            let s = item
                .as_str()
                .map(str::trim)
                .ok_or_else(|| format!("{} must be an array of strings", key))?;
            if s.is_empty() {
                return Err(format!("{} entries must not be empty", key));
            }
            Ok(s.to_string())
        })
        .collect()
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Dashboard => match k.as_str() {
                "defaultAssignmentPoints" | "defaultExamMaxScore" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 10_000)?));
                }
                "seedClasses" => {
                    obj.insert(k.clone(), json!(parse_name_list(v, k, 20)?));
                }
                _ => return Err(format!("unknown dashboard field: {}", k)),
            },
            SetupSection::Picker => match k.as_str() {
                "defaultSampleSize" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 100)?));
                }
                "minSpins" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 50)?));
                }
                "maxSpins" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 2, 100)?));
                }
                _ => return Err(format!("unknown picker field: {}", k)),
            },
        }
    }

    // Cross-field rules hold on the merged result, not just the patch.
    if let SetupSection::Picker = section {
        let min = obj.get("minSpins").and_then(|v| v.as_i64()).unwrap_or(0);
        let max = obj.get("maxSpins").and_then(|v| v.as_i64()).unwrap_or(0);
        if max <= min {
            return Err("maxSpins must be greater than minSpins".into());
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed saved section falls back to defaults.
            let mut merged = current.clone();
            match merge_section_patch(section, &mut merged, saved_obj) {
                Ok(()) => current = merged,
                Err(msg) => {
                    tracing::warn!(section = section.key(), %msg, "ignoring saved setup section")
                }
            }
        }
    }
    Ok(current)
}

fn field_i64(section: &Value, key: &str) -> i64 {
    section.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

/// Defaults used when a create request leaves the scale out.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDefaults {
    pub assignment_points: f64,
    pub exam_max_score: f64,
    pub seed_classes: Vec<String>,
}

pub fn dashboard_defaults(conn: &rusqlite::Connection) -> anyhow::Result<DashboardDefaults> {
    let section = load_section(conn, SetupSection::Dashboard)?;
    let seed_classes = section
        .get("seedClasses")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();
    Ok(DashboardDefaults {
        assignment_points: field_i64(&section, "defaultAssignmentPoints") as f64,
        exam_max_score: field_i64(&section, "defaultExamMaxScore") as f64,
        seed_classes,
    })
}

pub fn seed_classes(conn: &rusqlite::Connection) -> anyhow::Result<Vec<String>> {
    Ok(dashboard_defaults(conn)?.seed_classes)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickerDefaults {
    pub sample_size: usize,
    pub spin: SpinSettings,
}

pub fn picker_defaults(conn: &rusqlite::Connection) -> anyhow::Result<PickerDefaults> {
    let section = load_section(conn, SetupSection::Picker)?;
    Ok(PickerDefaults {
        sample_size: field_i64(&section, "defaultSampleSize").max(1) as usize,
        spin: SpinSettings {
            min_spins: field_i64(&section, "minSpins").max(1) as u32,
            max_spins: field_i64(&section, "maxSpins").max(2) as u32,
        },
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let dashboard = match load_section(conn, SetupSection::Dashboard) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let picker = match load_section(conn, SetupSection::Picker) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "dashboard": dashboard,
            "picker": picker
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    // New seed names apply to the next account that loads with no classes.
    if let SetupSection::Dashboard = section {
        let seeds = match seed_classes(conn) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if let Some(gate) = state.gate.as_mut() {
            gate.set_seed_classes(seeds);
        }
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
