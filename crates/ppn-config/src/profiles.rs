//! Built-in parameter tables.
//!
//! `defaults` holds every recognized key. The other tables only list the
//! keys they change.

use serde_json::{json, Map, Value};

/// Name of the full defaults table.
pub const DEFAULTS: &str = "defaults";

/// Names of all built-in profiles.
pub const BUILTIN_PROFILES: &[&str] = &[
    DEFAULTS,
    "test",
    "esteri",
    "esteri_archive",
    "docker_ravake",
];

fn table(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Every recognized key with its default value.
pub fn defaults() -> Map<String, Value> {
    table(json!({
        "DOMAIN": "fmi",
        "OPTFLOW_METHOD": "lucaskanade",
        "NOWCAST_METHOD": "steps",
        "FFT_METHOD": "pyfftw",
        "GENERATE_DETERMINISTIC": true,
        "GENERATE_ENSEMBLE": true,
        "GENERATE_UNPERTURBED": false,
        "REGENERATE_PERTURBED_MOTION": false,
        "VALUE_DOMAIN": "dbz",
        "ZR_A": 223.0,
        "ZR_B": 1.53,
        "NUM_PREV_OBSERVATIONS": 3,
        "NOWCAST_TIMESTEP": 5,
        "MAX_LEADTIME": 120,
        "NUM_TIMESTEPS": null,
        "ENSEMBLE_SIZE": 25,
        "NUM_CASCADES": 6,
        "NUM_WORKERS": 6,
        "RAIN_THRESHOLD": 0.1,
        "NORAIN_VALUE": 0.0,
        "DBZ_THRESHOLD": -10.0,
        "DBZ_MIN": -10.0,
        "KMPERPIXEL": 1.0,
        "SEED": null,
        "VEL_PERT_METHOD": "bps",
        "VEL_PERT_KWARGS": {
            "p_par": [2.20837526, 0.33887032, -2.48995355],
            "p_perp": [2.21722634, 0.32359621, -2.57402761],
        },
        "FIELD_VALUES": "dbz",
        "OUTPUT_PATH": null,
        "OUTPUT_TIME_FORMAT": "%Y-%m-%d %H:%M:%S",
        "STORE_ENSEMBLE": true,
        "STORE_UNPERTURBED": true,
        "STORE_DETERMINISTIC": true,
        "STORE_MOTION": true,
        "STORE_PERTURBED_MOTION": true,
        "SCALER": 100.0,
        "SCALE_ZERO": "auto",
        "WRITE_LOG": false,
        "LOG_LEVEL": "info",
        "LOG_FOLDER": "../logs",
    }))
}

/// Short nowcast producing every product, runnable with the bundled
/// baseline motion estimator and engine.
fn test() -> Map<String, Value> {
    table(json!({
        "DOMAIN": "fmi_archive",
        "OPTFLOW_METHOD": "global-shift",
        "NOWCAST_METHOD": "advection",
        "NOWCAST_TIMESTEP": 5,
        "MAX_LEADTIME": 30,
        "ENSEMBLE_SIZE": 5,
        "SEED": 0,
        "FIELD_VALUES": "rrate",
        "VALUE_DOMAIN": "rrate",
        "GENERATE_DETERMINISTIC": true,
        "GENERATE_ENSEMBLE": true,
        "GENERATE_UNPERTURBED": true,
        "REGENERATE_PERTURBED_MOTION": true,
        "STORE_DETERMINISTIC": true,
        "STORE_ENSEMBLE": true,
        "STORE_UNPERTURBED": true,
        "STORE_PERTURBED_MOTION": true,
        "STORE_MOTION": true,
        "LOG_LEVEL": "debug",
        "WRITE_LOG": false,
    }))
}

fn esteri() -> Map<String, Value> {
    table(json!({
        "DOMAIN": "fmi_realtime_ravake",
        "NOWCAST_TIMESTEP": 5,
        "MAX_LEADTIME": 90,
        "ENSEMBLE_SIZE": 15,
        "NUM_WORKERS": 30,
        "GENERATE_UNPERTURBED": true,
        "REGENERATE_PERTURBED_MOTION": true,
        "GENERATE_DETERMINISTIC": true,
        "OUTPUT_PATH": "/dev/shm/ppn",
        "STORE_MOTION": true,
        "STORE_ENSEMBLE": true,
        "STORE_DETERMINISTIC": true,
        "SEED": 20190823,
        "FIELD_VALUES": "dbz",
        "VALUE_DOMAIN": "dbz",
        "SCALER": 10.0,
        "WRITE_LOG": true,
        "LOG_LEVEL": "debug",
        "LOG_FOLDER": "/var/tmp/log",
        "DBZ_MIN": -10.0,
        "DBZ_THRESHOLD": -10.0,
        "VEL_PERT_KWARGS": {
            "p_par": [0.0, 0.0, 0.0],
            "p_perp": [0.0, 0.0, 0.0],
        },
    }))
}

fn esteri_archive() -> Map<String, Value> {
    table(json!({
        "DOMAIN": "fmi_archived_ravake",
        "NOWCAST_TIMESTEP": 5,
        "MAX_LEADTIME": 60,
        "ENSEMBLE_SIZE": 15,
        "NUM_WORKERS": 25,
        "GENERATE_DETERMINISTIC": true,
        "OUTPUT_PATH": "/dev/shm/ppn",
        "STORE_MOTION": true,
        "STORE_ENSEMBLE": true,
        "STORE_DETERMINISTIC": true,
        "SEED": 20190823,
        "FIELD_VALUES": "dbz",
        "VALUE_DOMAIN": "dbz",
        "SCALER": 10.0,
        "WRITE_LOG": true,
        "LOG_LEVEL": "debug",
        "LOG_FOLDER": "/var/tmp/log",
        "DBZ_MIN": -6.0,
        "DBZ_THRESHOLD": -6.0,
    }))
}

fn docker_ravake() -> Map<String, Value> {
    table(json!({
        "DOMAIN": "fmi_realtime_ravake_docker",
        "NOWCAST_TIMESTEP": 5,
        "MAX_LEADTIME": 90,
        "ENSEMBLE_SIZE": 15,
        "NUM_WORKERS": 30,
        "GENERATE_UNPERTURBED": true,
        "REGENERATE_PERTURBED_MOTION": true,
        "GENERATE_DETERMINISTIC": true,
        "OUTPUT_PATH": "~/fmippn-run/fmippn-run-and-distribution/output",
        "STORE_MOTION": true,
        "STORE_ENSEMBLE": true,
        "STORE_DETERMINISTIC": true,
        "SEED": 20190823,
        "FIELD_VALUES": "dbz",
        "VALUE_DOMAIN": "dbz",
        "SCALER": 10.0,
        "WRITE_LOG": true,
        "LOG_LEVEL": "debug",
        "LOG_FOLDER": "~/fmippn-run/fmippn-run-and-distribution/logs",
        "DBZ_MIN": -10.0,
        "DBZ_THRESHOLD": -10.0,
        "VEL_PERT_KWARGS": {
            "p_par": [0.0, 0.0, 0.0],
            "p_perp": [0.0, 0.0, 0.0],
        },
    }))
}

/// Override table of a built-in profile. `defaults` has no overrides.
pub fn builtin(name: &str) -> Option<Map<String, Value>> {
    match name {
        DEFAULTS => Some(Map::new()),
        "test" => Some(test()),
        "esteri" => Some(esteri()),
        "esteri_archive" => Some(esteri_archive()),
        "docker_ravake" => Some(docker_ravake()),
        _ => None,
    }
}
