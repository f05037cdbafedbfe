#![allow(dead_code)]

use std::path::PathBuf;

use evalforge::ExerciseOpt;

pub fn setup() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .is_test(true)
        .try_init();
}

/// The directory of one of the exercises used by the tests.
pub fn exercise_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("exercises")
        .join(name)
}

pub fn exercise_opt(name: &str) -> ExerciseOpt {
    let dir = exercise_dir(name);
    ExerciseOpt {
        exercise: dir.join("exercise.yaml"),
        pipelines: dir.join("pipelines"),
    }
}
