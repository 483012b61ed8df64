#![allow(dead_code)]

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;

/// Scoped subscriber writing through the test harness capture.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_target(true),
        );
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

pub mod temp_files {
    use super::*;

    /// Write `content` to `name` inside `dir` and return the path.
    pub fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }
}

pub mod output {
    use brrtkit::server::Output;
    use serde_json::Value;

    /// Body parsed as JSON.
    pub fn json(out: &Output) -> Value {
        serde_json::from_slice(&out.body).unwrap()
    }

    /// Every value of header `name`, case-insensitive.
    pub fn header_values<'a>(out: &'a Output, name: &str) -> Vec<&'a str> {
        out.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}
