/// A single NDMP environment variable.
///
/// Names and values are ASCII on the wire; the core treats both as opaque
/// strings and does not validate recognized names (`HIST`, `FILESYSTEM`,
/// `LEVEL`, `DIRECT`, `UPDATE`, ...) — that's the archive worker's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
