/// One recover-selection entry.
///
/// The wire encoding differs between V3 (`ndmp_name_v3`) and V4
/// (`ndmp_name_v4`, which adds `fh_info` validity flags); the core only
/// needs the fields it actually reasons about, so both are folded into one
/// struct with version-specific extras left optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameListEntry {
    /// Path as it exists in the backup image.
    pub original_path: String,
    /// Path to restore it to, if different from `original_path`.
    pub destination_path: Option<String>,
    /// Opaque file-history node/offset cookie echoed back by the worker.
    pub fh_info: Option<u64>,
}
