use wire::EnvVar;

/// Ordered, name-keyed environment list for one DATA episode (`§3`).
///
/// `add` appends unconditionally, matching the archive worker's add-env
/// callback, which the original never deduplicates. `set` is update-or-insert
/// with last-write-wins, the semantics the testable round-trip property in
/// `§8` actually requires of `get`. Lifetime is one ACTIVE-or-HALTED episode;
/// `clear` is called from `data_stop`.
#[derive(Debug, Default, Clone)]
pub struct EnvList {
    entries: Vec<EnvVar>,
}

impl EnvList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(EnvVar::new(name, value));
    }

    /// Update-or-insert. If `name` already appears, its value is replaced in
    /// place (position preserved); otherwise a new entry is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            existing.value = value;
        } else {
            self.entries.push(EnvVar { name, value });
        }
    }

    /// Last matching entry by name, so duplicate `add`s for the same name
    /// resolve the way a trailing `set` would.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    pub fn entries(&self) -> &[EnvVar] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place_preserving_order() {
        let mut env = EnvList::new();
        env.add("HIST", "Y");
        env.add("FILESYSTEM", "/x");
        env.set("HIST", "N");

        let names: Vec<&str> = env.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["HIST", "FILESYSTEM"]);
        assert_eq!(env.get("HIST"), Some("N"));
    }

    #[test]
    fn set_inserts_when_absent() {
        let mut env = EnvList::new();
        env.set("LEVEL", "0");
        assert_eq!(env.get("LEVEL"), Some("0"));
        assert_eq!(env.entries().len(), 1);
    }

    #[test]
    fn clear_empties_the_list() {
        let mut env = EnvList::new();
        env.add("HIST", "Y");
        env.clear();
        assert!(env.entries().is_empty());
        assert_eq!(env.get("HIST"), None);
    }

    #[test]
    fn get_returns_none_for_unknown_name() {
        let env = EnvList::new();
        assert_eq!(env.get("NOPE"), None);
    }
}
