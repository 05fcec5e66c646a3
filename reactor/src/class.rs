/// Which subsystem owns a handler, and which subsystem a `select` call
/// wants to service (`§4.1`).
///
/// `All` is only ever used as a `select` filter (the dispatcher's "interleave
/// everything" call); registering a handler with class `All` would make it
/// fire under every filter, which no caller in this design needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerClass {
    Connection,
    Mover,
    Module,
    All,
}

impl HandlerClass {
    /// Whether a handler registered as `self` should be considered when a
    /// `select` call asks for `filter`.
    pub const fn matches(self, filter: Self) -> bool {
        matches!(filter, Self::All) || matches!(self, Self::All) || same(self, filter)
    }
}

const fn same(a: HandlerClass, b: HandlerClass) -> bool {
    matches!(
        (a, b),
        (HandlerClass::Connection, HandlerClass::Connection)
            | (HandlerClass::Mover, HandlerClass::Mover)
            | (HandlerClass::Module, HandlerClass::Module)
            | (HandlerClass::All, HandlerClass::All)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_filter_matches_every_class() {
        assert!(HandlerClass::Connection.matches(HandlerClass::All));
        assert!(HandlerClass::Mover.matches(HandlerClass::All));
        assert!(HandlerClass::Module.matches(HandlerClass::All));
    }

    #[test]
    fn module_filter_does_not_match_connection() {
        assert!(!HandlerClass::Connection.matches(HandlerClass::Module));
    }

    #[test]
    fn exact_class_matches_itself() {
        assert!(HandlerClass::Mover.matches(HandlerClass::Mover));
    }
}
