/// A view's attributes and readiness state.
pub struct View {
    pub schema: String,
    pub name: String,
    pub basename: String,
    pub sql_seen: bool,
    pub sql_pre_seen: bool,
}

impl View {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, basename: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            basename: basename.into(),
            sql_seen: false,
            sql_pre_seen: false,
        }
    }

    /// `ready ⇔ sql_seen ∧ sql_pre_seen`.
    pub fn ready(&self) -> bool {
        self.sql_seen && self.sql_pre_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_requires_both_scripts() {
        let mut v = View::new("s", "v", "s@v");
        assert!(!v.ready());
        v.sql_seen = true;
        assert!(!v.ready());
        v.sql_pre_seen = true;
        assert!(v.ready());
    }
}
