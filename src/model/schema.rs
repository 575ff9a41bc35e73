use super::{TableKey, Table, View};

/// A schema's attributes and readiness state.
pub struct Schema {
    pub name: String,
    pub basename: String,

    pub has_sql: bool,
    pub has_data: bool,
    pub sql_seen: bool,
    /// Set once the schema manifest has been parsed (table/view lists known).
    pub md_loaded: bool,
    /// Set once this schema is fully `ready` (own DDL observed if
    /// applicable, every table and view settled). Once set, the scanner's
    /// metadata-descent pass skips this schema's children entirely on every
    /// later rescan instead of re-checking each already-satisfied flag.
    pub md_done: bool,
    /// Set once this schema has been handed out via `next_schema`.
    pub sql_done: bool,

    pub table_keys: Vec<TableKey>,
    pub views: Vec<View>,

    pub trigger_names: Vec<String>,
    pub function_names: Vec<String>,
    pub procedure_names: Vec<String>,
    pub event_names: Vec<String>,

    /// FOREIGN KEY constraints peeled off each table's `indexes` by the
    /// splitter, accumulated here so they can be applied once every table in
    /// the dump has finished loading.
    pub fk_queries: Vec<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>, basename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basename: basename.into(),
            has_sql: true,
            has_data: true,
            sql_seen: false,
            md_loaded: false,
            md_done: false,
            sql_done: false,
            table_keys: Vec::new(),
            views: Vec::new(),
            trigger_names: Vec::new(),
            function_names: Vec::new(),
            procedure_names: Vec::new(),
            event_names: Vec::new(),
            fk_queries: Vec::new(),
        }
    }

    /// `ready ⇔ md_loaded ∧ (¬has_sql ∨ sql_seen) ∧ (∀ t ∈ tables: t.ready) ∧ (∀ v ∈ views: v.ready)`.
    ///
    /// Table readiness is evaluated by the caller (the `EntityModel` owns
    /// the table store, not the `Schema`), so this takes the tables as an
    /// iterator rather than reaching into a parent structure.
    pub fn ready<'a>(&self, tables: impl Iterator<Item = &'a Table>) -> bool {
        if !self.md_loaded || (self.has_sql && !self.sql_seen) {
            return false;
        }
        if self.views.iter().any(|v| !v.ready()) {
            return false;
        }
        tables.into_iter().all(|t| t.ready())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_metadata_loaded() {
        let schema = Schema::new("s", "s");
        assert!(!schema.ready(std::iter::empty()));
    }

    #[test]
    fn ready_requires_sql_seen_when_has_sql() {
        let mut schema = Schema::new("s", "s");
        schema.md_loaded = true;
        assert!(!schema.ready(std::iter::empty()));
        schema.sql_seen = true;
        assert!(schema.ready(std::iter::empty()));
    }

    #[test]
    fn ready_requires_all_views_ready() {
        let mut schema = Schema::new("s", "s");
        schema.md_loaded = true;
        schema.sql_seen = true;
        schema.views.push(View::new("s", "v", "s@v"));
        assert!(!schema.ready(std::iter::empty()));
        schema.views[0].sql_seen = true;
        schema.views[0].sql_pre_seen = true;
        assert!(schema.ready(std::iter::empty()));
    }

    #[test]
    fn ready_requires_all_tables_ready() {
        let mut schema = Schema::new("s", "s");
        schema.md_loaded = true;
        schema.sql_seen = true;
        let mut t = Table::new("s", "t", "s@t");
        t.has_data = false;
        t.has_sql = false;
        assert!(schema.ready(std::iter::once(&t)));
        t.has_sql = true;
        assert!(!schema.ready(std::iter::once(&t)));
    }
}
