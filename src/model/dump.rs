use std::collections::HashMap;

/// Whether the dump producer has finished writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStatus {
    Dumping,
    Complete,
}

impl Default for DumpStatus {
    fn default() -> Self {
        DumpStatus::Dumping
    }
}

/// Root entity attributes.
#[derive(Default)]
pub struct Dump {
    pub dump_version: Option<String>,
    pub server_version: Option<String>,
    pub default_charset: Option<String>,
    pub gtid_executed: Option<String>,
    pub tz_utc: bool,
    pub mds_compatibility: bool,

    pub status: DumpStatus,

    pub preamble: Option<String>,
    pub postamble: Option<String>,
    pub users_script: Option<String>,

    /// Authoritative total data size, populated from the terminator once
    /// `status == Complete`.
    pub data_size: Option<u64>,
    /// Authoritative per-(schema, table) sizes, populated from the
    /// terminator once `status == Complete`.
    pub table_data_size: HashMap<String, HashMap<String, u64>>,

    /// Running total of chunk bytes observed so far while still `Dumping`.
    pub dump_size: u64,
}

impl Dump {
    /// The whole-text preamble script (`@.sql`), once observed. Empty until
    /// then.
    pub fn begin_script(&self) -> &str {
        self.preamble.as_deref().unwrap_or("")
    }

    /// The whole-text postamble script (`@.post.sql`), once observed. Empty
    /// until then.
    pub fn end_script(&self) -> &str {
        self.postamble.as_deref().unwrap_or("")
    }

    /// The whole-text users script (`@.users.sql`), once observed. Empty
    /// until then.
    pub fn users_script(&self) -> &str {
        self.users_script.as_deref().unwrap_or("")
    }

    /// Total data size so far, *unfiltered*: the authoritative terminator
    /// value once `Complete`, else the running count of observed chunk
    /// bytes. This counts every entity the dumper wrote, including any the
    /// caller's `Filter` excluded from this model - callers that need the
    /// filtered figure want [`EntityModel::filtered_data_size`] instead,
    /// which uses this as its `DUMPING`-phase fallback.
    pub fn total_data_size(&self) -> u64 {
        match self.status {
            DumpStatus::Complete => self.data_size.unwrap_or(self.dump_size),
            DumpStatus::Dumping => self.dump_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_data_size_falls_back_to_running_total_while_dumping() {
        let mut dump = Dump::default();
        dump.dump_size = 42;
        assert_eq!(dump.total_data_size(), 42);
    }

    #[test]
    fn total_data_size_prefers_terminator_once_complete() {
        let mut dump = Dump::default();
        dump.dump_size = 42;
        dump.status = DumpStatus::Complete;
        dump.data_size = Some(100);
        assert_eq!(dump.total_data_size(), 100);
    }
}
