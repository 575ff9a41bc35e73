//! Deferred index / foreign key splitting.
//!
//! After a loader parses a table's `CREATE TABLE` statement it hands back
//! the list of `ADD INDEX`/`ADD CONSTRAINT`/... statements that still need
//! to run against the now-populated table. Some of those are `FOREIGN KEY`
//! constraints, which cannot be applied until every table they might
//! reference has finished loading, so they are pulled out and accumulated
//! on the owning schema instead of being run per-table.
//!
//! This is a free function over explicit `&mut` arguments rather than a
//! method that reaches through a back-pointer from table to schema, so a
//! table never needs to know how to reach its owning schema on its own.

use crate::model::Schema;

/// Partition `indexes` in place: statements containing a top-level
/// `FOREIGN KEY` token sequence are moved into `schema.fk_queries`; the
/// rest are left in `indexes`, in their original relative order.
///
/// Idempotent: running this again on an already-split `indexes` list (which
/// by construction contains no more `FOREIGN KEY` statements) is a no-op.
pub fn add_deferred_indexes(schema: &mut Schema, indexes: &mut Vec<String>) {
    let mut kept = Vec::with_capacity(indexes.len());
    for statement in indexes.drain(..) {
        if contains_foreign_key(&statement) {
            schema.fk_queries.push(statement);
        } else {
            kept.push(statement);
        }
    }
    *indexes = kept;
}

/// Scan `statement`'s token stream for a `FOREIGN` token immediately
/// followed by a `KEY` token, case-insensitively, skipping over quoted
/// strings, backtick-quoted identifiers, and `--`/`/* */` comments so that
/// an identifier or string literal spelled "foreign key" does not trigger a
/// false split.
fn contains_foreign_key(statement: &str) -> bool {
    let mut tokens = tokenize(statement);
    let mut prev_was_foreign = false;
    for token in tokens.drain(..) {
        if prev_was_foreign && token.eq_ignore_ascii_case("KEY") {
            return true;
        }
        prev_was_foreign = token.eq_ignore_ascii_case("FOREIGN");
    }
    false
}

/// A minimal SQL tokenizer: splits on whitespace and punctuation, treating
/// `'...'`, `"..."`, and `` `...` `` quoted spans and `--`/`#`/`/* */`
/// comments as single opaque tokens so that quoted content is never mistaken
/// for a keyword.
fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' || c == '`' {
            let quote = c;
            let start = i;
            i += 1;
            while i < chars.len() {
                if chars[i] == '\\' && quote != '`' && i + 1 < chars.len() {
                    i += 2;
                    continue;
                }
                if chars[i] == quote {
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        tokens.push(c.to_string());
        i += 1;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_foreign_key_statements_into_schema_fk_queries() {
        let mut schema = Schema::new("s", "s");
        let mut indexes = vec![
            "ADD INDEX i1 (a)".to_string(),
            "ADD CONSTRAINT fk1 FOREIGN KEY (b) REFERENCES u(id)".to_string(),
            "ADD UNIQUE u1 (c)".to_string(),
        ];

        add_deferred_indexes(&mut schema, &mut indexes);

        assert_eq!(indexes, vec!["ADD INDEX i1 (a)", "ADD UNIQUE u1 (c)"]);
        assert_eq!(
            schema.fk_queries,
            vec!["ADD CONSTRAINT fk1 FOREIGN KEY (b) REFERENCES u(id)"]
        );
    }

    #[test]
    fn is_case_insensitive() {
        let mut schema = Schema::new("s", "s");
        let mut indexes = vec!["add constraint fk1 foreign key (b) references u(id)".to_string()];
        add_deferred_indexes(&mut schema, &mut indexes);
        assert!(indexes.is_empty());
        assert_eq!(schema.fk_queries.len(), 1);
    }

    #[test]
    fn does_not_false_positive_on_quoted_column_named_foreign() {
        let mut schema = Schema::new("s", "s");
        let mut indexes = vec!["ADD INDEX `foreign key idx` (a)".to_string()];
        add_deferred_indexes(&mut schema, &mut indexes);
        assert_eq!(indexes.len(), 1);
        assert!(schema.fk_queries.is_empty());
    }

    #[test]
    fn is_idempotent_on_an_already_split_list() {
        let mut schema = Schema::new("s", "s");
        let mut indexes = vec!["ADD INDEX i1 (a)".to_string()];
        add_deferred_indexes(&mut schema, &mut indexes);
        let snapshot = indexes.clone();
        add_deferred_indexes(&mut schema, &mut indexes);
        assert_eq!(indexes, snapshot);
        assert!(schema.fk_queries.is_empty());
    }
}
