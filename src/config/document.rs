//! Path-aware access to the raw configuration tree
//!
//! Every accessor reports failures against the dotted path of the element
//! it was asked for, so diagnostics read like `dot11_monitors.#2.channels`.

use toml::{Table, Value};

use super::error::{ConfigError, Result};

/// A table in the raw document together with its location
#[derive(Debug, Clone)]
pub struct Node<'a> {
    table: &'a Table,
    path: String,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "a string",
        Value::Integer(_) => "an integer",
        Value::Float(_) => "a float",
        Value::Boolean(_) => "a boolean",
        Value::Datetime(_) => "a datetime",
        Value::Array(_) => "a list",
        Value::Table(_) => "a table",
    }
}

impl<'a> Node<'a> {
    pub fn root(table: &'a Table) -> Self {
        Self {
            table,
            path: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw(&self) -> &'a Table {
        self.table
    }

    /// Dotted path for a key below this node
    pub fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<&'a Value> {
        self.table
            .get(key)
            .ok_or_else(|| ConfigError::missing(self.child_path(key)))
    }

    pub fn table(&self, key: &str) -> Result<Node<'a>> {
        match self.get(key)? {
            Value::Table(t) => Ok(Node {
                table: t,
                path: self.child_path(key),
            }),
            other => Err(ConfigError::wrong_type(self.child_path(key), "a table", type_name(other))),
        }
    }

    pub fn opt_table(&self, key: &str) -> Result<Option<Node<'a>>> {
        if self.has(key) {
            self.table(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn string(&self, key: &str) -> Result<&'a str> {
        match self.get(key)? {
            Value::String(s) => Ok(s.as_str()),
            other => Err(ConfigError::wrong_type(self.child_path(key), "a string", type_name(other))),
        }
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<&'a str>> {
        if self.has(key) {
            self.string(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn boolean(&self, key: &str) -> Result<bool> {
        match self.get(key)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(ConfigError::wrong_type(self.child_path(key), "a boolean", type_name(other))),
        }
    }

    pub fn integer(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            Value::Integer(i) => Ok(*i),
            other => Err(ConfigError::wrong_type(self.child_path(key), "an integer", type_name(other))),
        }
    }

    /// Integer that must be zero or positive
    pub fn unsigned(&self, key: &str) -> Result<u64> {
        let value = self.integer(key)?;
        u64::try_from(value)
            .map_err(|_| ConfigError::invalid(self.child_path(key), format!("must not be negative, got {}", value)))
    }

    pub fn array(&self, key: &str) -> Result<&'a [Value]> {
        match self.get(key)? {
            Value::Array(items) => Ok(items.as_slice()),
            other => Err(ConfigError::wrong_type(self.child_path(key), "a list", type_name(other))),
        }
    }

    pub fn int_list(&self, key: &str) -> Result<Vec<i64>> {
        let path = self.child_path(key);
        self.array(key)?
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Ok(*i),
                other => Err(ConfigError::wrong_type(path.clone(), "a list of integers", type_name(other))),
            })
            .collect()
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        let path = self.child_path(key);
        self.array(key)?
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(ConfigError::wrong_type(path.clone(), "a list of strings", type_name(other))),
            })
            .collect()
    }

    /// List of tables, each located as `key.#i`.
    ///
    /// Non-table elements are returned as errors in place so permissive
    /// callers can skip them individually.
    pub fn tables(&self, key: &str) -> Result<Vec<Result<Node<'a>>>> {
        let base = self.child_path(key);
        let items = self.array(key)?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let path = format!("{}.#{}", base, i);
                match v {
                    Value::Table(t) => Ok(Node { table: t, path }),
                    other => Err(ConfigError::wrong_type(path, "a table", type_name(other))),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ConfigErrorKind;

    fn doc(s: &str) -> Table {
        s.parse::<Table>().unwrap()
    }

    #[test]
    fn test_child_paths() {
        let t = doc("[general.alerting]\nclean_after_minutes = 5\n");
        let root = Node::root(&t);
        let general = root.table("general").unwrap();
        let alerting = general.table("alerting").unwrap();
        assert_eq!(alerting.path(), "general.alerting");
        assert_eq!(alerting.integer("clean_after_minutes").unwrap(), 5);
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let t = doc("a = \"x\"\n");
        let root = Node::root(&t);

        let err = root.integer("b").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Missing);
        assert_eq!(err.path(), Some("b"));

        let err = root.integer("a").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::WrongType);
    }

    #[test]
    fn test_tables_are_indexed() {
        let t = doc("items = [{ a = 1 }, 7]\n");
        let root = Node::root(&t);
        let items = root.tables("items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().path(), "items.#0");
        assert_eq!(items[1].as_ref().unwrap_err().path(), Some("items.#1"));
    }

    #[test]
    fn test_negative_unsigned_is_invalid() {
        let t = doc("n = -3\n");
        let err = Node::root(&t).unsigned("n").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Invalid);
    }
}
