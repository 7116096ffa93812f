/// Remote table seam
///
/// The dashboard only needs four operations on one namespaced table. Reads
/// never fail: an absent key, a value of the wrong type or an unreachable
/// peer all yield the caller's default. Writes are fire-and-forget.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value stored under a table key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableValue {
    Number(f64),
    String(String),
}

impl TableValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TableValue::Number(v) => Some(*v),
            TableValue::String(_) => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            TableValue::String(s) => Some(s.as_str()),
            TableValue::Number(_) => None,
        }
    }
}

/// Trait for table access - lets the controller run against NetworkTables,
/// an in-memory table, or a recording fake
pub trait RemoteTable {
    fn put_string(&mut self, key: &str, value: &str);
    fn put_number(&mut self, key: &str, value: f64);
    fn get_number(&self, key: &str, default: f64) -> f64;
    fn get_string(&self, key: &str, default: &str) -> String;
}

impl<T: RemoteTable + ?Sized> RemoteTable for Box<T> {
    fn put_string(&mut self, key: &str, value: &str) {
        (**self).put_string(key, value)
    }

    fn put_number(&mut self, key: &str, value: f64) {
        (**self).put_number(key, value)
    }

    fn get_number(&self, key: &str, default: f64) -> f64 {
        (**self).get_number(key, default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        (**self).get_string(key, default)
    }
}

/// In-process table used for `--offline` runs
#[derive(Debug, Default, Clone)]
pub struct MemoryTable {
    name: String,
    values: HashMap<String, TableValue>,
}

impl MemoryTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&TableValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: &str, value: TableValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<TableValue> {
        self.values.remove(key)
    }
}

impl RemoteTable for MemoryTable {
    fn put_string(&mut self, key: &str, value: &str) {
        self.insert(key, TableValue::String(value.to_string()));
    }

    fn put_number(&mut self, key: &str, value: f64) {
        self.insert(key, TableValue::Number(value));
    }

    fn get_number(&self, key: &str, default: f64) -> f64 {
        self.values
            .get(key)
            .and_then(TableValue::as_number)
            .unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .and_then(|v| v.as_string())
            .unwrap_or(default)
            .to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let table = MemoryTable::new("RobotData");
        assert_eq!(table.get_number("speed", 0.0), 0.0);
        assert_eq!(table.get_string("allianceColor", "UNKNOWN"), "UNKNOWN");
    }

    #[test]
    fn test_type_mismatch_returns_default() {
        let mut table = MemoryTable::new("RobotData");
        table.put_string("speed", "fast");
        table.put_number("allianceColor", 1.0);
        assert_eq!(table.get_number("speed", -1.0), -1.0);
        assert_eq!(table.get_string("allianceColor", "UNKNOWN"), "UNKNOWN");
    }

    #[test]
    fn test_put_then_get() {
        let mut table = MemoryTable::new("RobotData");
        table.put_number("motorPower", 0.75);
        table.put_string("selectedAuto", "redLeave");
        assert_eq!(table.get_number("motorPower", 0.0), 0.75);
        assert_eq!(table.get_string("selectedAuto", ""), "redLeave");
        assert_eq!(table.name(), "RobotData");
    }

    #[test]
    fn test_boxed_table_forwards() {
        let mut table: Box<dyn RemoteTable> = Box::new(MemoryTable::new("RobotData"));
        table.put_number("speed", 2.5);
        assert_eq!(table.get_number("speed", 0.0), 2.5);
    }
}
