use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generic ordered key-value container used by every snapshot.
pub type StateMap = BTreeMap<String, StateValue>;

/// The storage-neutral value type every game flattens its state into.
///
/// Snapshots built from these pass through any textual medium without the
/// medium knowing the concrete game type. Untagged serde keeps the JSON
/// shape natural (`5`, `"x"`, `true`, `[..]`, `{..}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<StateValue>),
    Map(StateMap),
}

impl StateValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            StateValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Encodes a row/col pair as a nested map, the canonical shape for
    /// positions in snapshots.
    pub fn position(row: usize, col: usize) -> StateValue {
        let mut map = StateMap::new();
        map.insert("row".to_string(), StateValue::Int(row as i64));
        map.insert("col".to_string(), StateValue::Int(col as i64));
        StateValue::Map(map)
    }

    /// Reads a row/col pair back out. Round-tripping through a textual
    /// medium may have turned a native pair into either a two-element
    /// list or a `{row, col}` map; both shapes are accepted.
    pub fn as_position(&self) -> Option<(usize, usize)> {
        match self {
            StateValue::Map(map) => {
                let row = map.get("row")?.as_int()?;
                let col = map.get("col")?.as_int()?;
                Some((usize::try_from(row).ok()?, usize::try_from(col).ok()?))
            }
            StateValue::List(items) if items.len() == 2 => {
                let row = items[0].as_int()?;
                let col = items[1].as_int()?;
                Some((usize::try_from(row).ok()?, usize::try_from(col).ok()?))
            }
            _ => None,
        }
    }

    /// Flattens a 2D grid into a sequence of sequences.
    pub fn grid<T, F>(rows: &[Vec<T>], f: F) -> StateValue
    where
        F: Fn(&T) -> StateValue,
    {
        StateValue::List(
            rows.iter()
                .map(|row| StateValue::List(row.iter().map(&f).collect()))
                .collect(),
        )
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<u32> for StateValue {
    fn from(value: u32) -> Self {
        StateValue::Int(value as i64)
    }
}

impl From<usize> for StateValue {
    fn from(value: usize) -> Self {
        StateValue::Int(value as i64)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Str(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Str(value)
    }
}

/// Typed readers for the required-key lookups every `restore_state`
/// performs. Missing or mistyped keys surface as `None`; callers map
/// that to their own error.
pub trait StateMapExt {
    fn int(&self, key: &str) -> Option<i64>;
    fn boolean(&self, key: &str) -> Option<bool>;
    fn str(&self, key: &str) -> Option<&str>;
    fn list(&self, key: &str) -> Option<&[StateValue]>;
    fn pos(&self, key: &str) -> Option<(usize, usize)>;
}

impl StateMapExt for StateMap {
    fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(StateValue::as_int)
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(StateValue::as_bool)
    }

    fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(StateValue::as_str)
    }

    fn list(&self, key: &str) -> Option<&[StateValue]> {
        self.get(key).and_then(StateValue::as_list)
    }

    fn pos(&self, key: &str) -> Option<(usize, usize)> {
        self.get(key).and_then(StateValue::as_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_accepts_both_shapes() {
        let as_map = StateValue::position(3, 4);
        assert_eq!(as_map.as_position(), Some((3, 4)));

        let as_list = StateValue::List(vec![StateValue::Int(3), StateValue::Int(4)]);
        assert_eq!(as_list.as_position(), Some((3, 4)));

        assert_eq!(StateValue::Int(3).as_position(), None);
    }

    #[test]
    fn test_json_round_trip_preserves_shape() {
        let mut map = StateMap::new();
        map.insert("moves".to_string(), StateValue::Int(7));
        map.insert("won".to_string(), StateValue::Bool(false));
        map.insert("player".to_string(), StateValue::position(1, 2));
        map.insert(
            "grid".to_string(),
            StateValue::grid(&[vec![true, false], vec![false, true]], |b| {
                StateValue::Bool(*b)
            }),
        );

        let json = serde_json::to_string(&map).unwrap();
        let back: StateMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.pos("player"), Some((1, 2)));
    }

    #[test]
    fn test_typed_readers_reject_mistyped_keys() {
        let mut map = StateMap::new();
        map.insert("moves".to_string(), StateValue::Str("7".to_string()));
        assert_eq!(map.int("moves"), None);
        assert_eq!(map.int("absent"), None);
        assert_eq!(map.str("moves"), Some("7"));
    }
}
