//! Variable bindings produced by matching and consumed by construction.

use crate::value::Value;
use im::HashMap;

/// Named values extracted by a match.
///
/// Backed by a persistent map: cloning a set of bindings to try an
/// alternative is O(1), and the clone is simply dropped if the alternative
/// fails.
///
/// # Examples
///
/// ```rust
/// use arbor::pattern::Bindings;
/// use arbor::value::Value;
/// let mut b = Bindings::new();
/// assert!(b.bind("x", Value::Int(1)));
/// assert!(b.bind("x", Value::Int(1)));
/// assert!(!b.bind("x", Value::Int(2)));
/// assert_eq!(b.get("x"), Some(&Value::Int(1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    vars: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Unifies `name` with `value`.
    ///
    /// Binds on first occurrence; afterwards returns `false` unless `value`
    /// is structurally equal to the bound one.
    pub fn bind(&mut self, name: &str, value: Value) -> bool {
        match self.vars.get(name) {
            Some(existing) => *existing == value,
            None => {
                self.vars.insert(name.to_string(), value);
                true
            }
        }
    }

    /// Overwrites `name` unconditionally.
    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.vars.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Rewrites every bound value with `f` in name order, stopping at the first error.
    pub fn try_map<E>(self, mut f: impl FnMut(&str, Value) -> Result<Value, E>) -> Result<Self, E> {
        let mut entries: Vec<(String, Value)> = self.vars.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut vars = HashMap::new();
        for (name, value) in entries {
            let value = f(&name, value)?;
            vars.insert(name, value);
        }
        Ok(Self { vars })
    }
}

impl FromIterator<(String, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
