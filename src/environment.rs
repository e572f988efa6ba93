use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A runtime lexical scope: a name-to-value table plus an optional link to
/// the enclosing scope.  Scopes are shared by reference: the active call
/// stack and every closure created inside a scope keep it alive.
#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in *this* scope.  Redeclaring a name overwrites its slot.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up, walking outward through enclosing scopes.
    pub fn get(&self, name: &str) -> Option<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }

        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().get(name))
    }

    /// Overwrite an *existing* binding, walking outward through enclosing
    /// scopes.  Returns `false` if the name is bound nowhere on the chain.
    pub fn assign(&mut self, name: &str, value: Value<'a>) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// Read `name` from the scope exactly `distance` links outward, per the
    /// resolver's binding-distance table.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
    ) -> Option<Value<'a>> {
        let ancestor = Self::ancestor(env, distance)?;
        let value = ancestor.borrow().values.get(name).cloned();
        value
    }

    /// Overwrite `name` in the scope exactly `distance` links outward.
    /// Returns `false` if that scope has no such binding.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
    ) -> bool {
        match Self::ancestor(env, distance) {
            Some(ancestor) => match ancestor.borrow_mut().values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment<'a>>>> {
        let mut current: Rc<RefCell<Environment<'a>>> = env.clone();

        for _ in 0..distance {
            let enclosing = current.borrow().enclosing.clone();
            current = enclosing?;
        }

        Some(current)
    }
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}
