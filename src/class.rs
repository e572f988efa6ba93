use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::Function;
use crate::token::Token;

/// A class value: its name, an optional superclass link, and the table of
/// methods declared in its own body.
///
/// Method lookup is *not* copied down from the superclass: `find_method`
/// walks the superclass chain at lookup time, own table first.
#[derive(Debug, Clone)]
pub struct Class<'a> {
    data: Rc<ClassData<'a>>,
}

#[derive(Debug)]
struct ClassData<'a> {
    name: &'a Token<'a>,
    superclass: Option<Class<'a>>,
    methods: HashMap<String, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    pub fn new(
        name: &'a Token<'a>,
        superclass: Option<Class<'a>>,
        methods: HashMap<String, Rc<Function<'a>>>,
    ) -> Self {
        Class {
            data: Rc::new(ClassData {
                name,
                superclass,
                methods,
            }),
        }
    }

    pub fn name(&self) -> &'a str {
        self.data.name.lexeme
    }

    /// Resolve `name` against this class: own method table first, then the
    /// superclass chain, terminating at the root.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function<'a>>> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .data
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// A class's call arity is its initializer's arity, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    pub fn ptr_eq(&self, other: &Class<'a>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl<'a> fmt::Display for Class<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
