use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::token::Token;
use crate::value::Value;

/// An instance of a class: a back-reference to the class plus its own field
/// table.  Instances are shared by reference; mutation through one handle is
/// visible through all.
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    data: Rc<RefCell<InstanceData<'a>>>,
}

#[derive(Debug)]
struct InstanceData<'a> {
    class: Class<'a>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Class<'a>) -> Self {
        Instance {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    /// Property read: own fields first, then a method from the class bound
    /// to this instance.  `None` means the property is undefined.
    pub fn get(&self, name: &Token<'a>) -> Option<Value<'a>> {
        if let Some(value) = self.data.borrow().fields.get(name.lexeme) {
            return Some(value.clone());
        }

        let class = self.data.borrow().class.clone();

        class
            .find_method(name.lexeme)
            .map(|method| Value::Function(Rc::new(method.bind(self.clone()))))
    }

    /// Property write: always creates or updates an *own* field, never a
    /// method slot on the class.
    pub fn set(&self, name: &Token<'a>, value: Value<'a>) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.lexeme.to_string(), value);
    }

    pub fn ptr_eq(&self, other: &Instance<'a>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl<'a> fmt::Display for Instance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.data.borrow().class)
    }
}
