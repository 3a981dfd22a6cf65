//! Two bytes with an ordering constraint and lifecycle hooks.

use randforge::prelude::*;

use crate::hierarchy::Env;

/// `a < b`, both unsigned bytes.
#[derive(Debug, Fields)]
pub struct Pair {
    #[randforge(object)]
    pub object: Object,
    #[randforge(format = "hex")]
    pub a: Uint8,
    pub b: Uint8,
    pub label: String,
    /// Hook calls in order.
    #[randforge(skip)]
    pub hooks: Vec<&'static str>,
}

impl Pair {
    pub fn new() -> Self {
        let mut pair = Self {
            object: Object::new("pair", Some(&Env::default())),
            a: Uint8::new(0),
            b: Uint8::new(0),
            label: "pair".to_string(),
            hooks: Vec::new(),
        };
        let args = vec![pair.a.arg(), pair.b.arg()];
        pair.add_constraint("order", Predicate::binary(|a, b| a.ult(b)), args);
        pair
    }
}

impl Default for Pair {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregate for Pair {
    fn pre_randomize(&mut self) {
        self.hooks.push("pre");
    }

    fn post_randomize(&mut self) {
        self.hooks.push("post");
    }
}
