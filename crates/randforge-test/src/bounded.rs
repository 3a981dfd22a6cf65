//! Single-variable aggregates.

use randforge::prelude::*;

use crate::hierarchy::Env;

/// One byte constrained below `limit`.
#[derive(Debug, Fields)]
pub struct Bounded {
    #[randforge(object)]
    pub object: Object,
    pub value: Uint8,
}

impl Bounded {
    /// Adds a hard `value < limit` constraint named "limit".
    pub fn new(limit: u8) -> Self {
        let mut bounded = Self {
            object: Object::new("bounded", Some(&Env::default())),
            value: Uint8::new(0),
        };
        bounded.limit(move |x| x.ult(limit));
        bounded
    }

    /// Replaces the "limit" constraint.
    pub fn limit(&mut self, f: impl Fn(&Term) -> Term + Send + Sync + 'static) {
        let args = vec![self.value.arg()];
        self.add_constraint("limit", Predicate::unary(f), args);
    }
}

impl Aggregate for Bounded {}

/// A single-precision float bounded to `[-1.1, 1.1]`.
#[derive(Debug, Fields)]
pub struct FloatEnv {
    #[randforge(object)]
    pub object: Object,
    pub x: Fp32,
}

impl FloatEnv {
    pub fn new() -> Self {
        let mut env = Self {
            object: Object::new("float_env", Some(&Env::default())),
            x: Fp32::new(0.0),
        };
        let args = vec![env.x.arg()];
        env.add_constraint(
            "range",
            Predicate::unary(|x| x.within(-1.1f32, 1.1f32)),
            args,
        );
        env
    }
}

impl Default for FloatEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregate for FloatEnv {}
