//! Hand-written aggregates for unit tests (the derive macros live in a
//! downstream crate).

use crate::copy::CopyContext;
use crate::field::{Field, Fields, VarSink};
use crate::object::{Aggregate, AsObject, Named, Object, Shared};
use crate::var::{Format, Var};

/// Two bytes and a label.
#[derive(Debug)]
pub struct Pair {
    pub object: Object,
    pub a: Var<u8>,
    pub b: Var<u8>,
    pub tag: String,
    pub hooks: Vec<&'static str>,
}

pub struct Top;

impl Named for Top {
    fn name(&self) -> &str {
        "top"
    }

    fn full_name(&self) -> String {
        "top".to_string()
    }
}

impl Pair {
    pub fn new(a: u8, b: u8) -> Self {
        Self {
            object: Object::new("pair", Some(&Top)),
            a: Var::new(a),
            b: Var::new(b),
            tag: "p".to_string(),
            hooks: Vec::new(),
        }
    }
}

impl Field for Pair {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        self.a.visit_vars(sink);
        self.b.visit_vars(sink);
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        self.object.visit_objects(f);
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        Self {
            object: self.object.copy_field(cx),
            a: self.a.copy_field(cx),
            b: self.b.copy_field(cx),
            tag: self.tag.copy_field(cx),
            hooks: Vec::new(),
        }
    }

    fn render(&self, _format: Option<Format>) -> String {
        format!("<{}>", self.object.full_name())
    }

    fn same_value(&self, other: &Self) -> bool {
        self.differing_fields(other).is_empty()
    }
}

impl Fields for Pair {
    fn field_names(&self) -> &'static [&'static str] {
        &["a", "b", "tag"]
    }

    fn describe(&self, format_of: &dyn Fn(&str) -> Option<Format>) -> Vec<(&'static str, String)> {
        vec![
            ("a", Field::render(&self.a, format_of("a"))),
            ("b", Field::render(&self.b, format_of("b"))),
            ("tag", Field::render(&self.tag, format_of("tag"))),
        ]
    }

    fn differing_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.a.same_value(&other.a) {
            out.push("a");
        }
        if !self.b.same_value(&other.b) {
            out.push("b");
        }
        if !self.tag.same_value(&other.tag) {
            out.push("tag");
        }
        out
    }
}

impl AsObject for Pair {
    fn object(&self) -> &Object {
        &self.object
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.object
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

/// A byte next to an embedded pair and a shared one.
#[derive(Debug)]
pub struct Outer {
    pub object: Object,
    pub x: Var<u8>,
    pub inner: Pair,
    pub shared: Shared<Pair>,
}

impl Outer {
    pub fn new(shared: Shared<Pair>) -> Self {
        let object = Object::new("outer", Some(&Top));
        let mut inner = Pair::new(0, 0);
        inner.object.set_parent(Some(&object));
        Self {
            object,
            x: Var::new(0),
            inner,
            shared,
        }
    }
}

impl Field for Outer {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        self.x.visit_vars(sink);
        self.inner.visit_vars(sink);
        self.shared.visit_vars(sink);
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        self.object.visit_objects(f);
        self.inner.visit_objects(f);
        self.shared.visit_objects(f);
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        Self {
            object: self.object.copy_field(cx),
            x: self.x.copy_field(cx),
            inner: self.inner.copy_field(cx),
            shared: self.shared.copy_field(cx),
        }
    }

    fn render(&self, _format: Option<Format>) -> String {
        format!("<{}>", self.object.full_name())
    }

    fn same_value(&self, other: &Self) -> bool {
        self.differing_fields(other).is_empty()
    }
}

impl Fields for Outer {
    fn field_names(&self) -> &'static [&'static str] {
        &["x", "inner", "shared"]
    }

    fn describe(&self, format_of: &dyn Fn(&str) -> Option<Format>) -> Vec<(&'static str, String)> {
        vec![
            ("x", Field::render(&self.x, format_of("x"))),
            ("inner", Field::render(&self.inner, format_of("inner"))),
            ("shared", Field::render(&self.shared, format_of("shared"))),
        ]
    }

    fn differing_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.x.same_value(&other.x) {
            out.push("x");
        }
        if !self.inner.same_value(&other.inner) {
            out.push("inner");
        }
        if !self.shared.same_value(&other.shared) {
            out.push("shared");
        }
        out
    }
}

impl AsObject for Outer {
    fn object(&self) -> &Object {
        &self.object
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }
}

impl Aggregate for Outer {}
