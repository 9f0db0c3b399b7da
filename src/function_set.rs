//! Function sets (component B): ordered, deduplicated collections of basis
//! function handles, plus the preset bundles from `spec.md` §6.4.
use std::ops::Add;

use lazy_static::lazy_static;

use crate::basis::{self, BasisFunction};
use crate::error::Error;

/// An ordered, pointer-deduplicated collection of basis function handles.
#[derive(Debug, Clone, Default)]
pub struct FunctionSet(Vec<&'static BasisFunction>);

impl FunctionSet {
    pub fn new() -> Self {
        FunctionSet(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, &'static BasisFunction> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&'static BasisFunction> {
        self.0.get(i).copied()
    }

    /// Appends `f` unless an identical (pointer-equal) handle is already
    /// present. Union-building is idempotent regardless of call order.
    pub fn push_back(&mut self, f: &'static BasisFunction) {
        if !self.0.iter().any(|existing| std::ptr::eq(*existing, f)) {
            self.0.push(f);
        }
    }

    /// Builds a function set from `spec.md` §6.4 names, in the order given.
    /// Duplicate names collapse to a single entry, same as [`push_back`].
    ///
    /// [`push_back`]: Self::push_back
    pub fn from_names(names: &[&str]) -> Result<Self, Error> {
        let mut set = FunctionSet::new();
        for name in names {
            set.push_back(basis::by_name(name)?);
        }
        Ok(set)
    }

    pub fn basic() -> Self {
        BASIC.clone()
    }

    pub fn extended() -> Self {
        EXTENDED.clone()
    }

    pub fn trig() -> Self {
        TRIG.clone()
    }

    pub fn hyp() -> Self {
        HYP.clone()
    }

    pub fn all() -> Self {
        ALL.clone()
    }
}

impl Add for FunctionSet {
    type Output = FunctionSet;

    /// Left-biased union: `self`'s order is kept, then `rhs`'s new entries
    /// are appended in their own order.
    fn add(self, rhs: FunctionSet) -> FunctionSet {
        let mut out = self;
        for f in rhs.0 {
            out.push_back(f);
        }
        out
    }
}

impl<'a> IntoIterator for &'a FunctionSet {
    type Item = &'a &'static BasisFunction;
    type IntoIter = std::slice::Iter<'a, &'static BasisFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

lazy_static! {
    static ref BASIC: FunctionSet = FunctionSet(vec![
        &basis::ZERO,
        &basis::ONE,
        &basis::SUM,
        &basis::DIFF,
        &basis::MUL,
        &basis::DIV,
    ]);
    static ref EXTENDED: FunctionSet = FunctionSet(vec![
        &basis::SQRT,
        &basis::POW,
        &basis::EXP,
        &basis::LOG,
    ]);
    static ref TRIG: FunctionSet = FunctionSet(vec![
        &basis::SIN,
        &basis::COS,
        &basis::TAN,
        &basis::ASIN,
        &basis::ACOS,
        &basis::ATAN,
    ]);
    static ref HYP: FunctionSet = FunctionSet(vec![
        &basis::SINH,
        &basis::COSH,
        &basis::TANH,
    ]);
    static ref ALL: FunctionSet =
        FunctionSet::basic() + FunctionSet::extended() + FunctionSet::trig() + FunctionSet::hyp();
}
