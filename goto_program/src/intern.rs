// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A global string interner for identifiers, labels and diagnostics.
//!
//! Goto programs contain a large number of strings which refer to names:
//! symbols, files, property classes, etc. These tend to be reused many times,
//! so each unique string is allocated once and referred to by index. This
//! makes `InternedString` `Copy`, which simplifies APIs. The downside is that
//! interned strings live for the lifetime of the execution, so only strings
//! that end up in long-lived data structures should be interned.

use lazy_static::lazy_static;
use std::sync::Mutex;
use string_interner::StringInterner;
use string_interner::backend::StringBackend;

#[derive(Clone, Hash, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InternedString(string_interner::symbol::SymbolU32);

lazy_static! {
    static ref INTERNER: Mutex<StringInterner<StringBackend>> =
        Mutex::new(StringInterner::default());
}

impl InternedString {
    pub fn is_empty(&self) -> bool {
        self.map(|s| s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.map(|s| s.len())
    }

    /// Apply the function `f` to the interned string, represented as an &str.
    /// Exporting the &str backing the `InternedString` is blocked by lifetime
    /// rules; this allows users to operate on the &str when needed.
    pub fn map<T, F: FnOnce(&str) -> T>(&self, f: F) -> T {
        f(INTERNER.lock().unwrap().resolve(self.0).unwrap())
    }

    pub fn starts_with(&self, pattern: &str) -> bool {
        self.map(|s| s.starts_with(pattern))
    }

    pub fn strip_prefix(&self, pattern: &str) -> Option<InternedString> {
        // resolve to an owned string first: interning inside `map` would
        // re-enter the interner lock
        let stripped = self.map(|s| s.strip_prefix(pattern).map(str::to_string));
        stripped.map(InternedString::from)
    }
}

impl std::fmt::Display for InternedString {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(fmt, "{}", INTERNER.lock().unwrap().resolve(self.0).unwrap())
    }
}

/// Custom-implement Debug, so debug logging contains meaningful strings, not numbers.
impl std::fmt::Debug for InternedString {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(fmt, "{:?}", INTERNER.lock().unwrap().resolve(self.0).unwrap())
    }
}

impl<T> From<T> for InternedString
where
    T: AsRef<str>,
{
    fn from(s: T) -> InternedString {
        InternedString(INTERNER.lock().unwrap().get_or_intern(s))
    }
}

impl<T> PartialEq<T> for InternedString
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        INTERNER.lock().unwrap().resolve(self.0).unwrap() == other.as_ref()
    }
}

pub trait InternString {
    fn intern(self) -> InternedString;
}

impl<T> InternString for T
where
    T: Into<InternedString>,
{
    fn intern(self) -> InternedString {
        self.into()
    }
}

pub trait InternStringOption {
    fn intern(self) -> Option<InternedString>;
}

impl<T> InternStringOption for Option<T>
where
    T: Into<InternedString>,
{
    fn intern(self) -> Option<InternedString> {
        self.map(|s| s.into())
    }
}
