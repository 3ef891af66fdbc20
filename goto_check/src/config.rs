// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use goto_program::InternedString;

/// The language a function was written in, read from its symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LanguageMode {
    C,
    Cpp,
    Java,
}

impl LanguageMode {
    /// Map the `mode` string of a symbol to a language. Unknown frontends are
    /// treated as C.
    pub fn from_symbol_mode(mode: InternedString) -> LanguageMode {
        if mode == "java" {
            LanguageMode::Java
        } else if mode == "C++" || mode == "cpp" {
            LanguageMode::Cpp
        } else {
            LanguageMode::C
        }
    }
}

/// The C or C++ standard in force.
///
/// The only rule that depends on it is the width of the top-bits window in
/// the signed left-shift overflow check: shifting a 1 into the sign bit is
/// implementation-defined in C89 and C++98 but explicitly undefined from C99
/// and C++11 on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LanguageStandard {
    C89,
    C99,
    C11,
    Cpp98,
    Cpp11,
    Cpp14,
}

impl LanguageStandard {
    pub fn allows_shift_into_sign_bit(&self, mode: LanguageMode) -> bool {
        match mode {
            LanguageMode::C => !matches!(self, LanguageStandard::C99 | LanguageStandard::C11),
            LanguageMode::Cpp => {
                !matches!(self, LanguageStandard::Cpp11 | LanguageStandard::Cpp14)
            }
            LanguageMode::Java => true,
        }
    }
}

/// One name per check family, used for pragma parsing and for attributing
/// property classes to the flag that owns them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckName {
    Bounds,
    Pointer,
    MemoryLeak,
    DivByZero,
    SignedOverflow,
    UnsignedOverflow,
    PointerOverflow,
    Conversion,
    UndefinedShift,
    FloatOverflow,
    Nan,
}

impl CheckName {
    pub fn flag_name(&self) -> &'static str {
        match self {
            CheckName::Bounds => "bounds-check",
            CheckName::Pointer => "pointer-check",
            CheckName::MemoryLeak => "memory-leak-check",
            CheckName::DivByZero => "div-by-zero-check",
            CheckName::SignedOverflow => "signed-overflow-check",
            CheckName::UnsignedOverflow => "unsigned-overflow-check",
            CheckName::PointerOverflow => "pointer-overflow-check",
            CheckName::Conversion => "conversion-check",
            CheckName::UndefinedShift => "undefined-shift-check",
            CheckName::FloatOverflow => "float-overflow-check",
            CheckName::Nan => "nan-check",
        }
    }

    /// Parse a `disable:<flag-name>` pragma.
    pub fn from_disable_pragma(pragma: InternedString) -> Option<CheckName> {
        let all = [
            CheckName::Bounds,
            CheckName::Pointer,
            CheckName::MemoryLeak,
            CheckName::DivByZero,
            CheckName::SignedOverflow,
            CheckName::UnsignedOverflow,
            CheckName::PointerOverflow,
            CheckName::Conversion,
            CheckName::UndefinedShift,
            CheckName::FloatOverflow,
            CheckName::Nan,
        ];
        let name = pragma.strip_prefix("disable:")?;
        all.into_iter().find(|c| name == c.flag_name())
    }
}

/// The Boolean toggles of the pass. `Copy`, so the per-instruction pragma
/// overrides can save and restore the whole set.
#[derive(Copy, Clone, Debug)]
pub struct CheckFlags {
    pub bounds_check: bool,
    pub pointer_check: bool,
    pub memory_leak_check: bool,
    pub div_by_zero_check: bool,
    pub signed_overflow_check: bool,
    pub unsigned_overflow_check: bool,
    pub pointer_overflow_check: bool,
    pub conversion_check: bool,
    pub undefined_shift_check: bool,
    pub float_overflow_check: bool,
    pub nan_check: bool,
    pub simplify: bool,
    pub retain_trivial: bool,
    pub assert_to_assume: bool,
    pub assertions: bool,
    pub built_in_assertions: bool,
    pub assumptions: bool,
}

impl Default for CheckFlags {
    fn default() -> Self {
        CheckFlags {
            bounds_check: false,
            pointer_check: false,
            memory_leak_check: false,
            div_by_zero_check: false,
            signed_overflow_check: false,
            unsigned_overflow_check: false,
            pointer_overflow_check: false,
            conversion_check: false,
            undefined_shift_check: false,
            float_overflow_check: false,
            nan_check: false,
            simplify: true,
            retain_trivial: false,
            assert_to_assume: false,
            assertions: true,
            built_in_assertions: true,
            assumptions: true,
        }
    }
}

impl CheckFlags {
    /// All check families enabled; the pass-behavior toggles keep their
    /// defaults.
    pub fn all_checks() -> Self {
        CheckFlags {
            bounds_check: true,
            pointer_check: true,
            memory_leak_check: true,
            div_by_zero_check: true,
            signed_overflow_check: true,
            unsigned_overflow_check: true,
            pointer_overflow_check: true,
            conversion_check: true,
            undefined_shift_check: true,
            float_overflow_check: true,
            nan_check: true,
            ..Default::default()
        }
    }

    pub fn disable(&mut self, check: CheckName) {
        match check {
            CheckName::Bounds => self.bounds_check = false,
            CheckName::Pointer => self.pointer_check = false,
            CheckName::MemoryLeak => self.memory_leak_check = false,
            CheckName::DivByZero => self.div_by_zero_check = false,
            CheckName::SignedOverflow => self.signed_overflow_check = false,
            CheckName::UnsignedOverflow => self.unsigned_overflow_check = false,
            CheckName::PointerOverflow => self.pointer_overflow_check = false,
            CheckName::Conversion => self.conversion_check = false,
            CheckName::UndefinedShift => self.undefined_shift_check = false,
            CheckName::FloatOverflow => self.float_overflow_check = false,
            CheckName::Nan => self.nan_check = false,
        }
    }
}

/// The full configuration of a pass instance.
#[derive(Clone, Debug)]
pub struct Config {
    pub flags: CheckFlags,
    /// Labels whose presence on an instruction is itself an error.
    pub error_labels: Vec<InternedString>,
    pub language_standard: LanguageStandard,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            flags: CheckFlags::default(),
            error_labels: Vec::new(),
            language_standard: LanguageStandard::C11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckName, LanguageMode, LanguageStandard};

    #[test]
    fn pragma_parsing() {
        assert_eq!(
            CheckName::from_disable_pragma("disable:bounds-check".into()),
            Some(CheckName::Bounds)
        );
        assert_eq!(
            CheckName::from_disable_pragma("disable:nan-check".into()),
            Some(CheckName::Nan)
        );
        assert_eq!(CheckName::from_disable_pragma("bounds-check".into()), None);
        assert_eq!(CheckName::from_disable_pragma("disable:everything".into()), None);
    }

    #[test]
    fn shift_into_sign_bit_by_standard() {
        assert!(LanguageStandard::C89.allows_shift_into_sign_bit(LanguageMode::C));
        assert!(!LanguageStandard::C11.allows_shift_into_sign_bit(LanguageMode::C));
        assert!(!LanguageStandard::Cpp11.allows_shift_into_sign_bit(LanguageMode::Cpp));
        assert!(LanguageStandard::Cpp98.allows_shift_into_sign_bit(LanguageMode::Cpp));
    }
}
