// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Tests for error constants
//! Every code is referenced once and checked against its range

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use duet_error::{codes, Error, ErrorCategory};

    fn check_range(seen: &mut HashSet<u16>, group: &[u16], low: u16, high: u16, name: &str) {
        for code in group {
            assert!(seen.insert(*code), "Duplicate error code: {}", code);
            assert!(
                *code >= low && *code < high,
                "{} error code {} out of range",
                name,
                code
            );
        }
    }

    #[test]
    fn test_all_error_constants_are_unique() {
        let mut seen_codes = HashSet::new();

        check_range(
            &mut seen_codes,
            &[
                codes::STACK_UNDERFLOW,
                codes::EXECUTION_ERROR,
                codes::TYPE_MISMATCH,
                codes::OUT_OF_BOUNDS_ERROR,
                codes::EXECUTION_INTERRUPTED,
                codes::POISONED_LOCK,
                codes::UNSUPPORTED_OPERATION,
                codes::MALFORMED_BODY,
            ],
            1000,
            2000,
            "Core",
        );

        check_range(
            &mut seen_codes,
            &[
                codes::INVALID_FUNCTION_INDEX,
                codes::UNREGISTERED_FUNCTION,
                codes::DUPLICATE_REGISTRATION,
                codes::ENTRY_POINT_SIGNATURE_MISMATCH,
                codes::EXPORT_NOT_FOUND,
                codes::EXPORT_NOT_A_FUNCTION,
                codes::INVALID_TYPE_INDEX,
            ],
            2000,
            3000,
            "Function",
        );

        check_range(
            &mut seen_codes,
            &[
                codes::RESOURCE_LIMIT_EXCEEDED,
                codes::GLOBAL_NOT_FOUND,
                codes::MEMORY_NOT_FOUND,
                codes::TABLE_NOT_FOUND,
                codes::GLOBAL_IMMUTABLE,
            ],
            3000,
            4000,
            "Resource",
        );

        check_range(
            &mut seen_codes,
            &[
                codes::TRAP_UNREACHABLE,
                codes::TRAP_OUT_OF_BOUNDS_MEMORY,
                codes::TRAP_INTEGER_DIVIDE_BY_ZERO,
                codes::TRAP_INTEGER_OVERFLOW,
                codes::TRAP_INVALID_CONVERSION,
                codes::TRAP_CALL_STACK_EXHAUSTED,
                codes::TRAP_INDIRECT_CALL_TYPE_MISMATCH,
                codes::TRAP_UNINITIALIZED_ELEMENT,
                codes::TRAP_UNDEFINED_ELEMENT,
                codes::TRAP_ARGUMENT_MISMATCH,
                codes::TRAP_RESULT_MISMATCH,
            ],
            4000,
            5000,
            "Trap",
        );

        check_range(
            &mut seen_codes,
            &[
                codes::VALIDATION_ERROR,
                codes::LINK_UNKNOWN_IMPORT,
                codes::LINK_INCOMPATIBLE_IMPORT,
                codes::SEGMENT_OUT_OF_BOUNDS,
                codes::INVALID_CONFIGURATION,
            ],
            5000,
            6000,
            "Validation",
        );
    }

    #[test]
    fn test_every_trap_constructor_uses_trap_category() {
        let traps = [
            Error::trap_unreachable(),
            Error::trap_out_of_bounds_memory(),
            Error::trap_integer_divide_by_zero(),
            Error::trap_integer_overflow(),
            Error::trap_invalid_conversion(),
            Error::trap_call_stack_exhausted(),
            Error::trap_indirect_call_type_mismatch(),
            Error::trap_uninitialized_element(),
            Error::trap_undefined_element(),
            Error::trap_argument_mismatch(),
            Error::trap_result_mismatch(),
        ];

        for trap in traps {
            assert_eq!(trap.category, ErrorCategory::RuntimeTrap);
            assert!(trap.code >= 4000 && trap.code < 5000, "{}", trap);
        }
    }

    #[test]
    fn test_dispatch_errors_are_not_traps() {
        assert!(!Error::unregistered_function().is_trap());
        assert!(!Error::duplicate_registration().is_trap());
        assert_eq!(
            Error::unregistered_function().code,
            codes::UNREGISTERED_FUNCTION
        );
    }
}
