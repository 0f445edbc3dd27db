// crates/contract-gate-core/src/extract/mod.rs
// ============================================================================
// Module: Contract Gate Extraction
// Description: Language adapters and the static adapter dispatch table.
// Purpose: Turn source units into normalized observations.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Extraction is lexical: [`scan`] blanks comments and indexes strings and
//! brackets, then one adapter per language recognizes sites on the scanned
//! text. Adapters are selected through [`adapter_for`], a static table keyed
//! by [`Language`]; [`Adapter`] is a closed enum, so selection never inspects
//! types at runtime.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod access;
pub mod binding;
pub mod control;
pub mod golang;
pub mod java;
pub mod kinds;
pub mod python;
pub mod scan;
pub mod shapes;
pub mod sites;
pub mod typescript;

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::observation::BoundarySide;
use crate::core::observation::EnumObservation;
use crate::core::observation::ErrorHandlingObservation;
use crate::core::observation::ModelObservation;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::TestObservation;
use crate::core::source::Language;
use crate::core::source::SourceUnit;
use crate::extract::golang::GoAdapter;
use crate::extract::java::JavaAdapter;
use crate::extract::python::PythonAdapter;
use crate::extract::scan::ScannedUnit;
use crate::extract::scan::scan_unit;
use crate::extract::sites::Recognizer;
use crate::extract::sites::build_enums;
use crate::extract::sites::build_errors;
use crate::extract::sites::build_models;
use crate::extract::sites::build_requests;
use crate::extract::sites::build_responses;
use crate::extract::sites::build_tests;
use crate::extract::typescript::TypeScriptAdapter;
use crate::interfaces::ExtractionContext;
use crate::interfaces::ExtractionError;
use crate::interfaces::Extractor;

// ============================================================================
// SECTION: Adapters
// ============================================================================

/// Closed set of language adapters.
#[derive(Debug, Clone, Copy)]
pub enum Adapter {
    /// TypeScript and JavaScript.
    TypeScript(TypeScriptAdapter),
    /// Python.
    Python(PythonAdapter),
    /// Go.
    Go(GoAdapter),
    /// Java.
    Java(JavaAdapter),
}

/// Static dispatch table: one adapter per language.
const ADAPTERS: &[(Language, Adapter)] = &[
    (Language::TypeScript, Adapter::TypeScript(TypeScriptAdapter)),
    (Language::Python, Adapter::Python(PythonAdapter)),
    (Language::Go, Adapter::Go(GoAdapter)),
    (Language::Java, Adapter::Java(JavaAdapter)),
];

/// Returns the adapter registered for a language.
#[must_use]
pub fn adapter_for(language: Language) -> Option<Adapter> {
    ADAPTERS.iter().find(|(candidate, _)| *candidate == language).map(|(_, adapter)| *adapter)
}

/// Returns the adapter for a path, resolved through the extension table.
#[must_use]
pub fn adapter_for_path(path: &str) -> Option<Adapter> {
    Language::from_path(path).and_then(adapter_for)
}

impl Adapter {
    /// Returns the recognizer behind the adapter.
    fn recognizer(&self) -> &dyn Recognizer {
        match self {
            Self::TypeScript(adapter) => adapter,
            Self::Python(adapter) => adapter,
            Self::Go(adapter) => adapter,
            Self::Java(adapter) => adapter,
        }
    }
}

impl Extractor for Adapter {
    fn language(&self) -> Language {
        self.recognizer().language()
    }

    fn is_test_unit(&self, path: &str) -> bool {
        self.recognizer().is_test_path(path)
    }

    fn scan(&self, unit: &SourceUnit, max_bytes: usize) -> Result<ScannedUnit, ExtractionError> {
        scan_unit(unit, self.is_test_unit(&unit.path), max_bytes)
    }

    fn infer_side(&self, unit: &ScannedUnit) -> BoundarySide {
        sites::infer_side(self.recognizer(), unit)
    }

    fn extract_requests(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<RequestObservation>, ExtractionError> {
        Ok(build_requests(self.recognizer(), unit, ctx))
    }

    fn extract_response_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ResponseObservation>, ExtractionError> {
        Ok(build_responses(self.recognizer(), unit, ctx))
    }

    fn extract_error_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ErrorHandlingObservation>, ExtractionError> {
        Ok(build_errors(self.recognizer(), unit, ctx))
    }

    fn extract_enum_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<EnumObservation>, ExtractionError> {
        Ok(build_enums(self.recognizer(), unit, ctx))
    }

    fn extract_tests(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<TestObservation>, ExtractionError> {
        Ok(build_tests(self.recognizer(), unit, ctx))
    }

    fn extract_models(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ModelObservation>, ExtractionError> {
        Ok(build_models(self.recognizer(), unit, ctx))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::*;

    #[test]
    fn extension_table_selects_adapters() {
        assert!(matches!(adapter_for_path("web/src/api.tsx"), Some(Adapter::TypeScript(_))));
        assert!(matches!(adapter_for_path("svc/app/main.py"), Some(Adapter::Python(_))));
        assert!(matches!(adapter_for_path("svc/handlers.go"), Some(Adapter::Go(_))));
        assert!(matches!(adapter_for_path("svc/src/main/java/Api.java"), Some(Adapter::Java(_))));
        assert!(adapter_for_path("README.md").is_none());
    }

    #[test]
    fn test_units_follow_language_conventions() {
        let cases = [
            ("web/src/api.test.ts", true),
            ("web/src/__tests__/api.ts", true),
            ("svc/tests/test_orders.py", true),
            ("svc/orders_test.go", true),
            ("svc/src/test/java/OrdersIT.java", true),
            ("svc/orders.go", false),
            ("web/src/api.ts", false),
        ];
        for (path, expected) in cases {
            let adapter = adapter_for_path(path).unwrap();
            assert_eq!(adapter.is_test_unit(path), expected, "{path}");
        }
    }
}
