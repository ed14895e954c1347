//! Policy & guardrail gate.

pub mod gate;
pub mod guardrails;

pub use self::gate::PolicyGate;
pub use self::guardrails::{GuardrailPattern, GuardrailReport, Guardrails, Severity, Violation};
