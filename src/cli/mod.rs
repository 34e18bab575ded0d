//! Thin command-line facade (§4.13): wires a pid and a minimally-parsed
//! value literal to one [`ScannerSession`] pass, prints the result, and
//! exits. Not the interactive REPL described as out of scope — this binary
//! runs exactly one scan per invocation.

pub mod args;
pub mod literal;
