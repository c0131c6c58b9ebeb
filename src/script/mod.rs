//! Heap trace scripts
//!
//! A trace script plays the part of a guest program: each line is one call
//! into the allocator, or a host-side poke at guest memory.
//!
//! ```text
//! # comment
//! p = malloc 10        # bind the returned address to `p`
//! write p 1 2 3 4      # store bytes at p
//! q = realloc p 32
//! link p q             # declare q as the continuation of p
//! free q
//! free null            # logged, otherwise a no-op
//! ```
//!
//! - [`lexer`]: tokenises a script, keeping newlines as separators
//! - [`parse`]: builds a [`Script`] from the token stream
//! - [`ast`]: statements, calls and operands

pub mod ast;
pub mod lexer;
pub mod parse;

pub use ast::{Call, Operand, Script, SourceLocation, Statement, StatementKind};
pub use parse::{parse_script, ParseError, Parser};
