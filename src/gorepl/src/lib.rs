pub mod ast;
pub mod classify;
pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod imports;
pub mod include;
pub mod printer;
pub mod program;
pub mod runner;
pub mod session;
