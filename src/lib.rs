pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod primitive;
pub mod scanner;
pub mod token;
pub mod value;
