//! Actions issued by the model and their translation into device commands.

mod action;
mod parser;
mod translator;

pub use action::{Action, CoordinateSystem, RELATIVE_COORDINATE_MAX};
pub use parser::{parse_action, ParseError, DEFAULT_WAIT};
pub use translator::{ActionTranslator, Directive, TranslateError};
