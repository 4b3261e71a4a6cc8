//! Filter expressions for selecting course elements.
//!
//! A filter string such as `code in ["CS101","CS102"]` or `! year < 2016` is
//! compiled against an [`ExtractorTable`] into a [`Filter`]. Compilation
//! rejects bad syntax, unknown extractors and operators the value's type does
//! not support, so evaluation itself cannot fail.
//!
//! # Operators
//!
//! - `==`, `!=` - equality
//! - `<`, `<=`, `>=`, `>` - numeric or string ordering
//! - `~`, `=~` - regular expression match, `!~` - negated match
//! - `in` - array element, object key or substring
//! - `keyin`, `valuein` - object key or object value
//!
//! Without an operator, arrays and objects use `in`, regular expressions use
//! `~` and everything else uses `==`.
//!
//! # Example
//!
//! ```
//! use cl_core::filter::ExtractorTable;
//! use cl_core::Value;
//!
//! let table: ExtractorTable<i32, String, ()> = ExtractorTable::new()
//!     .with("code", |_: &i32, code: &String, _: Option<&()>| Value::from(code.as_str()))
//!     .with_default("code");
//!
//! let filter = table.compile("code ~ /^CS/").unwrap();
//! assert!(filter.evaluate(&2017, &"CS101".to_string(), None));
//! ```

mod compiler;
mod error;
mod extractor;
mod predicate;

pub use compiler::{Comparison, FilterSpec, Operator};
pub use error::FilterError;
pub use extractor::{Extractor, ExtractorTable};
pub use predicate::Filter;
