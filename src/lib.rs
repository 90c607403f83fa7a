//! MediaWiki template expansion for offline wikitext processing.
//!
//! Give an [`Expander`] a [`Wiki`] backend and the name of a page, then call
//! [`Expander::expand`] with the page text to get the text back with every
//! template, template argument, magic word, and parser function resolved.
//!
//! ```
//! use wiki_expand::{Expander, MemoryWiki};
//!
//! let wiki = MemoryWiki::default().with_template("Greet", "Hello, {{{1|world}}}!");
//! let mut expander = Expander::new(&wiki, "Main Page")?;
//! assert_eq!(expander.expand("{{Greet}} {{Greet|{{PAGENAME}}}}")?, "Hello, world! Hello, Main Page!");
//! # Ok::<(), wiki_expand::Error>(())
//! ```

pub mod alias;
pub mod cache;
pub mod common;
pub mod config;
pub mod expander;
pub mod expr;
pub mod parser;
pub mod php;
pub mod preprocess;
pub mod scanner;
pub mod siteinfo;
pub mod title;
pub mod uniq;
pub mod wiki;

pub use cache::ParseCache;
pub use config::Limits;
pub use expander::{ArgumentList, CancelToken, Error, Expander, Result};
pub use siteinfo::Siteinfo;
pub use wiki::{MemoryWiki, Page, Source, Wiki, WikiError};
