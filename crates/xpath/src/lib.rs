//! XPath 1.0 query engine over a cursor-style tree navigator.
//!
//! The pipeline is scanner → precedence parser → expression tree → lazy
//! cursors driving a host-supplied [`Navigator`]. Nothing here owns a
//! document: hosts implement [`Navigator`] for their own tree and hand a
//! positioned navigator to [`CompiledQuery::evaluate`].
//!
//! ```
//! use navpath_xpath::model::simple::{doc, elem, attr, text};
//! use navpath_xpath::{compile, DynamicContext, StaticContext, Value};
//!
//! let root = doc()
//!     .child(
//!         elem("list")
//!             .child(elem("item").attr(attr("n", "1")).child(text("a")))
//!             .child(elem("item").attr(attr("n", "2")).child(text("b"))),
//!     )
//!     .build();
//!
//! let query = compile("count(/list/item[@n > 1])", &StaticContext::default()).unwrap();
//! let ctx = DynamicContext::default();
//! match query.evaluate(&root, &ctx).unwrap() {
//!     Value::Number(n) => assert_eq!(n, 1.0),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod cache;
pub mod consts;
pub mod engine;
pub mod model;
pub mod parser;
pub mod query;
pub mod xdm;

pub use cache::QueryCache;
pub use engine::collation::{Collation, CollationRegistry};
pub use engine::runtime::{
    CallCtx, DynamicContext, DynamicContextBuilder, Error, ErrorCode, FunctionRegistry,
    StaticContext, StaticContextBuilder,
};
pub use model::{NamespaceScope, Navigator, NodeKind, NodeOrder};
pub use query::{CaseOrder, CompiledQuery, SortDataType, SortOrder, compile};
pub use xdm::{ExpandedName, NodeCursor, NodeSequence, ReturnType, SeqOrder, Value};
